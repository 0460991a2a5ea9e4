//! Event-level inputs: samples, histogramming, and the toy generator.

pub mod sample;
pub mod simulate;

pub use sample::*;
pub use simulate::*;
