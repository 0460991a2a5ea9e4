//! Terminal plots of spectra and fitted overlays.

pub mod ascii;

pub use ascii::*;
