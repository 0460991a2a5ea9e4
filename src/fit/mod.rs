//! Peak fitting orchestration.
//!
//! Responsibilities:
//!
//! - validate binned input before any solver work
//! - seed the solver from the histogram's moments
//! - run Levenberg–Marquardt and derive parameter errors
//! - evaluate the fitted model on a dense grid for overlays
//! - fit independent spectra in parallel

pub mod fitter;
pub mod seed;

pub use fitter::*;
pub use seed::*;
