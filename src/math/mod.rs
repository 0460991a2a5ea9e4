//! Numerical utilities: least squares, moments, grids, and the nonlinear solver.

pub mod grid;
pub mod lm;
pub mod moments;
pub mod ols;

pub use grid::*;
pub use lm::*;
pub use moments::*;
pub use ols::*;
