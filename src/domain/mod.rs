//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the model selector (`ModelKind`) and its parameter layout
//! - binned spectra (`BinnedSample`)
//! - fit outputs (`FitResult`, `ParamEstimate`, `FitQuality`, `CurveGrid`)
//! - run configuration (`FitConfig`, `SolverSettings`, `RunConfig`)

pub mod types;

pub use types::*;
