//! Input/output helpers.
//!
//! - binned CSV ingest + validation (`ingest`)
//! - per-bin result and histogram CSV writers (`export`)
//! - curve JSON read/write (`curve`)

pub mod curve;
pub mod export;
pub mod ingest;

pub use curve::*;
pub use export::*;
pub use ingest::*;
