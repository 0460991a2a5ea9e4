//! Peak model implementations (Gaussian, Crystal Ball, Crystal Ball + linear).
//!
//! Models are implemented as small, pure functions so that fitting code can
//! stay generic; `ModelKind` selects one through [`evaluate`].

pub mod model;

pub use model::*;
