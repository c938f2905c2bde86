//! # Input/Output utilities for promoter feature tensors.
//!
//! This small crate saves and restores a [TensorBundle]: the assembled
//! `(promoters, resolutions, windows, channels)` feature tensor, the promoter
//! metadata aligned to its rows and an optional response variable. Bundles
//! are stored as `.npz` archives of named `.npy` arrays, readable from numpy,
//! next to a small JSON manifest describing the tensor axes.
//!
pub mod bundle;
pub mod error;
pub mod npz;

// re-expose core functions
pub use bundle::*;
pub use error::*;
pub use npz::*;
