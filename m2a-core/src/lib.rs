//! # Core data model for m2a
//!
//! Promoter definitions, methylation input and the readers that load them.
//! Everything downstream (window statistics, tensor assembly) works on the
//! types defined here.
//!
pub mod errors;
pub mod models;
pub mod utils;

pub use errors::{M2aCoreError, Result};
