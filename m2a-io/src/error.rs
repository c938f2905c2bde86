use std::io;
use thiserror::Error;

use m2a_core::M2aCoreError;

/// Error type for m2a-io operations.
#[derive(Error, Debug)]
pub enum TensorIoError {
    /// IO error occurred during file operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Failed to write an array into the archive.
    #[error("Failed to write npz archive: {0}")]
    WriteNpz(#[from] ndarray_npy::WriteNpzError),

    /// Failed to read an array from the archive.
    #[error("Failed to read npz archive: {0}")]
    ReadNpz(#[from] ndarray_npy::ReadNpzError),

    /// The schema manifest couldn't be (de)serialised.
    #[error("Invalid schema manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    /// Dimensions of the bundle's parts disagree.
    #[error("Tensor shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A stored metadata field couldn't be decoded.
    #[error("Invalid `{field}` dataset: {reason}")]
    InvalidField { field: String, reason: String },

    #[error(transparent)]
    Core(#[from] M2aCoreError),
}

/// Result type alias for m2a-io operations.
pub type Result<T> = std::result::Result<T, TensorIoError>;
