use thiserror::Error;

use m2a_core::M2aCoreError;
use m2a_io::TensorIoError;

#[derive(Error, Debug)]
pub enum FeatureError {
    #[error("Invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    #[error("Feature columns don't match the schema: {0}")]
    SchemaMismatch(String),

    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("Tensor shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Duplicate promoter key: {0}")]
    DuplicatePromoter(String),

    #[error("Promoter `{0}` has no metadata row")]
    MissingMetadata(String),

    #[error("{count} metadata rows have no tensor row (first: `{first}`)")]
    UnmatchedMetadata { count: usize, first: String },

    #[error("BigWig error: {0}")]
    BigWigError(String),

    #[error(transparent)]
    Core(#[from] M2aCoreError),

    #[error(transparent)]
    TensorIo(#[from] TensorIoError),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FeatureError>;
