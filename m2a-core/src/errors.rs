use thiserror::Error;

#[derive(Error, Debug)]
pub enum M2aCoreError {
    #[error("Can't read file: {0}")]
    FileReadError(String),

    #[error("Missing required column `{column}` in {file}")]
    MissingColumn { column: String, file: String },

    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("Invalid strand `{0}`, expected `+` or `-`")]
    InvalidStrand(String),

    #[error("Duplicate promoter key: {0}")]
    DuplicatePromoter(String),

    #[error("Corrupted file. 0 records found in the file: {0}")]
    EmptyInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, M2aCoreError>;
