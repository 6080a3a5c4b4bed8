//! Error types for jpd-blocks

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Sync metadata block is missing required key '{key}'")]
    MissingKey { key: &'static str },

    #[error("Invalid sync metadata line {line}: {message}")]
    InvalidLine { line: usize, message: String },

    #[error("Invalid timestamp '{value}': {message}")]
    InvalidTimestamp { value: String, message: String },
}
