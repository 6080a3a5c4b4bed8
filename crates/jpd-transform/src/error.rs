//! Error types for jpd-transform

/// Result type for jpd-transform operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while mapping a source record
///
/// None of these abort a reconciliation pass: the caller logs the error
/// against the record key and moves on to the next record.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A custom function could not be resolved from its path
    #[error("Failed to load transform function '{path}': {reason}")]
    FunctionLoad { path: String, reason: String },

    /// A custom function was loaded but returned an error
    #[error("Transform function '{path}' failed: {message}")]
    FunctionFailed { path: String, message: String },

    /// A template referenced a filter that does not exist
    #[error("Unknown template filter '{name}'")]
    UnknownFilter { name: String },

    /// A filter was given the wrong number of arguments
    #[error("Filter '{name}' expects {expected} argument(s), got {actual}")]
    FilterArity {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Template syntax could not be parsed
    #[error("Invalid template at byte {position}: {message}")]
    InvalidTemplate { position: usize, message: String },

    /// Field path syntax could not be parsed
    #[error("Invalid field path '{path}': {message}")]
    InvalidPath { path: String, message: String },
}

impl Error {
    pub fn invalid_path(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn invalid_template(position: usize, message: impl Into<String>) -> Self {
        Self::InvalidTemplate {
            position,
            message: message.into(),
        }
    }
}
