//! Error types for jpd-core

use std::path::PathBuf;

/// Result type for jpd-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// How a failure affects the running pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rate limits and timeouts; retried inside the gateway
    Transient,
    /// Skips the current record, the pass continues
    PerRecord,
    /// Malformed stored state; degrades instead of failing
    Structural,
    /// Aborts the pass
    Fatal,
}

/// Errors that can occur in jpd-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration file not found at expected path
    #[error("Configuration not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration file could not be parsed
    #[error("Failed to parse {format} configuration {path}: {message}")]
    ConfigParse {
        path: PathBuf,
        format: String,
        message: String,
    },

    /// Configuration file extension is not recognized
    #[error("Unsupported configuration format: '{extension}'")]
    UnsupportedFormat { extension: String },

    /// A mapping produced an empty value for a field the destination requires
    #[error("Record {key}: required field '{field}' is empty")]
    MissingRequiredField { key: String, field: &'static str },

    // Transparent wrappers for underlying crate errors
    /// Mapping error from jpd-transform
    #[error(transparent)]
    Transform(#[from] jpd_transform::Error),

    /// State block error from jpd-blocks
    #[error(transparent)]
    Blocks(#[from] jpd_blocks::Error),

    /// Store access error from jpd-gateway
    #[error(transparent)]
    Gateway(#[from] jpd_gateway::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigNotFound { .. }
            | Self::ConfigParse { .. }
            | Self::UnsupportedFormat { .. }
            | Self::Io(_) => ErrorKind::Fatal,
            Self::Gateway(e) if e.is_fatal() => ErrorKind::Fatal,
            Self::Gateway(e) if e.is_transient() => ErrorKind::Transient,
            Self::Blocks(_) => ErrorKind::Structural,
            Self::MissingRequiredField { .. }
            | Self::Transform(_)
            | Self::Gateway(_)
            | Self::Json(_) => ErrorKind::PerRecord,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }
}
