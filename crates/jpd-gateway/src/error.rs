//! Error types for jpd-gateway

use std::time::Duration;

/// Result type for jpd-gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the record stores and the gateway
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The service signalled a rate limit outside of an HTTP status
    #[error("Rate limited by {service}")]
    RateLimited {
        service: String,
        retry_after: Option<Duration>,
    },

    /// Retries were exhausted on a transient error
    #[error("Rate limit retries exhausted after {attempts} attempts: {source}")]
    RateLimitExhausted { attempts: u32, source: Box<Error> },

    /// Non-success HTTP response
    #[error("{service} returned HTTP {status}: {message}")]
    Http {
        service: String,
        status: u16,
        message: String,
    },

    /// Credentials were rejected
    #[error("Credentials rejected by {service}: {message}")]
    Unauthorized { service: String, message: String },

    /// Request timed out before a response arrived
    #[error("Request to {service} timed out")]
    Timeout { service: String },

    /// Record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Connection-level failure
    #[error("Transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn http(service: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            service: service.into(),
            status,
            message: message.into(),
        }
    }

    pub fn rate_limited(service: impl Into<String>) -> Self {
        Self::RateLimited {
            service: service.into(),
            retry_after: None,
        }
    }

    /// HTTP 429, or a 403 whose body names a rate limit (GitHub's secondary
    /// limits are reported that way).
    pub fn is_rate_limit(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Http {
                status: 429, ..
            } => true,
            Self::Http {
                status: 403,
                message,
                ..
            } => message.to_lowercase().contains("rate limit"),
            _ => false,
        }
    }

    /// Errors worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        self.is_rate_limit() || matches!(self, Self::Timeout { .. })
    }

    /// Errors that must abort a whole pass.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized { .. } | Self::Http { status: 401, .. }
        )
    }
}
