//! Transport error types.

use std::time::Duration;
use thiserror::Error;

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors raised while moving a request to the cluster and back.
///
/// Every variant is fatal to the attempt that produced it. Item-level
/// statuses inside a successful bulk envelope are not transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection refused, reset or otherwise unavailable.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Request timed out.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The envelope itself came back with a non-2xx status.
    #[error("Unexpected response status {status}: {message}")]
    Status {
        /// HTTP status code of the envelope.
        status: u16,
        /// Leading part of the response body.
        message: String,
    },

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Request building error.
    #[error("Failed to build request: {0}")]
    RequestBuild(String),

    /// Body could not be read as text or JSON.
    #[error("Body error: {0}")]
    Body(String),

    /// Underlying HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl TransportError {
    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_)) || matches!(self, Self::Http(e) if e.is_timeout())
    }

    /// Check if this is a connection error.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_)) || matches!(self, Self::Http(e) if e.is_connect())
    }

    /// Get the envelope status code, if the server answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code() {
        let err = TransportError::Status {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(err.status_code(), Some(503));
        assert!(!err.is_timeout());
        assert!(!err.is_connection());
    }

    #[test]
    fn test_classification_helpers() {
        assert!(TransportError::Timeout(Duration::from_secs(1)).is_timeout());
        assert!(TransportError::Connection("refused".into()).is_connection());
        assert_eq!(TransportError::InvalidUrl("x".into()).status_code(), None);
    }
}
