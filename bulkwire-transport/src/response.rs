//! Transport response.

use crate::{Result, TransportError};
use bytes::Bytes;
use http::StatusCode;
use serde::de::DeserializeOwned;

/// Status code plus fully-read body returned by a [`Transport`](crate::Transport).
#[derive(Debug, Clone)]
pub struct TransportResponse {
    status: StatusCode,
    body: Bytes,
}

impl TransportResponse {
    /// Create a response from its parts.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Get the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Check if the envelope status is 2xx.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Get the response body as bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Consume the response and return the body.
    pub fn into_bytes(self) -> Bytes {
        self.body
    }

    /// Get the response body as text.
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec()).map_err(|e| TransportError::Body(e.to_string()))
    }

    /// Parse the response body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| TransportError::Body(e.to_string()))
    }

    /// Turn a non-2xx envelope into [`TransportError::Status`].
    pub fn error_for_status(self) -> Result<Self> {
        if self.status.is_success() {
            return Ok(self);
        }

        let text = String::from_utf8_lossy(&self.body);
        let message: String = text.chars().take(512).collect();
        Err(TransportError::Status {
            status: self.status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_for_status() {
        let ok = TransportResponse::new(StatusCode::OK, "{}");
        assert!(ok.error_for_status().is_ok());

        let bad = TransportResponse::new(StatusCode::SERVICE_UNAVAILABLE, "cluster blocked");
        match bad.error_for_status() {
            Err(TransportError::Status { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "cluster blocked");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_json_body() {
        let response = TransportResponse::new(StatusCode::OK, r#"{"took": 3}"#);
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["took"], 3);
        assert!(TransportResponse::new(StatusCode::OK, "nope")
            .json::<serde_json::Value>()
            .is_err());
    }
}
