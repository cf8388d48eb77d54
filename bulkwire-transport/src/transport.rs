//! The transport seam consumed by the bulk pipeline.

use crate::{Result, TransportResponse};
use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use std::sync::Arc;

/// Sends one request to the cluster and returns the envelope status and body.
///
/// Implementations must be safe to share between concurrent submissions.
/// Connection failures are reported as errors; a response with any status,
/// including non-2xx, is returned as `Ok` and judged by the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `body` to `path` using `method`.
    async fn send(&self, method: Method, path: &str, body: Bytes) -> Result<TransportResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, method: Method, path: &str, body: Bytes) -> Result<TransportResponse> {
        (**self).send(method, path, body).await
    }
}
