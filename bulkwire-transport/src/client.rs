//! reqwest-backed transport.

use crate::{HttpTransportConfig, Result, Transport, TransportError, TransportResponse};
use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, header};
use std::sync::Arc;
use tracing::trace;

/// HTTP transport talking to a single cluster node.
///
/// Built once and cloned freely; clones share one connection pool.
#[derive(Clone)]
pub struct HttpTransport {
    inner: reqwest::Client,
    config: Arc<HttpTransportConfig>,
}

impl HttpTransport {
    /// Create a new transport with the given configuration.
    pub fn new(config: HttpTransportConfig) -> Result<Self> {
        url::Url::parse(&config.base_url)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        let builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .default_headers(default_headers(&config)?)
            .gzip(config.gzip);

        let inner = builder
            .build()
            .map_err(|e| TransportError::RequestBuild(e.to_string()))?;

        Ok(Self {
            inner,
            config: Arc::new(config),
        })
    }

    /// Get the transport configuration.
    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    fn url_for(&self, path: &str) -> Result<url::Url> {
        let joined = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Ok(url::Url::parse(&joined)?)
    }

    fn map_error(&self, error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout(self.config.timeout)
        } else if error.is_connect() {
            TransportError::Connection(error.to_string())
        } else {
            TransportError::Http(error)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, method: Method, path: &str, body: Bytes) -> Result<TransportResponse> {
        let url = self.url_for(path)?;
        trace!(%method, %url, bytes = body.len(), "Sending request");

        let mut request = self.inner.request(method, url);
        if !body.is_empty() {
            request = request
                .header(header::CONTENT_TYPE, "application/x-ndjson")
                .body(body);
        }

        let response = request.send().await.map_err(|e| self.map_error(e))?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.map_error(e))?;

        trace!(status = status.as_u16(), bytes = body.len(), "Received response");
        Ok(TransportResponse::new(status, body))
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

fn default_headers(config: &HttpTransportConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    for (name, value) in &config.default_headers {
        let name = HeaderName::try_from(name.as_str())
            .map_err(|e| TransportError::RequestBuild(format!("header {}: {}", name, e)))?;
        let value = HeaderValue::try_from(value.as_str())
            .map_err(|e| TransportError::RequestBuild(e.to_string()))?;
        headers.insert(name, value);
    }

    if let Some(username) = &config.username {
        let credentials = format!("{}:{}", username, config.password.as_deref().unwrap_or(""));
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
        let mut value = HeaderValue::try_from(format!("Basic {}", encoded))
            .map_err(|e| TransportError::RequestBuild(e.to_string()))?;
        value.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, value);
    }

    Ok(headers)
}
