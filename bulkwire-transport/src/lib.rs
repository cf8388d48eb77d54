//! # Bulkwire Transport
//!
//! The connection seam used by the bulkwire bulk write pipeline. The
//! pipeline only needs something that can send a request and hand back an
//! envelope status plus body; this crate defines that contract as the
//! [`Transport`] trait and ships a reqwest-backed [`HttpTransport`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bulkwire_transport::{HttpTransport, HttpTransportConfig, Method, Transport};
//! use bytes::Bytes;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HttpTransportConfig::builder()
//!         .base_url("http://localhost:9200")
//!         .timeout(Duration::from_secs(30))
//!         .basic_auth("elastic", "changeme")
//!         .build();
//!
//!     let transport = HttpTransport::new(config)?;
//!     let response = transport.send(Method::GET, "/", Bytes::new()).await?;
//!
//!     println!("Status: {}", response.status());
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;
mod response;
mod transport;

pub use client::HttpTransport;
pub use config::{HttpTransportConfig, HttpTransportConfigBuilder};
pub use error::{Result, TransportError};
pub use response::TransportResponse;
pub use transport::Transport;

// Re-export common types
pub use bytes::Bytes;
pub use http::{Method, StatusCode};
