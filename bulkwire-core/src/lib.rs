//! # Bulkwire Core
//!
//! Bulk write pipeline for Elasticsearch/OpenSearch compatible clusters.
//!
//! Operations are encoded into a [`TrackedBuffer`] that remembers where each
//! one starts, sent as a single NDJSON request, and every item of the
//! response is paired back with the operation that produced it. Items are
//! then classified:
//!
//! - **accepted**: 2xx
//! - **ignored**: a status listed in `bulk.write.status.ignore`
//! - **retry**: a transient status (429 by default); only these operations
//!   are sent again, after a backoff, up to the retry ceiling
//! - **fatal**: anything else; the batch aborts and the error names the
//!   first rejected operation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bulkwire_core::prelude::*;
//! use bulkwire_transport::{HttpTransport, HttpTransportConfig};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = HttpTransport::new(HttpTransportConfig::new("http://localhost:9200"))?;
//!     let settings = BulkSettings::from_properties([("bulk.write.status.ignore", "404")])?;
//!     let client = BulkClient::new(transport, settings);
//!
//!     let report = client
//!         .submit(vec![
//!             WriteOperation::index("logs", Some("1"), &json!({ "msg": "hello" }))?,
//!             WriteOperation::update("logs", "2", &json!({ "seen": true }))?,
//!             WriteOperation::delete("logs", "3")?,
//!         ])
//!         .await?;
//!
//!     println!("{} accepted, {} ignored", report.accepted, report.ignored.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! [`BulkSettings`] can be built in code, from string properties, or from
//! `BULKWIRE_*` environment variables (a `.env` file is honored):
//!
//! | Property                     | Environment                     | Default  |
//! |------------------------------|---------------------------------|----------|
//! | `bulk.path`                  | `BULKWIRE_PATH`                 | `/_bulk` |
//! | `bulk.write.status.ignore`   | `BULKWIRE_WRITE_STATUS_IGNORE`  | empty    |
//! | `bulk.write.retry.count`     | `BULKWIRE_WRITE_RETRY_COUNT`    | `3`      |
//! | `bulk.write.retry.wait`      | `BULKWIRE_WRITE_RETRY_WAIT`     | `500ms`  |
//! | `bulk.write.retry.max_wait`  | `BULKWIRE_WRITE_RETRY_MAX_WAIT` | `10s`    |
//! | `bulk.write.retry.statuses`  | `BULKWIRE_WRITE_RETRY_STATUSES` | `429`    |
//! | `bulk.size.entries`          | `BULKWIRE_SIZE_ENTRIES`         | `1000`   |
//! | `bulk.size.bytes`            | `BULKWIRE_SIZE_BYTES`           | `1mb`    |

pub mod buffer;
pub mod client;
pub mod encoder;
pub mod error;
pub mod operation;
pub mod policy;
pub mod response;
pub mod retry;
pub mod settings;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod writer;

pub use buffer::{Span, TrackedBuffer};
pub use client::{BulkClient, BulkReport, SubmitOptions};
pub use encoder::{decode_request, encode};
pub use error::{BufferError, BulkError, BulkResult, DecodeError, Result, SettingsError};
pub use operation::{BulkAction, Document, WriteOperation};
pub use policy::{Classification, ClassifiedOutcomes, DEFAULT_RETRY_STATUSES, IgnorePolicy, StatusPolicy};
pub use response::{BulkItem, BulkItemStatus, BulkOutcome, BulkResponse, ItemError, decode, decode_items};
pub use retry::{BackoffStrategy, RetryPolicy};
pub use settings::BulkSettings;
pub use writer::{BulkWriter, WriterStats};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::client::{BulkClient, BulkReport, SubmitOptions};
    pub use crate::error::{BulkError, BulkResult};
    pub use crate::operation::{BulkAction, Document, WriteOperation};
    pub use crate::policy::IgnorePolicy;
    pub use crate::retry::RetryPolicy;
    pub use crate::settings::BulkSettings;
    pub use crate::writer::BulkWriter;
}
