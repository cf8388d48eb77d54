// Bulkwire - bulk writes for Elasticsearch/OpenSearch compatible clusters
//
// This library encodes write operations into one NDJSON request, pairs every
// item of the response with the operation that produced it, and resends only
// the operations rejected as transient.

// Re-export the pipeline
pub use bulkwire_core::*;

// Re-export the transport seam
pub use bulkwire_transport as transport;
pub use bulkwire_transport::{HttpTransport, HttpTransportConfig, Transport, TransportError, TransportResponse};

/// Prelude for common imports.
pub mod prelude {
    pub use bulkwire_core::prelude::*;
    pub use bulkwire_transport::{HttpTransport, HttpTransportConfig, Transport};
}
