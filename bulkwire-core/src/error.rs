//! Error types for the bulk write pipeline.

use crate::response::BulkOutcome;
use bulkwire_transport::TransportError;
use thiserror::Error;

/// Terminal failure of one bulk submission.
///
/// Every variant that follows at least one decoded response carries the
/// latest outcome of each submitted operation, so a caller can always tell
/// which documents landed.
#[derive(Error, Debug)]
pub enum BulkError {
    /// Connection failure or non-2xx envelope. Never tolerated per item.
    #[error("Bulk request failed on attempt {attempts}: {source}")]
    Transport {
        /// Underlying transport failure.
        #[source]
        source: TransportError,
        /// Attempts made, including the failing one.
        attempts: u32,
        /// Outcomes known from earlier attempts.
        outcomes: Vec<BulkOutcome>,
    },

    /// Response body could not be correlated with the request.
    #[error("Bulk response could not be decoded on attempt {attempts}: {source}")]
    Decode {
        /// Decoding failure.
        #[source]
        source: DecodeError,
        /// Attempts made, including the failing one.
        attempts: u32,
        /// Outcomes known from earlier attempts.
        outcomes: Vec<BulkOutcome>,
    },

    /// At least one item returned a status that is neither accepted,
    /// ignored nor retryable.
    #[error(
        "Bulk write aborted: {} item(s) rejected, first at ordinal {} with status {}{}",
        .fatal.len(),
        .first.ordinal,
        .first.status,
        .first.error.as_ref().map(|e| format!(" ({})", e)).unwrap_or_default()
    )]
    ItemFatal {
        /// First rejected item in submission order.
        first: BulkOutcome,
        /// Every rejected item.
        fatal: Vec<BulkOutcome>,
        /// Latest outcome of every submitted operation.
        outcomes: Vec<BulkOutcome>,
        /// Attempts made.
        attempts: u32,
    },

    /// Items were still being rejected as transient after the last retry.
    #[error("Bulk write gave up after {attempts} attempt(s) with {} item(s) still rejected", .remaining.len())]
    RetriesExhausted {
        /// Attempts made.
        attempts: u32,
        /// Items that were still marked for retry.
        remaining: Vec<BulkOutcome>,
        /// Latest outcome of every submitted operation.
        outcomes: Vec<BulkOutcome>,
    },

    /// The caller canceled the submission or its deadline passed.
    #[error("Bulk write canceled after {attempts} attempt(s)")]
    Canceled {
        /// Attempts completed before cancellation was observed.
        attempts: u32,
        /// Outcomes known at that point.
        outcomes: Vec<BulkOutcome>,
    },

    /// The client was closed before the submission started.
    #[error("Bulk client is closed")]
    Closed,

    /// Retry payload could not be built.
    #[error(transparent)]
    Buffer(#[from] BufferError),
}

impl BulkError {
    /// True for caller-initiated cancellation.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled { .. })
    }

    /// Outcomes known when the submission stopped.
    pub fn outcomes(&self) -> &[BulkOutcome] {
        match self {
            Self::Transport { outcomes, .. }
            | Self::Decode { outcomes, .. }
            | Self::ItemFatal { outcomes, .. }
            | Self::RetriesExhausted { outcomes, .. }
            | Self::Canceled { outcomes, .. } => outcomes,
            Self::Closed | Self::Buffer(_) => &[],
        }
    }

    /// Number of send attempts made.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Transport { attempts, .. }
            | Self::Decode { attempts, .. }
            | Self::ItemFatal { attempts, .. }
            | Self::RetriesExhausted { attempts, .. }
            | Self::Canceled { attempts, .. } => *attempts,
            Self::Closed | Self::Buffer(_) => 0,
        }
    }
}

/// Failure to turn a bulk body into correlated records.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The response is not a bulk envelope.
    #[error("Malformed bulk response: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The response has a different number of items than the request.
    #[error("Bulk response has {actual} item(s), request had {expected}")]
    CountMismatch {
        /// Operations sent.
        expected: usize,
        /// Items returned.
        actual: usize,
    },

    /// A pre-encoded request body could not be split into operations.
    #[error("Malformed bulk request at line {line}: {reason}")]
    Request {
        /// One-based line number.
        line: usize,
        /// What was wrong.
        reason: String,
    },
}

/// Misuse of a [`TrackedBuffer`](crate::TrackedBuffer).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// The requested ordinal is not held by the buffer.
    #[error("Ordinal {0} is not present in the buffer")]
    UnknownOrdinal(usize),
}

/// Invalid configuration value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// A key held a value that could not be parsed.
    #[error("Invalid value {value:?} for {key}: {reason}")]
    Invalid {
        /// Setting key.
        key: String,
        /// Raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl SettingsError {
    pub(crate) fn invalid(key: &str, value: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type of one bulk submission.
pub type BulkResult = std::result::Result<crate::BulkReport, BulkError>;

/// Result type alias for bulk operations.
pub type Result<T> = std::result::Result<T, BulkError>;
