//! Bulk response decoding.

use crate::{buffer::Span, error::DecodeError, operation::BulkAction};
use serde::{Deserialize, Serialize};

/// Bulk response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkResponse {
    /// Time taken in milliseconds.
    #[serde(default)]
    pub took: u64,
    /// Whether any item failed.
    #[serde(default)]
    pub errors: bool,
    /// Individual item results, in request order.
    pub items: Vec<BulkItem>,
}

/// Individual bulk item result, keyed by its action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkItem {
    /// Index result.
    Index(BulkItemStatus),
    /// Create result.
    Create(BulkItemStatus),
    /// Update result.
    Update(BulkItemStatus),
    /// Delete result.
    Delete(BulkItemStatus),
}

impl BulkItem {
    /// Action the item reports on.
    pub fn action(&self) -> BulkAction {
        match self {
            BulkItem::Index(_) => BulkAction::Index,
            BulkItem::Create(_) => BulkAction::Create,
            BulkItem::Update(_) => BulkAction::Update,
            BulkItem::Delete(_) => BulkAction::Delete,
        }
    }

    /// Status block of the item.
    pub fn status(&self) -> &BulkItemStatus {
        match self {
            BulkItem::Index(s) | BulkItem::Create(s) | BulkItem::Update(s) | BulkItem::Delete(s) => s,
        }
    }

    fn into_outcome(self, ordinal: usize) -> BulkOutcome {
        let action = self.action();
        let status = match self {
            BulkItem::Index(s) | BulkItem::Create(s) | BulkItem::Update(s) | BulkItem::Delete(s) => s,
        };

        BulkOutcome {
            ordinal,
            action,
            status: status.status,
            error: status.error,
            index: status.index,
            id: status.id,
        }
    }
}

/// Status of a bulk item operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkItemStatus {
    /// Index name.
    #[serde(rename = "_index", default)]
    pub index: Option<String>,
    /// Document ID.
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    /// Document version.
    #[serde(rename = "_version", default)]
    pub version: Option<i64>,
    /// Result keyword (`created`, `updated`, `deleted`, `noop`, `not_found`).
    #[serde(default)]
    pub result: Option<String>,
    /// HTTP status code of the item.
    pub status: u16,
    /// Error details.
    #[serde(default)]
    pub error: Option<ItemError>,
}

/// Bulk item error details.
///
/// Current clusters send an object; very old ones sent a bare string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemError {
    /// Structured error.
    Detailed {
        /// Error type, e.g. `document_missing_exception`.
        #[serde(rename = "type")]
        error_type: String,
        /// Human readable reason.
        #[serde(default)]
        reason: Option<String>,
    },
    /// Legacy string error.
    Message(String),
}

impl ItemError {
    /// Error type, when the cluster reported one.
    pub fn error_type(&self) -> Option<&str> {
        match self {
            ItemError::Detailed { error_type, .. } => Some(error_type),
            ItemError::Message(_) => None,
        }
    }

    /// Reason text.
    pub fn reason(&self) -> Option<&str> {
        match self {
            ItemError::Detailed { reason, .. } => reason.as_deref(),
            ItemError::Message(message) => Some(message),
        }
    }
}

impl std::fmt::Display for ItemError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemError::Detailed {
                error_type,
                reason: Some(reason),
            } => write!(f, "{}: {}", error_type, reason),
            ItemError::Detailed { error_type, .. } => f.write_str(error_type),
            ItemError::Message(message) => f.write_str(message),
        }
    }
}

/// Result of one submitted operation, correlated by ordinal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkOutcome {
    /// Ordinal of the operation in the original submission.
    pub ordinal: usize,
    /// Action the cluster reported.
    pub action: BulkAction,
    /// Item-level status code.
    pub status: u16,
    /// Error descriptor, on failure.
    pub error: Option<ItemError>,
    /// Index the item was routed to.
    pub index: Option<String>,
    /// Document ID.
    pub id: Option<String>,
}

impl BulkOutcome {
    /// Check if the item was acknowledged (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Decode a response to the request whose spans are `sent`.
///
/// Item *i* is paired with `sent[i]` and takes its ordinal, so a reduced
/// retry buffer maps straight back to the original submission. The item
/// count must match exactly.
pub fn decode(body: &[u8], sent: &[Span]) -> Result<Vec<BulkOutcome>, DecodeError> {
    let items = parse_items(body, sent.len())?;
    Ok(items
        .into_iter()
        .zip(sent)
        .map(|(item, span)| item.into_outcome(span.ordinal))
        .collect())
}

/// Decode a response expected to hold `expected` items, numbered from zero.
pub fn decode_items(body: &[u8], expected: usize) -> Result<Vec<BulkOutcome>, DecodeError> {
    let items = parse_items(body, expected)?;
    Ok(items
        .into_iter()
        .enumerate()
        .map(|(ordinal, item)| item.into_outcome(ordinal))
        .collect())
}

fn parse_items(body: &[u8], expected: usize) -> Result<Vec<BulkItem>, DecodeError> {
    let response: BulkResponse = serde_json::from_slice(body)?;

    if response.items.len() != expected {
        return Err(DecodeError::CountMismatch {
            expected,
            actual: response.items.len(),
        });
    }

    Ok(response.items)
}
