//! Write operations and the document trait.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Bulk action type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkAction {
    /// Index a document, replacing any existing one.
    Index,
    /// Create a document, failing if it exists.
    Create,
    /// Partially update an existing document.
    Update,
    /// Delete a document.
    Delete,
}

impl BulkAction {
    /// Wire name of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkAction::Index => "index",
            BulkAction::Create => "create",
            BulkAction::Update => "update",
            BulkAction::Delete => "delete",
        }
    }

    /// Parse a wire action name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "index" => Some(BulkAction::Index),
            "create" => Some(BulkAction::Create),
            "update" => Some(BulkAction::Update),
            "delete" => Some(BulkAction::Delete),
            _ => None,
        }
    }

    /// Whether the action line is followed by a payload line.
    pub fn has_payload(&self) -> bool {
        !matches!(self, BulkAction::Delete)
    }
}

impl std::fmt::Display for BulkAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for documents that know where they are written.
///
/// # Example
///
/// ```rust
/// use bulkwire_core::Document;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Product {
///     sku: String,
///     price: f64,
/// }
///
/// impl Document for Product {
///     fn index_name() -> &'static str {
///         "products"
///     }
///
///     fn document_id(&self) -> Option<String> {
///         Some(self.sku.clone())
///     }
/// }
/// ```
pub trait Document: Serialize + Send + Sync {
    /// Returns the target index for this document type.
    fn index_name() -> &'static str;

    /// Returns the document ID; `None` lets the cluster generate one.
    fn document_id(&self) -> Option<String> {
        None
    }

    /// Returns the routing key for this document (optional).
    fn routing(&self) -> Option<String> {
        None
    }
}

fn partial_doc<T: Serialize + ?Sized>(partial: &T, upsert: bool) -> serde_json::Result<Value> {
    let mut body = Map::new();
    body.insert("doc".to_string(), serde_json::to_value(partial)?);
    if upsert {
        body.insert("doc_as_upsert".to_string(), Value::Bool(true));
    }
    Ok(Value::Object(body))
}

#[derive(Serialize)]
struct ActionMeta<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    routing: Option<&'a str>,
}

/// One serialized bulk operation: an action line plus, unless it is a
/// delete, a payload line. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOperation {
    action: BulkAction,
    bytes: Bytes,
}

impl WriteOperation {
    /// Index `doc` into `index`.
    pub fn index<T: Serialize + ?Sized>(
        index: &str,
        id: Option<&str>,
        doc: &T,
    ) -> serde_json::Result<Self> {
        let meta = ActionMeta { index, id, routing: None };
        Self::build(BulkAction::Index, &meta, Some(serde_json::to_value(doc)?))
    }

    /// Create `doc` in `index`, failing on the cluster if the ID exists.
    pub fn create<T: Serialize + ?Sized>(
        index: &str,
        id: Option<&str>,
        doc: &T,
    ) -> serde_json::Result<Self> {
        let meta = ActionMeta { index, id, routing: None };
        Self::build(BulkAction::Create, &meta, Some(serde_json::to_value(doc)?))
    }

    /// Merge `partial` into the existing document `id`.
    pub fn update<T: Serialize + ?Sized>(
        index: &str,
        id: &str,
        partial: &T,
    ) -> serde_json::Result<Self> {
        let meta = ActionMeta { index, id: Some(id), routing: None };
        Self::build(BulkAction::Update, &meta, Some(partial_doc(partial, false)?))
    }

    /// Merge `partial` into document `id`, creating it when missing.
    pub fn upsert<T: Serialize + ?Sized>(
        index: &str,
        id: &str,
        partial: &T,
    ) -> serde_json::Result<Self> {
        let meta = ActionMeta { index, id: Some(id), routing: None };
        Self::build(BulkAction::Update, &meta, Some(partial_doc(partial, true)?))
    }

    /// Delete document `id` from `index`.
    pub fn delete(index: &str, id: &str) -> serde_json::Result<Self> {
        let meta = ActionMeta { index, id: Some(id), routing: None };
        Self::build(BulkAction::Delete, &meta, None)
    }

    /// Build an operation for a [`Document`], honoring its ID and routing.
    pub fn from_document<D: Document>(action: BulkAction, doc: &D) -> serde_json::Result<Self> {
        let id = doc.document_id();
        let routing = doc.routing();
        let meta = ActionMeta {
            index: D::index_name(),
            id: id.as_deref(),
            routing: routing.as_deref(),
        };

        let payload = match action {
            BulkAction::Index | BulkAction::Create => Some(serde_json::to_value(doc)?),
            BulkAction::Update => Some(partial_doc(doc, false)?),
            BulkAction::Delete => None,
        };
        Self::build(action, &meta, payload)
    }

    /// Wrap bytes that are already in bulk wire form.
    ///
    /// The bytes are taken as-is; the caller is responsible for the
    /// newline framing.
    pub fn raw(action: BulkAction, bytes: impl Into<Bytes>) -> Self {
        Self {
            action,
            bytes: bytes.into(),
        }
    }

    fn build(action: BulkAction, meta: &ActionMeta<'_>, payload: Option<Value>) -> serde_json::Result<Self> {
        let mut line = Map::new();
        line.insert(action.as_str().to_string(), serde_json::to_value(meta)?);

        let mut bytes = serde_json::to_vec(&line)?;
        bytes.push(b'\n');
        if let Some(payload) = payload {
            serde_json::to_writer(&mut bytes, &payload)?;
            bytes.push(b'\n');
        }

        Ok(Self {
            action,
            bytes: bytes.into(),
        })
    }

    /// Action type.
    pub fn action(&self) -> BulkAction {
        self.action
    }

    /// Serialized bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Serialized length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True for a zero-length operation.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Article {
        slug: String,
        title: String,
    }

    impl Document for Article {
        fn index_name() -> &'static str {
            "articles"
        }

        fn document_id(&self) -> Option<String> {
            Some(self.slug.clone())
        }

        fn routing(&self) -> Option<String> {
            Some("tenant-1".to_string())
        }
    }

    fn lines(op: &WriteOperation) -> Vec<Value> {
        std::str::from_utf8(op.as_bytes())
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_index_operation_lines() {
        let op = WriteOperation::index("logs", Some("1"), &json!({"msg": "hi"})).unwrap();
        assert_eq!(op.action(), BulkAction::Index);
        assert!(op.as_bytes().ends_with(b"\n"));

        let lines = lines(&op);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], json!({"index": {"_index": "logs", "_id": "1"}}));
        assert_eq!(lines[1], json!({"msg": "hi"}));
    }

    #[test]
    fn test_create_without_id_omits_id() {
        let op = WriteOperation::create("logs", None, &json!({"n": 1})).unwrap();
        assert_eq!(lines(&op)[0], json!({"create": {"_index": "logs"}}));
    }

    #[test]
    fn test_update_wraps_partial_doc() {
        let op = WriteOperation::update("logs", "7", &json!({"n": 2})).unwrap();
        assert_eq!(lines(&op)[1], json!({"doc": {"n": 2}}));

        let op = WriteOperation::upsert("logs", "7", &json!({"n": 2})).unwrap();
        assert_eq!(lines(&op)[1], json!({"doc": {"n": 2}, "doc_as_upsert": true}));
    }

    #[test]
    fn test_delete_has_no_payload() {
        let op = WriteOperation::delete("logs", "9").unwrap();
        let lines = lines(&op);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], json!({"delete": {"_index": "logs", "_id": "9"}}));
        assert!(!op.action().has_payload());
    }

    #[test]
    fn test_payload_newlines_are_escaped() {
        let op = WriteOperation::index("logs", None, &json!({"msg": "a\nb"})).unwrap();
        assert_eq!(op.as_bytes().iter().filter(|b| **b == b'\n').count(), 2);
    }

    #[test]
    fn test_from_document_uses_id_and_routing() {
        let article = Article {
            slug: "hello".to_string(),
            title: "Hello".to_string(),
        };
        let op = WriteOperation::from_document(BulkAction::Index, &article).unwrap();
        let lines = lines(&op);
        assert_eq!(
            lines[0],
            json!({"index": {"_index": "articles", "_id": "hello", "routing": "tenant-1"}})
        );
        assert_eq!(lines[1]["title"], "Hello");
    }

    #[test]
    fn test_action_names() {
        for action in [
            BulkAction::Index,
            BulkAction::Create,
            BulkAction::Update,
            BulkAction::Delete,
        ] {
            assert_eq!(BulkAction::parse(action.as_str()), Some(action));
        }
        assert_eq!(BulkAction::parse("upsert"), None);
    }

    #[test]
    fn test_raw_keeps_bytes() {
        let op = WriteOperation::raw(BulkAction::Delete, &b"{\"delete\":{\"_id\":\"1\"}}\n"[..]);
        assert_eq!(op.len(), 23);
        assert!(!op.is_empty());
    }
}
