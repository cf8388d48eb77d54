//! Scripted transport for exercising the bulk pipeline without a cluster.
//!
//! ```
//! use bulkwire_core::testing::MockTransport;
//!
//! // Reject document "7" under load, accept everything else.
//! let transport = MockTransport::with_statuses(|_, op| {
//!     if op.id.as_deref() == Some("7") { 429 } else { 201 }
//! });
//! assert_eq!(transport.request_count(), 0);
//! ```

use crate::{encoder, operation::BulkAction};
use async_trait::async_trait;
use bulkwire_transport::{Bytes, Method, StatusCode, Transport, TransportError, TransportResponse};
use serde_json::{Map, Value, json};
use std::sync::{Mutex, PoisonError};

/// A request seen by [`MockTransport`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Zero-based position of this request among all requests the
    /// transport received.
    pub attempt: usize,
    /// HTTP method.
    pub method: Method,
    /// Request path.
    pub path: String,
    /// NDJSON body.
    pub body: Bytes,
}

/// Action line of one operation in a recorded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedOperation {
    /// Bulk action.
    pub action: BulkAction,
    /// Target index.
    pub index: Option<String>,
    /// Document ID.
    pub id: Option<String>,
}

impl RecordedRequest {
    /// Operations in the body, in order. Empty when the body is not valid
    /// bulk NDJSON.
    pub fn operations(&self) -> Vec<RequestedOperation> {
        let Ok((buffer, actions)) = encoder::decode_request(&self.body) else {
            return Vec::new();
        };

        buffer
            .spans()
            .iter()
            .zip(actions)
            .map(|(span, action)| {
                let slice = buffer.slice(span);
                let line = slice.split(|b| *b == b'\n').next().unwrap_or_default();
                let meta = serde_json::from_slice::<Value>(line)
                    .ok()
                    .and_then(|v| v.get(action.as_str()).cloned());
                let field = |name: &str| {
                    meta.as_ref()
                        .and_then(|m| m.get(name))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                };

                RequestedOperation {
                    action,
                    index: field("_index"),
                    id: field("_id"),
                }
            })
            .collect()
    }
}

type Responder = dyn Fn(&RecordedRequest) -> Result<TransportResponse, TransportError> + Send + Sync;

/// Transport that records every request and answers from a closure.
pub struct MockTransport {
    responder: Box<Responder>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    /// Answer every request with `responder`.
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&RecordedRequest) -> Result<TransportResponse, TransportError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer with a well-formed bulk envelope whose item statuses come
    /// from `status_of(attempt, operation)`.
    pub fn with_statuses<F>(status_of: F) -> Self
    where
        F: Fn(usize, &RequestedOperation) -> u16 + Send + Sync + 'static,
    {
        Self::new(move |request| Self::respond(request, |op| status_of(request.attempt, op)))
    }

    /// Build a 200 bulk envelope for `request` with one item per operation.
    pub fn respond<F>(request: &RecordedRequest, status_of: F) -> Result<TransportResponse, TransportError>
    where
        F: Fn(&RequestedOperation) -> u16,
    {
        let items: Vec<_> = request
            .operations()
            .into_iter()
            .map(|op| {
                let status = status_of(&op);
                (op.action, op.id, status)
            })
            .collect();

        Ok(TransportResponse::new(StatusCode::OK, bulk_response_body(&items)))
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, method: Method, path: &str, body: Bytes) -> bulkwire_transport::Result<TransportResponse> {
        let request = {
            let mut requests = self.requests.lock().unwrap_or_else(PoisonError::into_inner);
            let request = RecordedRequest {
                attempt: requests.len(),
                method,
                path: path.to_string(),
                body,
            };
            requests.push(request.clone());
            request
        };

        (self.responder)(&request)
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("requests", &self.request_count())
            .finish()
    }
}

/// Serialize a bulk response envelope with one item per entry.
pub fn bulk_response_body(items: &[(BulkAction, Option<String>, u16)]) -> Vec<u8> {
    let items: Vec<Value> = items
        .iter()
        .map(|(action, id, status)| {
            let mut item = Map::new();
            item.insert("_index".into(), Value::from("test"));
            if let Some(id) = id {
                item.insert("_id".into(), Value::from(id.as_str()));
            }
            item.insert("status".into(), Value::from(*status));
            if !(200..300).contains(status) {
                item.insert(
                    "error".into(),
                    json!({ "type": error_type(*status), "reason": format!("status {}", status) }),
                );
            }

            let mut wrapper = Map::new();
            wrapper.insert(action.as_str().into(), Value::Object(item));
            Value::Object(wrapper)
        })
        .collect();

    let errors = items.iter().any(|item| {
        item.as_object()
            .and_then(|w| w.values().next())
            .and_then(|i| i.get("error"))
            .is_some()
    });

    serde_json::to_vec(&json!({ "took": 1, "errors": errors, "items": items })).unwrap_or_default()
}

fn error_type(status: u16) -> &'static str {
    match status {
        400 => "mapper_parsing_exception",
        404 => "document_missing_exception",
        409 => "version_conflict_engine_exception",
        429 => "es_rejected_execution_exception",
        503 => "unavailable_shards_exception",
        _ => "exception",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{WriteOperation, response};

    #[tokio::test]
    async fn test_records_and_answers() {
        let transport = MockTransport::with_statuses(|_, op| if op.id.as_deref() == Some("b") { 404 } else { 200 });
        let ops = [
            WriteOperation::index("logs", Some("a"), &json!({"x": 1})).unwrap(),
            WriteOperation::delete("logs", "b").unwrap(),
        ];
        let (buffer, _) = encoder::encode(&ops);

        let response = transport
            .send(Method::POST, "/_bulk", buffer.to_bytes())
            .await
            .unwrap();
        let outcomes = response::decode(response.bytes(), buffer.spans()).unwrap();

        assert_eq!(outcomes[0].status, 200);
        assert_eq!(outcomes[1].status, 404);
        assert_eq!(outcomes[1].action, BulkAction::Delete);
        assert_eq!(
            outcomes[1].error.as_ref().and_then(|e| e.error_type()),
            Some("document_missing_exception")
        );

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].operations()[0].index.as_deref(), Some("logs"));
    }
}
