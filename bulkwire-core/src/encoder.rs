//! Bulk request encoding.

use crate::{
    buffer::{Span, TrackedBuffer},
    error::DecodeError,
    operation::BulkAction,
    WriteOperation,
};
use serde_json::{Map, Value};

/// Concatenate `operations` into a fresh buffer, one span per operation.
///
/// Operation *i* gets ordinal *i*. No validation of the content is done.
pub fn encode(operations: &[WriteOperation]) -> (TrackedBuffer, Vec<Span>) {
    let size = operations.iter().map(WriteOperation::len).sum();
    let mut buffer = TrackedBuffer::with_capacity(size);

    for op in operations {
        buffer.append(op.as_bytes());
    }

    let spans = buffer.spans().to_vec();
    (buffer, spans)
}

/// Split an already encoded NDJSON bulk body into tracked operations.
///
/// Each operation is its action line plus the following payload line
/// (deletes have none). Blank lines are skipped and every line is
/// re-terminated with `\n`.
pub fn decode_request(raw: &[u8]) -> Result<(TrackedBuffer, Vec<BulkAction>), DecodeError> {
    let mut buffer = TrackedBuffer::with_capacity(raw.len() + 1);
    let mut actions = Vec::new();

    let mut lines = raw
        .split(|b| *b == b'\n')
        .enumerate()
        .map(|(n, line)| (n + 1, line.strip_suffix(b"\r").unwrap_or(line)))
        .filter(|(_, line)| !line.iter().all(u8::is_ascii_whitespace));

    while let Some((number, line)) = lines.next() {
        let action = parse_action_line(number, line)?;

        let mut op = Vec::with_capacity(line.len() + 1);
        op.extend_from_slice(line);
        op.push(b'\n');

        if action.has_payload() {
            let (_, payload) = lines.next().ok_or_else(|| DecodeError::Request {
                line: number,
                reason: format!("{} action has no payload line", action),
            })?;
            op.extend_from_slice(payload);
            op.push(b'\n');
        }

        buffer.append(&op);
        actions.push(action);
    }

    Ok((buffer, actions))
}

fn parse_action_line(number: usize, line: &[u8]) -> Result<BulkAction, DecodeError> {
    let invalid = |reason: String| DecodeError::Request { line: number, reason };

    let object: Map<String, Value> =
        serde_json::from_slice(line).map_err(|e| invalid(e.to_string()))?;

    let mut keys = object.keys();
    match (keys.next(), keys.next()) {
        (Some(name), None) => {
            BulkAction::parse(name).ok_or_else(|| invalid(format!("unknown action `{}`", name)))
        }
        _ => Err(invalid("action line must hold exactly one action".to_string())),
    }
}
