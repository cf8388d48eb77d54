//! Byte buffer that remembers where each bulk operation lives.
//!
//! A [`TrackedBuffer`] is an arena of contiguous bytes plus an index of
//! [`Span`]s, one per appended operation. Building a retry payload is a
//! matter of copying the selected spans into a fresh buffer; nothing is
//! serialized twice.

use crate::error::BufferError;
use bytes::{Bytes, BytesMut};
use std::collections::BTreeSet;

/// Byte range of one operation inside a [`TrackedBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    /// Start offset inside the owning buffer.
    pub offset: usize,
    /// Length in bytes.
    pub len: usize,
    /// Position of the operation in the originally submitted batch.
    pub ordinal: usize,
}

impl Span {
    /// Offset one past the last byte of this span.
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Append-only byte buffer with per-operation boundaries.
///
/// Spans are kept in append order, never overlap and cover the whole
/// content. Ordinals strictly increase from one span to the next.
#[derive(Debug, Clone, Default)]
pub struct TrackedBuffer {
    data: BytesMut,
    spans: Vec<Span>,
    next_ordinal: usize,
}

impl TrackedBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with room for `bytes` bytes.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(bytes),
            ..Default::default()
        }
    }

    /// Append one operation and return its ordinal.
    pub fn append(&mut self, bytes: &[u8]) -> usize {
        let ordinal = self.next_ordinal;
        self.spans.push(Span {
            offset: self.data.len(),
            len: bytes.len(),
            ordinal,
        });
        self.data.extend_from_slice(bytes);
        self.next_ordinal += 1;
        ordinal
    }

    /// Spans in append order.
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Ordinals in append order.
    pub fn ordinals(&self) -> impl Iterator<Item = usize> + '_ {
        self.spans.iter().map(|s| s.ordinal)
    }

    /// Number of operations held.
    pub fn span_count(&self) -> usize {
        self.spans.len()
    }

    /// Total content length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when no operation has been appended.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Whole content.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Owned copy of the content, ready to hand to a transport.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.data)
    }

    /// Bytes covered by `span`.
    ///
    /// # Panics
    ///
    /// Panics if `span` does not belong to this buffer.
    pub fn slice(&self, span: &Span) -> &[u8] {
        &self.data[span.offset..span.end()]
    }

    /// Local position of the span carrying `ordinal`.
    pub fn position_of(&self, ordinal: usize) -> Option<usize> {
        self.spans
            .binary_search_by_key(&ordinal, |s| s.ordinal)
            .ok()
    }

    /// Copy the spans whose ordinals are listed into a new buffer.
    ///
    /// Original ordinals and relative order are kept; offsets are
    /// renumbered from zero. Duplicate ordinals are collapsed. An empty
    /// selection yields an empty buffer.
    pub fn extract<I>(&self, ordinals: I) -> Result<TrackedBuffer, BufferError>
    where
        I: IntoIterator<Item = usize>,
    {
        let wanted: BTreeSet<usize> = ordinals.into_iter().collect();

        if let Some(missing) = wanted.iter().find(|o| self.position_of(**o).is_none()) {
            return Err(BufferError::UnknownOrdinal(*missing));
        }

        let capacity = self
            .spans
            .iter()
            .filter(|s| wanted.contains(&s.ordinal))
            .map(|s| s.len)
            .sum();

        let mut out = TrackedBuffer {
            data: BytesMut::with_capacity(capacity),
            spans: Vec::with_capacity(wanted.len()),
            next_ordinal: self.next_ordinal,
        };

        for span in self.spans.iter().filter(|s| wanted.contains(&s.ordinal)) {
            out.spans.push(Span {
                offset: out.data.len(),
                len: span.len,
                ordinal: span.ordinal,
            });
            out.data.extend_from_slice(self.slice(span));
        }

        Ok(out)
    }
}
