//! Traces grouped by the value of one header field.
//!
//! [`SortedIndex`] makes one pass over a [`TraceStream`], decoding headers
//! only, and keeps the byte offset of every trace under the value of the
//! chosen field. Lookups seek back to those offsets and decode again; no
//! decoded content is cached.

use std::collections::BTreeMap;
use std::ops::Bound;

use tracing::debug;

use crate::access::TraceStream;
use crate::record::Trace;
use crate::value::{FieldValue, HeaderMap};
use crate::{Result, SegError};

/// Trace offsets keyed by a header field value, with a cursor walking the
/// whole index in key order.
pub struct SortedIndex<S> {
    stream: S,
    field: String,
    buckets: BTreeMap<FieldValue, Vec<u64>>,
    traces: usize,
    cursor: Option<(FieldValue, usize)>,
}

impl<S: TraceStream> SortedIndex<S> {
    /// Index every trace of `stream` by `field`.
    ///
    /// Traces keep file order within a key. Fails with
    /// [`SegError::UnknownField`] when a trace header lacks `field`.
    pub fn build(mut stream: S, field: impl Into<String>) -> Result<Self> {
        let field = field.into();
        stream.rewind()?;
        let mut buckets: BTreeMap<FieldValue, Vec<u64>> = BTreeMap::new();
        let mut traces = 0;
        while stream.has_trace() {
            let offset = stream.trace_offset();
            let headers = stream.read_trace_header()?;
            let value = headers
                .get(&field)
                .copied()
                .ok_or_else(|| SegError::UnknownField(field.clone()))?;
            buckets.entry(value).or_default().push(offset);
            traces += 1;
        }
        stream.rewind()?;
        debug!(field = %field, traces, keys = buckets.len(), "built sorted index");

        let cursor = buckets.keys().next().map(|k| (*k, 0));
        Ok(Self {
            stream,
            field,
            buckets,
            traces,
            cursor,
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Distinct values of the field, ascending.
    pub fn keys(&self) -> impl Iterator<Item = &FieldValue> {
        self.buckets.keys()
    }

    /// Number of indexed traces.
    pub fn len(&self) -> usize {
        self.traces
    }

    pub fn is_empty(&self) -> bool {
        self.traces == 0
    }

    /// Offsets of the traces holding `key`, in file order.
    pub fn offsets_for(&self, key: &FieldValue) -> &[u64] {
        self.buckets.get(key).map_or(&[], Vec::as_slice)
    }

    pub fn trace_count_for(&self, key: &FieldValue) -> usize {
        self.offsets_for(key).len()
    }

    /// Headers of at most `max` traces holding `key`.
    pub fn headers_for(&mut self, key: &FieldValue, max: usize) -> Result<Vec<HeaderMap>> {
        let offsets: Vec<u64> = self.offsets_for(key).iter().take(max).copied().collect();
        offsets
            .into_iter()
            .map(|offset| {
                self.stream.seek_trace(offset)?;
                self.stream.read_trace_header()
            })
            .collect()
    }

    /// At most `max` traces holding `key`.
    pub fn traces_for(&mut self, key: &FieldValue, max: usize) -> Result<Vec<Trace>> {
        let offsets: Vec<u64> = self.offsets_for(key).iter().take(max).copied().collect();
        offsets
            .into_iter()
            .map(|offset| {
                self.stream.seek_trace(offset)?;
                self.stream.read_trace()
            })
            .collect()
    }

    /// `true` while the cursor has traces left.
    pub fn has_next(&self) -> bool {
        self.cursor.is_some()
    }

    /// Headers of the trace under the cursor; advances it.
    pub fn next_header(&mut self) -> Result<HeaderMap> {
        let offset = self.advance()?;
        self.stream.seek_trace(offset)?;
        self.stream.read_trace_header()
    }

    /// The trace under the cursor; advances it.
    pub fn next_trace(&mut self) -> Result<Trace> {
        let offset = self.advance()?;
        self.stream.seek_trace(offset)?;
        self.stream.read_trace()
    }

    /// Move the cursor back to the first trace of the lowest key.
    pub fn reset(&mut self) {
        self.cursor = self.buckets.keys().next().map(|k| (*k, 0));
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    fn advance(&mut self) -> Result<u64> {
        let (key, pos) = self.cursor.ok_or(SegError::NoTrace)?;
        let bucket = self.offsets_for(&key);
        let (offset, len) = (bucket[pos], bucket.len());
        self.cursor = if pos + 1 < len {
            Some((key, pos + 1))
        } else {
            self.buckets
                .range((Bound::Excluded(key), Bound::Unbounded))
                .next()
                .map(|(k, _)| (*k, 0))
        };
        Ok(offset)
    }
}
