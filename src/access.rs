//! Random-access trace stream abstraction.

use crate::Result;
use crate::record::Trace;
use crate::value::HeaderMap;

/// Sequential trace reader that can also seek to a known trace offset.
///
/// Implemented by [`SegyReader`](crate::segy::SegyReader) and
/// [`SegdReader`](crate::segd::SegdReader), so
/// [`SortedIndex`](crate::index::SortedIndex) works over either format.
pub trait TraceStream {
    /// `true` while another trace starts at the current position.
    fn has_trace(&self) -> bool;

    /// Byte offset of the next trace.
    fn trace_offset(&self) -> u64;

    /// Position at a trace previously reported by [`trace_offset`](Self::trace_offset).
    fn seek_trace(&mut self, offset: u64) -> Result<()>;

    /// Position at the first trace.
    fn rewind(&mut self) -> Result<()>;

    /// Decode the next trace's headers and skip its samples.
    fn read_trace_header(&mut self) -> Result<HeaderMap>;

    /// Decode the next trace.
    fn read_trace(&mut self) -> Result<Trace>;
}
