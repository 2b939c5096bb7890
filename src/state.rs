//! Record layout state machine.
//!
//! Both formats share one shape: lead headers, optional extension blocks,
//! then repeated traces (primary header, chained additional headers,
//! samples) and finally an optional trailer. [`RecordMachine`] tracks
//! where a reader or writer is in that sequence and owns the three
//! revision-dependent policies:
//!
//! - [`TraceLength`]: how many samples follow a trace header.
//! - [`AdditionalHeaders`]: how many chained header blocks follow it.
//! - [`EndOfData`]: where trace data stops and the trailer starts.

use std::fmt;
use std::io::{ErrorKind, Read};

use tracing::{trace, warn};

use crate::value::{FieldValue, HeaderMap};
use crate::{Result, SegError};

/// Position within a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    AwaitingLeadHeader,
    AwaitingExtensionHeaders(usize),
    AwaitingTraceHeader,
    AwaitingAdditionalTraceHeaders(usize),
    AwaitingSamples(usize),
    AwaitingTrailer,
    Done,
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitingLeadHeader => f.write_str("lead header"),
            Self::AwaitingExtensionHeaders(n) => write!(f, "{n} extension header(s)"),
            Self::AwaitingTraceHeader => f.write_str("trace header"),
            Self::AwaitingAdditionalTraceHeaders(n) => {
                write!(f, "{n} additional trace header(s)")
            }
            Self::AwaitingSamples(n) => write!(f, "{n} sample(s)"),
            Self::AwaitingTrailer => f.write_str("trailer"),
            Self::Done => f.write_str("end of record"),
        }
    }
}

/// Sample count policy.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceLength {
    /// Every trace carries the same number of samples.
    Fixed(usize),
    /// The first non-zero of these header fields, else a caller-supplied
    /// fallback.
    PerTrace(Vec<String>),
}

impl TraceLength {
    pub fn per_trace<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::PerTrace(fields.into_iter().map(Into::into).collect())
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, Self::Fixed(_))
    }

    /// Sample count for the trace whose headers are `headers`.
    pub fn resolve(&self, headers: &HeaderMap, fallback: usize) -> Result<usize> {
        match self {
            Self::Fixed(n) => Ok(*n),
            Self::PerTrace(fields) => {
                for name in fields {
                    if let Some(value) = headers.get(name).filter(|v| !v.is_zero()) {
                        return as_count(name, value);
                    }
                }
                Ok(fallback)
            }
        }
    }
}

/// Additional trace header count policy.
#[derive(Debug, Clone, PartialEq)]
pub enum AdditionalHeaders {
    Fixed(usize),
    /// `max` blocks unless the first additional block names a non-zero
    /// count in `field`.
    FromFirstBlock { max: usize, field: String },
    /// The primary trace header names the count in `field`.
    FromTraceHeader { field: String, max: Option<usize> },
}

impl AdditionalHeaders {
    /// Count known once the primary trace header is decoded.
    pub fn initial(&self, primary: &HeaderMap) -> Result<usize> {
        match self {
            Self::Fixed(n) => Ok(*n),
            Self::FromFirstBlock { max, .. } => Ok(*max),
            Self::FromTraceHeader { field, max } => {
                let n = match primary.get(field) {
                    Some(value) => as_count(field, value)?,
                    None => 0,
                };
                if let Some(max) = max {
                    check_max(n, *max)?;
                }
                Ok(n)
            }
        }
    }

    /// Total count after the first additional block is decoded.
    pub fn refine(&self, first: &HeaderMap, current: usize) -> Result<usize> {
        match self {
            Self::FromFirstBlock { max, field } => match first.get(field) {
                Some(value) if !value.is_zero() => {
                    let n = as_count(field, value)?;
                    check_max(n, *max)?;
                    Ok(n)
                }
                _ => Ok(current),
            },
            _ => Ok(current),
        }
    }
}

fn as_count(name: &str, value: &FieldValue) -> Result<usize> {
    value
        .as_usize()
        .ok_or_else(|| SegError::InvalidHeader(format!("count field `{name}` holds {value}")))
}

fn check_max(n: usize, max: usize) -> Result<()> {
    if n > max {
        return Err(SegError::CountMismatch {
            what: "additional trace headers",
            declared: max as u64,
            actual: n as u64,
        });
    }
    Ok(())
}

/// End-of-trace-data policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOfData {
    /// Traces run to the end of the file.
    FileEnd,
    /// `blocks` trailer blocks of `block_size` bytes close the file.
    Counted { blocks: u64, block_size: u64 },
    /// The trailer starts after `traces` traces and runs until a block
    /// opening with an end marker, or end of file.
    SentinelScan { traces: Option<u64>, block_size: u64 },
}

impl EndOfData {
    /// Offset where trace data ends, if the file length alone decides it.
    ///
    /// Returns `Ok(None)` for a sentinel scan with a known trace count: the
    /// caller must skip that many traces to find the trailer.
    pub fn data_end(&self, file_len: u64) -> Result<Option<u64>> {
        match *self {
            Self::FileEnd => Ok(Some(file_len)),
            Self::Counted { blocks, block_size } => blocks
                .checked_mul(block_size)
                .and_then(|len| file_len.checked_sub(len))
                .map(Some)
                .ok_or_else(|| {
                    SegError::EndOfData(format!(
                        "{blocks} trailer block(s) of {block_size} bytes exceed file length {file_len}"
                    ))
                }),
            Self::SentinelScan {
                traces: Some(_), ..
            } => Ok(None),
            Self::SentinelScan { traces: None, .. } => Err(SegError::EndOfData(
                "sentinel trailer with unknown trace count".into(),
            )),
        }
    }
}

/// Read `block_size` blocks until `is_last` accepts one or input ends.
///
/// Returns the blocks read, including the accepted one, and whether the
/// terminator was seen. A block cut short by end of input is an error.
pub fn scan_blocks<R: Read>(
    reader: &mut R,
    block_size: usize,
    is_last: impl Fn(&[u8]) -> bool,
) -> Result<(Vec<Vec<u8>>, bool)> {
    let mut blocks = Vec::new();
    loop {
        let mut block = vec![0u8; block_size];
        let filled = read_full(reader, &mut block)?;
        if filled == 0 {
            warn!(blocks = blocks.len(), "block scan reached end of input without end marker");
            return Ok((blocks, false));
        }
        if filled < block_size {
            return Err(SegError::BlockTooShort {
                expected: block_size,
                actual: filled,
            });
        }
        let last = is_last(&block);
        blocks.push(block);
        if last {
            return Ok((blocks, true));
        }
    }
}

/// Fill `buf` as far as input allows; returns the byte count.
pub(crate) fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// Tracks progress through a record and applies its layout policies.
#[derive(Debug, Clone)]
pub struct RecordMachine {
    state: RecordState,
    trace_length: TraceLength,
    additional: AdditionalHeaders,
    end: EndOfData,
    additional_seen: usize,
}

impl RecordMachine {
    pub fn new(trace_length: TraceLength, additional: AdditionalHeaders, end: EndOfData) -> Self {
        Self {
            state: RecordState::AwaitingLeadHeader,
            trace_length,
            additional,
            end,
            additional_seen: 0,
        }
    }

    pub fn state(&self) -> RecordState {
        self.state
    }

    pub fn trace_length(&self) -> &TraceLength {
        &self.trace_length
    }

    pub fn additional_headers(&self) -> &AdditionalHeaders {
        &self.additional
    }

    pub fn end_of_data(&self) -> EndOfData {
        self.end
    }

    fn unexpected(&self, expected: &'static str) -> SegError {
        SegError::State {
            expected,
            found: self.state.to_string(),
        }
    }

    /// The lead headers are done; `extensions` blocks follow.
    pub fn lead_header_done(&mut self, extensions: usize) -> Result<()> {
        if self.state != RecordState::AwaitingLeadHeader {
            return Err(self.unexpected("lead header"));
        }
        self.state = if extensions == 0 {
            RecordState::AwaitingTraceHeader
        } else {
            RecordState::AwaitingExtensionHeaders(extensions)
        };
        Ok(())
    }

    pub fn extension_done(&mut self) -> Result<()> {
        match self.state {
            RecordState::AwaitingExtensionHeaders(1) => {
                self.state = RecordState::AwaitingTraceHeader;
            }
            RecordState::AwaitingExtensionHeaders(n) if n > 1 => {
                self.state = RecordState::AwaitingExtensionHeaders(n - 1);
            }
            _ => return Err(self.unexpected("extension header")),
        }
        Ok(())
    }

    /// A primary trace header was decoded; returns the additional block
    /// count it implies.
    pub fn begin_trace(&mut self, primary: &HeaderMap) -> Result<usize> {
        if self.state != RecordState::AwaitingTraceHeader {
            return Err(self.unexpected("trace header"));
        }
        let n = self.additional.initial(primary)?;
        self.additional_seen = 0;
        self.state = RecordState::AwaitingAdditionalTraceHeaders(n);
        Ok(n)
    }

    /// An additional block was consumed, decoded (`Some`) or skipped by
    /// length (`None`). Returns the number still to come.
    pub fn additional_done(&mut self, block: Option<&HeaderMap>) -> Result<usize> {
        let remaining = match self.state {
            RecordState::AwaitingAdditionalTraceHeaders(n) if n > 0 => n,
            _ => return Err(self.unexpected("additional trace header")),
        };
        let remaining = match (self.additional_seen, block) {
            (0, Some(first)) => self.additional.refine(first, remaining)? - 1,
            _ => remaining - 1,
        };
        self.additional_seen += 1;
        self.state = RecordState::AwaitingAdditionalTraceHeaders(remaining);
        Ok(remaining)
    }

    /// All header blocks of the trace are in; returns its sample count.
    pub fn samples_due(&mut self, headers: &HeaderMap, fallback: usize) -> Result<usize> {
        if self.state != RecordState::AwaitingAdditionalTraceHeaders(0) {
            return Err(self.unexpected("end of trace headers"));
        }
        let n = self.trace_length.resolve(headers, fallback)?;
        trace!(samples = n, additional = self.additional_seen, "trace headers complete");
        self.state = RecordState::AwaitingSamples(n);
        Ok(n)
    }

    /// Samples consumed; `more` says whether another trace follows.
    pub fn samples_done(&mut self, more: bool) -> Result<()> {
        if !matches!(self.state, RecordState::AwaitingSamples(_)) {
            return Err(self.unexpected("samples"));
        }
        self.state = if more {
            RecordState::AwaitingTraceHeader
        } else {
            RecordState::AwaitingTrailer
        };
        Ok(())
    }

    pub fn trailer_done(&mut self) -> Result<()> {
        match self.state {
            RecordState::AwaitingTrailer | RecordState::AwaitingTraceHeader => {
                self.state = RecordState::Done;
                Ok(())
            }
            _ => Err(self.unexpected("trailer")),
        }
    }

    /// Reposition at a trace boundary after a random-access seek.
    pub fn seek_reset(&mut self) -> Result<()> {
        match self.state {
            RecordState::AwaitingLeadHeader | RecordState::AwaitingExtensionHeaders(_) => {
                Err(self.unexpected("any trace position"))
            }
            _ => {
                self.additional_seen = 0;
                self.state = RecordState::AwaitingTraceHeader;
                Ok(())
            }
        }
    }
}
