//! Streaming SEG-Y reader with random access by trace offset.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::{debug, trace, warn};

use super::binary::{BINARY_HEADER_LEN, BinaryHeader};
use super::layout::{self, TRACE_HEADER_LEN};
use super::textual::{self, TEXTUAL_HEADER_LEN, TextualHeader};
use super::{SegyHeaders, SegyOptions};
use crate::access::TraceStream;
use crate::raw::RawCodec;
use crate::record::Trace;
use crate::sample::SampleCodec;
use crate::schema::SchemaChain;
use crate::state::{self, AdditionalHeaders, EndOfData, RecordMachine, TraceLength};
use crate::value::HeaderMap;
use crate::{Result, SegError};

/// Reads traces from a SEG-Y file.
///
/// Opening reads the textual, binary and extended textual headers, locates
/// the end of trace data and reads any trailer stanzas. Traces are then
/// read in order with [`read_trace`](TraceStream::read_trace), or by
/// offset after [`seek_trace`](TraceStream::seek_trace).
pub struct SegyReader<R> {
    inner: R,
    headers: SegyHeaders,
    codec: RawCodec,
    samples: SampleCodec,
    chain: SchemaChain,
    machine: RecordMachine,
    data_start: u64,
    data_end: u64,
    position: u64,
    scratch: Vec<u8>,
}

impl SegyReader<BufReader<File>> {
    /// Open a file with the built-in layouts.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, SegyOptions::default())
    }

    /// Open a file with layout overrides.
    pub fn open_with(path: impl AsRef<Path>, options: SegyOptions) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::with_options(BufReader::new(file), options)
    }
}

impl<R: Read + Seek> SegyReader<R> {
    pub fn new(inner: R) -> Result<Self> {
        Self::with_options(inner, SegyOptions::default())
    }

    pub fn with_options(mut inner: R, options: SegyOptions) -> Result<Self> {
        let chain = options.chain()?;

        inner.seek(SeekFrom::Start(0))?;
        let mut lead = vec![0u8; TEXTUAL_HEADER_LEN + BINARY_HEADER_LEN];
        let filled = state::read_full(&mut inner, &mut lead)?;
        if filled < lead.len() {
            return Err(SegError::BlockTooShort {
                expected: lead.len(),
                actual: filled,
            });
        }
        let textual = TextualHeader::from_bytes(&lead[..TEXTUAL_HEADER_LEN])?;
        let binary = BinaryHeader::decode(&lead[TEXTUAL_HEADER_LEN..], options.byte_order())?;
        options.check_additional_count(binary.max_additional_headers)?;

        let format = match options.sample_format() {
            Some(format) => format,
            None => binary.sample_format()?,
        };
        let codec = RawCodec::new(binary.byte_order);
        let samples = SampleCodec::select(format, binary.byte_order);
        let mut machine = RecordMachine::new(
            trace_length(&binary),
            AdditionalHeaders::FromFirstBlock {
                max: binary.max_additional_headers as usize,
                field: layout::ADDITIONAL_TRACE_HEADERS.into(),
            },
            end_of_data(&binary)?,
        );

        let extended = read_extended(&mut inner, binary.extended_textual_headers)?;
        machine.lead_header_done(extended.len())?;
        for _ in &extended {
            machine.extension_done()?;
        }

        let after_headers = inner.stream_position()?;
        let data_start = if binary.first_trace_offset != 0 {
            binary.first_trace_offset
        } else {
            after_headers
        };
        let file_len = inner.seek(SeekFrom::End(0))?;

        let mut reader = Self {
            inner,
            headers: SegyHeaders::new(textual, binary).with_extended(extended),
            codec,
            samples,
            chain,
            machine,
            data_start,
            data_end: file_len,
            position: data_start,
            scratch: Vec::new(),
        };
        reader.locate_trailer(file_len)?;
        reader.rewind()?;

        let binary = &reader.headers.binary;
        debug!(
            revision = ?binary.revision(),
            byte_order = %binary.byte_order,
            format = %format,
            fixed_length = binary.is_fixed_length(),
            samples = binary.samples(),
            extended = reader.headers.extended.len(),
            trailer = reader.headers.trailer.len(),
            data_start = reader.data_start,
            data_end = reader.data_end,
            "opened SEG-Y file"
        );
        Ok(reader)
    }

    /// Find where trace data ends and read the trailer stanzas behind it.
    fn locate_trailer(&mut self, file_len: u64) -> Result<()> {
        let end = self.machine.end_of_data();
        let data_end = match end.data_end(file_len)? {
            Some(data_end) => data_end,
            None => self.skip_declared_traces(end)?,
        };
        if data_end < self.data_start {
            return Err(SegError::EndOfData(format!(
                "trace data would end at {data_end}, before it starts at {}",
                self.data_start
            )));
        }
        self.data_end = data_end;
        self.inner.seek(SeekFrom::Start(data_end))?;

        let trailer = match end {
            EndOfData::FileEnd => Vec::new(),
            EndOfData::Counted { blocks, .. } => {
                let mut stanzas = Vec::with_capacity(blocks as usize);
                let mut block = vec![0u8; TEXTUAL_HEADER_LEN];
                for _ in 0..blocks {
                    self.inner.read_exact(&mut block)?;
                    stanzas.push(TextualHeader::from_bytes(&block)?);
                }
                stanzas
            }
            EndOfData::SentinelScan { .. } => {
                let (blocks, _) =
                    state::scan_blocks(&mut self.inner, TEXTUAL_HEADER_LEN, textual::is_end_text)?;
                blocks
                    .iter()
                    .map(|b| TextualHeader::from_bytes(b))
                    .collect::<Result<Vec<_>>>()?
            }
        };
        self.headers.trailer = trailer;
        self.machine.trailer_done()?;
        Ok(())
    }

    /// Walk past the declared trace count; returns the offset after it.
    fn skip_declared_traces(&mut self, end: EndOfData) -> Result<u64> {
        let EndOfData::SentinelScan {
            traces: Some(count),
            ..
        } = end
        else {
            return Err(SegError::EndOfData("trace count unknown".into()));
        };
        self.inner.seek(SeekFrom::Start(self.data_start))?;
        self.position = self.data_start;
        for i in 0..count {
            if !self.has_trace() {
                return Err(SegError::EndOfData(format!(
                    "binary header declares {count} traces but the file ends after {i}"
                )));
            }
            self.read_trace_header()?;
        }
        Ok(self.position)
    }

    pub fn headers(&self) -> &SegyHeaders {
        &self.headers
    }

    pub fn textual_header(&self) -> &TextualHeader {
        &self.headers.textual
    }

    pub fn binary_header(&self) -> &BinaryHeader {
        &self.headers.binary
    }

    pub fn extended_textual_headers(&self) -> &[TextualHeader] {
        &self.headers.extended
    }

    pub fn trailer(&self) -> &[TextualHeader] {
        &self.headers.trailer
    }

    pub fn sample_codec(&self) -> &SampleCodec {
        &self.samples
    }

    pub fn schema_chain(&self) -> &SchemaChain {
        &self.chain
    }

    pub fn machine(&self) -> &RecordMachine {
        &self.machine
    }

    /// Offset of the first trace.
    pub fn data_start(&self) -> u64 {
        self.data_start
    }

    /// Offset just past the last trace.
    pub fn data_end(&self) -> u64 {
        self.data_end
    }

    /// Number of traces, when the layout makes it computable without
    /// walking the file.
    pub fn trace_count(&self) -> Option<u64> {
        if self.headers.binary.is_fixed_length() {
            let per_trace = self.fixed_trace_len()?;
            return Some((self.data_end - self.data_start) / per_trace);
        }
        match self.headers.binary.number_of_traces {
            0 => None,
            n => Some(n),
        }
    }

    fn fixed_trace_len(&self) -> Option<u64> {
        let max = self.headers.binary.max_additional_headers as u64;
        // a per-trace override may shorten the chain
        if max > 1 {
            return None;
        }
        let samples = self.samples.byte_len(self.headers.binary.samples()).ok()? as u64;
        Some((1 + max) * TRACE_HEADER_LEN as u64 + samples)
    }

    /// Iterate over the remaining traces.
    pub fn traces(&mut self) -> Traces<'_, R> {
        Traces {
            reader: self,
            failed: false,
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn read_block(&mut self, len: usize) -> Result<()> {
        self.scratch.resize(len, 0);
        self.inner.read_exact(&mut self.scratch[..len])?;
        self.position += len as u64;
        Ok(())
    }

    /// Read every header block of the next trace; returns the merged
    /// headers and the sample count.
    fn read_headers(&mut self) -> Result<(HeaderMap, usize)> {
        if !self.has_trace() {
            return Err(SegError::NoTrace);
        }
        let offset = self.position;
        self.read_block(TRACE_HEADER_LEN)?;
        let mut headers = self.chain.primary().decode(&self.codec, &self.scratch)?;
        let mut remaining = self.machine.begin_trace(&headers)?;

        let mut index = 0;
        while remaining > 0 {
            self.read_block(TRACE_HEADER_LEN)?;
            let decoded = match self.chain.additional_at(index) {
                Some(schema) => Some(schema.decode(&self.codec, &self.scratch)?),
                None => None,
            };
            remaining = self.machine.additional_done(decoded.as_ref())?;
            if let Some(block) = decoded {
                headers.extend(block);
            }
            index += 1;
        }

        let fallback = self.headers.binary.samples();
        let samples = self.machine.samples_due(&headers, fallback)?;
        trace!(offset, additional = index, samples, "read trace headers");
        Ok((headers, samples))
    }

    fn finish_trace(&mut self) -> Result<()> {
        let more = self.has_trace();
        if !more && self.position > self.data_end {
            warn!(
                position = self.position,
                data_end = self.data_end,
                "trace runs past the end of trace data"
            );
        }
        self.machine.samples_done(more)
    }
}

impl<R: Read + Seek> TraceStream for SegyReader<R> {
    fn has_trace(&self) -> bool {
        self.position + TRACE_HEADER_LEN as u64 <= self.data_end
    }

    fn trace_offset(&self) -> u64 {
        self.position
    }

    fn seek_trace(&mut self, offset: u64) -> Result<()> {
        if offset < self.data_start || offset > self.data_end {
            return Err(SegError::InvalidHeader(format!(
                "trace offset {offset} outside trace data {}..{}",
                self.data_start, self.data_end
            )));
        }
        self.inner.seek(SeekFrom::Start(offset))?;
        self.position = offset;
        self.machine.seek_reset()
    }

    fn rewind(&mut self) -> Result<()> {
        self.seek_trace(self.data_start)
    }

    fn read_trace_header(&mut self) -> Result<HeaderMap> {
        let (headers, samples) = self.read_headers()?;
        let len = self.samples.byte_len(samples)?;
        self.inner.seek(SeekFrom::Current(len as i64))?;
        self.position += len as u64;
        self.finish_trace()?;
        Ok(headers)
    }

    fn read_trace(&mut self) -> Result<Trace> {
        let (headers, count) = self.read_headers()?;
        let len = self.samples.byte_len(count)?;
        self.read_block(len)?;
        let samples = self.samples.decode(&self.scratch, count)?;
        self.finish_trace()?;
        Ok(Trace { headers, samples })
    }
}

/// Iterator over the remaining traces of a [`SegyReader`].
///
/// Stops after the last trace or after the first error.
pub struct Traces<'a, R> {
    reader: &'a mut SegyReader<R>,
    failed: bool,
}

impl<R: Read + Seek> Iterator for Traces<'_, R> {
    type Item = Result<Trace>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || !self.reader.has_trace() {
            return None;
        }
        let result = self.reader.read_trace();
        self.failed = result.is_err();
        Some(result)
    }
}

fn trace_length(binary: &BinaryHeader) -> TraceLength {
    if binary.is_fixed_length() {
        TraceLength::Fixed(binary.samples())
    } else {
        TraceLength::per_trace([layout::NUM_SAMPLES_EXT, layout::NUM_SAMPLES])
    }
}

fn end_of_data(binary: &BinaryHeader) -> Result<EndOfData> {
    let block_size = TEXTUAL_HEADER_LEN as u64;
    match binary.trailer_stanzas {
        0 => Ok(EndOfData::FileEnd),
        -1 => Ok(EndOfData::SentinelScan {
            traces: match binary.number_of_traces {
                0 => None,
                n => Some(n),
            },
            block_size,
        }),
        n if n > 0 => Ok(EndOfData::Counted {
            blocks: n as u64,
            block_size,
        }),
        n => Err(SegError::InvalidHeader(format!(
            "trailer stanza count {n}"
        ))),
    }
}

fn read_extended<R: Read>(inner: &mut R, count: i16) -> Result<Vec<TextualHeader>> {
    match count {
        0 => Ok(Vec::new()),
        -1 => {
            let (blocks, _) = state::scan_blocks(inner, TEXTUAL_HEADER_LEN, textual::is_end_text)?;
            blocks.iter().map(|b| TextualHeader::from_bytes(b)).collect()
        }
        n if n > 0 => {
            let mut block = vec![0u8; TEXTUAL_HEADER_LEN];
            let mut headers = Vec::with_capacity(n as usize);
            for _ in 0..n {
                inner.read_exact(&mut block)?;
                headers.push(TextualHeader::from_bytes(&block)?);
            }
            Ok(headers)
        }
        n => Err(SegError::InvalidHeader(format!(
            "extended textual header count {n}"
        ))),
    }
}
