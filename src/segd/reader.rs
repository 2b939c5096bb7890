//! Streaming SEG-D reader with random access by trace offset.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::{debug, trace, warn};

use super::channel_set::{self, ChannelSetHeader};
use super::extension::ExtensionBlock;
use super::general::{GeneralHeader, GeneralHeader1, GeneralHeader2};
use super::layout::{self, TRACE_HEADER_LEN};
use super::{BLOCK_LEN, SegdHeaders, SegdOptions};
use crate::access::TraceStream;
use crate::raw::RawCodec;
use crate::record::Trace;
use crate::sample::{SampleCodec, SampleFormat};
use crate::schema::SchemaChain;
use crate::state::{self, AdditionalHeaders, EndOfData, RecordMachine, TraceLength};
use crate::value::HeaderMap;
use crate::{Result, SegError};

/// Reads demultiplexed traces from one SEG-D record.
///
/// Opening reads every header block up to the first trace and the general
/// trailer. The sample count of a trace comes from trace header extension
/// 1 when it names one, else from the trace's channel set descriptor.
pub struct SegdReader<R> {
    inner: R,
    headers: SegdHeaders,
    codec: RawCodec,
    samples: SampleCodec,
    chain: SchemaChain,
    machine: RecordMachine,
    samples_by_set: BTreeMap<(u8, u16), usize>,
    data_start: u64,
    data_end: u64,
    position: u64,
    scratch: Vec<u8>,
}

impl SegdReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, SegdOptions::default())
    }

    pub fn open_with(path: impl AsRef<Path>, options: SegdOptions) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::with_options(BufReader::new(file), options)
    }
}

impl<R: Read + Seek> SegdReader<R> {
    pub fn new(inner: R) -> Result<Self> {
        Self::with_options(inner, SegdOptions::default())
    }

    pub fn with_options(mut inner: R, options: SegdOptions) -> Result<Self> {
        inner.seek(SeekFrom::Start(0))?;
        let mut block = [0u8; BLOCK_LEN];
        read_block(&mut inner, &mut block)?;
        let block1 = GeneralHeader1::decode(&block)?;
        let block2 = if block1.additional_blocks > 0 {
            read_block(&mut inner, &mut block)?;
            Some(GeneralHeader2::decode(&block)?)
        } else {
            None
        };
        let mut general = GeneralHeader {
            block1,
            block2,
            extensions: Vec::new(),
        };
        let revision = general.major_revision();
        let remaining = general
            .additional_blocks()?
            .saturating_sub(general.block2.is_some() as usize);
        for _ in 0..remaining {
            read_block(&mut inner, &mut block)?;
            general.extensions.push(ExtensionBlock::decode(&block, revision)?);
        }

        let (format, order) = match options.sample_format() {
            Some(format) => (format, options.sample_order().unwrap_or_default()),
            None => {
                let (format, order) = SampleFormat::from_segd_code(general.block1.format_code)?;
                (format, options.sample_order().unwrap_or(order))
            }
        };
        let samples = SampleCodec::select(format, order);
        let chain = options.chain(revision)?;

        let scan_types = general.block1.scan_types as usize;
        let set_count = scan_types * general.channel_sets_per_scan_type()?;
        let mut descriptor = vec![0u8; channel_set::descriptor_len(revision)];
        let mut channel_sets = Vec::with_capacity(set_count);
        for _ in 0..set_count {
            read_block(&mut inner, &mut descriptor)?;
            channel_sets.push(ChannelSetHeader::decode(&descriptor, revision)?);
        }
        let skew = read_blocks(&mut inner, scan_types * general.skew_blocks()?)?;
        let extended = read_blocks(&mut inner, general.extended_blocks()?)?;
        let external = read_blocks(&mut inner, general.external_blocks()?)?;

        let mut machine = RecordMachine::new(
            TraceLength::per_trace([layout::SAMPLES_PER_TRACE]),
            AdditionalHeaders::FromTraceHeader {
                field: layout::TRACE_HEADER_EXTENSIONS.into(),
                max: None,
            },
            EndOfData::Counted {
                blocks: general.trailer_blocks() as u64,
                block_size: BLOCK_LEN as u64,
            },
        );
        let lead_blocks =
            general.extensions.len() + channel_sets.len() + skew.len() + extended.len() + external.len();
        machine.lead_header_done(lead_blocks)?;
        for _ in 0..lead_blocks {
            machine.extension_done()?;
        }

        let base = general.block1.base_scan_interval;
        let samples_by_set = channel_sets
            .iter()
            .map(|cs| (cs.key(), cs.samples_per_trace(base)))
            .collect();
        let data_start = inner.stream_position()?;
        let file_len = inner.seek(SeekFrom::End(0))?;

        let mut headers = SegdHeaders::new(general);
        headers.channel_sets = channel_sets;
        headers.skew = skew;
        headers.extended = extended;
        headers.external = external;

        let mut reader = Self {
            inner,
            headers,
            codec: RawCodec::BIG,
            samples,
            chain,
            machine,
            samples_by_set,
            data_start,
            data_end: file_len,
            position: data_start,
            scratch: Vec::new(),
        };
        reader.read_trailer(file_len)?;
        reader.rewind()?;

        let general = &reader.headers.general;
        debug!(
            revision = ?general.revision(),
            format = %format,
            sample_order = %order,
            channel_sets = reader.headers.channel_sets.len(),
            extensions = general.extensions.len(),
            trailer = reader.headers.trailer.len(),
            data_start = reader.data_start,
            data_end = reader.data_end,
            "opened SEG-D record"
        );
        Ok(reader)
    }

    fn read_trailer(&mut self, file_len: u64) -> Result<()> {
        let end = self.machine.end_of_data();
        let data_end = end
            .data_end(file_len)?
            .ok_or_else(|| SegError::EndOfData("general trailer has no fixed length".into()))?;
        if data_end < self.data_start {
            return Err(SegError::EndOfData(format!(
                "general trailer starts at {data_end}, inside the header blocks"
            )));
        }
        self.data_end = data_end;
        self.inner.seek(SeekFrom::Start(data_end))?;
        self.headers.trailer = read_blocks(&mut self.inner, self.headers.general.trailer_blocks())?;
        self.machine.trailer_done()
    }

    pub fn headers(&self) -> &SegdHeaders {
        &self.headers
    }

    pub fn general_header(&self) -> &GeneralHeader {
        &self.headers.general
    }

    pub fn channel_sets(&self) -> &[ChannelSetHeader] {
        &self.headers.channel_sets
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

    pub fn data_start(&self) -> u64 {
        self.data_start
    }

    pub fn data_end(&self) -> u64 {
        self.data_end
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

    fn read_scratch(&mut self, len: usize) -> Result<()> {
        self.scratch.resize(len, 0);
        self.inner.read_exact(&mut self.scratch[..len])?;
        self.position += len as u64;
        Ok(())
    }

    /// Sample count the channel set of `headers` declares.
    fn channel_set_samples(&self, headers: &HeaderMap) -> Result<usize> {
        let (scan_type, channel_set) = layout::channel_set_key(headers);
        let key = (scan_type as u8, channel_set as u16);
        self.samples_by_set.get(&key).copied().ok_or_else(|| {
            SegError::InvalidHeader(format!(
                "trace refers to scan type {scan_type} channel set {channel_set}, which has no descriptor"
            ))
        })
    }

    fn read_headers(&mut self) -> Result<(HeaderMap, usize)> {
        if !self.has_trace() {
            return Err(SegError::NoTrace);
        }
        let offset = self.position;
        self.read_scratch(TRACE_HEADER_LEN)?;
        let mut headers = self.chain.primary().decode(&self.codec, &self.scratch)?;
        let mut remaining = self.machine.begin_trace(&headers)?;

        let mut index = 0;
        while remaining > 0 {
            self.read_scratch(layout::EXTENSION_LEN)?;
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

        let fallback = match headers.get(layout::SAMPLES_PER_TRACE) {
            Some(v) if !v.is_zero() => 0,
            _ => self.channel_set_samples(&headers)?,
        };
        let samples = self.machine.samples_due(&headers, fallback)?;
        trace!(offset, extensions = index, samples, "read trace headers");
        Ok((headers, samples))
    }

    fn finish_trace(&mut self) -> Result<()> {
        let more = self.has_trace();
        if !more && self.position > self.data_end {
            warn!(
                position = self.position,
                data_end = self.data_end,
                "trace runs into the general trailer"
            );
        }
        self.machine.samples_done(more)
    }
}

impl<R: Read + Seek> TraceStream for SegdReader<R> {
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
        self.read_scratch(len)?;
        let samples = self.samples.decode(&self.scratch, count)?;
        self.finish_trace()?;
        Ok(Trace { headers, samples })
    }
}

/// Iterator over the remaining traces of a [`SegdReader`].
pub struct Traces<'a, R> {
    reader: &'a mut SegdReader<R>,
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

fn read_block<R: Read>(inner: &mut R, block: &mut [u8]) -> Result<()> {
    let filled = state::read_full(inner, block)?;
    if filled < block.len() {
        return Err(SegError::BlockTooShort {
            expected: block.len(),
            actual: filled,
        });
    }
    Ok(())
}

fn read_blocks<R: Read>(inner: &mut R, count: usize) -> Result<Vec<[u8; BLOCK_LEN]>> {
    let mut blocks = Vec::with_capacity(count);
    for _ in 0..count {
        let mut block = [0u8; BLOCK_LEN];
        read_block(inner, &mut block)?;
        blocks.push(block);
    }
    Ok(blocks)
}
