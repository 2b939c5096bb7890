//! SEG-Y writer.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, trace};

use super::binary::BinaryHeader;
use super::layout::{self, TRACE_HEADER_LEN};
use super::textual::TEXTUAL_HEADER_LEN;
use super::{SegyHeaders, SegyOptions};
use crate::raw::RawCodec;
use crate::record::Trace;
use crate::sample::SampleCodec;
use crate::schema::{Schema, SchemaChain};
use crate::state::{AdditionalHeaders, EndOfData, RecordMachine, TraceLength};
use crate::value::{FieldValue, HeaderMap};
use crate::{Result, SegError};

/// Writes a SEG-Y file.
///
/// The lead headers are written together with the first trace so that a
/// zero sample count or interval in the binary header can be taken from
/// it. [`finish`](Self::finish) writes the trailer stanzas and, for
/// revision 2, patches the trace count into the binary header.
pub struct SegyWriter<W: Write + Seek> {
    inner: W,
    headers: SegyHeaders,
    codec: RawCodec,
    samples: SampleCodec,
    chain: SchemaChain,
    machine: RecordMachine,
    lead_written: bool,
    traces_written: u64,
    block: Vec<u8>,
    sample_bytes: Vec<u8>,
}

impl SegyWriter<BufWriter<File>> {
    /// Create a file with the built-in layouts.
    pub fn create(path: impl AsRef<Path>, headers: SegyHeaders) -> Result<Self> {
        Self::create_with(path, headers, SegyOptions::default())
    }

    pub fn create_with(
        path: impl AsRef<Path>,
        headers: SegyHeaders,
        options: SegyOptions,
    ) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        Self::with_options(BufWriter::new(file), headers, options)
    }
}

impl<W: Write + Seek> SegyWriter<W> {
    pub fn new(inner: W, headers: SegyHeaders) -> Result<Self> {
        Self::with_options(inner, headers, SegyOptions::default())
    }

    /// Validate `headers` against `options`; nothing is written yet.
    pub fn with_options(inner: W, mut headers: SegyHeaders, options: SegyOptions) -> Result<Self> {
        let chain = options.chain()?;
        if let Some(order) = options.byte_order() {
            headers.binary.byte_order = order;
        }
        let format = match options.sample_format() {
            Some(format) => {
                headers.binary.format_code = format.segy_code().ok_or_else(|| {
                    SegError::InvalidHeader(format!("{format} has no SEG-Y format code"))
                })?;
                format
            }
            None => headers.binary.sample_format()?,
        };
        check_textual_counts(&headers)?;
        options.check_additional_count(headers.binary.max_additional_headers)?;

        let binary = &headers.binary;
        let codec = RawCodec::new(binary.byte_order);
        let samples = SampleCodec::select(format, binary.byte_order);
        let trace_length = if binary.is_fixed_length() && binary.samples() != 0 {
            TraceLength::Fixed(binary.samples())
        } else {
            TraceLength::per_trace([layout::NUM_SAMPLES_EXT, layout::NUM_SAMPLES])
        };
        let end = if binary.trailer_stanzas == 0 {
            EndOfData::FileEnd
        } else {
            EndOfData::Counted {
                blocks: headers.trailer.len() as u64,
                block_size: TEXTUAL_HEADER_LEN as u64,
            }
        };
        let machine = RecordMachine::new(
            trace_length,
            AdditionalHeaders::FromFirstBlock {
                max: binary.max_additional_headers as usize,
                field: layout::ADDITIONAL_TRACE_HEADERS.into(),
            },
            end,
        );

        Ok(Self {
            inner,
            headers,
            codec,
            samples,
            chain,
            machine,
            lead_written: false,
            traces_written: 0,
            block: Vec::new(),
            sample_bytes: Vec::new(),
        })
    }

    pub fn binary_header(&self) -> &BinaryHeader {
        &self.headers.binary
    }

    pub fn traces_written(&self) -> u64 {
        self.traces_written
    }

    fn write_lead(&mut self, first: Option<&Trace>) -> Result<()> {
        let binary = &mut self.headers.binary;
        if let Some(first) = first {
            if binary.samples() == 0 {
                binary.set_samples(first.samples.len())?;
            }
            if binary.sample_interval == 0 && binary.ext_sample_interval == 0.0 {
                if let Some(interval) = first.header(layout::SAMPLE_INTERVAL) {
                    binary.sample_interval = interval
                        .as_u64()
                        .and_then(|v| u16::try_from(v).ok())
                        .ok_or_else(|| SegError::range(interval, "binary sample interval"))?;
                }
            }
        }
        let fixed = binary.is_fixed_length();
        let samples = binary.samples();

        self.inner.write_all(self.headers.textual.as_bytes())?;
        self.inner.write_all(&self.headers.binary.encode())?;
        for ext in &self.headers.extended {
            self.inner.write_all(ext.as_bytes())?;
        }
        self.machine.lead_header_done(self.headers.extended.len())?;
        for _ in 0..self.headers.extended.len() {
            self.machine.extension_done()?;
        }
        if fixed && !self.machine.trace_length().is_fixed() {
            self.machine = RecordMachine::new(
                TraceLength::Fixed(samples),
                self.machine.additional_headers().clone(),
                self.machine.end_of_data(),
            );
            self.machine.lead_header_done(0)?;
        }
        self.lead_written = true;
        debug!(
            revision = ?self.headers.binary.revision(),
            format = %self.samples.format(),
            byte_order = %self.codec.order(),
            samples,
            "wrote SEG-Y lead headers"
        );
        Ok(())
    }

    /// Encode and write one trace.
    ///
    /// The trace sample count is written into `num_samples` (or
    /// `num_samples_ext` when it does not fit 16 bits). The whole trace is
    /// encoded before any byte of it is written.
    ///
    /// A trace rejected while encoding leaves the writer ready for the next
    /// one.
    pub fn write_trace(&mut self, trace: &Trace) -> Result<()> {
        if !self.lead_written {
            self.write_lead(Some(trace))?;
        }
        let (additional, due) = match self.encode_trace(trace) {
            Ok(encoded) => encoded,
            Err(err) => {
                self.machine.seek_reset()?;
                return Err(err);
            }
        };

        self.inner.write_all(&self.block)?;
        self.inner.write_all(&self.sample_bytes)?;
        self.machine.samples_done(true)?;
        self.traces_written += 1;
        trace!(
            index = self.traces_written - 1,
            additional,
            samples = due,
            "wrote trace"
        );
        Ok(())
    }

    /// Encode `trace` into the block and sample buffers, advancing the
    /// machine to the sample stage. Returns the additional block count and
    /// the sample count.
    fn encode_trace(&mut self, trace: &Trace) -> Result<(usize, usize)> {
        let headers = self.sample_count_headers(trace)?;

        self.block.clear();
        self.block.resize(TRACE_HEADER_LEN, 0);
        self.chain
            .primary()
            .encode_into(&self.codec, &headers, &mut self.block)?;
        let mut remaining = self.machine.begin_trace(&headers)?;
        let mut index = 0;
        while remaining > 0 {
            let start = self.block.len();
            self.block.resize(start + TRACE_HEADER_LEN, 0);
            let slot = &mut self.block[start..];
            let schema = self.chain.additional_at(index);
            if let Some(schema) = schema {
                schema.encode_into(&self.codec, &headers, slot)?;
            }
            slot[TRACE_HEADER_LEN - Schema::NAME_TAG_LEN..].copy_from_slice(&layout::name_tag(index));
            remaining = self
                .machine
                .additional_done(schema.map(|_| &headers))?;
            index += 1;
        }

        let fallback = self.headers.binary.samples();
        let due = self.machine.samples_due(&headers, fallback)?;
        if due != trace.samples.len() {
            return Err(SegError::CountMismatch {
                what: "samples per trace",
                declared: due as u64,
                actual: trace.samples.len() as u64,
            });
        }
        self.samples.encode(&trace.samples, &mut self.sample_bytes)?;
        Ok((index, due))
    }

    /// Copy of the trace headers with the sample count fields set.
    fn sample_count_headers(&self, trace: &Trace) -> Result<HeaderMap> {
        let mut headers = trace.headers.clone();
        let n = trace.samples.len();
        let has_ext = self.headers.binary.max_additional_headers > 0
            && self
                .chain
                .additional_at(0)
                .is_some_and(|s| s.contains(layout::NUM_SAMPLES_EXT));
        match u16::try_from(n) {
            Ok(short) => {
                headers.insert(layout::NUM_SAMPLES.into(), FieldValue::U16(short));
                if let Some(ext) = headers.get_mut(layout::NUM_SAMPLES_EXT) {
                    if !ext.is_zero() {
                        *ext = FieldValue::U32(n as u32);
                    }
                }
            }
            Err(_) if has_ext => {
                let long = u32::try_from(n).map_err(|_| SegError::range(n, "num_samples_ext"))?;
                headers.insert(layout::NUM_SAMPLES.into(), FieldValue::U16(0));
                headers.insert(layout::NUM_SAMPLES_EXT.into(), FieldValue::U32(long));
            }
            Err(_) => return Err(SegError::range(n, layout::NUM_SAMPLES)),
        }
        Ok(headers)
    }

    /// Write the trailer, patch the revision 2 trace count and return the
    /// underlying writer.
    pub fn finish(mut self) -> Result<W> {
        if !self.lead_written {
            self.write_lead(None)?;
        }
        for stanza in &self.headers.trailer {
            self.inner.write_all(stanza.as_bytes())?;
        }
        self.machine.trailer_done()?;

        let binary = &mut self.headers.binary;
        if binary.major_revision >= 2 && binary.number_of_traces != self.traces_written {
            binary.number_of_traces = self.traces_written;
            let end = self.inner.stream_position()?;
            self.inner.seek(SeekFrom::Start(TEXTUAL_HEADER_LEN as u64))?;
            self.inner.write_all(&binary.encode())?;
            self.inner.seek(SeekFrom::Start(end))?;
        }
        self.inner.flush()?;
        debug!(
            traces = self.traces_written,
            trailer = self.headers.trailer.len(),
            "finished SEG-Y file"
        );
        Ok(self.inner)
    }
}

/// Extended textual and trailer counts must agree with the records given.
fn check_textual_counts(headers: &SegyHeaders) -> Result<()> {
    let binary = &headers.binary;
    match binary.extended_textual_headers {
        -1 => {
            if !headers.extended.last().is_some_and(|h| h.is_end_text()) {
                return Err(SegError::InvalidHeader(
                    "scanned extended textual headers must end with the end marker".into(),
                ));
            }
        }
        n if n >= 0 => {
            if n as usize != headers.extended.len() {
                return Err(SegError::CountMismatch {
                    what: "extended textual headers",
                    declared: n as u64,
                    actual: headers.extended.len() as u64,
                });
            }
        }
        n => {
            return Err(SegError::InvalidHeader(format!(
                "extended textual header count {n}"
            )));
        }
    }
    match binary.trailer_stanzas {
        -1 => Ok(()),
        n if n >= 0 => {
            if n as usize != headers.trailer.len() {
                return Err(SegError::CountMismatch {
                    what: "trailer stanzas",
                    declared: n as u64,
                    actual: headers.trailer.len() as u64,
                });
            }
            Ok(())
        }
        n => Err(SegError::InvalidHeader(format!("trailer stanza count {n}"))),
    }
}
