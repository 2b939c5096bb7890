//! SEG-D writer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::{debug, trace};

use super::layout::{self, EXTENSION_LEN, TRACE_HEADER_LEN};
use super::{SegdHeaders, SegdOptions};
use crate::raw::RawCodec;
use crate::record::Trace;
use crate::sample::{SampleCodec, SampleFormat};
use crate::schema::SchemaChain;
use crate::state::{AdditionalHeaders, EndOfData, RecordMachine, TraceLength};
use crate::value::FieldValue;
use crate::{Result, SegError};

/// Writes one SEG-D record.
///
/// Header block counts in the general header must agree with the blocks in
/// [`SegdHeaders`]; this is checked before anything is written. A trace
/// refers to its channel set through `scan_type` and `channel_set` (or
/// `extended_channel_set`), and its sample count must match what that
/// descriptor or its extension 1 declares.
pub struct SegdWriter<W: Write> {
    inner: W,
    headers: SegdHeaders,
    samples: SampleCodec,
    chain: SchemaChain,
    machine: RecordMachine,
    lead_written: bool,
    traces_written: u64,
    block: Vec<u8>,
    sample_bytes: Vec<u8>,
}

impl SegdWriter<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>, headers: SegdHeaders) -> Result<Self> {
        Self::create_with(path, headers, SegdOptions::default())
    }

    pub fn create_with(
        path: impl AsRef<Path>,
        headers: SegdHeaders,
        options: SegdOptions,
    ) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        Self::with_options(BufWriter::new(file), headers, options)
    }
}

impl<W: Write> SegdWriter<W> {
    pub fn new(inner: W, headers: SegdHeaders) -> Result<Self> {
        Self::with_options(inner, headers, SegdOptions::default())
    }

    pub fn with_options(inner: W, mut headers: SegdHeaders, options: SegdOptions) -> Result<Self> {
        let revision = headers.general.major_revision();
        let chain = options.chain(revision)?;
        let (format, order) = match options.sample_format() {
            Some(format) => {
                let order = options.sample_order().unwrap_or_default();
                headers.general.block1.format_code = format.segd_code(order).ok_or_else(|| {
                    SegError::InvalidHeader(format!("{format} has no SEG-D format code"))
                })?;
                (format, order)
            }
            None => {
                let (format, order) =
                    SampleFormat::from_segd_code(headers.general.block1.format_code)?;
                (format, options.sample_order().unwrap_or(order))
            }
        };
        check_counts(&headers)?;

        let machine = RecordMachine::new(
            TraceLength::per_trace([layout::SAMPLES_PER_TRACE]),
            AdditionalHeaders::FromTraceHeader {
                field: layout::TRACE_HEADER_EXTENSIONS.into(),
                max: None,
            },
            EndOfData::Counted {
                blocks: headers.trailer.len() as u64,
                block_size: super::BLOCK_LEN as u64,
            },
        );
        Ok(Self {
            inner,
            headers,
            samples: SampleCodec::select(format, order),
            chain,
            machine,
            lead_written: false,
            traces_written: 0,
            block: Vec::new(),
            sample_bytes: Vec::new(),
        })
    }

    pub fn headers(&self) -> &SegdHeaders {
        &self.headers
    }

    pub fn traces_written(&self) -> u64 {
        self.traces_written
    }

    fn write_lead(&mut self) -> Result<()> {
        let general = self.headers.general.encode()?;
        self.inner.write_all(&general)?;
        for cs in &self.headers.channel_sets {
            self.inner.write_all(&cs.encode()?)?;
        }
        let raw_blocks = self
            .headers
            .skew
            .iter()
            .chain(&self.headers.extended)
            .chain(&self.headers.external);
        for block in raw_blocks {
            self.inner.write_all(block)?;
        }
        let lead_blocks = self.headers.general.extensions.len()
            + self.headers.channel_sets.len()
            + self.headers.skew.len()
            + self.headers.extended.len()
            + self.headers.external.len();
        self.machine.lead_header_done(lead_blocks)?;
        for _ in 0..lead_blocks {
            self.machine.extension_done()?;
        }
        self.lead_written = true;
        debug!(
            revision = ?self.headers.general.revision(),
            format = %self.samples.format(),
            channel_sets = self.headers.channel_sets.len(),
            "wrote SEG-D header blocks"
        );
        Ok(())
    }

    /// Sample count the trace's channel set declares.
    fn channel_set_samples(&self, trace: &Trace) -> Result<usize> {
        let (scan_type, channel_set) = layout::channel_set_key(&trace.headers);
        let cs = u8::try_from(scan_type)
            .ok()
            .zip(u16::try_from(channel_set).ok())
            .and_then(|(s, c)| self.headers.channel_set(s, c))
            .ok_or_else(|| {
                SegError::InvalidHeader(format!(
                    "no descriptor for scan type {scan_type} channel set {channel_set}"
                ))
            })?;
        Ok(cs.samples_per_trace(self.headers.general.block1.base_scan_interval))
    }

    /// Encode and write one trace.
    ///
    /// With at least one extension the sample count is written into
    /// `samples_per_trace`; otherwise the channel set must declare it. A
    /// rejected trace writes nothing and the next one may follow.
    pub fn write_trace(&mut self, trace: &Trace) -> Result<()> {
        if !self.lead_written {
            self.write_lead()?;
        }
        let (extensions, due) = match self.encode_trace(trace) {
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
            extensions,
            samples = due,
            "wrote trace"
        );
        Ok(())
    }

    fn encode_trace(&mut self, trace: &Trace) -> Result<(usize, usize)> {
        let mut headers = trace.headers.clone();
        let fallback = self.channel_set_samples(trace)?;

        self.block.clear();
        self.block.resize(TRACE_HEADER_LEN, 0);
        let codec = RawCodec::BIG;
        self.chain
            .primary()
            .encode_into(&codec, &headers, &mut self.block)?;
        let mut remaining = self.machine.begin_trace(&headers)?;
        if remaining > 0
            && self
                .chain
                .additional_at(0)
                .is_some_and(|s| s.contains(layout::SAMPLES_PER_TRACE))
        {
            let n = u32::try_from(trace.samples.len())
                .map_err(|_| SegError::range(trace.samples.len(), layout::SAMPLES_PER_TRACE))?;
            headers.insert(layout::SAMPLES_PER_TRACE.into(), FieldValue::U32(n));
        }
        let mut index = 0;
        while remaining > 0 {
            let start = self.block.len();
            self.block.resize(start + EXTENSION_LEN, 0);
            let schema = self.chain.additional_at(index);
            if let Some(schema) = schema {
                schema.encode_into(&codec, &headers, &mut self.block[start..])?;
            }
            remaining = self.machine.additional_done(schema.map(|_| &headers))?;
            index += 1;
        }

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

    /// Write the general trailer and return the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        if !self.lead_written {
            self.write_lead()?;
        }
        for block in &self.headers.trailer {
            self.inner.write_all(block)?;
        }
        self.machine.trailer_done()?;
        self.inner.flush()?;
        let expected = self.headers.expected_traces();
        debug!(
            traces = self.traces_written,
            expected,
            trailer = self.headers.trailer.len(),
            "finished SEG-D record"
        );
        Ok(self.inner)
    }
}

fn mismatch(what: &'static str, declared: usize, actual: usize) -> Result<()> {
    if declared != actual {
        return Err(SegError::CountMismatch {
            what,
            declared: declared as u64,
            actual: actual as u64,
        });
    }
    Ok(())
}

/// Block counts in the general header must agree with the blocks given.
fn check_counts(headers: &SegdHeaders) -> Result<()> {
    let general = &headers.general;
    let revision = general.major_revision();
    let scan_types = general.block1.scan_types as usize;
    mismatch(
        "channel set descriptors",
        scan_types * general.channel_sets_per_scan_type()?,
        headers.channel_sets.len(),
    )?;
    if let Some(cs) = headers
        .channel_sets
        .iter()
        .find(|cs| cs.major_revision() != revision)
    {
        return Err(SegError::InvalidHeader(format!(
            "channel set {} uses revision {} layout in a revision {revision} record",
            cs.channel_set,
            cs.major_revision()
        )));
    }
    mismatch("skew blocks", scan_types * general.skew_blocks()?, headers.skew.len())?;
    mismatch("extended header blocks", general.extended_blocks()?, headers.extended.len())?;
    mismatch("external header blocks", general.external_blocks()?, headers.external.len())?;
    mismatch("general trailer blocks", general.trailer_blocks(), headers.trailer.len())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::access::TraceStream;
    use crate::segd::{ChannelSetHeader, GeneralHeader, SegdReader};

    fn headers(revision: u8) -> SegdHeaders {
        let mut headers = SegdHeaders::new(GeneralHeader::new(revision, 0));
        headers.general.block1.channel_sets = Some(2);
        let first = ChannelSetHeader::new(revision, 1, 1).with_channels(2);
        let second = ChannelSetHeader::new(revision, 1, 2)
            .with_channels(1)
            .with_trace_header_extensions(1);
        headers.channel_sets = if revision >= 3 {
            vec![first.with_samples(6, 1000), second.with_samples(0, 1000)]
        } else {
            // 12 ms window at a 1 ms base interval
            vec![first.with_window(0, 6), second]
        };
        headers.general.block1.base_scan_interval = 16;
        headers
    }

    fn trace(set: u64, number: u64, samples: Vec<f64>) -> Trace {
        Trace::new()
            .with_header("scan_type", 1u64)
            .with_header("channel_set", set)
            .with_header("trace_number", number)
            .with_samples(samples)
    }

    fn write(headers: SegdHeaders, traces: &[Trace]) -> Vec<u8> {
        let mut writer = SegdWriter::new(Cursor::new(Vec::new()), headers).unwrap();
        for t in traces {
            writer.write_trace(t).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn fallback_and_extension_sample_counts() {
        for revision in [2, 3] {
            let n = if revision >= 3 { 6 } else { 12 };
            let extended = trace(2, 3, vec![1.0; 9]).with_header("trace_header_extensions", 1u8);
            let traces = [
                trace(1, 1, vec![0.25; n]),
                trace(1, 2, vec![-0.5; n]),
                extended,
            ];
            let bytes = write(headers(revision), &traces);

            let mut reader = SegdReader::new(Cursor::new(bytes)).unwrap();
            let read: Vec<_> = reader.traces().collect::<Result<_>>().unwrap();
            assert_eq!(read.len(), 3);
            assert_eq!(read[0].samples, traces[0].samples);
            assert_eq!(read[1].samples, traces[1].samples);
            assert_eq!(read[2].samples, vec![1.0; 9]);
            assert_eq!(read[2].header("samples_per_trace").unwrap().as_u64(), Some(9));
            assert!(!reader.has_trace());
        }
    }

    #[test]
    fn wrong_sample_count_rejected() {
        let mut writer = SegdWriter::new(Cursor::new(Vec::new()), headers(3)).unwrap();
        let err = writer.write_trace(&trace(1, 1, vec![0.0; 5])).unwrap_err();
        assert!(matches!(
            err,
            SegError::CountMismatch {
                declared: 6,
                actual: 5,
                ..
            }
        ));
    }

    #[test]
    fn rejected_trace_leaves_writer_usable() {
        let mut writer = SegdWriter::new(Cursor::new(Vec::new()), headers(3)).unwrap();
        writer.write_trace(&trace(1, 1, vec![1.0; 6])).unwrap();
        let err = writer.write_trace(&trace(1, 2, vec![0.0; 3])).unwrap_err();
        assert!(matches!(err, SegError::CountMismatch { declared: 6, actual: 3, .. }));
        writer.write_trace(&trace(1, 2, vec![2.0; 6])).unwrap();
        assert_eq!(writer.traces_written(), 2);
        let bytes = writer.finish().unwrap().into_inner();

        let mut reader = SegdReader::new(Cursor::new(bytes)).unwrap();
        let read: Vec<_> = reader.traces().collect::<Result<_>>().unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read[1].samples, vec![2.0; 6]);
    }

    #[test]
    fn two_digit_channel_set_wins_over_extended() {
        let disagreeing = trace(1, 1, vec![4.0; 6]).with_header("extended_channel_set", 2u16);
        let bytes = write(headers(3), &[disagreeing]);
        let mut reader = SegdReader::new(Cursor::new(bytes)).unwrap();
        let back = reader.read_trace().unwrap();
        assert_eq!(back.header("channel_set").unwrap().as_u64(), Some(1));
        assert_eq!(back.samples, vec![4.0; 6]);
    }

    #[test]
    fn unknown_channel_set_rejected() {
        let mut writer = SegdWriter::new(Cursor::new(Vec::new()), headers(3)).unwrap();
        let err = writer.write_trace(&trace(7, 1, vec![0.0; 6])).unwrap_err();
        assert!(matches!(err, SegError::InvalidHeader(_)));
    }

    #[test]
    fn counts_checked_up_front() {
        let mut bad = headers(3);
        bad.channel_sets.pop();
        assert!(matches!(
            SegdWriter::new(Cursor::new(Vec::new()), bad),
            Err(SegError::CountMismatch { declared: 2, actual: 1, .. })
        ));

        let mut bad = headers(3);
        bad.general.block2.as_mut().unwrap().trailer_blocks = 1;
        assert!(SegdWriter::new(Cursor::new(Vec::new()), bad).is_err());

        let mut mixed = headers(3);
        mixed.channel_sets[0] = ChannelSetHeader::new(2, 1, 1);
        assert!(matches!(
            SegdWriter::new(Cursor::new(Vec::new()), mixed),
            Err(SegError::InvalidHeader(_))
        ));
    }

    #[test]
    fn trailer_blocks_round_trip() {
        let mut headers = headers(2);
        headers.general.block2.as_mut().unwrap().trailer_blocks = 2;
        headers.trailer = vec![[0x11; 32], [0x22; 32]];
        let bytes = write(headers, &[trace(1, 1, vec![3.0; 12])]);
        let mut reader = SegdReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.headers().trailer, vec![[0x11; 32], [0x22; 32]]);
        assert_eq!(reader.read_trace().unwrap().samples, vec![3.0; 12]);
        assert!(!reader.has_trace());
    }
}
