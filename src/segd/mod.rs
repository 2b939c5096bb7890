//! SEG-D revision 1, 2 and 3 demultiplexed files.
//!
//! A record is a general header (block 1, block 2 and additional blocks),
//! one descriptor per channel set, skew, extended and external header
//! blocks, then traces and an optional general trailer. Every header
//! block is a multiple of 32 bytes and binary fields are big-endian.
//!
//! ```
//! use std::io::Cursor;
//! use seg_rs::segd::{ChannelSetHeader, GeneralHeader, SegdHeaders, SegdReader, SegdWriter};
//! use seg_rs::{Trace, TraceStream};
//!
//! let mut headers = SegdHeaders::new(GeneralHeader::new(3, 0));
//! headers.channel_sets = vec![ChannelSetHeader::new(3, 1, 1).with_samples(4, 1000)];
//! let mut writer = SegdWriter::new(Cursor::new(Vec::new()), headers).unwrap();
//! let trace = Trace::new()
//!     .with_header("scan_type", 1u64)
//!     .with_header("channel_set", 1u64)
//!     .with_samples(vec![1.0, -2.0, 0.5, 0.0]);
//! writer.write_trace(&trace).unwrap();
//! let bytes = writer.finish().unwrap().into_inner();
//!
//! let mut reader = SegdReader::new(Cursor::new(bytes)).unwrap();
//! assert_eq!(reader.read_trace().unwrap().samples, vec![1.0, -2.0, 0.5, 0.0]);
//! ```

pub mod channel_set;
pub mod extension;
pub mod general;
pub mod layout;
pub mod reader;
pub mod writer;

pub use channel_set::ChannelSetHeader;
pub use extension::{ExtensionBlock, SourceKind};
pub use general::{GeneralHeader, GeneralHeader1, GeneralHeader2};
pub use reader::SegdReader;
pub use writer::SegdWriter;

use crate::{Result, SegError};
use crate::raw::{BCD_UNDEFINED, bcd_decode, bcd_encode};
use crate::sample::SampleFormat;
use crate::schema::{Schema, SchemaChain};
use crate::types::ByteOrder;

/// Size of every SEG-D header block.
pub const BLOCK_LEN: usize = 32;

pub(crate) fn bcd(raw: &[u8], offset: usize, digits: usize, skip_first: bool) -> Result<u64> {
    bcd_decode(&raw[offset..], digits, skip_first)
}

/// BCD field where all-`F` nibbles mean "see elsewhere".
pub(crate) fn bcd_opt(
    raw: &[u8],
    offset: usize,
    digits: usize,
    skip_first: bool,
) -> Result<Option<u64>> {
    let value = bcd(raw, offset, digits, skip_first)?;
    Ok((value != BCD_UNDEFINED).then_some(value))
}

pub(crate) fn put_bcd(
    raw: &mut [u8],
    offset: usize,
    digits: usize,
    skip_first: bool,
    value: u64,
) -> Result<()> {
    bcd_encode(value, digits, skip_first, &mut raw[offset..])
}

/// Everything in a SEG-D record that is not a trace.
#[derive(Debug, Clone, PartialEq)]
pub struct SegdHeaders {
    pub general: GeneralHeader,
    /// Descriptors in file order, scan type major.
    pub channel_sets: Vec<ChannelSetHeader>,
    pub skew: Vec<[u8; BLOCK_LEN]>,
    pub extended: Vec<[u8; BLOCK_LEN]>,
    pub external: Vec<[u8; BLOCK_LEN]>,
    pub trailer: Vec<[u8; BLOCK_LEN]>,
}

impl SegdHeaders {
    pub fn new(general: GeneralHeader) -> Self {
        Self {
            general,
            channel_sets: Vec::new(),
            skew: Vec::new(),
            extended: Vec::new(),
            external: Vec::new(),
            trailer: Vec::new(),
        }
    }

    /// The descriptor for `(scan_type, channel_set)`.
    pub fn channel_set(&self, scan_type: u8, channel_set: u16) -> Option<&ChannelSetHeader> {
        self.channel_sets
            .iter()
            .find(|cs| cs.key() == (scan_type, channel_set))
    }

    /// Traces one record holds: the channels of every channel set.
    pub fn expected_traces(&self) -> u64 {
        self.channel_sets.iter().map(|cs| cs.channels as u64).sum()
    }
}

/// Layout overrides for opening or creating a SEG-D record.
#[derive(Debug, Clone, Default)]
pub struct SegdOptions {
    trace_schema: Option<Schema>,
    extension_schemas: Option<Vec<Schema>>,
    sample_format: Option<SampleFormat>,
    sample_order: Option<ByteOrder>,
}

impl SegdOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the built-in 20-byte trace header layout.
    pub fn with_trace_schema(mut self, schema: Schema) -> Self {
        self.trace_schema = Some(schema);
        self
    }

    /// Replace the built-in trace header extension layouts.
    pub fn with_extension_schemas(mut self, schemas: Vec<Schema>) -> Self {
        self.extension_schemas = Some(schemas);
        self
    }

    /// Ignore the general header format code and use `format`.
    pub fn with_sample_format(mut self, format: SampleFormat) -> Self {
        self.sample_format = Some(format);
        self
    }

    /// Byte order of the samples, overriding the one the format code implies.
    pub fn with_sample_order(mut self, order: ByteOrder) -> Self {
        self.sample_order = Some(order);
        self
    }

    pub fn sample_format(&self) -> Option<SampleFormat> {
        self.sample_format
    }

    pub fn sample_order(&self) -> Option<ByteOrder> {
        self.sample_order
    }

    /// The trace header chain for a record of `major_revision`.
    ///
    /// The trace header schema must span 20 bytes and each extension
    /// schema 32 bytes.
    pub fn chain(&self, major_revision: u8) -> Result<SchemaChain> {
        let primary = match &self.trace_schema {
            Some(schema) => schema.clone(),
            None => layout::trace_header_schema()?,
        };
        check_block_len(&primary, layout::TRACE_HEADER_LEN, "trace header")?;
        let extensions = match &self.extension_schemas {
            Some(schemas) => schemas.clone(),
            None => vec![layout::extension_1_schema(major_revision)?],
        };
        for schema in &extensions {
            check_block_len(schema, layout::EXTENSION_LEN, "trace header extension")?;
        }
        SchemaChain::new(primary, extensions)
    }
}

fn check_block_len(schema: &Schema, expected: usize, what: &str) -> Result<()> {
    if schema.block_len() != expected {
        return Err(SegError::InvalidSchema(format!(
            "{what} schema spans {} bytes, expected {expected}",
            schema.block_len()
        )));
    }
    Ok(())
}
