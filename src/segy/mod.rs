//! SEG-Y revision 0, 1 and 2 files.
//!
//! A file is a 3200-byte textual header, a 400-byte [`BinaryHeader`],
//! optional extended textual headers, then traces (240-byte header,
//! optional 240-byte additional headers, samples) and optional trailer
//! stanzas. [`SegyReader`] and [`SegyWriter`] walk that layout with a
//! [`RecordMachine`](crate::state::RecordMachine) configured from the
//! binary header.
//!
//! ```
//! use std::io::Cursor;
//! use seg_rs::segy::{BinaryHeader, SegyHeaders, SegyReader, SegyWriter, TextEncoding, TextualHeader};
//! use seg_rs::{TraceStream, Trace};
//!
//! let headers = SegyHeaders::new(
//!     TextualHeader::from_lines(&["C 1 EXAMPLE"], TextEncoding::Ebcdic),
//!     BinaryHeader::new().with_sample_interval(4000),
//! );
//! let mut writer = SegyWriter::new(Cursor::new(Vec::new()), headers).unwrap();
//! writer
//!     .write_trace(&Trace::new().with_header("cdp", 1i32).with_samples(vec![0.5; 8]))
//!     .unwrap();
//! let bytes = writer.finish().unwrap().into_inner();
//!
//! let mut reader = SegyReader::new(Cursor::new(bytes)).unwrap();
//! let trace = reader.read_trace().unwrap();
//! assert_eq!(trace.samples.len(), 8);
//! assert!(!reader.has_trace());
//! ```

pub mod binary;
pub mod layout;
pub mod reader;
pub mod textual;
pub mod writer;

pub use binary::BinaryHeader;
pub use reader::SegyReader;
pub use textual::{TextEncoding, TextualHeader};
pub use writer::SegyWriter;

use crate::{Result, SegError};
use crate::sample::SampleFormat;
use crate::schema::{Schema, SchemaChain};
use crate::types::ByteOrder;

/// Everything in a SEG-Y file that is not a trace.
#[derive(Debug, Clone, PartialEq)]
pub struct SegyHeaders {
    pub textual: TextualHeader,
    pub binary: BinaryHeader,
    pub extended: Vec<TextualHeader>,
    pub trailer: Vec<TextualHeader>,
}

impl SegyHeaders {
    pub fn new(textual: TextualHeader, binary: BinaryHeader) -> Self {
        Self {
            textual,
            binary,
            extended: Vec::new(),
            trailer: Vec::new(),
        }
    }

    /// Set the extended textual headers.
    pub fn with_extended(mut self, extended: Vec<TextualHeader>) -> Self {
        self.extended = extended;
        self
    }

    /// Set the trailer stanzas.
    pub fn with_trailer(mut self, trailer: Vec<TextualHeader>) -> Self {
        self.trailer = trailer;
        self
    }
}

/// Layout overrides for opening or creating a SEG-Y file.
#[derive(Debug, Clone, Default)]
pub struct SegyOptions {
    trace_schema: Option<Schema>,
    additional_schemas: Option<Vec<Schema>>,
    byte_order: Option<ByteOrder>,
    sample_format: Option<SampleFormat>,
}

impl SegyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the built-in 240-byte trace header layout.
    pub fn with_trace_schema(mut self, schema: Schema) -> Self {
        self.trace_schema = Some(schema);
        self
    }

    /// Replace the built-in additional header layouts (extension 1).
    ///
    /// Additional blocks beyond the last schema are skipped by length.
    pub fn with_additional_schemas(mut self, schemas: Vec<Schema>) -> Self {
        self.additional_schemas = Some(schemas);
        self
    }

    /// Ignore the byte order marker and use `order`.
    pub fn with_byte_order(mut self, order: ByteOrder) -> Self {
        self.byte_order = Some(order);
        self
    }

    /// Ignore the binary header format code and use `format`.
    pub fn with_sample_format(mut self, format: SampleFormat) -> Self {
        self.sample_format = Some(format);
        self
    }

    pub fn byte_order(&self) -> Option<ByteOrder> {
        self.byte_order
    }

    pub fn sample_format(&self) -> Option<SampleFormat> {
        self.sample_format
    }

    /// The trace header schema chain these options select.
    ///
    /// Every schema must span a whole 240-byte block, and additional
    /// schemas must leave the last [`Schema::NAME_TAG_LEN`] bytes free for
    /// the block name tag.
    pub fn chain(&self) -> Result<SchemaChain> {
        let primary = match &self.trace_schema {
            Some(schema) => schema.clone(),
            None => layout::trace_header_schema()?,
        };
        check_block_len(&primary, "trace header")?;
        let additional = match &self.additional_schemas {
            Some(schemas) => schemas.clone(),
            None => vec![layout::extension_1_schema()?],
        };
        for (index, schema) in additional.iter().enumerate() {
            check_block_len(schema, "additional trace header")?;
            if schema.reserved_tail() < Schema::NAME_TAG_LEN {
                return Err(SegError::InvalidSchema(format!(
                    "additional trace header schema {index} reserves {} tail bytes, \
                     the name tag needs {}",
                    schema.reserved_tail(),
                    Schema::NAME_TAG_LEN
                )));
            }
        }
        SchemaChain::new(primary, additional)
    }

    /// Reject explicit additional schemas that outnumber the blocks a file
    /// may carry per trace. The built-in extension 1 layout is always
    /// accepted.
    pub(crate) fn check_additional_count(&self, max_additional_headers: u32) -> Result<()> {
        match &self.additional_schemas {
            Some(schemas) if schemas.len() > max_additional_headers as usize => {
                Err(SegError::CountMismatch {
                    what: "additional trace header schemas",
                    declared: max_additional_headers as u64,
                    actual: schemas.len() as u64,
                })
            }
            _ => Ok(()),
        }
    }
}

fn check_block_len(schema: &Schema, what: &str) -> Result<()> {
    if schema.block_len() != layout::TRACE_HEADER_LEN {
        return Err(SegError::InvalidSchema(format!(
            "{what} schema spans {} bytes, expected {}",
            schema.block_len(),
            layout::TRACE_HEADER_LEN
        )));
    }
    Ok(())
}
