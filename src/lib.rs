//! Pure Rust SEG-Y and SEG-D reader and writer.
//!
//! Zero `unsafe`, zero C dependencies. Reads and writes SEG-Y revisions 0
//! to 2 and demultiplexed SEG-D revisions 1 to 3, with header layouts that
//! can be replaced at open time, BCD and IBM float conversion, every SEG-Y
//! sample format and the SEG-D packed formats.
//!
//! # Decoding a header block
//!
//! ```
//! use seg_rs::{FieldType, FieldValue, HeaderMap, RawCodec, Schema};
//!
//! let schema = Schema::from_tuples(8, &[
//!     (0, "line", FieldType::I32),
//!     (4, "point", FieldType::Bcd { digits: 4, skip_first: false }),
//! ]).unwrap();
//!
//! let block = [0x00, 0x00, 0x01, 0x2C, 0x12, 0x34, 0x00, 0x00];
//! let headers = schema.decode(&RawCodec::BIG, &block).unwrap();
//! assert_eq!(headers["line"], FieldValue::I32(300));
//! assert_eq!(headers["point"], FieldValue::U64(1234));
//!
//! let mut map = HeaderMap::new();
//! map.insert("line".into(), FieldValue::I32(300));
//! map.insert("point".into(), FieldValue::U64(1234));
//! assert_eq!(schema.encode(&RawCodec::BIG, &map).unwrap(), block);
//! ```
//!
//! # Grouping traces by a header field
//!
//! ```
//! use std::io::Cursor;
//! use seg_rs::segy::{BinaryHeader, SegyHeaders, SegyReader, SegyWriter, TextEncoding, TextualHeader};
//! use seg_rs::{FieldValue, SortedIndex, Trace};
//!
//! let headers = SegyHeaders::new(
//!     TextualHeader::from_lines(&["C 1 GATHERS"], TextEncoding::Ebcdic),
//!     BinaryHeader::new().with_sample_interval(4000),
//! );
//! let mut writer = SegyWriter::new(Cursor::new(Vec::new()), headers).unwrap();
//! for cdp in [7, 5, 7, 5, 7] {
//!     let trace = Trace::new().with_header("cdp", cdp).with_samples(vec![cdp as f64; 16]);
//!     writer.write_trace(&trace).unwrap();
//! }
//! let bytes = writer.finish().unwrap().into_inner();
//!
//! let reader = SegyReader::new(Cursor::new(bytes)).unwrap();
//! let mut index = SortedIndex::build(reader, "cdp").unwrap();
//! assert_eq!(index.trace_count_for(&FieldValue::I32(7)), 3);
//! let gather = index.traces_for(&FieldValue::I32(5), 5).unwrap();
//! assert_eq!(gather.len(), 2);
//! ```

pub mod access;
pub mod ebcdic;
pub mod error;
pub mod index;
pub mod raw;
pub mod record;
pub mod sample;
pub mod schema;
pub mod segd;
pub mod segy;
pub mod state;
pub mod types;
pub mod value;

pub use access::TraceStream;
pub use error::{Result, SegError};
pub use index::SortedIndex;
pub use raw::RawCodec;
pub use record::Trace;
pub use sample::{SampleCodec, SampleFormat};
pub use schema::{FieldDescriptor, Schema, SchemaChain};
pub use state::{AdditionalHeaders, EndOfData, RecordMachine, RecordState, TraceLength};
pub use types::{ByteOrder, FieldType, ValueKind};
pub use value::{FieldValue, HeaderMap};
