//! Error types for SEG-Y and SEG-D decoding and encoding.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SegError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("block too short: expected at least {expected} bytes, got {actual}")]
    BlockTooShort { expected: usize, actual: usize },

    #[error("unsupported byte order marker {0:#010X}")]
    UnsupportedByteOrder(u32),

    #[error("unsupported sample format code: {0}")]
    UnsupportedFormat(i32),

    #[error("unsupported revision: {0}")]
    UnsupportedRevision(String),

    #[error("invalid BCD nibble {nibble:#X} at digit {digit}")]
    InvalidBcd { nibble: u8, digit: usize },

    #[error("schema field `{name}` at offset {offset} overlaps field `{previous}`")]
    SchemaOverlap {
        name: String,
        offset: usize,
        previous: String,
    },

    #[error("schema field `{name}` ends at byte {end}, beyond usable block length {limit}")]
    SchemaOutOfBlock {
        name: String,
        end: usize,
        limit: usize,
    },

    #[error("schema field `{0}` is declared more than once")]
    DuplicateField(String),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("header field `{0}` not found")]
    UnknownField(String),

    #[error("header count mismatch: {what} declares at most {declared}, found {actual}")]
    CountMismatch {
        what: &'static str,
        declared: u64,
        actual: u64,
    },

    #[error("packed sample group mismatch: {samples} samples is not a multiple of {group}")]
    PartialGroup { samples: usize, group: usize },

    #[error("unable to determine end of trace data: {0}")]
    EndOfData(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("no trace at the current position")]
    NoTrace,

    #[error("unexpected record state: expected {expected}, found {found}")]
    State {
        expected: &'static str,
        found: String,
    },

    #[error("value {value} out of range for {target}")]
    Range { value: String, target: String },
}

impl SegError {
    /// Build a [`SegError::Range`] from anything displayable.
    pub(crate) fn range(value: impl std::fmt::Display, target: impl Into<String>) -> Self {
        Self::Range {
            value: value.to_string(),
            target: target.into(),
        }
    }

    /// `true` for errors caused by a value exceeding its on-disk type.
    pub fn is_range(&self) -> bool {
        matches!(self, Self::Range { .. })
    }

    /// `true` for errors raised by the underlying reader or writer.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, SegError>;
