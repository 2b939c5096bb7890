//! Shared types: [`ByteOrder`] and [`FieldType`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Byte order for multi-byte fields in a header block or sample stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ByteOrder {
    #[default]
    Big,
    Little,
}

impl ByteOrder {
    /// The byte order of the host.
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Self::Big
        } else {
            Self::Little
        }
    }

    /// The opposite byte order.
    pub const fn reversed(self) -> Self {
        match self {
            Self::Big => Self::Little,
            Self::Little => Self::Big,
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Big => write!(f, "big-endian"),
            Self::Little => write!(f, "little-endian"),
        }
    }
}

/// On-disk type of a header field.
///
/// Every type has a fixed width in bytes. Decoding widens the value to the
/// [`FieldValue`](crate::FieldValue) variant returned by [`FieldType::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    I8,
    I16,
    /// 24-bit two's complement, decoded as `i32`.
    I24,
    I32,
    I64,
    U8,
    U16,
    /// 24-bit unsigned, decoded as `u32`.
    U24,
    U32,
    U64,
    F32,
    F64,
    /// IBM System/360 hexadecimal float, decoded as `f64`.
    Ibm32,
    /// Packed binary-coded decimal, decoded as `u64`.
    ///
    /// With `skip_first` the first nibble of the first byte belongs to a
    /// neighbouring field and is left untouched on encode.
    Bcd { digits: u8, skip_first: bool },
}

/// The [`FieldValue`](crate::FieldValue) variant a field decodes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueKind {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl FieldType {
    /// Width of the field in bytes.
    pub const fn width(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I24 | Self::U24 => 3,
            Self::I32 | Self::U32 | Self::F32 | Self::Ibm32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
            Self::Bcd { digits, skip_first } => (digits as usize + skip_first as usize).div_ceil(2),
        }
    }

    pub const fn kind(self) -> ValueKind {
        match self {
            Self::I8 => ValueKind::I8,
            Self::I16 => ValueKind::I16,
            Self::I24 | Self::I32 => ValueKind::I32,
            Self::I64 => ValueKind::I64,
            Self::U8 => ValueKind::U8,
            Self::U16 => ValueKind::U16,
            Self::U24 | Self::U32 => ValueKind::U32,
            Self::U64 | Self::Bcd { .. } => ValueKind::U64,
            Self::F32 => ValueKind::F32,
            Self::F64 | Self::Ibm32 => ValueKind::F64,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I8 => write!(f, "int8"),
            Self::I16 => write!(f, "int16"),
            Self::I24 => write!(f, "int24"),
            Self::I32 => write!(f, "int32"),
            Self::I64 => write!(f, "int64"),
            Self::U8 => write!(f, "uint8"),
            Self::U16 => write!(f, "uint16"),
            Self::U24 => write!(f, "uint24"),
            Self::U32 => write!(f, "uint32"),
            Self::U64 => write!(f, "uint64"),
            Self::F32 => write!(f, "float32"),
            Self::F64 => write!(f, "float64"),
            Self::Ibm32 => write!(f, "ibm32"),
            Self::Bcd { digits, .. } => write!(f, "bcd{digits}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths() {
        assert_eq!(FieldType::I24.width(), 3);
        assert_eq!(FieldType::Ibm32.width(), 4);
        assert_eq!(
            FieldType::Bcd {
                digits: 4,
                skip_first: false
            }
            .width(),
            2
        );
        assert_eq!(
            FieldType::Bcd {
                digits: 3,
                skip_first: true
            }
            .width(),
            2
        );
        assert_eq!(
            FieldType::Bcd {
                digits: 3,
                skip_first: false
            }
            .width(),
            2
        );
    }

    #[test]
    fn field_type_json_names() {
        let t: FieldType = serde_json::from_str("\"u24\"").unwrap();
        assert_eq!(t, FieldType::U24);
        let t: FieldType =
            serde_json::from_str(r#"{"bcd": {"digits": 2, "skip_first": false}}"#).unwrap();
        assert_eq!(
            t,
            FieldType::Bcd {
                digits: 2,
                skip_first: false
            }
        );
    }

    #[test]
    fn reversed_order() {
        assert_eq!(ByteOrder::Big.reversed(), ByteOrder::Little);
        assert_eq!(ByteOrder::native().reversed().reversed(), ByteOrder::native());
    }
}
