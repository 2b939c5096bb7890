//! Typed header values: [`FieldValue`] and [`HeaderMap`].

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::types::ValueKind;

/// Decoded header fields of one trace, keyed by field name.
pub type HeaderMap = BTreeMap<String, FieldValue>;

/// A single decoded header field.
///
/// Equality and ordering are total: values compare numerically after
/// widening (integers exactly, floats by IEEE order with NaN placed by
/// sign at either end), and numerically equal values of different kinds
/// are ordered by kind. `FieldValue` can therefore be used as a map key.
#[derive(Debug, Clone, Copy)]
pub enum FieldValue {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
}

enum Widened {
    Int(i128),
    Float(f64),
}

impl FieldValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::I8(_) => ValueKind::I8,
            Self::I16(_) => ValueKind::I16,
            Self::I32(_) => ValueKind::I32,
            Self::I64(_) => ValueKind::I64,
            Self::U8(_) => ValueKind::U8,
            Self::U16(_) => ValueKind::U16,
            Self::U32(_) => ValueKind::U32,
            Self::U64(_) => ValueKind::U64,
            Self::F32(_) => ValueKind::F32,
            Self::F64(_) => ValueKind::F64,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::F32(_) | Self::F64(_))
    }

    fn widen(&self) -> Widened {
        match *self {
            Self::I8(v) => Widened::Int(v as i128),
            Self::I16(v) => Widened::Int(v as i128),
            Self::I32(v) => Widened::Int(v as i128),
            Self::I64(v) => Widened::Int(v as i128),
            Self::U8(v) => Widened::Int(v as i128),
            Self::U16(v) => Widened::Int(v as i128),
            Self::U32(v) => Widened::Int(v as i128),
            Self::U64(v) => Widened::Int(v as i128),
            Self::F32(v) => Widened::Float(v as f64),
            Self::F64(v) => Widened::Float(v),
        }
    }

    /// The value as an `i128` if it is an integer, or an integral float
    /// inside the `i128` range.
    pub fn as_i128(&self) -> Option<i128> {
        match self.widen() {
            Widened::Int(v) => Some(v),
            Widened::Float(f) => {
                if f.is_finite() && f.fract() == 0.0 && f.abs() < 1.7e38 {
                    Some(f as i128)
                } else {
                    None
                }
            }
        }
    }

    /// The value as an `i64`, if it is integral and fits.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_i128().and_then(|v| i64::try_from(v).ok())
    }

    /// The value as a `u64`, if it is integral, non-negative and fits.
    pub fn as_u64(&self) -> Option<u64> {
        self.as_i128().and_then(|v| u64::try_from(v).ok())
    }

    /// The value as a `usize`, if it is integral, non-negative and fits.
    pub fn as_usize(&self) -> Option<usize> {
        self.as_i128().and_then(|v| usize::try_from(v).ok())
    }

    /// The value as an `f64` (possibly rounded for large 64-bit integers).
    pub fn as_f64(&self) -> f64 {
        match self.widen() {
            Widened::Int(v) => v as f64,
            Widened::Float(f) => f,
        }
    }

    /// `true` if the value is numerically zero.
    pub fn is_zero(&self) -> bool {
        match self.widen() {
            Widened::Int(v) => v == 0,
            Widened::Float(f) => f == 0.0,
        }
    }

    fn numeric_cmp(&self, other: &Self) -> Ordering {
        match (self.widen(), other.widen()) {
            (Widened::Int(a), Widened::Int(b)) => a.cmp(&b),
            (Widened::Float(a), Widened::Float(b)) => {
                a.partial_cmp(&b).unwrap_or_else(|| a.total_cmp(&b))
            }
            (Widened::Int(a), Widened::Float(b)) => cmp_int_float(a, b),
            (Widened::Float(a), Widened::Int(b)) => cmp_int_float(b, a).reverse(),
        }
    }
}

/// Exact comparison of an integer against a float.
fn cmp_int_float(i: i128, f: f64) -> Ordering {
    if f.is_nan() {
        return if f.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    // Every i128 lies strictly inside ±1.7e38.
    if f >= 1.7e38 {
        return Ordering::Less;
    }
    if f <= -1.7e38 {
        return Ordering::Greater;
    }
    let floor = f.floor();
    match i.cmp(&(floor as i128)) {
        Ordering::Equal if f > floor => Ordering::Less,
        ord => ord,
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FieldValue {}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FieldValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.numeric_cmp(other)
            .then_with(|| self.kind().cmp(&other.kind()))
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I8(v) => write!(f, "{v}"),
            Self::I16(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::U8(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
        }
    }
}

macro_rules! impl_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for FieldValue {
                fn from(v: $t) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_from!(
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn numeric_order_across_kinds() {
        assert!(FieldValue::I8(-1) < FieldValue::U64(0));
        assert!(FieldValue::U64(u64::MAX) > FieldValue::I64(i64::MAX));
        assert!(FieldValue::F64(2.5) > FieldValue::I32(2));
        assert!(FieldValue::F64(2.5) < FieldValue::I32(3));
        assert!(FieldValue::F32(-0.5) > FieldValue::I16(-1));
    }

    #[test]
    fn same_value_different_kind_is_distinct() {
        let a = FieldValue::I16(7);
        let b = FieldValue::I32(7);
        assert_ne!(a, b);
        assert!(a < b);
        assert_eq!(FieldValue::I32(7), FieldValue::from(7i32));
    }

    #[test]
    fn nan_is_ordered() {
        let nan = FieldValue::F64(f64::NAN);
        assert_eq!(nan, nan);
        assert!(nan > FieldValue::F64(f64::INFINITY));
        assert!(nan > FieldValue::U64(u64::MAX));
        let neg_nan = FieldValue::F64(-f64::NAN);
        assert!(neg_nan < FieldValue::I64(i64::MIN));
    }

    #[test]
    fn usable_as_set_key() {
        let set: BTreeSet<FieldValue> = [3i32, 1, 2, 3, 1]
            .into_iter()
            .map(FieldValue::from)
            .collect();
        let keys: Vec<_> = set.into_iter().collect();
        assert_eq!(
            keys,
            vec![FieldValue::I32(1), FieldValue::I32(2), FieldValue::I32(3)]
        );
    }

    #[test]
    fn conversions() {
        assert_eq!(FieldValue::U16(500).as_usize(), Some(500));
        assert_eq!(FieldValue::I32(-1).as_u64(), None);
        assert_eq!(FieldValue::F64(3.0).as_i64(), Some(3));
        assert_eq!(FieldValue::F64(3.5).as_i64(), None);
        assert!(FieldValue::F32(0.0).is_zero());
    }
}
