//! Primitive byte-level codecs.
//!
//! [`RawCodec`] reads and writes fixed-width integers and floats in a byte
//! order chosen once when a file's lead header is read. The free functions
//! cover the legacy encodings both formats rely on: packed BCD, IBM
//! System/360 hexadecimal floats, and a portable IEEE-754 path that builds
//! values from their sign/exponent/mantissa fields.

use crate::types::{ByteOrder, FieldType};
use crate::value::FieldValue;
use crate::{Result, SegError};

/// Largest magnitude an IBM float can hold: `(1 - 16^-6) * 16^63`.
pub const IBM_MAX: f64 = 7.237_005_145_973_116e75;

/// Decoded value of a BCD field whose nibbles are all `0xF`.
///
/// SEG-D uses that pattern to mean "see the extended field".
pub const BCD_UNDEFINED: u64 = u64::MAX;

/// Largest number of digits a BCD field may declare.
pub const BCD_MAX_DIGITS: usize = 19;

/// Byte-order-aware primitive reader/writer.
///
/// All offsets are relative to the start of `buf`; callers guarantee the
/// slice is long enough (schemas are validated against the block length).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawCodec {
    order: ByteOrder,
}

macro_rules! primitive {
    ($read:ident, $write:ident, $t:ty, $n:expr) => {
        pub fn $read(&self, buf: &[u8], offset: usize) -> $t {
            let mut bytes = [0u8; $n];
            bytes.copy_from_slice(&buf[offset..offset + $n]);
            match self.order {
                ByteOrder::Big => <$t>::from_be_bytes(bytes),
                ByteOrder::Little => <$t>::from_le_bytes(bytes),
            }
        }

        pub fn $write(&self, buf: &mut [u8], offset: usize, value: $t) {
            let bytes = match self.order {
                ByteOrder::Big => value.to_be_bytes(),
                ByteOrder::Little => value.to_le_bytes(),
            };
            buf[offset..offset + $n].copy_from_slice(&bytes);
        }
    };
}

impl RawCodec {
    pub const BIG: Self = Self::new(ByteOrder::Big);
    pub const LITTLE: Self = Self::new(ByteOrder::Little);

    pub const fn new(order: ByteOrder) -> Self {
        Self { order }
    }

    pub const fn order(&self) -> ByteOrder {
        self.order
    }

    pub fn read_u8(&self, buf: &[u8], offset: usize) -> u8 {
        buf[offset]
    }

    pub fn write_u8(&self, buf: &mut [u8], offset: usize, value: u8) {
        buf[offset] = value;
    }

    pub fn read_i8(&self, buf: &[u8], offset: usize) -> i8 {
        buf[offset] as i8
    }

    pub fn write_i8(&self, buf: &mut [u8], offset: usize, value: i8) {
        buf[offset] = value as u8;
    }

    primitive!(read_u16, write_u16, u16, 2);
    primitive!(read_i16, write_i16, i16, 2);
    primitive!(read_u32, write_u32, u32, 4);
    primitive!(read_i32, write_i32, i32, 4);
    primitive!(read_u64, write_u64, u64, 8);
    primitive!(read_i64, write_i64, i64, 8);
    primitive!(read_f32, write_f32, f32, 4);
    primitive!(read_f64, write_f64, f64, 8);

    pub fn read_u24(&self, buf: &[u8], offset: usize) -> u32 {
        let b = &buf[offset..offset + 3];
        match self.order {
            ByteOrder::Big => (b[0] as u32) << 16 | (b[1] as u32) << 8 | b[2] as u32,
            ByteOrder::Little => (b[2] as u32) << 16 | (b[1] as u32) << 8 | b[0] as u32,
        }
    }

    /// Write the low 24 bits of `value`.
    pub fn write_u24(&self, buf: &mut [u8], offset: usize, value: u32) {
        let hi = (value >> 16) as u8;
        let mid = (value >> 8) as u8;
        let lo = value as u8;
        let bytes = match self.order {
            ByteOrder::Big => [hi, mid, lo],
            ByteOrder::Little => [lo, mid, hi],
        };
        buf[offset..offset + 3].copy_from_slice(&bytes);
    }

    pub fn read_i24(&self, buf: &[u8], offset: usize) -> i32 {
        sign_extend_24(self.read_u24(buf, offset))
    }

    pub fn write_i24(&self, buf: &mut [u8], offset: usize, value: i32) {
        self.write_u24(buf, offset, value as u32 & 0x00FF_FFFF);
    }

    pub fn read_ibm(&self, buf: &[u8], offset: usize) -> f64 {
        ibm_to_f64(self.read_u32(buf, offset))
    }

    pub fn write_ibm(&self, buf: &mut [u8], offset: usize, value: f64) -> Result<()> {
        let bits = f64_to_ibm(value)?;
        self.write_u32(buf, offset, bits);
        Ok(())
    }

    /// Decode one field of type `ty` at `offset`.
    pub fn read_field(&self, buf: &[u8], offset: usize, ty: FieldType) -> Result<FieldValue> {
        let value = match ty {
            FieldType::I8 => FieldValue::I8(self.read_i8(buf, offset)),
            FieldType::I16 => FieldValue::I16(self.read_i16(buf, offset)),
            FieldType::I24 => FieldValue::I32(self.read_i24(buf, offset)),
            FieldType::I32 => FieldValue::I32(self.read_i32(buf, offset)),
            FieldType::I64 => FieldValue::I64(self.read_i64(buf, offset)),
            FieldType::U8 => FieldValue::U8(self.read_u8(buf, offset)),
            FieldType::U16 => FieldValue::U16(self.read_u16(buf, offset)),
            FieldType::U24 => FieldValue::U32(self.read_u24(buf, offset)),
            FieldType::U32 => FieldValue::U32(self.read_u32(buf, offset)),
            FieldType::U64 => FieldValue::U64(self.read_u64(buf, offset)),
            FieldType::F32 => FieldValue::F32(self.read_f32(buf, offset)),
            FieldType::F64 => FieldValue::F64(self.read_f64(buf, offset)),
            FieldType::Ibm32 => FieldValue::F64(self.read_ibm(buf, offset)),
            FieldType::Bcd { digits, skip_first } => FieldValue::U64(bcd_decode(
                &buf[offset..offset + ty.width()],
                digits as usize,
                skip_first,
            )?),
        };
        Ok(value)
    }

    /// Encode `value` as type `ty` at `offset`.
    ///
    /// Integers must fit the target exactly; a float is accepted for an
    /// integer field only when it is integral. Out-of-range values are a
    /// [`SegError::Range`], never wrapped.
    pub fn write_field(
        &self,
        buf: &mut [u8],
        offset: usize,
        ty: FieldType,
        value: &FieldValue,
    ) -> Result<()> {
        match ty {
            FieldType::I8 => self.write_i8(buf, offset, int_field(value, ty)?),
            FieldType::I16 => self.write_i16(buf, offset, int_field(value, ty)?),
            FieldType::I24 => {
                let v: i32 = int_field(value, ty)?;
                if !(-0x80_0000..=0x7F_FFFF).contains(&v) {
                    return Err(SegError::range(v, ty.to_string()));
                }
                self.write_i24(buf, offset, v);
            }
            FieldType::I32 => self.write_i32(buf, offset, int_field(value, ty)?),
            FieldType::I64 => self.write_i64(buf, offset, int_field(value, ty)?),
            FieldType::U8 => self.write_u8(buf, offset, int_field(value, ty)?),
            FieldType::U16 => self.write_u16(buf, offset, int_field(value, ty)?),
            FieldType::U24 => {
                let v: u32 = int_field(value, ty)?;
                if v > 0xFF_FFFF {
                    return Err(SegError::range(v, ty.to_string()));
                }
                self.write_u24(buf, offset, v);
            }
            FieldType::U32 => self.write_u32(buf, offset, int_field(value, ty)?),
            FieldType::U64 => self.write_u64(buf, offset, int_field(value, ty)?),
            FieldType::F32 => {
                let v = value.as_f64();
                let narrowed = v as f32;
                if v.is_finite() && !narrowed.is_finite() {
                    return Err(SegError::range(v, ty.to_string()));
                }
                self.write_f32(buf, offset, narrowed);
            }
            FieldType::F64 => self.write_f64(buf, offset, value.as_f64()),
            FieldType::Ibm32 => self.write_ibm(buf, offset, value.as_f64())?,
            FieldType::Bcd { digits, skip_first } => {
                let v = value
                    .as_u64()
                    .ok_or_else(|| SegError::range(value, ty.to_string()))?;
                bcd_encode(
                    v,
                    digits as usize,
                    skip_first,
                    &mut buf[offset..offset + ty.width()],
                )?;
            }
        }
        Ok(())
    }
}

fn int_field<T: TryFrom<i128>>(value: &FieldValue, ty: FieldType) -> Result<T> {
    value
        .as_i128()
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| SegError::range(value, ty.to_string()))
}

fn sign_extend_24(v: u32) -> i32 {
    ((v << 8) as i32) >> 8
}

/// Reverse the byte order of a value.
pub trait ByteSwap: Sized {
    fn byte_swap(self) -> Self;
}

macro_rules! byte_swap_int {
    ($($t:ty),*) => {
        $(
            impl ByteSwap for $t {
                fn byte_swap(self) -> Self {
                    self.swap_bytes()
                }
            }
        )*
    };
}

byte_swap_int!(u8, i8, u16, i16, u32, i32, u64, i64);

impl ByteSwap for f32 {
    fn byte_swap(self) -> Self {
        f32::from_bits(self.to_bits().swap_bytes())
    }
}

impl ByteSwap for f64 {
    fn byte_swap(self) -> Self {
        f64::from_bits(self.to_bits().swap_bytes())
    }
}

/// Reverse the three low bytes of a 24-bit value.
pub fn swap_u24(v: u32) -> u32 {
    (v & 0xFF) << 16 | (v & 0xFF00) | (v >> 16) & 0xFF
}

fn nibble(buf: &[u8], index: usize) -> u8 {
    let byte = buf[index / 2];
    if index % 2 == 0 { byte >> 4 } else { byte & 0x0F }
}

fn set_nibble(buf: &mut [u8], index: usize, value: u8) {
    let byte = &mut buf[index / 2];
    if index % 2 == 0 {
        *byte = (*byte & 0x0F) | (value << 4);
    } else {
        *byte = (*byte & 0xF0) | (value & 0x0F);
    }
}

/// Decode `digits` packed BCD digits from `buf`, most significant first.
///
/// With `skip_first` the first nibble of `buf[0]` is ignored. A field made
/// entirely of `0xF` nibbles decodes to [`BCD_UNDEFINED`].
pub fn bcd_decode(buf: &[u8], digits: usize, skip_first: bool) -> Result<u64> {
    let start = skip_first as usize;
    let needed = (start + digits).div_ceil(2);
    if buf.len() < needed {
        return Err(SegError::BlockTooShort {
            expected: needed,
            actual: buf.len(),
        });
    }
    if digits > 0 && (start..start + digits).all(|i| nibble(buf, i) == 0x0F) {
        return Ok(BCD_UNDEFINED);
    }

    let mut value: u64 = 0;
    for digit in 0..digits {
        let n = nibble(buf, start + digit);
        if n > 9 {
            return Err(SegError::InvalidBcd { nibble: n, digit });
        }
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(n as u64))
            .ok_or_else(|| SegError::range(format!("{digits}-digit BCD"), "u64"))?;
    }
    Ok(value)
}

/// Encode `value` as `digits` packed BCD digits into `buf`.
///
/// The inverse of [`bcd_decode`]: with `skip_first` the first nibble of
/// `buf[0]` is left untouched. [`BCD_UNDEFINED`] writes all-`0xF` nibbles.
pub fn bcd_encode(value: u64, digits: usize, skip_first: bool, buf: &mut [u8]) -> Result<()> {
    let start = skip_first as usize;
    let needed = (start + digits).div_ceil(2);
    if buf.len() < needed {
        return Err(SegError::BlockTooShort {
            expected: needed,
            actual: buf.len(),
        });
    }
    if value == BCD_UNDEFINED {
        for i in start..start + digits {
            set_nibble(buf, i, 0x0F);
        }
        return Ok(());
    }
    if digits < 20 && value >= 10u64.pow(digits as u32) {
        return Err(SegError::range(value, format!("{digits}-digit BCD")));
    }

    let packed = double_dabble(value);
    for digit in 0..digits {
        let shift = 4 * (digits - 1 - digit);
        let n = if shift < 128 {
            ((packed >> shift) & 0x0F) as u8
        } else {
            0
        };
        set_nibble(buf, start + digit, n);
    }
    Ok(())
}

/// Binary to packed BCD using the shift-and-add-3 algorithm.
///
/// The result holds one decimal digit per nibble, least significant digit
/// in the low nibble. Twenty digits cover every `u64`.
pub fn double_dabble(value: u64) -> u128 {
    let mut bcd: u128 = 0;
    for bit in (0..64).rev() {
        for digit in 0..20 {
            let shift = digit * 4;
            if (bcd >> shift) & 0x0F >= 5 {
                bcd += 3 << shift;
            }
        }
        bcd = (bcd << 1) | ((value >> bit) & 1) as u128;
    }
    bcd
}

/// `2^exp` built directly from its bit pattern.
fn pow2(exp: i32) -> f64 {
    debug_assert!((-1022..=1023).contains(&exp));
    f64::from_bits(((exp + 1023) as u64) << 52)
}

/// Decode an IBM hexadecimal float: `sign * fraction / 2^24 * 16^(exponent - 64)`.
pub fn ibm_to_f64(bits: u32) -> f64 {
    let fraction = bits & 0x00FF_FFFF;
    if fraction == 0 {
        return 0.0;
    }
    let exponent = ((bits >> 24) & 0x7F) as i32;
    let magnitude = fraction as f64 * pow2(4 * (exponent - 64) - 24);
    if bits & 0x8000_0000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Encode a value as an IBM hexadecimal float, rounding to nearest.
///
/// Values below the smallest normalised magnitude are denormalised and
/// eventually flush to zero; values above [`IBM_MAX`] and non-finite
/// values are a [`SegError::Range`].
pub fn f64_to_ibm(value: f64) -> Result<u32> {
    if !value.is_finite() {
        return Err(SegError::range(value, "ibm32"));
    }
    if value == 0.0 {
        return Ok(0);
    }
    let sign = if value < 0.0 { 0x8000_0000u32 } else { 0 };
    let bits = value.abs().to_bits();
    let biased = ((bits >> 52) & 0x7FF) as i32;
    if biased == 0 {
        // f64 subnormals are far below the IBM range.
        return Ok(0);
    }

    // |value| = m * 2^exp2 with m in [0.5, 1)
    let exp2 = biased - 1022;
    let mut exp16 = exp2.div_euclid(4) + (exp2.rem_euclid(4) != 0) as i32;
    let shift = (4 * exp16 - exp2) as u32;
    let full = (bits & ((1u64 << 52) - 1)) | (1u64 << 52);
    let drop = 29 + shift;
    let mut fraction = (full + (1u64 << (drop - 1))) >> drop;
    if fraction >= 1 << 24 {
        fraction >>= 4;
        exp16 += 1;
    }

    let mut biased16 = exp16 + 64;
    if biased16 > 127 {
        return Err(SegError::range(value, "ibm32"));
    }
    if biased16 < 0 {
        let denorm = (4 * -biased16) as u32;
        if denorm >= 24 {
            return Ok(0);
        }
        fraction = (fraction + (1u64 << (denorm - 1))) >> denorm;
        biased16 = 0;
        if fraction == 0 {
            return Ok(0);
        }
    }
    Ok(sign | (biased16 as u32) << 24 | fraction as u32)
}

/// Decode IEEE-754 binary32 bits without relying on the host float layout.
pub fn ieee32_from_bits_portable(bits: u32) -> f32 {
    let negative = bits >> 31 == 1;
    let exponent = ((bits >> 23) & 0xFF) as i32;
    let mantissa = (bits & 0x007F_FFFF) as f64;
    let magnitude = match exponent {
        0xFF if mantissa == 0.0 => f64::INFINITY,
        0xFF => f64::NAN,
        0 => mantissa * 2f64.powi(-149),
        _ => (mantissa + 8_388_608.0) * 2f64.powi(exponent - 150),
    };
    let value = magnitude as f32;
    if negative { -value } else { value }
}

/// Encode a binary32 value into IEEE-754 bits from its arithmetic value.
pub fn ieee32_to_bits_portable(value: f32) -> u32 {
    let sign = if value.is_sign_negative() { 1u32 << 31 } else { 0 };
    if value.is_nan() {
        return 0x7FC0_0000;
    }
    let a = (value as f64).abs();
    if a.is_infinite() {
        return sign | 0x7F80_0000;
    }
    if a == 0.0 {
        return sign;
    }
    let (m, e) = normalize(a);
    let biased = e + 127;
    if biased <= 0 {
        let mantissa = (a * 2f64.powi(149)).round() as u32;
        return sign | mantissa;
    }
    let mantissa = ((m - 1.0) * 8_388_608.0) as u32;
    sign | (biased as u32) << 23 | mantissa
}

/// Decode IEEE-754 binary64 bits without relying on the host float layout.
pub fn ieee64_from_bits_portable(bits: u64) -> f64 {
    let negative = bits >> 63 == 1;
    let exponent = ((bits >> 52) & 0x7FF) as i32;
    let raw = bits & 0x000F_FFFF_FFFF_FFFF;
    let mantissa = raw as f64;
    let magnitude = match exponent {
        0x7FF if raw == 0 => f64::INFINITY,
        0x7FF => f64::NAN,
        0 => mantissa * 2f64.powi(-1022) * 2f64.powi(-52),
        _ => (1.0 + mantissa * 2f64.powi(-52)) * 2f64.powi(exponent - 1023),
    };
    if negative { -magnitude } else { magnitude }
}

/// Encode a binary64 value into IEEE-754 bits from its arithmetic value.
pub fn ieee64_to_bits_portable(value: f64) -> u64 {
    let sign = if value.is_sign_negative() { 1u64 << 63 } else { 0 };
    if value.is_nan() {
        return 0x7FF8_0000_0000_0000;
    }
    let a = value.abs();
    if a.is_infinite() {
        return sign | 0x7FF0_0000_0000_0000;
    }
    if a == 0.0 {
        return sign;
    }
    let (m, e) = normalize(a);
    let biased = e + 1023;
    if biased <= 0 {
        let mantissa = (a * 2f64.powi(1022) * 2f64.powi(52)) as u64;
        return sign | mantissa;
    }
    let mantissa = ((m - 1.0) * 2f64.powi(52)) as u64;
    sign | (biased as u64) << 52 | mantissa
}

/// Split a positive finite value into `m * 2^e` with `m` in `[1, 2)`.
fn normalize(mut m: f64) -> (f64, i32) {
    let mut e = 0;
    while m >= 2.0 {
        m /= 2.0;
        e += 1;
    }
    while m < 1.0 {
        m *= 2.0;
        e -= 1;
    }
    (m, e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn integers_both_orders() {
        let mut buf = [0u8; 8];
        RawCodec::BIG.write_u32(&mut buf, 0, 0x0102_0304);
        assert_eq!(&buf[..4], &[1, 2, 3, 4]);
        assert_eq!(RawCodec::LITTLE.read_u32(&buf, 0), 0x0403_0201);

        RawCodec::LITTLE.write_i16(&mut buf, 4, -2);
        assert_eq!(&buf[4..6], &[0xFE, 0xFF]);
        assert_eq!(RawCodec::BIG.read_i16(&buf, 4), -257);
    }

    #[test]
    fn int24_sign_extension() {
        let mut buf = [0u8; 3];
        RawCodec::BIG.write_i24(&mut buf, 0, -2);
        assert_eq!(buf, [0xFF, 0xFF, 0xFE]);
        assert_eq!(RawCodec::BIG.read_i24(&buf, 0), -2);
        assert_eq!(RawCodec::LITTLE.read_u24(&buf, 0), 0xFE_FFFF);
        assert_eq!(swap_u24(0x0012_3456), 0x0056_3412);
    }

    #[test]
    fn bcd_known_values() {
        assert_eq!(bcd_decode(&[0x12, 0x34], 4, false).unwrap(), 1234);
        // 0x4x: the high nibble belongs to another field
        assert_eq!(bcd_decode(&[0x41, 0x23], 3, true).unwrap(), 123);
        assert_eq!(bcd_decode(&[0xFF, 0xFF], 4, false).unwrap(), BCD_UNDEFINED);
        assert!(matches!(
            bcd_decode(&[0x1A], 2, false),
            Err(SegError::InvalidBcd { nibble: 0xA, digit: 1 })
        ));
    }

    #[test]
    fn bcd_encode_preserves_skipped_nibble() {
        let mut buf = [0x40, 0x00];
        bcd_encode(123, 3, true, &mut buf).unwrap();
        assert_eq!(buf, [0x41, 0x23]);
        assert!(bcd_encode(1000, 3, false, &mut buf).unwrap_err().is_range());
    }

    #[test]
    fn double_dabble_digits() {
        assert_eq!(double_dabble(0), 0);
        assert_eq!(double_dabble(9), 0x9);
        assert_eq!(double_dabble(1234), 0x1234);
        assert_eq!(
            double_dabble(u64::MAX),
            0x1844_6744_0737_0955_1615
        );
    }

    #[test]
    fn ibm_known_values() {
        // Classic example: -118.625 = 0xC276A000
        assert_eq!(ibm_to_f64(0xC276_A000), -118.625);
        assert_eq!(f64_to_ibm(-118.625).unwrap(), 0xC276_A000);
        assert_eq!(f64_to_ibm(1.0).unwrap(), 0x4110_0000);
        assert_eq!(ibm_to_f64(0x4110_0000), 1.0);
        assert_eq!(f64_to_ibm(0.0).unwrap(), 0);
        assert!(f64_to_ibm(f64::NAN).unwrap_err().is_range());
        assert!(f64_to_ibm(1e80).unwrap_err().is_range());
    }

    #[test]
    fn ibm_unnormalised_input_roundtrips() {
        let v = ibm_to_f64(0x4000_0001);
        let back = ibm_to_f64(f64_to_ibm(v).unwrap());
        assert_eq!(back, v);
        let tiny = ibm_to_f64(0x0000_0001);
        assert_eq!(ibm_to_f64(f64_to_ibm(tiny).unwrap()), tiny);
    }

    #[test]
    fn field_range_is_checked() {
        let mut buf = [0u8; 4];
        let err = RawCodec::BIG
            .write_field(&mut buf, 0, FieldType::I16, &FieldValue::I32(40_000))
            .unwrap_err();
        assert!(err.is_range());
        assert!(RawCodec::BIG
            .write_field(&mut buf, 0, FieldType::U8, &FieldValue::F64(2.5))
            .is_err());
        RawCodec::BIG
            .write_field(&mut buf, 0, FieldType::U24, &FieldValue::U8(7))
            .unwrap();
        assert_eq!(
            RawCodec::BIG.read_field(&buf, 0, FieldType::U24).unwrap(),
            FieldValue::U32(7)
        );
    }

    proptest! {
        #[test]
        fn bcd_roundtrip(value in 0u64..100_000_000, skip in any::<bool>()) {
            let mut buf = [0u8; 5];
            bcd_encode(value, 8, skip, &mut buf).unwrap();
            prop_assert_eq!(bcd_decode(&buf, 8, skip).unwrap(), value);
        }

        #[test]
        fn swap_involution(a in any::<u16>(), b in any::<i32>(), c in any::<u64>(), d in 0u32..0x100_0000) {
            prop_assert_eq!(a.byte_swap().byte_swap(), a);
            prop_assert_eq!(b.byte_swap().byte_swap(), b);
            prop_assert_eq!(c.byte_swap().byte_swap(), c);
            prop_assert_eq!(swap_u24(swap_u24(d)), d);
        }

        #[test]
        fn ibm_roundtrip(bits in any::<u32>()) {
            let v = ibm_to_f64(bits);
            prop_assert_eq!(ibm_to_f64(f64_to_ibm(v).unwrap()), v);
        }

        #[test]
        fn portable_ieee32_matches_native(bits in any::<u32>()) {
            let native = f32::from_bits(bits);
            prop_assume!(native.is_normal() || native == 0.0);
            prop_assert_eq!(ieee32_from_bits_portable(bits).to_bits(), bits);
            prop_assert_eq!(ieee32_to_bits_portable(native), bits);
        }

        #[test]
        fn portable_ieee64_matches_native(bits in any::<u64>()) {
            let native = f64::from_bits(bits);
            prop_assume!(native.is_normal() || native == 0.0);
            prop_assert_eq!(ieee64_from_bits_portable(bits).to_bits(), bits);
            prop_assert_eq!(ieee64_to_bits_portable(native), bits);
        }
    }
}
