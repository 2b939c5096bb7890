//! Sample codecs keyed by format code.
//!
//! [`SampleCodec::select`] resolves a [`SampleFormat`] and byte order into
//! a pair of function pointers once, when a file is opened; per-trace
//! decode and encode then run without re-dispatching on the format.
//!
//! Every decoder produces `f64`. Encoders round to nearest and reject
//! values the target cannot hold with [`SegError::Range`] rather than
//! wrapping them.
//!
//! The SEG-D exponent formats pack several samples, or a sign, exponent
//! and fraction, below byte boundaries:
//!
//! | code | layout                                                        |
//! |------|---------------------------------------------------------------|
//! | 8015 | 4 samples in 10 bytes: 4 exponent nibbles, 4 `S.Q15` words     |
//! | 8022 | `S C2 C1 C0 Q1..Q4`, value `S.Q * 4^C`                         |
//! | 8024 | `S C2 C1 C0 Q1..Q12`, value `S.Q * 4^C`                        |
//! | 8042 | `S C1 C0 Q1..Q5`, value `S.Q * 16^C`                           |
//! | 8044 | `S C1 C0 Q1..Q13`, value `S.Q * 16^C`                          |

use std::fmt;

use crate::raw::{f64_to_ibm, ibm_to_f64};
use crate::types::ByteOrder;
use crate::{Result, SegError};

/// On-disk encoding of trace samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    /// IBM hexadecimal float (SEG-Y 1, SEG-D 8048).
    Ibm32,
    Int8,
    Int16,
    Int24,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt24,
    UInt32,
    UInt64,
    Ieee32,
    Ieee64,
    /// 20-bit binary, 4-sample groups (SEG-D 8015).
    Packed20,
    /// 8-bit quaternary exponent (SEG-D 8022).
    Quaternary8,
    /// 16-bit quaternary exponent (SEG-D 8024).
    Quaternary16,
    /// 8-bit hexadecimal exponent (SEG-D 8042).
    Hexadecimal8,
    /// 16-bit hexadecimal exponent (SEG-D 8044).
    Hexadecimal16,
}

impl SampleFormat {
    /// Convert a SEG-Y binary header format code.
    pub fn from_segy_code(code: i16) -> Result<Self> {
        match code {
            1 => Ok(Self::Ibm32),
            2 => Ok(Self::Int32),
            3 => Ok(Self::Int16),
            5 => Ok(Self::Ieee32),
            6 => Ok(Self::Ieee64),
            7 => Ok(Self::Int24),
            8 => Ok(Self::Int8),
            9 => Ok(Self::Int64),
            10 => Ok(Self::UInt32),
            11 => Ok(Self::UInt16),
            12 => Ok(Self::UInt64),
            15 => Ok(Self::UInt24),
            16 => Ok(Self::UInt8),
            _ => Err(SegError::UnsupportedFormat(code as i32)),
        }
    }

    /// The SEG-Y format code, if the format exists in SEG-Y.
    pub fn segy_code(self) -> Option<i16> {
        match self {
            Self::Ibm32 => Some(1),
            Self::Int32 => Some(2),
            Self::Int16 => Some(3),
            Self::Ieee32 => Some(5),
            Self::Ieee64 => Some(6),
            Self::Int24 => Some(7),
            Self::Int8 => Some(8),
            Self::Int64 => Some(9),
            Self::UInt32 => Some(10),
            Self::UInt16 => Some(11),
            Self::UInt64 => Some(12),
            Self::UInt24 => Some(15),
            Self::UInt8 => Some(16),
            _ => None,
        }
    }

    /// Convert a SEG-D format code (the decoded BCD value) into a format and
    /// the byte order of its samples. Codes 9036-9080 are the byte-swapped
    /// counterparts of 8036-8080.
    pub fn from_segd_code(code: u16) -> Result<(Self, ByteOrder)> {
        let big = ByteOrder::Big;
        let little = ByteOrder::Little;
        match code {
            8015 => Ok((Self::Packed20, big)),
            8022 => Ok((Self::Quaternary8, big)),
            8024 => Ok((Self::Quaternary16, big)),
            8036 => Ok((Self::Int24, big)),
            8038 => Ok((Self::Int32, big)),
            8042 => Ok((Self::Hexadecimal8, big)),
            8044 => Ok((Self::Hexadecimal16, big)),
            8048 => Ok((Self::Ibm32, big)),
            8058 => Ok((Self::Ieee32, big)),
            8080 => Ok((Self::Ieee64, big)),
            9036 => Ok((Self::Int24, little)),
            9038 => Ok((Self::Int32, little)),
            9058 => Ok((Self::Ieee32, little)),
            9080 => Ok((Self::Ieee64, little)),
            _ => Err(SegError::UnsupportedFormat(code as i32)),
        }
    }

    /// The SEG-D format code for this format stored in `order`.
    pub fn segd_code(self, order: ByteOrder) -> Option<u16> {
        match (self, order) {
            (Self::Packed20, _) => Some(8015),
            (Self::Quaternary8, _) => Some(8022),
            (Self::Quaternary16, _) => Some(8024),
            (Self::Hexadecimal8, _) => Some(8042),
            (Self::Hexadecimal16, _) => Some(8044),
            (Self::Ibm32, ByteOrder::Big) => Some(8048),
            (Self::Int24, ByteOrder::Big) => Some(8036),
            (Self::Int32, ByteOrder::Big) => Some(8038),
            (Self::Ieee32, ByteOrder::Big) => Some(8058),
            (Self::Ieee64, ByteOrder::Big) => Some(8080),
            (Self::Int24, ByteOrder::Little) => Some(9036),
            (Self::Int32, ByteOrder::Little) => Some(9038),
            (Self::Ieee32, ByteOrder::Little) => Some(9058),
            (Self::Ieee64, ByteOrder::Little) => Some(9080),
            _ => None,
        }
    }

    /// `(samples, bytes)` of one encoded unit.
    pub const fn group(self) -> (usize, usize) {
        match self {
            Self::Int8 | Self::UInt8 | Self::Quaternary8 | Self::Hexadecimal8 => (1, 1),
            Self::Int16 | Self::UInt16 | Self::Quaternary16 | Self::Hexadecimal16 => (1, 2),
            Self::Int24 | Self::UInt24 => (1, 3),
            Self::Int32 | Self::UInt32 | Self::Ieee32 | Self::Ibm32 => (1, 4),
            Self::Int64 | Self::UInt64 | Self::Ieee64 => (1, 8),
            Self::Packed20 => (4, 10),
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ibm32 => "IBM32",
            Self::Int8 => "INT8",
            Self::Int16 => "INT16",
            Self::Int24 => "INT24",
            Self::Int32 => "INT32",
            Self::Int64 => "INT64",
            Self::UInt8 => "UINT8",
            Self::UInt16 => "UINT16",
            Self::UInt24 => "UINT24",
            Self::UInt32 => "UINT32",
            Self::UInt64 => "UINT64",
            Self::Ieee32 => "FLOAT32",
            Self::Ieee64 => "FLOAT64",
            Self::Packed20 => "PACKED20",
            Self::Quaternary8 => "QUAT8",
            Self::Quaternary16 => "QUAT16",
            Self::Hexadecimal8 => "HEX8",
            Self::Hexadecimal16 => "HEX16",
        };
        f.write_str(name)
    }
}

type DecodeFn = fn(&[u8], ByteOrder, &mut Vec<f64>);
type EncodeFn = fn(&[f64], ByteOrder, &mut [u8]) -> Result<()>;

/// A resolved sample decoder/encoder for one format and byte order.
#[derive(Clone, Copy)]
pub struct SampleCodec {
    format: SampleFormat,
    order: ByteOrder,
    group_samples: usize,
    group_bytes: usize,
    decode_fn: DecodeFn,
    encode_fn: EncodeFn,
}

impl fmt::Debug for SampleCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleCodec")
            .field("format", &self.format)
            .field("order", &self.order)
            .field("group_samples", &self.group_samples)
            .field("group_bytes", &self.group_bytes)
            .finish()
    }
}

impl SampleCodec {
    pub fn select(format: SampleFormat, order: ByteOrder) -> Self {
        let (decode_fn, encode_fn): (DecodeFn, EncodeFn) = match format {
            SampleFormat::Ibm32 => (decode_ibm, encode_ibm),
            SampleFormat::Int8 => (decode_i8, encode_i8),
            SampleFormat::Int16 => (decode_i16, encode_i16),
            SampleFormat::Int24 => (decode_i24, encode_i24),
            SampleFormat::Int32 => (decode_i32, encode_i32),
            SampleFormat::Int64 => (decode_i64, encode_i64),
            SampleFormat::UInt8 => (decode_u8, encode_u8),
            SampleFormat::UInt16 => (decode_u16, encode_u16),
            SampleFormat::UInt24 => (decode_u24, encode_u24),
            SampleFormat::UInt32 => (decode_u32, encode_u32),
            SampleFormat::UInt64 => (decode_u64, encode_u64),
            SampleFormat::Ieee32 => (decode_f32, encode_f32),
            SampleFormat::Ieee64 => (decode_f64, encode_f64),
            SampleFormat::Packed20 => (decode_packed20, encode_packed20),
            SampleFormat::Quaternary8 => (decode_quat8, encode_quat8),
            SampleFormat::Quaternary16 => (decode_quat16, encode_quat16),
            SampleFormat::Hexadecimal8 => (decode_hex8, encode_hex8),
            SampleFormat::Hexadecimal16 => (decode_hex16, encode_hex16),
        };
        let (group_samples, group_bytes) = format.group();
        Self {
            format,
            order,
            group_samples,
            group_bytes,
            decode_fn,
            encode_fn,
        }
    }

    /// Select the codec for a SEG-Y format code.
    pub fn for_segy_code(code: i16, order: ByteOrder) -> Result<Self> {
        Ok(Self::select(SampleFormat::from_segy_code(code)?, order))
    }

    /// Select the codec for a SEG-D format code.
    pub fn for_segd_code(code: u16) -> Result<Self> {
        let (format, order) = SampleFormat::from_segd_code(code)?;
        Ok(Self::select(format, order))
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    pub fn group_samples(&self) -> usize {
        self.group_samples
    }

    pub fn group_bytes(&self) -> usize {
        self.group_bytes
    }

    /// Encoded size of `samples` samples.
    ///
    /// A sample count that does not fill whole groups is a
    /// [`SegError::PartialGroup`].
    pub fn byte_len(&self, samples: usize) -> Result<usize> {
        if !samples.is_multiple_of(self.group_samples) {
            return Err(SegError::PartialGroup {
                samples,
                group: self.group_samples,
            });
        }
        Ok(samples / self.group_samples * self.group_bytes)
    }

    /// Decode `samples` samples from the start of `bytes`.
    pub fn decode(&self, bytes: &[u8], samples: usize) -> Result<Vec<f64>> {
        let mut out = Vec::with_capacity(samples);
        self.decode_into(bytes, samples, &mut out)?;
        Ok(out)
    }

    /// Decode `samples` samples from the start of `bytes`, appending to `out`.
    pub fn decode_into(&self, bytes: &[u8], samples: usize, out: &mut Vec<f64>) -> Result<()> {
        let len = self.byte_len(samples)?;
        if bytes.len() < len {
            return Err(SegError::BlockTooShort {
                expected: len,
                actual: bytes.len(),
            });
        }
        (self.decode_fn)(&bytes[..len], self.order, out);
        Ok(())
    }

    /// Encode `samples` into `out`, replacing its contents.
    pub fn encode(&self, samples: &[f64], out: &mut Vec<u8>) -> Result<()> {
        let len = self.byte_len(samples.len())?;
        out.clear();
        out.resize(len, 0);
        (self.encode_fn)(samples, self.order, out)
    }
}

macro_rules! int_codec {
    ($decode:ident, $encode:ident, $t:ty, $n:expr, $min:expr, $max_excl:expr) => {
        fn $decode(bytes: &[u8], order: ByteOrder, out: &mut Vec<f64>) {
            out.extend(bytes.chunks_exact($n).map(|c| {
                let mut b = [0u8; $n];
                b.copy_from_slice(c);
                let v = match order {
                    ByteOrder::Big => <$t>::from_be_bytes(b),
                    ByteOrder::Little => <$t>::from_le_bytes(b),
                };
                v as f64
            }));
        }

        fn $encode(samples: &[f64], order: ByteOrder, out: &mut [u8]) -> Result<()> {
            for (&s, slot) in samples.iter().zip(out.chunks_exact_mut($n)) {
                let v = round_in_range(s, $min, $max_excl, stringify!($t))? as $t;
                let b = match order {
                    ByteOrder::Big => v.to_be_bytes(),
                    ByteOrder::Little => v.to_le_bytes(),
                };
                slot.copy_from_slice(&b);
            }
            Ok(())
        }
    };
}

/// Round `v` to nearest and check `min <= v < max_excl`.
fn round_in_range(v: f64, min: f64, max_excl: f64, target: &str) -> Result<f64> {
    let r = v.round();
    if !r.is_finite() || r < min || r >= max_excl {
        return Err(SegError::range(v, target));
    }
    Ok(r)
}

const TWO_63: f64 = 9_223_372_036_854_775_808.0;
const TWO_64: f64 = 18_446_744_073_709_551_616.0;

int_codec!(decode_i8, encode_i8, i8, 1, -128.0, 128.0);
int_codec!(decode_i16, encode_i16, i16, 2, -32_768.0, 32_768.0);
int_codec!(decode_i32, encode_i32, i32, 4, -2_147_483_648.0, 2_147_483_648.0);
int_codec!(decode_i64, encode_i64, i64, 8, -TWO_63, TWO_63);
int_codec!(decode_u8, encode_u8, u8, 1, 0.0, 256.0);
int_codec!(decode_u16, encode_u16, u16, 2, 0.0, 65_536.0);
int_codec!(decode_u32, encode_u32, u32, 4, 0.0, 4_294_967_296.0);
int_codec!(decode_u64, encode_u64, u64, 8, 0.0, TWO_64);

fn read3(c: &[u8], order: ByteOrder) -> u32 {
    match order {
        ByteOrder::Big => (c[0] as u32) << 16 | (c[1] as u32) << 8 | c[2] as u32,
        ByteOrder::Little => (c[2] as u32) << 16 | (c[1] as u32) << 8 | c[0] as u32,
    }
}

fn write3(slot: &mut [u8], v: u32, order: ByteOrder) {
    let b = [(v >> 16) as u8, (v >> 8) as u8, v as u8];
    match order {
        ByteOrder::Big => slot.copy_from_slice(&b),
        ByteOrder::Little => slot.copy_from_slice(&[b[2], b[1], b[0]]),
    }
}

fn decode_i24(bytes: &[u8], order: ByteOrder, out: &mut Vec<f64>) {
    out.extend(
        bytes
            .chunks_exact(3)
            .map(|c| (((read3(c, order) << 8) as i32) >> 8) as f64),
    );
}

fn encode_i24(samples: &[f64], order: ByteOrder, out: &mut [u8]) -> Result<()> {
    for (&s, slot) in samples.iter().zip(out.chunks_exact_mut(3)) {
        let v = round_in_range(s, -8_388_608.0, 8_388_608.0, "int24")? as i32;
        write3(slot, v as u32 & 0x00FF_FFFF, order);
    }
    Ok(())
}

fn decode_u24(bytes: &[u8], order: ByteOrder, out: &mut Vec<f64>) {
    out.extend(bytes.chunks_exact(3).map(|c| read3(c, order) as f64));
}

fn encode_u24(samples: &[f64], order: ByteOrder, out: &mut [u8]) -> Result<()> {
    for (&s, slot) in samples.iter().zip(out.chunks_exact_mut(3)) {
        let v = round_in_range(s, 0.0, 16_777_216.0, "uint24")? as u32;
        write3(slot, v, order);
    }
    Ok(())
}

fn decode_f32(bytes: &[u8], order: ByteOrder, out: &mut Vec<f64>) {
    out.extend(bytes.chunks_exact(4).map(|c| {
        let b = [c[0], c[1], c[2], c[3]];
        let v = match order {
            ByteOrder::Big => f32::from_be_bytes(b),
            ByteOrder::Little => f32::from_le_bytes(b),
        };
        v as f64
    }));
}

fn encode_f32(samples: &[f64], order: ByteOrder, out: &mut [u8]) -> Result<()> {
    for (&s, slot) in samples.iter().zip(out.chunks_exact_mut(4)) {
        let v = s as f32;
        if s.is_finite() && !v.is_finite() {
            return Err(SegError::range(s, "float32"));
        }
        let b = match order {
            ByteOrder::Big => v.to_be_bytes(),
            ByteOrder::Little => v.to_le_bytes(),
        };
        slot.copy_from_slice(&b);
    }
    Ok(())
}

fn decode_f64(bytes: &[u8], order: ByteOrder, out: &mut Vec<f64>) {
    out.extend(bytes.chunks_exact(8).map(|c| {
        let mut b = [0u8; 8];
        b.copy_from_slice(c);
        match order {
            ByteOrder::Big => f64::from_be_bytes(b),
            ByteOrder::Little => f64::from_le_bytes(b),
        }
    }));
}

fn encode_f64(samples: &[f64], order: ByteOrder, out: &mut [u8]) -> Result<()> {
    for (&s, slot) in samples.iter().zip(out.chunks_exact_mut(8)) {
        let b = match order {
            ByteOrder::Big => s.to_be_bytes(),
            ByteOrder::Little => s.to_le_bytes(),
        };
        slot.copy_from_slice(&b);
    }
    Ok(())
}

fn decode_ibm(bytes: &[u8], order: ByteOrder, out: &mut Vec<f64>) {
    out.extend(bytes.chunks_exact(4).map(|c| {
        let b = [c[0], c[1], c[2], c[3]];
        let bits = match order {
            ByteOrder::Big => u32::from_be_bytes(b),
            ByteOrder::Little => u32::from_le_bytes(b),
        };
        ibm_to_f64(bits)
    }));
}

fn encode_ibm(samples: &[f64], order: ByteOrder, out: &mut [u8]) -> Result<()> {
    for (&s, slot) in samples.iter().zip(out.chunks_exact_mut(4)) {
        let bits = f64_to_ibm(s)?;
        let b = match order {
            ByteOrder::Big => bits.to_be_bytes(),
            ByteOrder::Little => bits.to_le_bytes(),
        };
        slot.copy_from_slice(&b);
    }
    Ok(())
}

/// Exact `2^exp` for the small exponents the packed formats use.
fn scale(exp: i32) -> f64 {
    2f64.powi(exp)
}

/// Interpret the low `bits` bits of `raw` as two's complement.
fn signed(raw: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((raw << shift) as i32) >> shift
}

/// Split `v` into a `frac_bits`-bit signed fraction and the smallest
/// exponent `c <= max_exp` (base `2^exp_step`) that holds it.
///
/// Returns `(c, m)` with `v ≈ m * 2^(c * exp_step - frac_bits)`; values
/// produced by the matching decoder are reproduced exactly.
fn pack_exponent(
    v: f64,
    frac_bits: u32,
    exp_step: i32,
    max_exp: u32,
    target: &str,
) -> Result<(u32, i32)> {
    if !v.is_finite() {
        return Err(SegError::range(v, target));
    }
    let lo = -(1i64 << frac_bits) as f64;
    let hi = ((1i64 << frac_bits) - 1) as f64;
    for c in 0..=max_exp {
        let m = (v * scale(frac_bits as i32 - c as i32 * exp_step)).round();
        if m >= lo && m <= hi {
            return Ok((c, m as i32));
        }
    }
    Err(SegError::range(v, target))
}

fn decode_packed20(bytes: &[u8], _order: ByteOrder, out: &mut Vec<f64>) {
    for group in bytes.chunks_exact(10) {
        let exps = [group[0] >> 4, group[0] & 0x0F, group[1] >> 4, group[1] & 0x0F];
        for (i, &c) in exps.iter().enumerate() {
            let m = i16::from_be_bytes([group[2 + 2 * i], group[3 + 2 * i]]);
            out.push(m as f64 * scale(c as i32 - 15));
        }
    }
}

fn encode_packed20(samples: &[f64], _order: ByteOrder, out: &mut [u8]) -> Result<()> {
    for (chunk, group) in samples.chunks_exact(4).zip(out.chunks_exact_mut(10)) {
        let mut exps = [0u8; 4];
        for (i, &s) in chunk.iter().enumerate() {
            let (c, m) = pack_exponent(s, 15, 1, 15, "packed20")?;
            exps[i] = c as u8;
            group[2 + 2 * i..4 + 2 * i].copy_from_slice(&(m as i16).to_be_bytes());
        }
        group[0] = exps[0] << 4 | exps[1];
        group[1] = exps[2] << 4 | exps[3];
    }
    Ok(())
}

fn decode_quat8(bytes: &[u8], _order: ByteOrder, out: &mut Vec<f64>) {
    out.extend(bytes.iter().map(|&b| {
        let c = ((b >> 4) & 0x07) as i32;
        let raw = ((b >> 7) as u32) << 4 | (b & 0x0F) as u32;
        signed(raw, 5) as f64 * scale(2 * c - 4)
    }));
}

fn encode_quat8(samples: &[f64], _order: ByteOrder, out: &mut [u8]) -> Result<()> {
    for (&s, slot) in samples.iter().zip(out.iter_mut()) {
        let (c, m) = pack_exponent(s, 4, 2, 7, "quat8")?;
        let raw = m as u32 & 0x1F;
        *slot = ((raw >> 4) << 7 | c << 4 | (raw & 0x0F)) as u8;
    }
    Ok(())
}

fn read16(c: &[u8], order: ByteOrder) -> u16 {
    match order {
        ByteOrder::Big => u16::from_be_bytes([c[0], c[1]]),
        ByteOrder::Little => u16::from_le_bytes([c[0], c[1]]),
    }
}

fn write16(slot: &mut [u8], v: u16, order: ByteOrder) {
    let b = match order {
        ByteOrder::Big => v.to_be_bytes(),
        ByteOrder::Little => v.to_le_bytes(),
    };
    slot.copy_from_slice(&b);
}

fn decode_quat16(bytes: &[u8], order: ByteOrder, out: &mut Vec<f64>) {
    out.extend(bytes.chunks_exact(2).map(|c| {
        let w = read16(c, order) as u32;
        let exp = ((w >> 12) & 0x07) as i32;
        let raw = (w >> 15) << 12 | (w & 0x0FFF);
        signed(raw, 13) as f64 * scale(2 * exp - 12)
    }));
}

fn encode_quat16(samples: &[f64], order: ByteOrder, out: &mut [u8]) -> Result<()> {
    for (&s, slot) in samples.iter().zip(out.chunks_exact_mut(2)) {
        let (c, m) = pack_exponent(s, 12, 2, 7, "quat16")?;
        let raw = m as u32 & 0x1FFF;
        let w = (raw >> 12) << 15 | c << 12 | (raw & 0x0FFF);
        write16(slot, w as u16, order);
    }
    Ok(())
}

fn decode_hex8(bytes: &[u8], _order: ByteOrder, out: &mut Vec<f64>) {
    out.extend(bytes.iter().map(|&b| {
        let c = ((b >> 5) & 0x03) as i32;
        let raw = ((b >> 7) as u32) << 5 | (b & 0x1F) as u32;
        signed(raw, 6) as f64 * scale(4 * c - 5)
    }));
}

fn encode_hex8(samples: &[f64], _order: ByteOrder, out: &mut [u8]) -> Result<()> {
    for (&s, slot) in samples.iter().zip(out.iter_mut()) {
        let (c, m) = pack_exponent(s, 5, 4, 3, "hex8")?;
        let raw = m as u32 & 0x3F;
        *slot = ((raw >> 5) << 7 | c << 5 | (raw & 0x1F)) as u8;
    }
    Ok(())
}

fn decode_hex16(bytes: &[u8], order: ByteOrder, out: &mut Vec<f64>) {
    out.extend(bytes.chunks_exact(2).map(|c| {
        let w = read16(c, order) as u32;
        let exp = ((w >> 13) & 0x03) as i32;
        let raw = (w >> 15) << 13 | (w & 0x1FFF);
        signed(raw, 14) as f64 * scale(4 * exp - 13)
    }));
}

fn encode_hex16(samples: &[f64], order: ByteOrder, out: &mut [u8]) -> Result<()> {
    for (&s, slot) in samples.iter().zip(out.chunks_exact_mut(2)) {
        let (c, m) = pack_exponent(s, 13, 4, 3, "hex16")?;
        let raw = m as u32 & 0x3FFF;
        let w = (raw >> 13) << 15 | c << 13 | (raw & 0x1FFF);
        write16(slot, w as u16, order);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ALL: [SampleFormat; 18] = [
        SampleFormat::Ibm32,
        SampleFormat::Int8,
        SampleFormat::Int16,
        SampleFormat::Int24,
        SampleFormat::Int32,
        SampleFormat::Int64,
        SampleFormat::UInt8,
        SampleFormat::UInt16,
        SampleFormat::UInt24,
        SampleFormat::UInt32,
        SampleFormat::UInt64,
        SampleFormat::Ieee32,
        SampleFormat::Ieee64,
        SampleFormat::Packed20,
        SampleFormat::Quaternary8,
        SampleFormat::Quaternary16,
        SampleFormat::Hexadecimal8,
        SampleFormat::Hexadecimal16,
    ];

    #[test]
    fn small_integers_survive_every_format() {
        let samples = [0.0, 1.0, 2.0, 3.0, 7.0, 4.0, 5.0, 6.0];
        for format in ALL {
            for order in [ByteOrder::Big, ByteOrder::Little] {
                let codec = SampleCodec::select(format, order);
                let mut bytes = Vec::new();
                codec.encode(&samples, &mut bytes).unwrap();
                assert_eq!(bytes.len(), codec.byte_len(samples.len()).unwrap());
                let back = codec.decode(&bytes, samples.len()).unwrap();
                assert_eq!(back, samples, "{format} {order}");
            }
        }
    }

    #[test]
    fn unknown_codes_rejected() {
        assert!(matches!(
            SampleFormat::from_segy_code(4),
            Err(SegError::UnsupportedFormat(4))
        ));
        assert!(SampleFormat::from_segd_code(8017).is_err());
        assert!(SampleCodec::for_segy_code(42, ByteOrder::Big).is_err());
    }

    #[test]
    fn segy_codes_are_consistent() {
        for code in [1i16, 2, 3, 5, 6, 7, 8, 9, 10, 11, 12, 15, 16] {
            let f = SampleFormat::from_segy_code(code).unwrap();
            assert_eq!(f.segy_code(), Some(code));
        }
        for code in [8015u16, 8022, 8024, 8036, 8038, 8042, 8044, 8048, 8058, 8080, 9036, 9038, 9058, 9080] {
            let (f, order) = SampleFormat::from_segd_code(code).unwrap();
            assert_eq!(f.segd_code(order), Some(code));
        }
    }

    #[test]
    fn narrow_integers_do_not_wrap() {
        let codec = SampleCodec::select(SampleFormat::Int16, ByteOrder::Big);
        let mut out = Vec::new();
        assert!(codec.encode(&[32_768.0], &mut out).unwrap_err().is_range());
        assert!(codec.encode(&[-32_769.0], &mut out).unwrap_err().is_range());
        assert!(codec.encode(&[f64::NAN], &mut out).unwrap_err().is_range());
        codec.encode(&[-32_768.4], &mut out).unwrap();
        assert_eq!(out, (-32_768i16).to_be_bytes());

        let u = SampleCodec::select(SampleFormat::UInt8, ByteOrder::Big);
        assert!(u.encode(&[-1.0], &mut out).unwrap_err().is_range());
        let i24 = SampleCodec::select(SampleFormat::Int24, ByteOrder::Big);
        assert!(i24.encode(&[8_388_608.0], &mut out).unwrap_err().is_range());
    }

    #[test]
    fn rounding_to_nearest() {
        let codec = SampleCodec::select(SampleFormat::Int32, ByteOrder::Little);
        let mut out = Vec::new();
        codec.encode(&[1.4, 1.6, -2.5], &mut out).unwrap();
        assert_eq!(codec.decode(&out, 3).unwrap(), vec![1.0, 2.0, -3.0]);
    }

    #[test]
    fn packed20_layout() {
        // exponents 1,2,3,4; fractions 0.5, -0.5, 0.25, -1.0
        let bytes = [
            0x12, 0x34, 0x40, 0x00, 0xC0, 0x00, 0x20, 0x00, 0x80, 0x00,
        ];
        let codec = SampleCodec::select(SampleFormat::Packed20, ByteOrder::Big);
        let samples = codec.decode(&bytes, 4).unwrap();
        assert_eq!(samples, vec![1.0, -2.0, 2.0, -16.0]);
    }

    #[test]
    fn packed20_partial_group_is_an_error() {
        let codec = SampleCodec::select(SampleFormat::Packed20, ByteOrder::Big);
        assert!(matches!(
            codec.decode(&[0u8; 20], 6),
            Err(SegError::PartialGroup { samples: 6, group: 4 })
        ));
        let mut out = Vec::new();
        assert!(matches!(
            codec.encode(&[1.0, 2.0, 3.0], &mut out),
            Err(SegError::PartialGroup { samples: 3, group: 4 })
        ));
        assert_eq!(codec.byte_len(8).unwrap(), 20);
    }

    #[test]
    fn quaternary8_layout() {
        // S=0 C=2 Q=1000 -> 0.5 * 16
        let codec = SampleCodec::select(SampleFormat::Quaternary8, ByteOrder::Big);
        assert_eq!(codec.decode(&[0b0010_1000], 1).unwrap(), vec![8.0]);
        // S=1 Q=1000 -> -0.5
        assert_eq!(codec.decode(&[0b1000_1000], 1).unwrap(), vec![-0.5]);
    }

    #[test]
    fn short_input_is_an_error() {
        let codec = SampleCodec::select(SampleFormat::Ieee64, ByteOrder::Big);
        assert!(matches!(
            codec.decode(&[0u8; 12], 2),
            Err(SegError::BlockTooShort { expected: 16, actual: 12 })
        ));
    }

    proptest! {
        #[test]
        fn packed20_decode_is_exactly_invertible(bytes in proptest::collection::vec(any::<u8>(), 40)) {
            let codec = SampleCodec::select(SampleFormat::Packed20, ByteOrder::Big);
            let samples = codec.decode(&bytes, 16).unwrap();
            let mut out = Vec::new();
            codec.encode(&samples, &mut out).unwrap();
            prop_assert_eq!(codec.decode(&out, 16).unwrap(), samples);
        }

        #[test]
        fn exponent_formats_invertible(b in any::<u8>(), w in any::<u16>()) {
            for format in [SampleFormat::Quaternary8, SampleFormat::Hexadecimal8] {
                let codec = SampleCodec::select(format, ByteOrder::Big);
                let v = codec.decode(&[b], 1).unwrap();
                let mut out = Vec::new();
                codec.encode(&v, &mut out).unwrap();
                prop_assert_eq!(codec.decode(&out, 1).unwrap(), v);
            }
            for format in [SampleFormat::Quaternary16, SampleFormat::Hexadecimal16] {
                let codec = SampleCodec::select(format, ByteOrder::Little);
                let v = codec.decode(&w.to_le_bytes(), 1).unwrap();
                let mut out = Vec::new();
                codec.encode(&v, &mut out).unwrap();
                prop_assert_eq!(codec.decode(&out, 1).unwrap(), v);
            }
        }
    }
}
