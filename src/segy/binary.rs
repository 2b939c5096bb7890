//! SEG-Y 400-byte binary file header.
//!
//! Field offsets follow revision 2.0 (bytes 3201-3600 of the file,
//! relative offsets here). Revision 0 and 1 files simply leave the later
//! fields zero.

use crate::raw::RawCodec;
use crate::sample::SampleFormat;
use crate::types::ByteOrder;
use crate::{Result, SegError};

/// Size of the binary file header.
pub const BINARY_HEADER_LEN: usize = 400;

/// Byte order marker value as read in the file's own order.
pub const BYTE_ORDER_MARKER: u32 = 0x0102_0304;

/// Binary file header.
///
/// Counts and intervals that have a revision 2 extended counterpart
/// (`ext_*`) are kept separately; see [`samples`](Self::samples) and
/// [`sample_interval_us`](Self::sample_interval_us) for the effective
/// values.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryHeader {
    pub job_id: i32,
    pub line_number: i32,
    pub reel_number: i32,
    pub traces_per_ensemble: u16,
    pub aux_traces_per_ensemble: u16,
    /// Microseconds (µs) for time data.
    pub sample_interval: u16,
    pub sample_interval_orig: u16,
    pub samples_per_trace: u16,
    pub samples_per_trace_orig: u16,
    pub format_code: i16,
    pub ensemble_fold: u16,
    pub trace_sorting: i16,
    pub vertical_sum: i16,
    pub sweep_freq_start: u16,
    pub sweep_freq_end: u16,
    pub sweep_length: u16,
    pub sweep_type: i16,
    pub sweep_channel: u16,
    pub sweep_taper_start: u16,
    pub sweep_taper_end: u16,
    pub taper_type: i16,
    pub correlated: i16,
    pub gain_recovered: i16,
    pub amplitude_recovery: i16,
    pub measurement_system: i16,
    pub impulse_polarity: i16,
    pub vibratory_polarity: i16,
    pub ext_traces_per_ensemble: u32,
    pub ext_aux_traces_per_ensemble: u32,
    pub ext_samples_per_trace: u32,
    pub ext_sample_interval: f64,
    pub ext_sample_interval_orig: f64,
    pub ext_samples_per_trace_orig: u32,
    pub ext_ensemble_fold: u32,
    /// Byte order of every binary value in the file.
    pub byte_order: ByteOrder,
    /// Whether bytes 3297-3300 carry the byte order marker. Legacy files
    /// leave them zero and are big-endian.
    pub byte_order_marker: bool,
    pub major_revision: u8,
    pub minor_revision: u8,
    pub fixed_length_traces: i16,
    /// Count of extended textual headers; `-1` means scan for the end
    /// marker.
    pub extended_textual_headers: i16,
    pub max_additional_headers: u32,
    pub time_basis: u16,
    pub number_of_traces: u64,
    pub first_trace_offset: u64,
    /// Count of trailer stanzas; `-1` means scan for the end marker.
    pub trailer_stanzas: i32,
}

impl BinaryHeader {
    /// Create a revision 2.0 header.
    ///
    /// Defaults: big-endian with marker, IEEE float samples, fixed-length
    /// traces, no extended textual headers, no additional trace headers,
    /// no trailer. Sample count and interval are zero and are taken from
    /// the first trace written.
    pub fn new() -> Self {
        Self {
            job_id: 0,
            line_number: 0,
            reel_number: 0,
            traces_per_ensemble: 0,
            aux_traces_per_ensemble: 0,
            sample_interval: 0,
            sample_interval_orig: 0,
            samples_per_trace: 0,
            samples_per_trace_orig: 0,
            format_code: 5,
            ensemble_fold: 0,
            trace_sorting: 0,
            vertical_sum: 0,
            sweep_freq_start: 0,
            sweep_freq_end: 0,
            sweep_length: 0,
            sweep_type: 0,
            sweep_channel: 0,
            sweep_taper_start: 0,
            sweep_taper_end: 0,
            taper_type: 0,
            correlated: 0,
            gain_recovered: 0,
            amplitude_recovery: 0,
            measurement_system: 0,
            impulse_polarity: 0,
            vibratory_polarity: 0,
            ext_traces_per_ensemble: 0,
            ext_aux_traces_per_ensemble: 0,
            ext_samples_per_trace: 0,
            ext_sample_interval: 0.0,
            ext_sample_interval_orig: 0.0,
            ext_samples_per_trace_orig: 0,
            ext_ensemble_fold: 0,
            byte_order: ByteOrder::Big,
            byte_order_marker: true,
            major_revision: 2,
            minor_revision: 0,
            fixed_length_traces: 1,
            extended_textual_headers: 0,
            max_additional_headers: 0,
            time_basis: 0,
            number_of_traces: 0,
            first_trace_offset: 0,
            trailer_stanzas: 0,
        }
    }

    /// Set the sample format.
    pub fn with_format(mut self, format: SampleFormat) -> Result<Self> {
        self.format_code = format
            .segy_code()
            .ok_or_else(|| SegError::InvalidHeader(format!("{format} has no SEG-Y format code")))?;
        Ok(self)
    }

    /// Set the sample interval in microseconds.
    pub fn with_sample_interval(mut self, interval: u16) -> Self {
        self.sample_interval = interval;
        self
    }

    /// Set the samples per trace, using the extended field above 65535.
    pub fn with_samples(mut self, samples: usize) -> Result<Self> {
        self.set_samples(samples)?;
        Ok(self)
    }

    pub fn with_revision(mut self, major: u8, minor: u8) -> Self {
        self.major_revision = major;
        self.minor_revision = minor;
        self
    }

    pub fn with_byte_order(mut self, order: ByteOrder) -> Self {
        self.byte_order = order;
        self.byte_order_marker = true;
        self
    }

    /// Mark traces as fixed (`true`) or variable length.
    pub fn with_fixed_length(mut self, fixed: bool) -> Self {
        self.fixed_length_traces = fixed as i16;
        self
    }

    pub fn with_extended_textual_headers(mut self, count: i16) -> Self {
        self.extended_textual_headers = count;
        self
    }

    pub fn with_max_additional_headers(mut self, count: u32) -> Self {
        self.max_additional_headers = count;
        self
    }

    pub fn with_trailer_stanzas(mut self, count: i32) -> Self {
        self.trailer_stanzas = count;
        self
    }

    /// Decode the header, resolving byte order from the marker at byte 96
    /// unless `order` overrides it.
    pub fn decode(raw: &[u8], order: Option<ByteOrder>) -> Result<Self> {
        if raw.len() < BINARY_HEADER_LEN {
            return Err(SegError::BlockTooShort {
                expected: BINARY_HEADER_LEN,
                actual: raw.len(),
            });
        }
        let marker = RawCodec::BIG.read_u32(raw, 96);
        let detected = match marker {
            0 => ByteOrder::Big,
            BYTE_ORDER_MARKER => ByteOrder::Big,
            0x0403_0201 => ByteOrder::Little,
            other => return Err(SegError::UnsupportedByteOrder(other)),
        };
        let byte_order = order.unwrap_or(detected);
        let c = RawCodec::new(byte_order);
        let (major, minor) = (raw[300], raw[301]);
        if major > 2 {
            return Err(SegError::UnsupportedRevision(format!("{major}.{minor}")));
        }

        Ok(Self {
            job_id: c.read_i32(raw, 0),
            line_number: c.read_i32(raw, 4),
            reel_number: c.read_i32(raw, 8),
            traces_per_ensemble: c.read_u16(raw, 12),
            aux_traces_per_ensemble: c.read_u16(raw, 14),
            sample_interval: c.read_u16(raw, 16),
            sample_interval_orig: c.read_u16(raw, 18),
            samples_per_trace: c.read_u16(raw, 20),
            samples_per_trace_orig: c.read_u16(raw, 22),
            format_code: c.read_i16(raw, 24),
            ensemble_fold: c.read_u16(raw, 26),
            trace_sorting: c.read_i16(raw, 28),
            vertical_sum: c.read_i16(raw, 30),
            sweep_freq_start: c.read_u16(raw, 32),
            sweep_freq_end: c.read_u16(raw, 34),
            sweep_length: c.read_u16(raw, 36),
            sweep_type: c.read_i16(raw, 38),
            sweep_channel: c.read_u16(raw, 40),
            sweep_taper_start: c.read_u16(raw, 42),
            sweep_taper_end: c.read_u16(raw, 44),
            taper_type: c.read_i16(raw, 46),
            correlated: c.read_i16(raw, 48),
            gain_recovered: c.read_i16(raw, 50),
            amplitude_recovery: c.read_i16(raw, 52),
            measurement_system: c.read_i16(raw, 54),
            impulse_polarity: c.read_i16(raw, 56),
            vibratory_polarity: c.read_i16(raw, 58),
            ext_traces_per_ensemble: c.read_u32(raw, 60),
            ext_aux_traces_per_ensemble: c.read_u32(raw, 64),
            ext_samples_per_trace: c.read_u32(raw, 68),
            ext_sample_interval: c.read_f64(raw, 72),
            ext_sample_interval_orig: c.read_f64(raw, 80),
            ext_samples_per_trace_orig: c.read_u32(raw, 88),
            ext_ensemble_fold: c.read_u32(raw, 92),
            byte_order,
            byte_order_marker: marker != 0,
            major_revision: major,
            minor_revision: minor,
            fixed_length_traces: c.read_i16(raw, 302),
            extended_textual_headers: c.read_i16(raw, 304),
            max_additional_headers: c.read_u32(raw, 306),
            time_basis: c.read_u16(raw, 310),
            number_of_traces: c.read_u64(raw, 312),
            first_trace_offset: c.read_u64(raw, 320),
            trailer_stanzas: c.read_i32(raw, 328),
        })
    }

    /// Encode the header in its own byte order. Unassigned bytes are zero.
    pub fn encode(&self) -> Vec<u8> {
        let mut raw = vec![0u8; BINARY_HEADER_LEN];
        let c = RawCodec::new(self.byte_order);
        c.write_i32(&mut raw, 0, self.job_id);
        c.write_i32(&mut raw, 4, self.line_number);
        c.write_i32(&mut raw, 8, self.reel_number);
        c.write_u16(&mut raw, 12, self.traces_per_ensemble);
        c.write_u16(&mut raw, 14, self.aux_traces_per_ensemble);
        c.write_u16(&mut raw, 16, self.sample_interval);
        c.write_u16(&mut raw, 18, self.sample_interval_orig);
        c.write_u16(&mut raw, 20, self.samples_per_trace);
        c.write_u16(&mut raw, 22, self.samples_per_trace_orig);
        c.write_i16(&mut raw, 24, self.format_code);
        c.write_u16(&mut raw, 26, self.ensemble_fold);
        c.write_i16(&mut raw, 28, self.trace_sorting);
        c.write_i16(&mut raw, 30, self.vertical_sum);
        c.write_u16(&mut raw, 32, self.sweep_freq_start);
        c.write_u16(&mut raw, 34, self.sweep_freq_end);
        c.write_u16(&mut raw, 36, self.sweep_length);
        c.write_i16(&mut raw, 38, self.sweep_type);
        c.write_u16(&mut raw, 40, self.sweep_channel);
        c.write_u16(&mut raw, 42, self.sweep_taper_start);
        c.write_u16(&mut raw, 44, self.sweep_taper_end);
        c.write_i16(&mut raw, 46, self.taper_type);
        c.write_i16(&mut raw, 48, self.correlated);
        c.write_i16(&mut raw, 50, self.gain_recovered);
        c.write_i16(&mut raw, 52, self.amplitude_recovery);
        c.write_i16(&mut raw, 54, self.measurement_system);
        c.write_i16(&mut raw, 56, self.impulse_polarity);
        c.write_i16(&mut raw, 58, self.vibratory_polarity);
        c.write_u32(&mut raw, 60, self.ext_traces_per_ensemble);
        c.write_u32(&mut raw, 64, self.ext_aux_traces_per_ensemble);
        c.write_u32(&mut raw, 68, self.ext_samples_per_trace);
        c.write_f64(&mut raw, 72, self.ext_sample_interval);
        c.write_f64(&mut raw, 80, self.ext_sample_interval_orig);
        c.write_u32(&mut raw, 88, self.ext_samples_per_trace_orig);
        c.write_u32(&mut raw, 92, self.ext_ensemble_fold);
        if self.byte_order_marker {
            c.write_u32(&mut raw, 96, BYTE_ORDER_MARKER);
        }
        c.write_u8(&mut raw, 300, self.major_revision);
        c.write_u8(&mut raw, 301, self.minor_revision);
        c.write_i16(&mut raw, 302, self.fixed_length_traces);
        c.write_i16(&mut raw, 304, self.extended_textual_headers);
        c.write_u32(&mut raw, 306, self.max_additional_headers);
        c.write_u16(&mut raw, 310, self.time_basis);
        c.write_u64(&mut raw, 312, self.number_of_traces);
        c.write_u64(&mut raw, 320, self.first_trace_offset);
        c.write_i32(&mut raw, 328, self.trailer_stanzas);
        raw
    }

    pub fn revision(&self) -> (u8, u8) {
        (self.major_revision, self.minor_revision)
    }

    /// Sample format declared by the format code.
    pub fn sample_format(&self) -> Result<SampleFormat> {
        SampleFormat::from_segy_code(self.format_code)
    }

    /// Effective samples per trace.
    pub fn samples(&self) -> usize {
        if self.ext_samples_per_trace != 0 {
            self.ext_samples_per_trace as usize
        } else {
            self.samples_per_trace as usize
        }
    }

    /// Store a samples-per-trace count, using the extended field when it
    /// does not fit 16 bits.
    pub fn set_samples(&mut self, samples: usize) -> Result<()> {
        match u16::try_from(samples) {
            Ok(n) => {
                self.samples_per_trace = n;
                self.ext_samples_per_trace = 0;
            }
            Err(_) if self.major_revision >= 2 => {
                self.ext_samples_per_trace = u32::try_from(samples)
                    .map_err(|_| SegError::range(samples, "extended samples per trace"))?;
                self.samples_per_trace = 0;
            }
            Err(_) => return Err(SegError::range(samples, "samples per trace")),
        }
        Ok(())
    }

    /// Effective sample interval in microseconds.
    pub fn sample_interval_us(&self) -> f64 {
        if self.ext_sample_interval != 0.0 {
            self.ext_sample_interval
        } else {
            self.sample_interval as f64
        }
    }

    /// `true` when every trace has [`samples`](Self::samples) samples.
    /// Revision 0 files are always fixed length.
    pub fn is_fixed_length(&self) -> bool {
        self.major_revision < 1 || self.fixed_length_traces != 0
    }
}

impl Default for BinaryHeader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_both_orders() {
        for order in [ByteOrder::Big, ByteOrder::Little] {
            let mut h = BinaryHeader::new()
                .with_byte_order(order)
                .with_sample_interval(2000)
                .with_samples(1500)
                .unwrap()
                .with_max_additional_headers(1)
                .with_trailer_stanzas(-1);
            h.job_id = 77;
            h.number_of_traces = 12;
            h.ext_sample_interval = 2000.0;
            let raw = h.encode();
            assert_eq!(raw.len(), BINARY_HEADER_LEN);
            let back = BinaryHeader::decode(&raw, None).unwrap();
            assert_eq!(back, h);
        }
    }

    #[test]
    fn marker_bytes_follow_order() {
        let raw = BinaryHeader::new().with_byte_order(ByteOrder::Little).encode();
        assert_eq!(&raw[96..100], &[0x04, 0x03, 0x02, 0x01]);
        let raw = BinaryHeader::new().encode();
        assert_eq!(&raw[96..100], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(&raw[300..302], &[2, 0]);
    }

    #[test]
    fn legacy_zero_marker_is_big_endian() {
        let mut raw = vec![0u8; BINARY_HEADER_LEN];
        raw[24..26].copy_from_slice(&1i16.to_be_bytes());
        let h = BinaryHeader::decode(&raw, None).unwrap();
        assert_eq!(h.byte_order, ByteOrder::Big);
        assert!(!h.byte_order_marker);
        assert_eq!(h.sample_format().unwrap(), SampleFormat::Ibm32);
        assert!(h.is_fixed_length());
        assert_eq!(h.encode(), raw);
    }

    #[test]
    fn unknown_marker_rejected() {
        let mut raw = vec![0u8; BINARY_HEADER_LEN];
        raw[96..100].copy_from_slice(&[0x02, 0x01, 0x04, 0x03]);
        assert!(matches!(
            BinaryHeader::decode(&raw, None),
            Err(SegError::UnsupportedByteOrder(0x0201_0403))
        ));
    }

    #[test]
    fn extended_sample_count() {
        let mut h = BinaryHeader::new();
        h.set_samples(100_000).unwrap();
        assert_eq!(h.samples(), 100_000);
        let mut old = BinaryHeader::new().with_revision(1, 0);
        assert!(old.set_samples(100_000).unwrap_err().is_range());
    }

    #[test]
    fn sample_count_overwrites_other_field() {
        let mut h = BinaryHeader::new();
        h.set_samples(100_000).unwrap();
        h.set_samples(500).unwrap();
        assert_eq!(h.samples(), 500);
        assert_eq!(h.ext_samples_per_trace, 0);

        let mut h = BinaryHeader::new();
        h.set_samples(500).unwrap();
        h.set_samples(70_000).unwrap();
        assert_eq!(h.samples(), 70_000);
        assert_eq!(h.samples_per_trace, 0);
    }

    #[test]
    fn future_revision_rejected() {
        let mut raw = BinaryHeader::new().encode();
        raw[300] = 3;
        assert!(matches!(
            BinaryHeader::decode(&raw, None),
            Err(SegError::UnsupportedRevision(r)) if r == "3.0"
        ));
    }

    #[test]
    fn short_block() {
        assert!(matches!(
            BinaryHeader::decode(&[0u8; 10], None),
            Err(SegError::BlockTooShort { .. })
        ));
    }
}
