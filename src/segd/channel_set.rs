//! SEG-D channel set descriptors.

use super::{bcd, bcd_opt, put_bcd};
use crate::raw::{BCD_UNDEFINED, RawCodec};
use crate::{Result, SegError};

/// Descriptor length before revision 3.
pub const CHANNEL_SET_LEN: usize = 32;
/// Descriptor length from revision 3.
pub const CHANNEL_SET_LEN_V3: usize = 64;

/// Length of a channel set descriptor for `major_revision`.
pub const fn descriptor_len(major_revision: u8) -> usize {
    if major_revision >= 3 {
        CHANNEL_SET_LEN_V3
    } else {
        CHANNEL_SET_LEN
    }
}

/// One channel set descriptor.
///
/// Times are in 2 ms units before revision 3 and in microseconds after.
/// Filter values are stored as BCD integers before revision 3, so they must
/// be whole non-negative numbers there.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSetHeader {
    major_revision: u8,
    pub scan_type: u8,
    pub channel_set: u16,
    pub channel_type: u8,
    pub start_time: u32,
    pub end_time: u32,
    /// Revision < 3 MP factor, raw.
    pub mp_factor: u16,
    /// Revision 3 descale multiplier.
    pub descale: f32,
    pub channels: u32,
    /// Sub-scans per base scan interval, a power of two.
    pub subscans: u32,
    pub gain_control: u8,
    pub alias_filter_freq: f32,
    pub alias_filter_slope: f32,
    pub low_cut_freq: f32,
    pub low_cut_slope: f32,
    pub notch_freqs: [f32; 3],
    pub extended_channel_set: u16,
    pub extended_header_flag: u8,
    pub trace_header_extensions: u8,
    pub vertical_stack: u8,
    pub streamer_cable: u8,
    /// Revision 3.
    pub samples: Option<u32>,
    /// Revision 3, microseconds.
    pub sample_interval: Option<u32>,
    /// Revision 3.
    pub array_forming: u8,
    /// Revision 3.
    pub filter_phase: u8,
    /// Revision 3.
    pub physical_unit: u8,
    /// Revision 3.
    pub filter_delay: i32,
}

impl ChannelSetHeader {
    pub fn new(major_revision: u8, scan_type: u8, channel_set: u16) -> Self {
        let v3 = major_revision >= 3;
        Self {
            major_revision,
            scan_type,
            channel_set,
            channel_type: 1,
            start_time: 0,
            end_time: 0,
            mp_factor: 0,
            descale: if v3 { 1.0 } else { 0.0 },
            channels: 0,
            subscans: 1,
            gain_control: 0,
            alias_filter_freq: 0.0,
            alias_filter_slope: 0.0,
            low_cut_freq: 0.0,
            low_cut_slope: 0.0,
            notch_freqs: [0.0; 3],
            extended_channel_set: 0,
            extended_header_flag: 0,
            trace_header_extensions: 0,
            vertical_stack: 1,
            streamer_cable: 0,
            samples: v3.then_some(0),
            sample_interval: v3.then_some(0),
            array_forming: 0,
            filter_phase: 0,
            physical_unit: 0,
            filter_delay: 0,
        }
    }

    pub fn with_channels(mut self, channels: u32) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_trace_header_extensions(mut self, n: u8) -> Self {
        self.trace_header_extensions = n;
        self
    }

    /// Set the sample count and interval (revision 3).
    pub fn with_samples(mut self, samples: u32, interval_us: u32) -> Self {
        self.samples = Some(samples);
        self.sample_interval = Some(interval_us);
        self
    }

    /// Set the record window in on-disk time units.
    pub fn with_window(mut self, start: u32, end: u32) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    pub fn major_revision(&self) -> u8 {
        self.major_revision
    }

    /// `(scan_type, channel_set)`, the key trace headers refer to.
    pub fn key(&self) -> (u8, u16) {
        (self.scan_type, self.channel_set)
    }

    /// Samples per trace of this channel set.
    ///
    /// Revision 3 stores the count. Older revisions derive it from the
    /// record window and the base scan interval (1/16 ms units).
    pub fn samples_per_trace(&self, base_scan_interval: u8) -> usize {
        if self.major_revision >= 3 {
            return self.samples.unwrap_or(0) as usize;
        }
        if base_scan_interval == 0 || self.end_time <= self.start_time {
            return 0;
        }
        let window = (self.end_time - self.start_time) as u64;
        (window * 32 * self.subscans as u64 / base_scan_interval as u64) as usize
    }

    pub fn decode(raw: &[u8], major_revision: u8) -> Result<Self> {
        let len = descriptor_len(major_revision);
        if raw.len() < len {
            return Err(SegError::BlockTooShort {
                expected: len,
                actual: raw.len(),
            });
        }
        if major_revision >= 3 {
            Self::decode_v3(raw)
        } else {
            Self::decode_v2(raw, major_revision)
        }
    }

    fn decode_v2(raw: &[u8], major_revision: u8) -> Result<Self> {
        let c = RawCodec::BIG;
        let extended_channel_set = c.read_u16(raw, 27);
        let channel_set = bcd_opt(raw, 1, 4, false)?.map_or(extended_channel_set, |v| v as u16);
        Ok(Self {
            major_revision,
            scan_type: bcd(raw, 0, 2, false)? as u8,
            channel_set,
            channel_type: raw[11] >> 4,
            start_time: c.read_u16(raw, 3) as u32,
            end_time: c.read_u16(raw, 5) as u32,
            mp_factor: c.read_u16(raw, 7),
            descale: 0.0,
            channels: bcd(raw, 9, 4, false)? as u32,
            subscans: 1 << (raw[12] >> 4),
            gain_control: raw[12] & 0x0F,
            alias_filter_freq: bcd(raw, 13, 4, false)? as f32,
            alias_filter_slope: bcd(raw, 15, 3, true)? as f32,
            low_cut_freq: bcd(raw, 17, 4, false)? as f32,
            low_cut_slope: bcd(raw, 19, 3, true)? as f32,
            notch_freqs: [
                bcd(raw, 21, 4, false)? as f32,
                bcd(raw, 23, 4, false)? as f32,
                bcd(raw, 25, 4, false)? as f32,
            ],
            extended_channel_set,
            extended_header_flag: raw[29] >> 4,
            trace_header_extensions: raw[29] & 0x0F,
            vertical_stack: raw[30],
            streamer_cable: raw[31],
            samples: None,
            sample_interval: None,
            array_forming: 0,
            filter_phase: 0,
            physical_unit: 0,
            filter_delay: 0,
        })
    }

    fn decode_v3(raw: &[u8]) -> Result<Self> {
        let c = RawCodec::BIG;
        Ok(Self {
            major_revision: 3,
            scan_type: bcd(raw, 0, 2, false)? as u8,
            channel_set: c.read_u16(raw, 1),
            channel_type: raw[3],
            start_time: c.read_u32(raw, 4),
            end_time: c.read_u32(raw, 8),
            mp_factor: 0,
            descale: c.read_f32(raw, 16),
            channels: c.read_u24(raw, 20),
            subscans: 1u32.checked_shl(raw[31] as u32).unwrap_or(0),
            gain_control: raw[28] & 0x0F,
            alias_filter_freq: c.read_f32(raw, 32),
            alias_filter_slope: c.read_i16(raw, 36) as f32,
            low_cut_freq: c.read_f32(raw, 38),
            low_cut_slope: c.read_i16(raw, 42) as f32,
            notch_freqs: [
                c.read_f32(raw, 44),
                c.read_f32(raw, 48),
                c.read_f32(raw, 52),
            ],
            extended_channel_set: 0,
            extended_header_flag: raw[28] >> 4,
            trace_header_extensions: raw[27],
            vertical_stack: raw[29],
            streamer_cable: raw[30],
            samples: Some(c.read_u32(raw, 12)),
            sample_interval: Some(c.read_u24(raw, 23)),
            array_forming: raw[26],
            filter_phase: raw[56],
            physical_unit: raw[57],
            filter_delay: c.read_i32(raw, 60),
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut raw = vec![0u8; descriptor_len(self.major_revision)];
        if self.major_revision >= 3 {
            self.encode_v3(&mut raw)?;
        } else {
            self.encode_v2(&mut raw)?;
        }
        Ok(raw)
    }

    fn encode_v2(&self, raw: &mut [u8]) -> Result<()> {
        let c = RawCodec::BIG;
        put_bcd(raw, 0, 2, false, self.scan_type as u64)?;
        let channel_set = if self.channel_set > 9999 {
            BCD_UNDEFINED
        } else {
            self.channel_set as u64
        };
        put_bcd(raw, 1, 4, false, channel_set)?;
        c.write_u16(raw, 3, u16_of(self.start_time, "channel set start time")?);
        c.write_u16(raw, 5, u16_of(self.end_time, "channel set end time")?);
        c.write_u16(raw, 7, self.mp_factor);
        put_bcd(raw, 9, 4, false, self.channels as u64)?;
        raw[11] = nibble(self.channel_type, "channel type")? << 4;
        raw[12] = subscan_exponent(self.subscans)? << 4 | nibble(self.gain_control, "gain control")?;
        put_bcd(raw, 13, 4, false, whole(self.alias_filter_freq, "alias filter frequency")?)?;
        put_bcd(raw, 15, 3, true, whole(self.alias_filter_slope, "alias filter slope")?)?;
        put_bcd(raw, 17, 4, false, whole(self.low_cut_freq, "low-cut filter frequency")?)?;
        put_bcd(raw, 19, 3, true, whole(self.low_cut_slope, "low-cut filter slope")?)?;
        for (i, notch) in self.notch_freqs.iter().enumerate() {
            put_bcd(raw, 21 + 2 * i, 4, false, whole(*notch, "notch frequency")?)?;
        }
        let extended = if self.channel_set > 9999 {
            self.channel_set
        } else {
            self.extended_channel_set
        };
        c.write_u16(raw, 27, extended);
        raw[29] = nibble(self.extended_header_flag, "extended header flag")? << 4
            | nibble(self.trace_header_extensions, "trace header extensions")?;
        raw[30] = self.vertical_stack;
        raw[31] = self.streamer_cable;
        Ok(())
    }

    fn encode_v3(&self, raw: &mut [u8]) -> Result<()> {
        let c = RawCodec::BIG;
        put_bcd(raw, 0, 2, false, self.scan_type as u64)?;
        c.write_u16(raw, 1, self.channel_set);
        raw[3] = self.channel_type;
        c.write_u32(raw, 4, self.start_time);
        c.write_u32(raw, 8, self.end_time);
        c.write_u32(raw, 12, self.samples.unwrap_or(0));
        c.write_f32(raw, 16, self.descale);
        c.write_u24(raw, 20, u24(self.channels, "channels in channel set")?);
        c.write_u24(
            raw,
            23,
            u24(self.sample_interval.unwrap_or(0), "channel set sample interval")?,
        );
        raw[26] = self.array_forming;
        raw[27] = self.trace_header_extensions;
        raw[28] = nibble(self.extended_header_flag, "extended header flag")? << 4
            | nibble(self.gain_control, "gain control")?;
        raw[29] = self.vertical_stack;
        raw[30] = self.streamer_cable;
        raw[31] = subscan_exponent(self.subscans)?;
        c.write_f32(raw, 32, self.alias_filter_freq);
        c.write_i16(raw, 36, slope(self.alias_filter_slope, "alias filter slope")?);
        c.write_f32(raw, 38, self.low_cut_freq);
        c.write_i16(raw, 42, slope(self.low_cut_slope, "low-cut filter slope")?);
        for (i, notch) in self.notch_freqs.iter().enumerate() {
            c.write_f32(raw, 44 + 4 * i, *notch);
        }
        raw[56] = self.filter_phase;
        raw[57] = self.physical_unit;
        c.write_i32(raw, 60, self.filter_delay);
        Ok(())
    }
}

/// Exponent of a power-of-two sub-scan count. A count of zero is written
/// as exponent zero.
pub fn subscan_exponent(subscans: u32) -> Result<u8> {
    match subscans {
        0 => Ok(0),
        n if n.is_power_of_two() && n.trailing_zeros() <= 15 => Ok(n.trailing_zeros() as u8),
        n => Err(SegError::range(n, "sub-scan count (power of two up to 2^15)")),
    }
}

fn nibble(value: u8, target: &str) -> Result<u8> {
    if value > 0x0F {
        return Err(SegError::range(value, target));
    }
    Ok(value)
}

fn u16_of(value: u32, target: &str) -> Result<u16> {
    u16::try_from(value).map_err(|_| SegError::range(value, target))
}

fn u24(value: u32, target: &str) -> Result<u32> {
    if value > 0x00FF_FFFF {
        return Err(SegError::range(value, target));
    }
    Ok(value)
}

fn whole(value: f32, target: &str) -> Result<u64> {
    if value < 0.0 || value.fract() != 0.0 || !value.is_finite() {
        return Err(SegError::range(value, target));
    }
    Ok(value as u64)
}

fn slope(value: f32, target: &str) -> Result<i16> {
    if value.fract() != 0.0 || value < i16::MIN as f32 || value > i16::MAX as f32 {
        return Err(SegError::range(value, target));
    }
    Ok(value as i16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_2_round_trip() {
        let mut cs = ChannelSetHeader::new(2, 1, 3)
            .with_channels(96)
            .with_window(0, 2048)
            .with_trace_header_extensions(1);
        cs.subscans = 4;
        cs.alias_filter_freq = 206.0;
        cs.alias_filter_slope = 276.0;
        cs.low_cut_freq = 3.0;
        cs.notch_freqs = [50.0, 0.0, 0.0];
        let raw = cs.encode().unwrap();
        assert_eq!(raw.len(), CHANNEL_SET_LEN);
        assert_eq!(raw[0], 0x01);
        assert_eq!(&raw[1..3], &[0x00, 0x03]);
        assert_eq!(&raw[9..11], &[0x00, 0x96]);
        assert_eq!(raw[12] >> 4, 2);
        assert_eq!(raw[29] & 0x0F, 1);
        assert_eq!(ChannelSetHeader::decode(&raw, 2).unwrap(), cs);
    }

    #[test]
    fn revision_3_round_trip() {
        let mut cs = ChannelSetHeader::new(3, 1, 1200)
            .with_channels(300_000)
            .with_samples(5001, 500)
            .with_window(0, 2_500_000);
        cs.low_cut_freq = 2.5;
        cs.alias_filter_slope = -370.0;
        cs.filter_delay = -12;
        let raw = cs.encode().unwrap();
        assert_eq!(raw.len(), CHANNEL_SET_LEN_V3);
        let back = ChannelSetHeader::decode(&raw, 3).unwrap();
        assert_eq!(back, cs);
        assert_eq!(back.samples_per_trace(0), 5001);
    }

    #[test]
    fn large_channel_set_uses_extended_number() {
        let cs = ChannelSetHeader::new(2, 1, 12_000);
        let raw = cs.encode().unwrap();
        assert_eq!(&raw[1..3], &[0xFF, 0xFF]);
        let back = ChannelSetHeader::decode(&raw, 2).unwrap();
        assert_eq!(back.key(), (1, 12_000));
    }

    #[test]
    fn subscan_counts() {
        assert_eq!(subscan_exponent(0).unwrap(), 0);
        assert_eq!(subscan_exponent(1).unwrap(), 0);
        assert_eq!(subscan_exponent(8).unwrap(), 3);
        assert!(subscan_exponent(3).unwrap_err().is_range());
        let mut cs = ChannelSetHeader::new(2, 1, 1);
        cs.subscans = 6;
        assert!(cs.encode().unwrap_err().is_range());
    }

    #[test]
    fn fractional_filter_rejected_before_revision_3() {
        let mut cs = ChannelSetHeader::new(2, 1, 1);
        cs.low_cut_freq = 2.5;
        assert!(cs.encode().unwrap_err().is_range());
    }

    #[test]
    fn derived_sample_count() {
        // 1024 ms window at a 2 ms base interval
        let cs = ChannelSetHeader::new(2, 1, 1).with_window(0, 512);
        assert_eq!(cs.samples_per_trace(32), 512);
    }
}
