//! SEG-D general header blocks 1 and 2.
//!
//! Block 1 is mostly packed BCD and is present in every revision. Block 2
//! carries the revision number and the binary counts that replace block 1
//! fields set to all `F` nibbles; its layout changed with revision 3.

use tracing::warn;

use super::extension::ExtensionBlock;
use super::{BLOCK_LEN, bcd, bcd_opt, put_bcd};
use crate::raw::{BCD_UNDEFINED, RawCodec};
use crate::{Result, SegError};

/// Type tag of general header block 2 in revision 3.
const BLOCK_2_TAG: u8 = 0x02;

/// Additional block count value meaning "see block 2".
pub const EXTENDED_COUNT: u8 = 0x0F;

/// General header block 1.
///
/// Fields that hold all-`F` nibbles on disk are `None`; their values live
/// in [`GeneralHeader2`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneralHeader1 {
    pub file_number: Option<u16>,
    pub format_code: u16,
    pub general_constants: u64,
    pub year: u8,
    /// Count of general header blocks after this one; 15 defers to block 2.
    pub additional_blocks: u8,
    pub day_of_year: u16,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub manufacturer_code: u8,
    pub manufacturer_serial: u16,
    pub bytes_per_scan: u32,
    /// Base scan interval in 1/16 ms.
    pub base_scan_interval: u8,
    pub polarity: u8,
    pub record_type: u8,
    /// Record length in units of 0.5 * 1.024 s.
    pub record_length: Option<u16>,
    pub scan_types: u8,
    pub channel_sets: Option<u8>,
    pub skew_blocks: Option<u8>,
    pub extended_blocks: Option<u8>,
    pub external_blocks: Option<u8>,
}

impl GeneralHeader1 {
    pub fn new() -> Self {
        Self {
            file_number: Some(1),
            format_code: 8058,
            general_constants: 0,
            year: 0,
            additional_blocks: 1,
            day_of_year: 1,
            hour: 0,
            minute: 0,
            second: 0,
            manufacturer_code: 0,
            manufacturer_serial: 0,
            bytes_per_scan: 0,
            base_scan_interval: 16,
            polarity: 0,
            record_type: 8,
            record_length: Some(0),
            scan_types: 1,
            channel_sets: Some(1),
            skew_blocks: Some(0),
            extended_blocks: Some(0),
            external_blocks: Some(0),
        }
    }

    pub fn decode(raw: &[u8]) -> Result<Self> {
        check_len(raw)?;
        Ok(Self {
            file_number: bcd_opt(raw, 0, 4, false)?.map(|v| v as u16),
            format_code: bcd(raw, 2, 4, false)? as u16,
            general_constants: bcd(raw, 4, 12, false)?,
            year: bcd(raw, 10, 2, false)? as u8,
            additional_blocks: raw[11] >> 4,
            day_of_year: bcd(raw, 11, 3, true)? as u16,
            hour: bcd(raw, 13, 2, false)? as u8,
            minute: bcd(raw, 14, 2, false)? as u8,
            second: bcd(raw, 15, 2, false)? as u8,
            manufacturer_code: bcd(raw, 16, 2, false)? as u8,
            manufacturer_serial: bcd(raw, 17, 4, false)? as u16,
            bytes_per_scan: bcd(raw, 19, 6, false)? as u32,
            base_scan_interval: raw[22],
            polarity: raw[23] >> 4,
            record_type: raw[25] >> 4,
            record_length: bcd_opt(raw, 25, 3, true)?.map(|v| v as u16),
            scan_types: bcd(raw, 27, 2, false)? as u8,
            channel_sets: bcd_opt(raw, 28, 2, false)?.map(|v| v as u8),
            skew_blocks: bcd_opt(raw, 29, 2, false)?.map(|v| v as u8),
            extended_blocks: bcd_opt(raw, 30, 2, false)?.map(|v| v as u8),
            external_blocks: bcd_opt(raw, 31, 2, false)?.map(|v| v as u8),
        })
    }

    pub fn encode(&self) -> Result<[u8; BLOCK_LEN]> {
        let mut raw = [0u8; BLOCK_LEN];
        put_bcd(&mut raw, 0, 4, false, opt(self.file_number))?;
        put_bcd(&mut raw, 2, 4, false, self.format_code as u64)?;
        put_bcd(&mut raw, 4, 12, false, self.general_constants)?;
        put_bcd(&mut raw, 10, 2, false, self.year as u64)?;
        raw[11] = nibble(self.additional_blocks, "additional general header blocks")? << 4;
        put_bcd(&mut raw, 11, 3, true, self.day_of_year as u64)?;
        put_bcd(&mut raw, 13, 2, false, self.hour as u64)?;
        put_bcd(&mut raw, 14, 2, false, self.minute as u64)?;
        put_bcd(&mut raw, 15, 2, false, self.second as u64)?;
        put_bcd(&mut raw, 16, 2, false, self.manufacturer_code as u64)?;
        put_bcd(&mut raw, 17, 4, false, self.manufacturer_serial as u64)?;
        put_bcd(&mut raw, 19, 6, false, self.bytes_per_scan as u64)?;
        raw[22] = self.base_scan_interval;
        raw[23] = nibble(self.polarity, "polarity")? << 4;
        raw[25] = nibble(self.record_type, "record type")? << 4;
        put_bcd(&mut raw, 25, 3, true, opt(self.record_length))?;
        put_bcd(&mut raw, 27, 2, false, self.scan_types as u64)?;
        put_bcd(&mut raw, 28, 2, false, opt(self.channel_sets))?;
        put_bcd(&mut raw, 29, 2, false, opt(self.skew_blocks))?;
        put_bcd(&mut raw, 30, 2, false, opt(self.extended_blocks))?;
        put_bcd(&mut raw, 31, 2, false, opt(self.external_blocks))?;
        Ok(raw)
    }
}

impl Default for GeneralHeader1 {
    fn default() -> Self {
        Self::new()
    }
}

fn opt<T: Into<u64>>(value: Option<T>) -> u64 {
    value.map_or(BCD_UNDEFINED, Into::into)
}

fn nibble(value: u8, target: &str) -> Result<u8> {
    if value > 0x0F {
        return Err(SegError::range(value, target));
    }
    Ok(value)
}

fn check_len(raw: &[u8]) -> Result<()> {
    if raw.len() < BLOCK_LEN {
        return Err(SegError::BlockTooShort {
            expected: BLOCK_LEN,
            actual: raw.len(),
        });
    }
    Ok(())
}

/// General header block 2.
///
/// Fields marked revision 3 are zero for older revisions and vice versa.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GeneralHeader2 {
    pub expanded_file_number: u32,
    pub ext_channel_sets: u16,
    pub ext_header_blocks: u32,
    /// Revision 3.
    pub ext_skew_blocks: u16,
    pub external_header_blocks: u32,
    pub major_revision: u8,
    pub minor_revision: u8,
    pub trailer_blocks: u32,
    pub ext_record_length: u32,
    /// Revision 3.
    pub record_set: u16,
    /// Revision 3.
    pub ext_additional_blocks: u16,
    /// Revision 3, microseconds.
    pub dominant_sample_interval: u32,
    /// Revision < 3.
    pub block_number: u8,
}

impl GeneralHeader2 {
    pub fn new(major_revision: u8, minor_revision: u8) -> Self {
        Self {
            major_revision,
            minor_revision,
            block_number: if major_revision < 3 { 2 } else { 0 },
            ..Self::default()
        }
    }

    pub fn decode(raw: &[u8]) -> Result<Self> {
        check_len(raw)?;
        let c = RawCodec::BIG;
        let major_revision = raw[10];
        let minor_revision = raw[11];
        if major_revision > 3 {
            return Err(SegError::UnsupportedRevision(format!(
                "{major_revision}.{minor_revision}"
            )));
        }
        if major_revision < 3 {
            return Ok(Self {
                expanded_file_number: c.read_u24(raw, 0),
                ext_channel_sets: c.read_u16(raw, 3),
                ext_header_blocks: c.read_u16(raw, 5) as u32,
                external_header_blocks: c.read_u16(raw, 7) as u32,
                major_revision,
                minor_revision,
                trailer_blocks: c.read_u16(raw, 12) as u32,
                ext_record_length: c.read_u24(raw, 14),
                block_number: raw[18],
                ..Self::default()
            });
        }
        if raw[31] != BLOCK_2_TAG {
            warn!(tag = raw[31], "general header block 2 has unexpected type tag");
        }
        Ok(Self {
            expanded_file_number: c.read_u24(raw, 0),
            ext_channel_sets: c.read_u16(raw, 3),
            ext_header_blocks: c.read_u24(raw, 5),
            ext_skew_blocks: c.read_u16(raw, 8),
            external_header_blocks: c.read_u24(raw, 27),
            major_revision,
            minor_revision,
            trailer_blocks: c.read_u32(raw, 12),
            ext_record_length: c.read_u32(raw, 16),
            record_set: c.read_u16(raw, 20),
            ext_additional_blocks: c.read_u16(raw, 22),
            dominant_sample_interval: c.read_u24(raw, 24),
            block_number: 0,
        })
    }

    pub fn encode(&self) -> Result<[u8; BLOCK_LEN]> {
        let mut raw = [0u8; BLOCK_LEN];
        let c = RawCodec::BIG;
        c.write_u24(&mut raw, 0, u24(self.expanded_file_number, "expanded file number")?);
        c.write_u16(&mut raw, 3, self.ext_channel_sets);
        raw[10] = self.major_revision;
        raw[11] = self.minor_revision;
        if self.major_revision < 3 {
            c.write_u16(&mut raw, 5, u16_of(self.ext_header_blocks, "extended header blocks")?);
            c.write_u16(
                &mut raw,
                7,
                u16_of(self.external_header_blocks, "external header blocks")?,
            );
            c.write_u16(&mut raw, 12, u16_of(self.trailer_blocks, "general trailer blocks")?);
            c.write_u24(&mut raw, 14, u24(self.ext_record_length, "extended record length")?);
            raw[18] = self.block_number;
        } else {
            c.write_u24(&mut raw, 5, u24(self.ext_header_blocks, "extended header blocks")?);
            c.write_u16(&mut raw, 8, self.ext_skew_blocks);
            c.write_u32(&mut raw, 12, self.trailer_blocks);
            c.write_u32(&mut raw, 16, self.ext_record_length);
            c.write_u16(&mut raw, 20, self.record_set);
            c.write_u16(&mut raw, 22, self.ext_additional_blocks);
            c.write_u24(
                &mut raw,
                24,
                u24(self.dominant_sample_interval, "dominant sample interval")?,
            );
            c.write_u24(
                &mut raw,
                27,
                u24(self.external_header_blocks, "external header blocks")?,
            );
            raw[31] = BLOCK_2_TAG;
        }
        Ok(raw)
    }
}

fn u24(value: u32, target: &str) -> Result<u32> {
    if value > 0x00FF_FFFF {
        return Err(SegError::range(value, target));
    }
    Ok(value)
}

fn u16_of(value: u32, target: &str) -> Result<u16> {
    u16::try_from(value).map_err(|_| SegError::range(value, target))
}

/// The general header: block 1, block 2 when present, and the additional
/// general header blocks that follow them.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralHeader {
    pub block1: GeneralHeader1,
    pub block2: Option<GeneralHeader2>,
    pub extensions: Vec<ExtensionBlock>,
}

impl GeneralHeader {
    /// Block 1 and an empty block 2 for the given revision.
    pub fn new(major_revision: u8, minor_revision: u8) -> Self {
        Self {
            block1: GeneralHeader1::new(),
            block2: Some(GeneralHeader2::new(major_revision, minor_revision)),
            extensions: Vec::new(),
        }
    }

    pub fn revision(&self) -> (u8, u8) {
        self.block2
            .as_ref()
            .map_or((0, 0), |b| (b.major_revision, b.minor_revision))
    }

    pub fn major_revision(&self) -> u8 {
        self.revision().0
    }

    fn block2_value<T>(&self, what: &str, value: impl Fn(&GeneralHeader2) -> T) -> Result<T> {
        self.block2
            .as_ref()
            .map(value)
            .ok_or_else(|| SegError::InvalidHeader(format!("{what} deferred to missing block 2")))
    }

    /// Count of general header blocks after block 1.
    pub fn additional_blocks(&self) -> Result<usize> {
        match self.block1.additional_blocks {
            EXTENDED_COUNT => self.block2_value("additional block count", |b| {
                b.ext_additional_blocks as usize
            }),
            n => Ok(n as usize),
        }
    }

    pub fn file_number(&self) -> Result<u32> {
        match self.block1.file_number {
            Some(n) => Ok(n as u32),
            None => self.block2_value("file number", |b| b.expanded_file_number),
        }
    }

    pub fn channel_sets_per_scan_type(&self) -> Result<usize> {
        match self.block1.channel_sets {
            Some(n) => Ok(n as usize),
            None => self.block2_value("channel set count", |b| b.ext_channel_sets as usize),
        }
    }

    pub fn skew_blocks(&self) -> Result<usize> {
        match self.block1.skew_blocks {
            Some(n) => Ok(n as usize),
            None => self.block2_value("skew block count", |b| b.ext_skew_blocks as usize),
        }
    }

    pub fn extended_blocks(&self) -> Result<usize> {
        match self.block1.extended_blocks {
            Some(n) => Ok(n as usize),
            None => self.block2_value("extended header count", |b| {
                b.ext_header_blocks as usize
            }),
        }
    }

    pub fn external_blocks(&self) -> Result<usize> {
        match self.block1.external_blocks {
            Some(n) => Ok(n as usize),
            None => self.block2_value("external header count", |b| {
                b.external_header_blocks as usize
            }),
        }
    }

    pub fn trailer_blocks(&self) -> usize {
        self.block2.as_ref().map_or(0, |b| b.trailer_blocks as usize)
    }

    /// Base scan interval in microseconds.
    pub fn base_scan_interval_us(&self) -> f64 {
        self.block1.base_scan_interval as f64 * 62.5
    }

    /// Encode every general header block in file order.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let expected = self.additional_blocks()?;
        let present = self.block2.is_some() as usize + self.extensions.len();
        if expected != present {
            return Err(SegError::CountMismatch {
                what: "additional general header blocks",
                declared: expected as u64,
                actual: present as u64,
            });
        }
        let mut out = Vec::with_capacity(BLOCK_LEN * (1 + present));
        out.extend_from_slice(&self.block1.encode()?);
        if let Some(block2) = &self.block2 {
            out.extend_from_slice(&block2.encode()?);
        }
        for ext in &self.extensions {
            out.extend_from_slice(&ext.encode()?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block1() -> GeneralHeader1 {
        GeneralHeader1 {
            file_number: Some(1234),
            format_code: 8058,
            general_constants: 5,
            year: 24,
            additional_blocks: 2,
            day_of_year: 187,
            hour: 13,
            minute: 5,
            second: 59,
            manufacturer_code: 20,
            manufacturer_serial: 4321,
            bytes_per_scan: 123_456,
            base_scan_interval: 32,
            polarity: 0,
            record_type: 8,
            record_length: Some(12),
            scan_types: 1,
            channel_sets: Some(3),
            skew_blocks: Some(0),
            extended_blocks: Some(2),
            external_blocks: None,
        }
    }

    #[test]
    fn block1_layout() {
        let raw = sample_block1().encode().unwrap();
        assert_eq!(&raw[0..4], &[0x12, 0x34, 0x80, 0x58]);
        // additional-blocks nibble shares byte 11 with the day of year
        assert_eq!(raw[11], 0x21);
        assert_eq!(raw[12], 0x87);
        assert_eq!(raw[25], 0x80);
        assert_eq!(raw[26], 0x12);
        assert_eq!(raw[31], 0xFF);
        assert_eq!(GeneralHeader1::decode(&raw).unwrap(), sample_block1());
    }

    #[test]
    fn block1_rejects_bad_bcd() {
        let mut raw = sample_block1().encode().unwrap();
        raw[2] = 0x8A;
        assert!(matches!(
            GeneralHeader1::decode(&raw),
            Err(SegError::InvalidBcd { nibble: 0x0A, .. })
        ));
    }

    #[test]
    fn block2_layouts_by_revision() {
        let mut old = GeneralHeader2::new(2, 1);
        old.ext_header_blocks = 3;
        old.trailer_blocks = 2;
        old.ext_record_length = 0x01_0000;
        let raw = old.encode().unwrap();
        assert_eq!(raw[18], 2);
        assert_eq!(GeneralHeader2::decode(&raw).unwrap(), old);

        let mut new = GeneralHeader2::new(3, 0);
        new.ext_header_blocks = 70_000;
        new.trailer_blocks = 100_000;
        new.ext_additional_blocks = 20;
        new.dominant_sample_interval = 500;
        let raw = new.encode().unwrap();
        assert_eq!(raw[31], 0x02);
        assert_eq!(GeneralHeader2::decode(&raw).unwrap(), new);

        old.trailer_blocks = 70_000;
        assert!(old.encode().unwrap_err().is_range());
    }

    #[test]
    fn unsupported_revision() {
        let mut raw = [0u8; BLOCK_LEN];
        raw[10] = 4;
        assert!(matches!(
            GeneralHeader2::decode(&raw),
            Err(SegError::UnsupportedRevision(_))
        ));
    }

    #[test]
    fn deferred_counts_come_from_block2() {
        let mut header = GeneralHeader::new(2, 1);
        header.block1 = sample_block1();
        header.block1.additional_blocks = 1;
        let block2 = header.block2.as_mut().unwrap();
        block2.external_header_blocks = 4;
        assert_eq!(header.external_blocks().unwrap(), 4);
        assert_eq!(header.extended_blocks().unwrap(), 2);
        assert_eq!(header.channel_sets_per_scan_type().unwrap(), 3);

        header.block2 = None;
        assert!(header.external_blocks().is_err());
    }

    #[test]
    fn block_count_must_match_extensions() {
        let mut header = GeneralHeader::new(3, 0);
        header.block1.additional_blocks = 2;
        assert!(matches!(
            header.encode(),
            Err(SegError::CountMismatch { declared: 2, actual: 1, .. })
        ));
        header.block1.additional_blocks = 1;
        assert_eq!(header.encode().unwrap().len(), 2 * BLOCK_LEN);
    }
}
