//! Additional general header blocks.
//!
//! Revision 3 tags every 32-byte block in its last byte and the tag selects
//! the layout. Older revisions only know general header block #N, the
//! source description repeated per source.

use super::BLOCK_LEN;
use crate::raw::RawCodec;
use crate::schema::{FieldDescriptor, Schema};
use crate::types::FieldType::{self, *};
use crate::value::HeaderMap;
use crate::{Result, SegError};

pub const GENERAL_3_TAG: u8 = 0x03;
pub const VESSEL_CREW_TAG: u8 = 0x10;
pub const SURVEY_AREA_TAG: u8 = 0x11;
pub const CLIENT_TAG: u8 = 0x12;
pub const JOB_TAG: u8 = 0x13;
pub const LINE_TAG: u8 = 0x14;
pub const ADDITIONAL_SOURCE_TAG: u8 = 0x20;
pub const AUX_CHANNEL_TAG: u8 = 0x21;
pub const CRS_TAG: u8 = 0x50;
pub const POSITION_TAGS: [u8; 3] = [0x51, 0x52, 0x53];

/// Payload bytes of a tagged block.
const PAYLOAD_LEN: usize = BLOCK_LEN - 1;

const GENERAL_N: &[(usize, &str, FieldType)] = &[
    (0, "expanded_file_number", U24),
    (3, "source_line", I24),
    (6, "source_line_fraction", U16),
    (8, "source_point", I24),
    (11, "source_point_fraction", U16),
    (13, "source_point_index", U8),
    (14, "phase_control", U8),
    (15, "vibrator_type", U8),
    (16, "phase_angle", I16),
    (18, "block_number", U8),
    (19, "source_set", U8),
];

const GENERAL_3: &[(usize, &str, FieldType)] = &[
    (0, "time_zero", U64),
    (8, "record_size", U64),
    (16, "data_size", U64),
    (24, "header_size", U32),
    (28, "extended_recording_mode", U8),
    (29, "relative_time_mode", U8),
];

const SOURCE: &[(usize, &str, FieldType)] = &[
    (0, "expanded_file_number", U24),
    (3, "source_line", I24),
    (6, "source_line_fraction", U16),
    (8, "source_point", I24),
    (11, "source_point_fraction", U16),
    (13, "source_point_index", U8),
    (14, "source_detail", U32),
    (18, "source_id", U8),
    (19, "source_set", U8),
    (20, "reshoot_index", U8),
    (21, "group_index", U8),
    (22, "depth_index", U8),
    (23, "offset_crossline", U16),
    (25, "offset_inline", U16),
    (27, "source_size", U16),
    (29, "offset_depth", U16),
];

const ADDITIONAL_SOURCE: &[(usize, &str, FieldType)] = &[
    (0, "time", U64),
    (8, "source_status", U8),
    (9, "source_id", U8),
    (10, "source_moving", U8),
];
const ADDITIONAL_SOURCE_TEXT: usize = 11;

const AUX_CHANNEL: &[(usize, &str, FieldType)] = &[
    (0, "source_id", U8),
    (1, "scan_type", U8),
    (2, "channel_set", U16),
    (4, "trace_number", U32),
    (8, "second_scan_type", U8),
    (9, "second_channel_set", U16),
    (11, "second_trace_number", U32),
];

const POSITION: &[(usize, &str, FieldType)] = &[
    (0, "time_of_position", U64),
    (8, "time_of_measurement", U64),
    (16, "vertical_error", F32),
    (20, "horizontal_error_major", F32),
    (24, "horizontal_error_minor", F32),
    (28, "horizontal_error_orientation", U16),
    (30, "position_type", U8),
];

/// Source description flavours sharing one layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Vibrator,
    Explosive,
    Airgun,
    Watergun,
    Electromagnetic,
    Other,
}

impl SourceKind {
    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0x15 => Self::Vibrator,
            0x16 => Self::Explosive,
            0x17 => Self::Airgun,
            0x18 => Self::Watergun,
            0x19 => Self::Electromagnetic,
            0x1F => Self::Other,
            _ => return None,
        })
    }

    pub fn tag(self) -> u8 {
        match self {
            Self::Vibrator => 0x15,
            Self::Explosive => 0x16,
            Self::Airgun => 0x17,
            Self::Watergun => 0x18,
            Self::Electromagnetic => 0x19,
            Self::Other => 0x1F,
        }
    }
}

/// One additional general header block.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtensionBlock {
    /// General header block #N (revision < 3).
    GeneralN(HeaderMap),
    /// General header block #3: time zero and record sizes.
    General3(HeaderMap),
    VesselCrew { abbreviation: String, name: String },
    SurveyArea(String),
    Client(String),
    Job { abbreviation: String, id: String },
    Line { abbreviation: String, id: String },
    Source { kind: SourceKind, header: HeaderMap },
    AdditionalSource { header: HeaderMap, description: String },
    AuxChannel(HeaderMap),
    CoordinateReferenceSystem(String),
    /// Position blocks 1 to 3.
    Position { index: u8, header: HeaderMap },
    /// Unrecognised tag; the whole block is kept.
    Raw([u8; BLOCK_LEN]),
}

fn tagged_schema(tuples: &[(usize, &str, FieldType)]) -> Result<Schema> {
    let fields = tuples
        .iter()
        .map(|&(offset, name, ty)| FieldDescriptor::new(offset, name, ty))
        .collect();
    Schema::with_reserved_tail(BLOCK_LEN, 1, fields)
}

fn decode_with(tuples: &[(usize, &str, FieldType)], raw: &[u8]) -> Result<HeaderMap> {
    tagged_schema(tuples)?.decode(&RawCodec::BIG, raw)
}

fn read_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches([' ', '\0'])
        .to_string()
}

fn write_text(dst: &mut [u8], text: &str, target: &str) -> Result<()> {
    if !text.is_ascii() || text.len() > dst.len() {
        return Err(SegError::range(format!("{text:?}"), target));
    }
    dst.fill(b' ');
    dst[..text.len()].copy_from_slice(text.as_bytes());
    Ok(())
}

impl ExtensionBlock {
    /// Decode one block following general header block 2.
    pub fn decode(raw: &[u8], major_revision: u8) -> Result<Self> {
        if raw.len() < BLOCK_LEN {
            return Err(SegError::BlockTooShort {
                expected: BLOCK_LEN,
                actual: raw.len(),
            });
        }
        let raw = &raw[..BLOCK_LEN];
        if major_revision < 3 {
            let schema = Schema::from_tuples(BLOCK_LEN, GENERAL_N)?;
            return Ok(Self::GeneralN(schema.decode(&RawCodec::BIG, raw)?));
        }

        let tag = raw[PAYLOAD_LEN];
        let block = match tag {
            GENERAL_3_TAG => Self::General3(decode_with(GENERAL_3, raw)?),
            VESSEL_CREW_TAG => Self::VesselCrew {
                abbreviation: read_text(&raw[..3]),
                name: read_text(&raw[3..PAYLOAD_LEN]),
            },
            SURVEY_AREA_TAG => Self::SurveyArea(read_text(&raw[..PAYLOAD_LEN])),
            CLIENT_TAG => Self::Client(read_text(&raw[..PAYLOAD_LEN])),
            JOB_TAG => Self::Job {
                abbreviation: read_text(&raw[..5]),
                id: read_text(&raw[5..PAYLOAD_LEN]),
            },
            LINE_TAG => Self::Line {
                abbreviation: read_text(&raw[..7]),
                id: read_text(&raw[7..PAYLOAD_LEN]),
            },
            ADDITIONAL_SOURCE_TAG => Self::AdditionalSource {
                header: decode_with(ADDITIONAL_SOURCE, raw)?,
                description: read_text(&raw[ADDITIONAL_SOURCE_TEXT..PAYLOAD_LEN]),
            },
            AUX_CHANNEL_TAG => Self::AuxChannel(decode_with(AUX_CHANNEL, raw)?),
            CRS_TAG => Self::CoordinateReferenceSystem(read_text(&raw[..PAYLOAD_LEN])),
            t if POSITION_TAGS.contains(&t) => Self::Position {
                index: t - POSITION_TAGS[0] + 1,
                header: decode_with(POSITION, raw)?,
            },
            t => match SourceKind::from_tag(t) {
                Some(kind) => Self::Source {
                    kind,
                    header: decode_with(SOURCE, raw)?,
                },
                None => {
                    let mut block = [0u8; BLOCK_LEN];
                    block.copy_from_slice(raw);
                    Self::Raw(block)
                }
            },
        };
        Ok(block)
    }

    /// The revision 3 type tag, `None` for block #N.
    pub fn tag(&self) -> Option<u8> {
        Some(match self {
            Self::GeneralN(_) => return None,
            Self::General3(_) => GENERAL_3_TAG,
            Self::VesselCrew { .. } => VESSEL_CREW_TAG,
            Self::SurveyArea(_) => SURVEY_AREA_TAG,
            Self::Client(_) => CLIENT_TAG,
            Self::Job { .. } => JOB_TAG,
            Self::Line { .. } => LINE_TAG,
            Self::Source { kind, .. } => kind.tag(),
            Self::AdditionalSource { .. } => ADDITIONAL_SOURCE_TAG,
            Self::AuxChannel(_) => AUX_CHANNEL_TAG,
            Self::CoordinateReferenceSystem(_) => CRS_TAG,
            Self::Position { index, .. } => POSITION_TAGS[(*index as usize).clamp(1, 3) - 1],
            Self::Raw(raw) => raw[PAYLOAD_LEN],
        })
    }

    pub fn encode(&self) -> Result<[u8; BLOCK_LEN]> {
        let mut raw = [0u8; BLOCK_LEN];
        let c = RawCodec::BIG;
        match self {
            Self::GeneralN(header) => {
                Schema::from_tuples(BLOCK_LEN, GENERAL_N)?.encode_into(&c, header, &mut raw)?;
                return Ok(raw);
            }
            Self::Raw(block) => return Ok(*block),
            Self::General3(header) => tagged_schema(GENERAL_3)?.encode_into(&c, header, &mut raw)?,
            Self::VesselCrew { abbreviation, name } => {
                write_text(&mut raw[..3], abbreviation, "vessel abbreviation")?;
                write_text(&mut raw[3..PAYLOAD_LEN], name, "vessel name")?;
            }
            Self::SurveyArea(text) => write_text(&mut raw[..PAYLOAD_LEN], text, "survey area")?,
            Self::Client(text) => write_text(&mut raw[..PAYLOAD_LEN], text, "client name")?,
            Self::Job { abbreviation, id } => {
                write_text(&mut raw[..5], abbreviation, "job abbreviation")?;
                write_text(&mut raw[5..PAYLOAD_LEN], id, "job identification")?;
            }
            Self::Line { abbreviation, id } => {
                write_text(&mut raw[..7], abbreviation, "line abbreviation")?;
                write_text(&mut raw[7..PAYLOAD_LEN], id, "line identification")?;
            }
            Self::Source { header, .. } => tagged_schema(SOURCE)?.encode_into(&c, header, &mut raw)?,
            Self::AdditionalSource {
                header,
                description,
            } => {
                tagged_schema(ADDITIONAL_SOURCE)?.encode_into(&c, header, &mut raw)?;
                write_text(
                    &mut raw[ADDITIONAL_SOURCE_TEXT..PAYLOAD_LEN],
                    description,
                    "source description",
                )?;
            }
            Self::AuxChannel(header) => {
                tagged_schema(AUX_CHANNEL)?.encode_into(&c, header, &mut raw)?
            }
            Self::CoordinateReferenceSystem(text) => {
                write_text(&mut raw[..PAYLOAD_LEN], text, "coordinate reference system")?
            }
            Self::Position { index, header } => {
                if !(1..=3).contains(index) {
                    return Err(SegError::range(index, "position block index"));
                }
                tagged_schema(POSITION)?.encode_into(&c, header, &mut raw)?
            }
        }
        if let Some(tag) = self.tag() {
            raw[PAYLOAD_LEN] = tag;
        }
        Ok(raw)
    }
}
