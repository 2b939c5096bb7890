//! Built-in SEG-D demultiplexed trace header layouts.
//!
//! A trace starts with a 20-byte header followed by as many 32-byte
//! extensions as its `trace_header_extensions` field names. Extension 1
//! moved its sample count in revision 3.

use crate::Result;
use crate::raw::BCD_UNDEFINED;
use crate::schema::{Schema, SchemaChain};
use crate::types::FieldType::{self, *};
use crate::value::HeaderMap;

pub const TRACE_HEADER_LEN: usize = 20;
pub const EXTENSION_LEN: usize = 32;

pub const SCAN_TYPE: &str = "scan_type";
pub const CHANNEL_SET: &str = "channel_set";
pub const TRACE_NUMBER: &str = "trace_number";
pub const TRACE_HEADER_EXTENSIONS: &str = "trace_header_extensions";
pub const EXTENDED_CHANNEL_SET: &str = "extended_channel_set";
pub const SAMPLES_PER_TRACE: &str = "samples_per_trace";

const BCD2: FieldType = Bcd {
    digits: 2,
    skip_first: false,
};
const BCD4: FieldType = Bcd {
    digits: 4,
    skip_first: false,
};

const TRACE_HEADER: &[(usize, &str, FieldType)] = &[
    (0, "file_number", BCD4),
    (2, SCAN_TYPE, BCD2),
    (3, CHANNEL_SET, BCD2),
    (4, TRACE_NUMBER, BCD4),
    (6, "first_timing_word", U24),
    (9, TRACE_HEADER_EXTENSIONS, U8),
    (10, "sample_skew", U8),
    (11, "trace_edit", U8),
    (12, "time_break_window", U24),
    (15, EXTENDED_CHANNEL_SET, U16),
    (17, "extended_file_number", U24),
];

const EXTENSION_1: &[(usize, &str, FieldType)] = &[
    (0, "receiver_line", I24),
    (3, "receiver_point", I24),
    (6, "receiver_point_index", I8),
    (7, SAMPLES_PER_TRACE, U24),
    (10, "extended_receiver_line", I24),
    (13, "extended_receiver_line_fraction", U16),
    (15, "extended_receiver_point", I24),
    (18, "extended_receiver_point_fraction", U16),
    (20, "sensor_type", U8),
];

const EXTENSION_1_V3: &[(usize, &str, FieldType)] = &[
    (0, "receiver_line", I24),
    (3, "receiver_point", I24),
    (6, "receiver_point_index", I8),
    (7, "reshoot_index", U8),
    (8, "group_index", U8),
    (9, "depth_index", U8),
    (10, "extended_receiver_line", I24),
    (13, "extended_receiver_line_fraction", U16),
    (15, "extended_receiver_point", I24),
    (18, "extended_receiver_point_fraction", U16),
    (20, "sensor_type", U8),
    (21, "trace_number_in_file", U32),
    (27, SAMPLES_PER_TRACE, U32),
];

/// The 20-byte trace header.
pub fn trace_header_schema() -> Result<Schema> {
    Schema::from_tuples(TRACE_HEADER_LEN, TRACE_HEADER)
}

/// Trace header extension 1 for `major_revision`.
pub fn extension_1_schema(major_revision: u8) -> Result<Schema> {
    if major_revision >= 3 {
        Schema::from_tuples(EXTENSION_LEN, EXTENSION_1_V3)
    } else {
        Schema::from_tuples(EXTENSION_LEN, EXTENSION_1)
    }
}

pub fn default_chain(major_revision: u8) -> Result<SchemaChain> {
    SchemaChain::new(
        trace_header_schema()?,
        vec![extension_1_schema(major_revision)?],
    )
}

/// `(scan_type, channel_set)` a trace refers to. The two-digit
/// `channel_set` wins unless it is missing or all-F, in which case
/// `extended_channel_set` names the set.
pub fn channel_set_key(headers: &HeaderMap) -> (u64, u64) {
    let field = |name: &str| headers.get(name).and_then(|v| v.as_u64());
    let scan_type = field(SCAN_TYPE).unwrap_or(0);
    let channel_set = match field(CHANNEL_SET) {
        Some(BCD_UNDEFINED) | None => field(EXTENDED_CHANNEL_SET).unwrap_or(0),
        Some(n) => n,
    };
    (scan_type, channel_set)
}
