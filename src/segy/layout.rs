//! Built-in SEG-Y revision 2.0 trace header layouts.
//!
//! The primary 240-byte trace header and trace header extension 1 (the
//! first additional block, tagged `SEG00001`). Field names are unique
//! across both so their decoded maps merge into one [`HeaderMap`].
//!
//! [`HeaderMap`]: crate::value::HeaderMap

use crate::Result;
use crate::schema::{Schema, SchemaChain};
use crate::types::FieldType::{self, *};

/// Size of the primary trace header and of every additional block.
pub const TRACE_HEADER_LEN: usize = 240;

pub const NUM_SAMPLES: &str = "num_samples";
pub const SAMPLE_INTERVAL: &str = "sample_interval";
pub const NUM_SAMPLES_EXT: &str = "num_samples_ext";
pub const ADDITIONAL_TRACE_HEADERS: &str = "additional_trace_headers";

const TRACE_HEADER: &[(usize, &str, FieldType)] = &[
    (0, "trace_sequence_line", I32),
    (4, "trace_sequence_file", I32),
    (8, "field_record", I32),
    (12, "trace_number", I32),
    (16, "energy_source_point", I32),
    (20, "cdp", I32),
    (24, "cdp_trace", I32),
    (28, "trace_id", I16),
    (30, "vertically_summed_traces", I16),
    (32, "horizontally_stacked_traces", I16),
    (34, "data_use", I16),
    (36, "offset", I32),
    (40, "receiver_elevation", I32),
    (44, "source_surface_elevation", I32),
    (48, "source_depth", I32),
    (52, "receiver_datum_elevation", I32),
    (56, "source_datum_elevation", I32),
    (60, "source_water_depth", I32),
    (64, "receiver_water_depth", I32),
    (68, "elevation_scalar", I16),
    (70, "coordinate_scalar", I16),
    (72, "source_x", I32),
    (76, "source_y", I32),
    (80, "group_x", I32),
    (84, "group_y", I32),
    (88, "coordinate_units", I16),
    (90, "weathering_velocity", I16),
    (92, "subweathering_velocity", I16),
    (94, "source_uphole_time", I16),
    (96, "group_uphole_time", I16),
    (98, "source_static", I16),
    (100, "group_static", I16),
    (102, "total_static", I16),
    (104, "lag_time_a", I16),
    (106, "lag_time_b", I16),
    (108, "delay_time", I16),
    (110, "mute_start", I16),
    (112, "mute_end", I16),
    (114, NUM_SAMPLES, U16),
    (116, SAMPLE_INTERVAL, U16),
    (118, "gain_type", I16),
    (120, "instrument_gain", I16),
    (122, "instrument_initial_gain", I16),
    (124, "correlated", I16),
    (126, "sweep_freq_start", I16),
    (128, "sweep_freq_end", I16),
    (130, "sweep_length", I16),
    (132, "sweep_type", I16),
    (134, "sweep_taper_start", I16),
    (136, "sweep_taper_end", I16),
    (138, "taper_type", I16),
    (140, "alias_filter_freq", I16),
    (142, "alias_filter_slope", I16),
    (144, "notch_filter_freq", I16),
    (146, "notch_filter_slope", I16),
    (148, "low_cut_freq", I16),
    (150, "high_cut_freq", I16),
    (152, "low_cut_slope", I16),
    (154, "high_cut_slope", I16),
    (156, "year", I16),
    (158, "day_of_year", I16),
    (160, "hour", I16),
    (162, "minute", I16),
    (164, "second", I16),
    (166, "time_basis", I16),
    (168, "trace_weighting", I16),
    (170, "group_number_roll_switch", I16),
    (172, "group_number_first_trace", I16),
    (174, "group_number_last_trace", I16),
    (176, "gap_size", I16),
    (178, "over_travel", I16),
    (180, "cdp_x", I32),
    (184, "cdp_y", I32),
    (188, "inline", I32),
    (192, "crossline", I32),
    (196, "shotpoint", I32),
    (200, "shotpoint_scalar", I16),
    (202, "trace_value_unit", I16),
    (204, "transduction_mantissa", I32),
    (208, "transduction_exponent", I16),
    (210, "transduction_unit", I16),
    (212, "device_id", I16),
    (214, "time_scalar", I16),
    (216, "source_type", I16),
    (218, "source_direction_vertical", I16),
    (220, "source_direction_crossline", I16),
    (222, "source_direction_inline", I16),
    (224, "source_measurement_mantissa", I32),
    (228, "source_measurement_exponent", I16),
    (230, "source_measurement_unit", I16),
];

const EXTENSION_1: &[(usize, &str, FieldType)] = &[
    (0, "ext_trace_sequence_line", U64),
    (8, "ext_trace_sequence_file", U64),
    (16, "ext_field_record", I64),
    (24, "ext_ensemble_number", I64),
    (32, "ext_receiver_elevation", F64),
    (40, "ext_receiver_depth", F64),
    (48, "ext_source_surface_elevation", F64),
    (56, "ext_source_depth", F64),
    (64, "ext_receiver_datum_elevation", F64),
    (72, "ext_source_datum_elevation", F64),
    (80, "ext_source_water_depth", F64),
    (88, "ext_receiver_water_depth", F64),
    (96, "ext_source_x", F64),
    (104, "ext_source_y", F64),
    (112, "ext_group_x", F64),
    (120, "ext_group_y", F64),
    (128, "ext_offset", F64),
    (136, NUM_SAMPLES_EXT, U32),
    (140, "nanoseconds", I32),
    (144, "ext_sample_interval", F64),
    (152, "cable_number", I32),
    (156, ADDITIONAL_TRACE_HEADERS, U16),
    (158, "last_trace_flag", I16),
    (160, "ext_cdp_x", F64),
    (168, "ext_cdp_y", F64),
];

/// The 240-byte primary trace header.
pub fn trace_header_schema() -> Result<Schema> {
    Schema::from_tuples(TRACE_HEADER_LEN, TRACE_HEADER)
}

/// Trace header extension 1, with its 8-byte name tag reserved.
pub fn extension_1_schema() -> Result<Schema> {
    Schema::additional_from_tuples(TRACE_HEADER_LEN, EXTENSION_1)
}

/// Primary header plus extension 1.
pub fn default_chain() -> Result<SchemaChain> {
    SchemaChain::new(trace_header_schema()?, vec![extension_1_schema()?])
}

/// Name tag written into additional block `index` (zero based).
pub fn name_tag(index: usize) -> [u8; 8] {
    let mut tag = [b' '; 8];
    let text = format!("SEG{:05}", index + 1);
    for (dst, src) in tag.iter_mut().zip(text.bytes()) {
        *dst = src;
    }
    tag
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_layouts_validate() {
        let chain = default_chain().unwrap();
        assert_eq!(chain.primary().fields().len(), TRACE_HEADER.len());
        assert_eq!(chain.additional()[0].reserved_tail(), 8);
        let (block, field) = chain.locate(NUM_SAMPLES_EXT).unwrap();
        assert_eq!(block, Some(0));
        assert_eq!(field.offset, 136);
        let (block, field) = chain.locate("inline").unwrap();
        assert_eq!(block, None);
        assert_eq!(field.offset, 188);
    }

    #[test]
    fn name_tags() {
        assert_eq!(&name_tag(0), b"SEG00001");
        assert_eq!(&name_tag(11), b"SEG00012");
    }
}
