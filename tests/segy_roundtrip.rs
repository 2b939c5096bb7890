//! SEG-Y write/read scenarios through the public API.

use std::io::Cursor;

use seg_rs::segy::{
    BinaryHeader, SegyHeaders, SegyOptions, SegyReader, SegyWriter, TextEncoding, TextualHeader,
};
use seg_rs::{ByteOrder, FieldType, FieldValue, SampleFormat, Schema, SegError, Trace, TraceStream};

fn textual(line: &str) -> TextualHeader {
    TextualHeader::from_lines(&[line], TextEncoding::Ebcdic)
}

fn ramp(n: usize, scale: f64) -> Vec<f64> {
    (0..n).map(|i| (i as f64 - n as f64 / 2.0) * scale).collect()
}

fn write(headers: SegyHeaders, traces: &[Trace]) -> Vec<u8> {
    let mut writer = SegyWriter::new(Cursor::new(Vec::new()), headers).unwrap();
    for trace in traces {
        writer.write_trace(trace).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[test]
fn sentinel_trailer_stops_after_declared_traces() {
    let headers = SegyHeaders::new(
        textual("C 1 SENTINEL TRAILER"),
        BinaryHeader::new()
            .with_sample_interval(2000)
            .with_trailer_stanzas(-1),
    )
    .with_trailer(vec![
        TextualHeader::new("C 1 PROCESSING HISTORY", TextEncoding::Ebcdic),
        TextualHeader::end_text(TextEncoding::Ebcdic),
    ]);
    let traces: Vec<Trace> = (0..5)
        .map(|i| {
            Trace::new()
                .with_header("trace_sequence_file", i + 1)
                .with_samples(ramp(50, 0.25 * (i + 1) as f64))
        })
        .collect();
    let expected_sum: f64 = traces.iter().flat_map(|t| t.samples.iter()).sum();

    let bytes = write(headers, &traces);
    let mut reader = SegyReader::new(Cursor::new(bytes)).unwrap();
    assert_eq!(reader.binary_header().number_of_traces, 5);
    assert_eq!(reader.trailer().len(), 2);
    assert!(reader.trailer()[1].is_end_text());

    let mut sum = 0.0;
    let mut count = 0;
    while reader.has_trace() {
        let trace = reader.read_trace().unwrap();
        sum += trace.samples.iter().sum::<f64>();
        count += 1;
    }
    assert_eq!(count, 5);
    assert_eq!(sum, expected_sum);
    assert!(matches!(reader.read_trace(), Err(SegError::NoTrace)));
}

#[test]
fn rewrite_is_byte_identical() {
    let headers = SegyHeaders::new(
        textual("C 1 REWRITE"),
        BinaryHeader::new()
            .with_sample_interval(4000)
            .with_format(SampleFormat::Ibm32)
            .unwrap()
            .with_max_additional_headers(1)
            .with_extended_textual_headers(1)
            .with_trailer_stanzas(1),
    )
    .with_extended(vec![textual("C 1 EXTENDED")])
    .with_trailer(vec![textual("C 1 TRAILER")]);
    let traces: Vec<Trace> = (0..4)
        .map(|i| {
            Trace::new()
                .with_header("cdp", 100 + i)
                .with_header("offset", -25 * i)
                .with_header("coordinate_scalar", -100i16)
                .with_header("ext_source_x", 512_345.75 + i as f64)
                .with_samples(ramp(33, 0.5))
        })
        .collect();
    let original = write(headers, &traces);

    let mut reader = SegyReader::new(Cursor::new(original.clone())).unwrap();
    let read: Vec<Trace> = reader.traces().collect::<seg_rs::Result<_>>().unwrap();
    assert_eq!(read.len(), 4);
    assert_eq!(read[2].header("ext_source_x"), Some(FieldValue::F64(512_347.75)));
    let rewritten = write(reader.headers().clone(), &read);
    assert_eq!(rewritten, original);
}

#[test]
fn variable_length_traces() {
    let headers = SegyHeaders::new(
        textual("C 1 VARIABLE"),
        BinaryHeader::new()
            .with_sample_interval(1000)
            .with_fixed_length(false),
    );
    let lengths = [10usize, 3, 25, 1, 7];
    let traces: Vec<Trace> = lengths
        .iter()
        .map(|&n| Trace::new().with_samples(ramp(n, 1.0)))
        .collect();
    let bytes = write(headers, &traces);

    let mut reader = SegyReader::new(Cursor::new(bytes)).unwrap();
    assert_eq!(reader.binary_header().samples(), 10);
    for (n, expected) in lengths.iter().zip(&traces) {
        let offset = reader.trace_offset();
        let trace = reader.read_trace().unwrap();
        assert_eq!(trace.samples.len(), *n);
        assert_eq!(trace.samples, expected.samples);
        assert_eq!(reader.trace_offset(), offset + 240 + 4 * *n as u64);
    }
    assert!(!reader.has_trace());
}

#[test]
fn long_traces_use_extended_counts() {
    let headers = SegyHeaders::new(
        textual("C 1 LONG"),
        BinaryHeader::new()
            .with_sample_interval(250)
            .with_max_additional_headers(1),
    );
    let trace = Trace::new().with_samples(vec![1.5; 70_000]);
    let bytes = write(headers, &[trace]);

    let mut reader = SegyReader::new(Cursor::new(bytes)).unwrap();
    assert_eq!(reader.binary_header().samples_per_trace, 0);
    assert_eq!(reader.binary_header().ext_samples_per_trace, 70_000);
    let back = reader.read_trace().unwrap();
    assert_eq!(back.header("num_samples_ext"), Some(FieldValue::U32(70_000)));
    assert_eq!(back.samples.len(), 70_000);
}

#[test]
fn too_many_samples_without_extension() {
    let headers = SegyHeaders::new(
        textual("C 1 RANGE"),
        BinaryHeader::new().with_fixed_length(false).with_revision(1, 0),
    );
    let mut writer = SegyWriter::new(Cursor::new(Vec::new()), headers).unwrap();
    let err = writer
        .write_trace(&Trace::new().with_samples(vec![0.0; 70_000]))
        .unwrap_err();
    assert!(err.is_range());
}

#[test]
fn little_endian_with_scanned_extended_headers() {
    let headers = SegyHeaders::new(
        textual("C 1 LITTLE"),
        BinaryHeader::new()
            .with_byte_order(ByteOrder::Little)
            .with_format(SampleFormat::Int16)
            .unwrap()
            .with_extended_textual_headers(-1),
    )
    .with_extended(vec![
        textual("C 1 FIRST EXTENDED"),
        TextualHeader::end_text(TextEncoding::Ebcdic),
    ]);
    let samples = vec![-32768.0, -1.0, 0.0, 1.0, 32767.0];
    let bytes = write(headers, &[Trace::new().with_header("inline", 9).with_samples(samples.clone())]);
    assert_eq!(&bytes[3200 + 96..3200 + 100], &[0x04, 0x03, 0x02, 0x01]);

    let mut reader = SegyReader::new(Cursor::new(bytes)).unwrap();
    assert_eq!(reader.binary_header().byte_order, ByteOrder::Little);
    assert_eq!(reader.extended_textual_headers().len(), 2);
    let trace = reader.read_trace().unwrap();
    assert_eq!(trace.header("inline"), Some(FieldValue::I32(9)));
    assert_eq!(trace.samples, samples);
}

#[test]
fn custom_trace_schema() {
    let schema = Schema::from_tuples(
        240,
        &[
            (0, "shot", FieldType::I32),
            (4, "channel", FieldType::U16),
            (114, "num_samples", FieldType::U16),
        ],
    )
    .unwrap();
    let options = SegyOptions::new()
        .with_trace_schema(schema)
        .with_additional_schemas(Vec::new());
    let headers = SegyHeaders::new(textual("C 1 CUSTOM"), BinaryHeader::new());
    let mut writer =
        SegyWriter::with_options(Cursor::new(Vec::new()), headers, options.clone()).unwrap();
    let trace = Trace::new()
        .with_header("shot", 77)
        .with_header("channel", 3u16)
        .with_samples(vec![2.0; 8]);
    writer.write_trace(&trace).unwrap();
    let bytes = writer.finish().unwrap().into_inner();

    let mut reader = SegyReader::with_options(Cursor::new(bytes), options).unwrap();
    let back = reader.read_trace().unwrap();
    assert_eq!(back.headers.len(), 3);
    assert_eq!(back.header("shot"), Some(FieldValue::I32(77)));
    assert_eq!(back.header("channel"), Some(FieldValue::U16(3)));
}

#[test]
fn overlapping_schema_rejected_before_reading() {
    let err = Schema::from_tuples(
        240,
        &[(0, "a", FieldType::I32), (2, "b", FieldType::I16)],
    )
    .unwrap_err();
    assert!(matches!(err, SegError::SchemaOverlap { offset: 2, .. }));
}

#[test]
fn files_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("line.sgy");
    let headers = SegyHeaders::new(
        textual("C 1 ON DISK"),
        BinaryHeader::new().with_sample_interval(2000),
    );
    let mut writer = SegyWriter::create(&path, headers).unwrap();
    for i in 0..3 {
        writer
            .write_trace(&Trace::new().with_header("cdp", i).with_samples(ramp(16, 0.125)))
            .unwrap();
    }
    writer.finish().unwrap();

    let mut reader = SegyReader::open(&path).unwrap();
    assert_eq!(reader.trace_count(), Some(3));
    assert_eq!(reader.textual_header().lines()[0].trim_end(), "C 1 ON DISK");
    let cdps: Vec<_> = reader
        .traces()
        .map(|t| t.unwrap().header("cdp").unwrap())
        .collect();
    assert_eq!(cdps, vec![FieldValue::I32(0), FieldValue::I32(1), FieldValue::I32(2)]);
}

#[test]
fn seek_back_to_a_trace() {
    let headers = SegyHeaders::new(textual("C 1 SEEK"), BinaryHeader::new());
    let traces: Vec<Trace> = (0..3)
        .map(|i| Trace::new().with_header("cdp", i).with_samples(vec![i as f64; 4]))
        .collect();
    let mut reader = SegyReader::new(Cursor::new(write(headers, &traces))).unwrap();
    reader.read_trace_header().unwrap();
    let second = reader.trace_offset();
    reader.read_trace().unwrap();
    reader.read_trace().unwrap();
    reader.seek_trace(second).unwrap();
    assert_eq!(reader.read_trace().unwrap().samples, vec![1.0; 4]);
    assert!(reader.seek_trace(0).is_err());
}

#[test]
fn sentinel_trailer_without_stanzas() {
    let headers = SegyHeaders::new(
        textual("C 1 EMPTY TRAILER"),
        BinaryHeader::new()
            .with_sample_interval(2000)
            .with_trailer_stanzas(-1),
    );
    let traces: Vec<Trace> = (0..3)
        .map(|i| Trace::new().with_header("cdp", i).with_samples(ramp(20, 1.0)))
        .collect();
    let bytes = write(headers, &traces);

    let mut reader = SegyReader::new(Cursor::new(bytes)).unwrap();
    assert!(reader.trailer().is_empty());
    let mut count = 0;
    while reader.has_trace() {
        assert_eq!(reader.read_trace().unwrap().samples, traces[count].samples);
        count += 1;
    }
    assert_eq!(count, 3);
}

#[test]
fn sentinel_trailer_needs_trace_count() {
    let headers = SegyHeaders::new(
        textual("C 1 NO COUNT"),
        BinaryHeader::new().with_trailer_stanzas(-1),
    )
    .with_trailer(vec![TextualHeader::end_text(TextEncoding::Ebcdic)]);
    let traces = [Trace::new().with_samples(vec![1.0; 4])];
    let mut bytes = write(headers, &traces);
    bytes[3200 + 312..3200 + 320].fill(0);

    let err = SegyReader::new(Cursor::new(bytes)).err().unwrap();
    assert!(matches!(err, SegError::EndOfData(_)));
    assert_eq!(err.to_string().matches("unable to determine").count(), 1);
}

#[test]
fn additional_schema_overlapping_name_tag_rejected() {
    let tail = Schema::from_tuples(240, &[(236, "vendor_tail", FieldType::I32)]).unwrap();
    let headers = SegyHeaders::new(
        textual("C 1 NAME TAG"),
        BinaryHeader::new().with_max_additional_headers(1),
    );
    let options = SegyOptions::new().with_additional_schemas(vec![tail]);
    let err = SegyWriter::with_options(Cursor::new(Vec::new()), headers, options).err();
    assert!(matches!(err, Some(SegError::InvalidSchema(_))));
}

#[test]
fn more_schemas_than_additional_headers_rejected() {
    let a = Schema::additional_from_tuples(240, &[(0, "vendor_a", FieldType::I32)]).unwrap();
    let b = Schema::additional_from_tuples(240, &[(0, "vendor_b", FieldType::I32)]).unwrap();
    let options = SegyOptions::new().with_additional_schemas(vec![a, b]);

    let headers = SegyHeaders::new(textual("C 1 COUNTS"), BinaryHeader::new());
    let err = SegyWriter::with_options(Cursor::new(Vec::new()), headers.clone(), options.clone())
        .err();
    assert!(matches!(
        err,
        Some(SegError::CountMismatch { declared: 0, actual: 2, .. })
    ));

    let bytes = write(headers, &[Trace::new().with_samples(vec![0.0; 4])]);
    let err = SegyReader::with_options(Cursor::new(bytes), options).err();
    assert!(matches!(
        err,
        Some(SegError::CountMismatch { declared: 0, actual: 2, .. })
    ));
}

#[test]
fn writer_recovers_after_rejected_trace() {
    let headers = SegyHeaders::new(
        textual("C 1 RECOVER"),
        BinaryHeader::new()
            .with_format(SampleFormat::Int16)
            .unwrap(),
    );
    let mut writer = SegyWriter::new(Cursor::new(Vec::new()), headers).unwrap();
    writer
        .write_trace(&Trace::new().with_header("cdp", 1).with_samples(vec![1.0; 4]))
        .unwrap();

    let loud = Trace::new().with_header("cdp", 2).with_samples(vec![1e9; 4]);
    assert!(writer.write_trace(&loud).unwrap_err().is_range());
    let short = Trace::new().with_header("cdp", 2).with_samples(vec![2.0; 3]);
    assert!(matches!(
        writer.write_trace(&short),
        Err(SegError::CountMismatch { declared: 4, actual: 3, .. })
    ));
    writer
        .write_trace(&Trace::new().with_header("cdp", 2).with_samples(vec![2.0; 4]))
        .unwrap();
    assert_eq!(writer.traces_written(), 2);
    let bytes = writer.finish().unwrap().into_inner();

    let mut reader = SegyReader::new(Cursor::new(bytes)).unwrap();
    let read: Vec<Trace> = reader.traces().collect::<seg_rs::Result<_>>().unwrap();
    assert_eq!(read.len(), 2);
    assert_eq!(read[1].header("cdp"), Some(FieldValue::I32(2)));
    assert_eq!(read[1].samples, vec![2.0; 4]);
}
