//! Grouping traces of both formats by a header field.

use std::io::Cursor;

use seg_rs::segd::{ChannelSetHeader, GeneralHeader, SegdHeaders, SegdReader, SegdWriter};
use seg_rs::segy::{BinaryHeader, SegyHeaders, SegyReader, SegyWriter, TextEncoding, TextualHeader};
use seg_rs::{FieldValue, SortedIndex, Trace};

fn segy(shots: &[i32]) -> SegyReader<Cursor<Vec<u8>>> {
    let headers = SegyHeaders::new(
        TextualHeader::from_lines(&["C 1 SHOT GATHERS"], TextEncoding::Ascii),
        BinaryHeader::new().with_sample_interval(2000),
    );
    let mut writer = SegyWriter::new(Cursor::new(Vec::new()), headers).unwrap();
    for (i, shot) in shots.iter().enumerate() {
        let trace = Trace::new()
            .with_header("energy_source_point", *shot)
            .with_header("trace_sequence_file", i as i32 + 1)
            .with_samples(vec![i as f64; 8]);
        writer.write_trace(&trace).unwrap();
    }
    SegyReader::new(Cursor::new(writer.finish().unwrap().into_inner())).unwrap()
}

#[test]
fn bounded_gather_keeps_file_order() {
    let shots = [4, 9, 4, 4, 2, 4, 9, 4, 4, 4, 2];
    let mut index = SortedIndex::build(segy(&shots), "energy_source_point").unwrap();
    let key = FieldValue::I32(4);
    assert_eq!(index.trace_count_for(&key), 7);

    let gather = index.traces_for(&key, 5).unwrap();
    assert_eq!(gather.len(), 5);
    assert!(gather.iter().all(|t| t.header("energy_source_point") == Some(key)));
    let sequence: Vec<i64> = gather
        .iter()
        .map(|t| t.header("trace_sequence_file").unwrap().as_i64().unwrap())
        .collect();
    assert_eq!(sequence, vec![1, 3, 4, 6, 8]);
    assert_eq!(gather[1].samples, vec![2.0; 8]);

    assert_eq!(index.traces_for(&FieldValue::I32(2), 5).unwrap().len(), 2);
}

#[test]
fn every_trace_indexed_once() {
    let shots = [1, 3, 3, 1, 5, 3];
    let mut index = SortedIndex::build(segy(&shots), "energy_source_point").unwrap();
    let keys: Vec<FieldValue> = index.keys().copied().collect();
    assert_eq!(keys, vec![FieldValue::I32(1), FieldValue::I32(3), FieldValue::I32(5)]);
    let total: usize = keys.iter().map(|k| index.trace_count_for(k)).sum();
    assert_eq!(total, shots.len());

    let mut walked = Vec::new();
    while index.has_next() {
        let headers = index.next_header().unwrap();
        walked.push(headers["energy_source_point"]);
    }
    assert_eq!(walked.len(), shots.len());
    assert!(walked.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn segd_record_by_channel_set() {
    let mut headers = SegdHeaders::new(GeneralHeader::new(3, 0));
    headers.general.block1.channel_sets = Some(2);
    headers.channel_sets = vec![
        ChannelSetHeader::new(3, 1, 1)
            .with_channels(3)
            .with_samples(4, 1000),
        ChannelSetHeader::new(3, 1, 2)
            .with_channels(2)
            .with_samples(6, 500),
    ];
    let mut writer = SegdWriter::new(Cursor::new(Vec::new()), headers).unwrap();
    let order = [(1u64, 1u64), (2, 1), (1, 2), (2, 2), (1, 3)];
    for (set, number) in order {
        let n = if set == 1 { 4 } else { 6 };
        let trace = Trace::new()
            .with_header("scan_type", 1u64)
            .with_header("channel_set", set)
            .with_header("trace_number", number)
            .with_samples(vec![set as f64 * 10.0 + number as f64; n]);
        writer.write_trace(&trace).unwrap();
    }
    let bytes = writer.finish().unwrap().into_inner();

    let reader = SegdReader::new(Cursor::new(bytes)).unwrap();
    let mut index = SortedIndex::build(reader, "channel_set").unwrap();
    assert_eq!(index.len(), 5);
    assert_eq!(index.trace_count_for(&FieldValue::U64(1)), 3);

    let second = index.traces_for(&FieldValue::U64(2), 10).unwrap();
    let samples: Vec<Vec<f64>> = second.iter().map(|t| t.samples.clone()).collect();
    assert_eq!(samples, vec![vec![21.0; 6], vec![22.0; 6]]);

    let headers = index.headers_for(&FieldValue::U64(1), 2).unwrap();
    let numbers: Vec<_> = headers.iter().map(|h| h["trace_number"]).collect();
    assert_eq!(numbers, vec![FieldValue::U64(1), FieldValue::U64(2)]);
}
