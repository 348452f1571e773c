// Wire-format checks against the documented layout: 16-byte magic, the
// target length as little-endian i64, then one bzip2 stream of records.
// The record stream is re-parsed here with an independent decoder so the
// assertions do not depend on engine internals.

use std::io::Read;

use bsdelta::{diff, diff_with_options, DiffOptions};
use bzip2::read::BzDecoder;

const MAGIC: &[u8; 16] = b"BSDELTA-PATCH-01";

#[derive(Debug)]
struct RawRecord {
    ctrl: i64,
    diff_len: i64,
    extra_len: i64,
    diff_stream: Vec<u8>,
    extra_stream: Vec<u8>,
}

fn offtin(buf: &[u8]) -> i64 {
    let raw = u64::from_le_bytes(buf.try_into().expect("slice is 8 bytes"));
    let magnitude = (raw & !(1 << 63)) as i64;
    if raw & (1 << 63) != 0 {
        -magnitude
    } else {
        magnitude
    }
}

fn parse_patch(patch: &[u8]) -> (i64, Vec<RawRecord>) {
    assert!(patch.len() >= 24, "patch shorter than its header");
    assert_eq!(&patch[..16], MAGIC, "bad magic");
    let target_len = i64::from_le_bytes(patch[16..24].try_into().expect("slice is 8 bytes"));

    let mut payload = Vec::new();
    BzDecoder::new(&patch[24..])
        .read_to_end(&mut payload)
        .expect("payload is a valid bzip2 stream");

    let mut records = Vec::new();
    let mut at = 0usize;
    let mut covered = 0i64;
    while covered < target_len {
        let ctrl = offtin(&payload[at..at + 8]);
        let diff_len = offtin(&payload[at + 8..at + 16]);
        let extra_len = offtin(&payload[at + 16..at + 24]);
        at += 24;
        assert!(ctrl >= 0 && diff_len >= 0, "negative record lengths");
        let diff_stream = payload[at..at + ctrl as usize].to_vec();
        at += ctrl as usize;
        let extra_stream = payload[at..at + diff_len as usize].to_vec();
        at += diff_len as usize;
        covered += ctrl + diff_len;
        records.push(RawRecord {
            ctrl,
            diff_len,
            extra_len,
            diff_stream,
            extra_stream,
        });
    }
    assert_eq!(covered, target_len, "records do not cover the target");
    assert_eq!(at, payload.len(), "trailing bytes after the last record");
    (target_len, records)
}

fn diff_to_vec(source: &[u8], target: &[u8]) -> Vec<u8> {
    let mut patch = Vec::new();
    diff(source, target, &mut patch).unwrap();
    patch
}

#[test]
fn header_layout() {
    let patch = diff_to_vec(b"abc", b"abcdef");
    assert_eq!(&patch[..16], MAGIC);
    assert_eq!(
        i64::from_le_bytes(patch[16..24].try_into().unwrap()),
        6,
        "header carries the target length"
    );
}

#[test]
fn empty_source_is_one_literal_record() {
    let (len, records) = parse_patch(&diff_to_vec(b"", b"hello"));
    assert_eq!(len, 5);
    assert_eq!(records.len(), 1);
    let rec = &records[0];
    assert_eq!((rec.ctrl, rec.diff_len, rec.extra_len), (0, 5, 0));
    assert_eq!(rec.extra_stream, b"hello");
}

#[test]
fn identical_inputs_are_one_zero_diff_record() {
    let (len, records) = parse_patch(&diff_to_vec(b"hello", b"hello"));
    assert_eq!(len, 5);
    assert_eq!(records.len(), 1);
    let rec = &records[0];
    assert_eq!((rec.ctrl, rec.diff_len), (5, 0));
    assert!(
        rec.diff_stream.iter().all(|&b| b == 0),
        "diff stream must be all zero for identical inputs"
    );
}

#[test]
fn single_substitution_diff_stream() {
    let (len, records) = parse_patch(&diff_to_vec(b"abcdefgh", b"abcXefgh"));
    assert_eq!(len, 8);
    let total: i64 = records.iter().map(|r| r.ctrl + r.diff_len).sum();
    assert_eq!(total, 8);
    // The whole target is one fuzzy copy whose diff stream carries the
    // substitution delta at offset 3.
    assert_eq!(records.len(), 1);
    let expected: Vec<u8> = vec![0, 0, 0, b'X'.wrapping_sub(b'd'), 0, 0, 0, 0];
    assert_eq!(records[0].diff_stream, expected);
}

#[test]
fn identity_table_single_flip_has_one_nonzero_diff_byte() {
    let source: Vec<u8> = (0u8..=255).collect();
    let mut target = source.clone();
    target[128] = 0xFF;
    let (_, records) = parse_patch(&diff_to_vec(&source, &target));
    let nonzero: usize = records
        .iter()
        .flat_map(|r| r.diff_stream.iter())
        .filter(|&&b| b != 0)
        .count();
    assert_eq!(nonzero, 1, "exactly one diff-stream byte differs");
}

#[test]
fn coverage_invariant_on_larger_inputs() {
    let mut s = 97u64;
    let source: Vec<u8> = (0..100_000)
        .map(|_| {
            s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
            (s >> 33) as u8
        })
        .collect();
    let mut target = source.clone();
    for i in (0..target.len()).step_by(1_000) {
        target[i] = target[i].wrapping_add(1);
    }
    let opts = DiffOptions {
        threads: 4,
        ..Default::default()
    };
    let mut patch = Vec::new();
    diff_with_options(&source, &target, &mut patch, &opts).unwrap();
    let (len, records) = parse_patch(&patch);
    assert_eq!(len, target.len() as i64);
    let total: i64 = records.iter().map(|r| r.ctrl + r.diff_len).sum();
    assert_eq!(total, len, "ctrl + diff_len must sum to the target length");
}

#[test]
fn empty_target_patch_has_no_records() {
    let (len, records) = parse_patch(&diff_to_vec(b"whatever", b""));
    assert_eq!(len, 0);
    assert!(records.is_empty());
}
