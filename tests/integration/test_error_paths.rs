//! Fatal-error paths: truncated input, unsorted output, missing files.

use recsort_lib::errors::RecsortError;
use recsort_lib::format::{write_header, HEADER_BYTES};
use recsort_lib::sort::Sorter;
use recsort_lib::verify::check_sorted_file;
use tempfile::TempDir;

use crate::helpers::{encode, keyed_records, write_record_file};

#[test]
fn test_missing_input_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = Sorter::new()
        .sort(&dir.path().join("absent.bin"), &dir.path().join("out.bin"), 10)
        .unwrap_err();
    let root = err.downcast_ref::<RecsortError>().expect("library error");
    assert!(matches!(root, RecsortError::Io { op: "open", .. }));
}

#[test]
fn test_record_count_larger_than_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("unsorted.bin");
    let output = dir.path().join("sorted.bin");
    write_record_file(&input, &[1, 2, 3]);

    // Claim 5 records; the scan must fail at record 3.
    let err = Sorter::new().sort(&input, &output, 5).unwrap_err();
    let root = err.downcast_ref::<RecsortError>().expect("library error");
    assert!(matches!(root, RecsortError::Format { record: 3, .. }));
}

#[test]
fn test_payload_overruns_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("unsorted.bin");
    let output = dir.path().join("sorted.bin");

    let mut data = Vec::new();
    let mut header = [0u8; HEADER_BYTES];
    write_header(&mut header, 9, 1_000); // declares far more payload than exists
    data.extend_from_slice(&header);
    data.extend_from_slice(&[0u8; 16]);
    std::fs::write(&input, &data).unwrap();

    let err = Sorter::new().sort(&input, &output, 1).unwrap_err();
    let root = err.downcast_ref::<RecsortError>().expect("library error");
    assert!(matches!(root, RecsortError::Format { record: 0, .. }));
}

#[test]
fn test_verification_flags_unsorted_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("claims_sorted.bin");
    std::fs::write(&path, encode(&keyed_records(&[5, 1, 9]))).unwrap();

    let err = check_sorted_file(&path, 3).unwrap_err();
    match err {
        RecsortError::Unsorted { record, key, prev_key } => {
            assert_eq!(record, 1);
            assert_eq!(key, 1);
            assert_eq!(prev_key, 5);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_verification_flags_truncation() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("short.bin");
    let mut data = encode(&keyed_records(&[1, 2]));
    data.truncate(data.len() - 4);
    std::fs::write(&path, &data).unwrap();

    let err = check_sorted_file(&path, 2).unwrap_err();
    assert!(matches!(err, RecsortError::Format { record: 1, .. }));
}
