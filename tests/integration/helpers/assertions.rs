//! Shared assertions over record files.

use super::record_files::decode;

/// Assert the file holds `n` records in ascending key order.
pub fn assert_sorted_records(data: &[u8], n: u64) {
    recsort_lib::verify::check_sorted(data, n).expect("output must verify as sorted");
    assert_eq!(decode(data).len() as u64, n, "record count must be conserved");
}

/// Assert two files carry the same multiset of records (byte conservation:
/// every record appears exactly once, unchanged).
pub fn assert_same_records(input: &[u8], output: &[u8]) {
    assert_eq!(input.len(), output.len(), "total byte count must match");
    let mut a = decode(input);
    let mut b = decode(output);
    a.sort();
    b.sort();
    assert_eq!(a, b, "output must be a permutation of the input records");
}
