//! Record-file construction for tests.

use std::path::Path;

use recsort_lib::format::{write_header, HEADER_BYTES};

/// A decoded record: key and payload bytes.
pub type Record = (u64, Vec<u8>);

/// Build records for the given keys with deterministic, varied payloads.
///
/// Payload length depends on the key (between 8 and 24 bytes) so offset
/// arithmetic gets exercised with real variable-length data.
pub fn keyed_records(keys: &[u64]) -> Vec<Record> {
    keys.iter()
        .map(|&key| {
            let len = 8 + (key % 17) as usize;
            let payload = (0..len).map(|i| (key as u8).wrapping_add(i as u8)).collect();
            (key, payload)
        })
        .collect()
}

/// Encode records into the on-disk format.
pub fn encode(records: &[Record]) -> Vec<u8> {
    let mut data = Vec::new();
    for (key, payload) in records {
        let mut header = [0u8; HEADER_BYTES];
        write_header(&mut header, *key, payload.len() as u32);
        data.extend_from_slice(&header);
        data.extend_from_slice(payload);
    }
    data
}

/// Decode a record file; panics on malformed input (test data is trusted).
pub fn decode(data: &[u8]) -> Vec<Record> {
    let mut records = Vec::new();
    let mut pos = 0;
    while pos < data.len() {
        let (key, len) = recsort_lib::format::read_header(data, pos).expect("well-formed record");
        let start = pos + HEADER_BYTES;
        records.push((key, data[start..start + len as usize].to_vec()));
        pos = start + len as usize;
    }
    records
}

/// Write records for `keys` to `path`, returning the encoded bytes.
pub fn write_record_file(path: &Path, keys: &[u64]) -> Vec<u8> {
    let data = encode(&keyed_records(keys));
    std::fs::write(path, &data).expect("write test input");
    data
}
