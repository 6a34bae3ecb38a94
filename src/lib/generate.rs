//! Deterministic test-data generation.
//!
//! Produces an unsorted input file in the record format: random keys,
//! random payload lengths in `[8, payload_max]`, random payload bytes. The
//! generator is seeded, so a `(seed, records, payload_max)` triple always
//! yields the same file. Lengths are drawn up front so the file can be
//! created at its exact size and filled through a writable mapping.

use std::path::{Path, PathBuf};

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::errors::Result;
use crate::format::{record_span, unsorted_file_name, write_header, OutputFile, HEADER_BYTES, MIN_PAYLOAD};
use crate::logging::format_count;

/// Default RNG seed, fixed so benchmark inputs are reproducible.
pub const DEFAULT_SEED: u64 = 42;

/// Generate `records` random records into `dir`, returning the file path.
///
/// Keys are uniform in `[0, i32::MAX]`; payload lengths uniform in
/// `[8, payload_max]`.
pub fn generate_unsorted_file(
    dir: &Path,
    records: u64,
    payload_max: u32,
    seed: u64,
) -> Result<PathBuf> {
    let path = dir.join(unsorted_file_name(records, payload_max));
    let mut rng = StdRng::seed_from_u64(seed);
    let payload_max = payload_max.max(MIN_PAYLOAD);

    // Draw keys and lengths first so the exact file size is known.
    let count = usize::try_from(records).unwrap_or(0);
    let mut keys: Vec<u64> = Vec::with_capacity(count);
    let mut lens: Vec<u32> = Vec::with_capacity(count);
    let mut exact_size = 0u64;
    for _ in 0..records {
        let key = rng.random_range(0..=i32::MAX as u64);
        let len = rng.random_range(MIN_PAYLOAD..=payload_max);
        keys.push(key);
        lens.push(len);
        exact_size += record_span(len) as u64;
    }

    let mut output = OutputFile::create(&path, exact_size)?;
    let map = output.bytes_mut();

    let mut offset = 0usize;
    for (&key, &len) in keys.iter().zip(&lens) {
        write_header(&mut map[offset..offset + HEADER_BYTES], key, len);
        rng.fill(&mut map[offset + HEADER_BYTES..offset + record_span(len)]);
        offset += record_span(len);
    }
    output.flush()?;

    info!(
        "Generated {} ({} records, {} bytes)",
        path.display(),
        format_count(records),
        format_count(exact_size)
    );
    Ok(path)
}
