//! Post-sort verification scan.
//!
//! Walks a record file front to back, checking that every record parses and
//! that adjacent keys never decrease. The first violation aborts with the
//! offending record index; there is no partial-result mode.

use std::path::Path;

use log::info;

use crate::errors::{RecsortError, Result};
use crate::format::{read_header, record_span, InputFile};
use crate::logging::format_count;

/// Check that `data` holds `n` well-formed records in ascending key order.
pub fn check_sorted(data: &[u8], n: u64) -> Result<()> {
    let mut pos = 0usize;
    let mut prev_key = 0u64;

    for i in 0..n {
        let Some((key, len)) = read_header(data, pos) else {
            return Err(RecsortError::Format {
                record: i,
                reason: format!("unexpected end of file at offset {pos}"),
            });
        };
        let span = record_span(len);
        if data.len() - pos < span {
            return Err(RecsortError::Format {
                record: i,
                reason: format!("payload of {len} bytes runs past end of file"),
            });
        }
        if i > 0 && key < prev_key {
            return Err(RecsortError::Unsorted { record: i, key, prev_key });
        }
        prev_key = key;
        pos += span;
    }

    Ok(())
}

/// Map the file at `path` and verify it holds `n` sorted records.
pub fn check_sorted_file(path: &Path, n: u64) -> Result<()> {
    let input = InputFile::open(path)?;
    check_sorted(input.bytes(), n)?;
    info!("{} is sorted ({} records)", path.display(), format_count(n));
    Ok(())
}
