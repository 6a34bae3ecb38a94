//! Second pass: rewrite records in sorted order.
//!
//! Guided by the sorted index, copies each record — header and payload in
//! one block — from the read-only input mapping to the next cursor position
//! in the output mapping. The output was created at its exact pre-computed
//! size, so the cursor lands exactly at the end.

use std::path::Path;

use log::info;

use crate::errors::{RecsortError, Result};
use crate::format::{InputFile, OutputFile};
use crate::index::IndexEntry;
use crate::logging::format_count;

/// Exact output size for a sorted index: `sum(12 + len_i)`.
#[must_use]
pub fn output_size(index: &[IndexEntry]) -> u64 {
    index.iter().map(|entry| entry.record_span() as u64).sum()
}

/// Copy records from `input` into `output` in index order.
///
/// `output` must be exactly [`output_size`] bytes. Every entry is
/// bounds-checked against the input mapping; an entry pointing outside it
/// is a fatal format violation (the index no longer describes the file).
pub fn rewrite(input: &[u8], index: &[IndexEntry], output: &mut [u8]) -> Result<()> {
    let mut cursor = 0usize;
    for (i, entry) in index.iter().enumerate() {
        let span = entry.record_span();
        let start = usize::try_from(entry.offset).map_err(|_| RecsortError::Format {
            record: i as u64,
            reason: format!("offset {} does not fit in memory", entry.offset),
        })?;
        let end = start.checked_add(span).filter(|&end| end <= input.len()).ok_or_else(|| {
            RecsortError::Format {
                record: i as u64,
                reason: format!(
                    "index entry spans [{start}, {}) beyond input of {} bytes",
                    start.wrapping_add(span),
                    input.len()
                ),
            }
        })?;

        output[cursor..cursor + span].copy_from_slice(&input[start..end]);
        cursor += span;
    }
    debug_assert_eq!(cursor, output.len());
    Ok(())
}

/// Create the output file next to the mapped input and rewrite into it.
///
/// Returns the number of bytes written.
pub fn rewrite_to_file(input: &InputFile, index: &[IndexEntry], out_path: &Path) -> Result<u64> {
    let size = output_size(index);
    let mut output = OutputFile::create(out_path, size)?;
    rewrite(input.bytes(), index, output.bytes_mut())?;
    output.flush()?;
    info!(
        "Rewrote {} records ({} bytes) to {}",
        format_count(index.len() as u64),
        format_count(size),
        out_path.display()
    );
    Ok(size)
}
