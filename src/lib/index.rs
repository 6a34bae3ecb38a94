//! The in-memory record index and its single-pass builder.
//!
//! Sorting never moves record bytes around; it permutes an array of
//! fixed-size [`IndexEntry`] values, one per record, built in one linear
//! scan over the mapped input. The array owns no payload bytes, so its
//! memory footprint is linear in the record count and independent of
//! payload size.

use bytemuck::Zeroable;

use crate::errors::{RecsortError, Result};
use crate::format::{read_header, record_span};
use crate::gate::ProgressGate;
use crate::progress::ProgressTracker;

/// One record's projection into the index: sort key, byte offset of the
/// record *header* in the mapped input, and payload length.
///
/// `#[repr(C)]` with an explicit padding word so the layout has no implicit
/// padding and the type is `Pod`: index slices cast directly to byte slices
/// for the distributed wire without any per-entry encoding.
#[repr(C)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct IndexEntry {
    /// The sort key.
    pub key: u64,
    /// Byte offset of the record header inside the input file.
    pub offset: u64,
    /// Payload length in bytes.
    pub len: u32,
    pad: u32,
}

impl IndexEntry {
    /// Size in bytes of one entry, in memory and on the wire.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Build an entry.
    #[must_use]
    pub fn new(key: u64, offset: u64, len: u32) -> Self {
        Self { key, offset, len, pad: 0 }
    }

    /// Total on-disk size of the record this entry describes.
    #[must_use]
    pub fn record_span(&self) -> usize {
        record_span(self.len)
    }
}

/// Index storage shared between the builder and concurrent sort tasks.
///
/// During the overlapped phase one builder thread fills slots in ascending
/// order while sort tasks, gated on the filled count, mutate disjoint
/// sub-ranges. Rust's borrow rules cannot express that protocol directly,
/// so this type hands out raw access behind two `unsafe` methods whose
/// contracts restate it:
///
/// - the builder is the only writer of a slot until it has published the
///   slot through [`ProgressGate::notify`];
/// - at most one task holds a given range at a time, and a parent touches a
///   range only after both children covering it have completed (join or
///   completion message).
///
/// Once the parallel phase has joined, [`SharedIndex::into_vec`] returns
/// the plain vector.
pub struct SharedIndex {
    ptr: *mut IndexEntry,
    len: usize,
}

// Access is coordinated by the gate / task-graph protocol documented above.
unsafe impl Send for SharedIndex {}
unsafe impl Sync for SharedIndex {}

impl SharedIndex {
    /// Allocate storage for `len` zeroed entries.
    #[must_use]
    pub fn with_len(len: usize) -> Self {
        Self::from_vec(vec![IndexEntry::zeroed(); len])
    }

    /// Take ownership of an existing entry vector.
    #[must_use]
    pub fn from_vec(entries: Vec<IndexEntry>) -> Self {
        let mut boxed = entries.into_boxed_slice();
        let len = boxed.len();
        let ptr = boxed.as_mut_ptr();
        std::mem::forget(boxed);
        Self { ptr, len }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Write the entry at slot `i`.
    ///
    /// # Safety
    ///
    /// The caller must be the sole writer of slot `i`, and no reader may
    /// observe the slot before a subsequent `ProgressGate::notify` covering
    /// it (the gate's lock provides the happens-before edge).
    pub unsafe fn write_slot(&self, i: usize, entry: IndexEntry) {
        debug_assert!(i < self.len);
        unsafe { self.ptr.add(i).write(entry) };
    }

    /// Mutable view of the inclusive range `[left, right]`.
    ///
    /// # Safety
    ///
    /// The caller must hold this range exclusively: no concurrent task may
    /// access any slot in it, and the builder must already have published
    /// every slot `<= right`.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn range_mut(&self, left: usize, right: usize) -> &mut [IndexEntry] {
        debug_assert!(left <= right && right < self.len);
        unsafe { std::slice::from_raw_parts_mut(self.ptr.add(left), right - left + 1) }
    }

    /// Reclaim the entries once every task referencing the index has joined.
    #[must_use]
    pub fn into_vec(self) -> Vec<IndexEntry> {
        let vec = unsafe { Vec::from_raw_parts(self.ptr, self.len, self.len) };
        std::mem::forget(self);
        vec
    }
}

impl Drop for SharedIndex {
    fn drop(&mut self) {
        drop(unsafe { Vec::from_raw_parts(self.ptr, self.len, self.len) });
    }
}

/// Scan `n` records starting at offset 0, handing each entry to `emit`.
///
/// Fails with a format error naming the record index if the remaining bytes
/// cannot hold the next header or its declared payload.
fn scan_records(data: &[u8], n: u64, mut emit: impl FnMut(u64, IndexEntry)) -> Result<()> {
    let progress = ProgressTracker::new("Indexed records");
    let mut pos = 0usize;
    for i in 0..n {
        let Some((key, len)) = read_header(data, pos) else {
            return Err(RecsortError::Format {
                record: i,
                reason: format!(
                    "header runs past end of file (offset {pos}, file size {})",
                    data.len()
                ),
            });
        };
        let span = record_span(len);
        if data.len() - pos < span {
            return Err(RecsortError::Format {
                record: i,
                reason: format!(
                    "payload of {len} bytes runs past end of file (offset {pos}, file size {})",
                    data.len()
                ),
            });
        }
        emit(i, IndexEntry::new(key, pos as u64, len));
        progress.log_if_needed(1);
        pos += span;
    }
    progress.log_final();
    Ok(())
}

/// Build the index for `n` records in one allocating pass.
pub fn build_index(data: &[u8], n: u64) -> Result<Vec<IndexEntry>> {
    let mut entries = Vec::with_capacity(usize::try_from(n).unwrap_or(0));
    scan_records(data, n, |_, entry| entries.push(entry))?;
    Ok(entries)
}

/// Build the index into pre-allocated shared storage, publishing progress.
///
/// Notifies the gate with `i + 1` after every `notify_every` entries
/// (`notify_every == 0` disables intermediate wakeups) and always posts a
/// final `notify(n)` so every waiter is released — including on the error
/// paths, where waiting sort tasks must not block forever while the error
/// propagates.
pub fn build_index_gated(
    data: &[u8],
    index: &SharedIndex,
    gate: &ProgressGate,
    notify_every: usize,
) -> Result<()> {
    let n = index.len() as u64;
    let result = scan_records(data, n, |i, entry| {
        // Sole writer of this slot; published by the notify below.
        unsafe { index.write_slot(i as usize, entry) };
        let filled = i as usize + 1;
        if notify_every > 0 && filled % notify_every == 0 {
            gate.notify(filled);
        }
    });
    gate.notify(index.len());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{write_header, HEADER_BYTES};

    /// Concatenate records with the given keys, each with a small payload.
    fn encode_records(keys: &[u64], payload_len: u32) -> Vec<u8> {
        let mut data = Vec::new();
        for &key in keys {
            let mut header = [0u8; HEADER_BYTES];
            write_header(&mut header, key, payload_len);
            data.extend_from_slice(&header);
            data.extend(std::iter::repeat_n(key as u8, payload_len as usize));
        }
        data
    }

    #[test]
    fn test_entry_is_pod_sized() {
        assert_eq!(IndexEntry::SIZE, 24);
        let entry = IndexEntry::new(1, 2, 3);
        let bytes: &[u8] = bytemuck::bytes_of(&entry);
        assert_eq!(bytes.len(), IndexEntry::SIZE);
        assert_eq!(bytemuck::pod_read_unaligned::<IndexEntry>(bytes), entry);
    }

    #[test]
    fn test_build_index_offsets_and_keys() {
        let data = encode_records(&[30, 10, 20], 8);
        let index = build_index(&data, 3).unwrap();

        assert_eq!(index.len(), 3);
        assert_eq!(index[0], IndexEntry::new(30, 0, 8));
        assert_eq!(index[1], IndexEntry::new(10, 20, 8));
        assert_eq!(index[2], IndexEntry::new(20, 40, 8));
    }

    #[test]
    fn test_build_index_empty() {
        assert!(build_index(&[], 0).unwrap().is_empty());
    }

    #[test]
    fn test_build_index_truncated_header() {
        let mut data = encode_records(&[1, 2], 8);
        data.truncate(data.len() - 15); // second record loses part of its header
        let err = build_index(&data, 2).unwrap_err();
        match err {
            RecsortError::Format { record, reason } => {
                assert_eq!(record, 1);
                assert!(reason.contains("header"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_build_index_truncated_payload() {
        let mut data = encode_records(&[1], 64);
        data.truncate(data.len() - 1);
        let err = build_index(&data, 1).unwrap_err();
        match err {
            RecsortError::Format { record, reason } => {
                assert_eq!(record, 0);
                assert!(reason.contains("payload"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_build_index_gated_notifies_and_fills() {
        let data = encode_records(&[5, 4, 3, 2, 1], 8);
        let index = SharedIndex::with_len(5);
        let gate = ProgressGate::new();

        build_index_gated(&data, &index, &gate, 2).unwrap();

        assert_eq!(gate.filled(), 5);
        let entries = index.into_vec();
        assert_eq!(entries[0].key, 5);
        assert_eq!(entries[4].key, 1);
        assert_eq!(entries[4].offset, 4 * 20);
    }

    #[test]
    fn test_build_index_gated_releases_waiters_on_error() {
        let mut data = encode_records(&[9, 8], 8);
        data.truncate(HEADER_BYTES + 8 + 3);
        let index = SharedIndex::with_len(2);
        let gate = ProgressGate::new();

        assert!(build_index_gated(&data, &index, &gate, 1).is_err());
        // Final notify still ran: a waiter for the full range would wake.
        assert_eq!(gate.filled(), 2);
    }

    #[test]
    fn test_shared_index_round_trip() {
        let entries = vec![IndexEntry::new(1, 0, 8), IndexEntry::new(2, 20, 8)];
        let shared = SharedIndex::from_vec(entries.clone());
        assert_eq!(shared.len(), 2);
        assert_eq!(shared.into_vec(), entries);
    }
}
