//! The distributed rank driver: one-shot scatter, local sort, pairwise
//! merge tree.
//!
//! Rank 0 has exclusive access to the input file. It builds the index in a
//! single streaming scan and ships each rank's contiguous slice the moment
//! the scan completes it, so index construction overlaps distribution.
//! Every rank sorts its slice with its local threads, then `ceil(log2 P)`
//! pairwise rounds fold the sorted slices together: in round `r` each rank
//! pairs with `rank XOR 2^r`, the lower rank of the aligned block receives
//! its partner's entire holdings into a buffer sized from the schedule,
//! concatenates `[mine || partner]`, and merges the two adjacent sorted
//! runs in place. Senders go inactive for all later rounds. After the last
//! round rank 0 holds the full sorted index and rewrites the output.

use std::path::Path;

use anyhow::{Context, Result};
use bytemuck::Zeroable;
use log::info;

use super::comm::Communicator;
use super::schedule::{
    is_receiver, merge_tag, partner, rounds, slice_count, subtree_count, TAG_SLICE,
};
use crate::config::SortConfig;
use crate::errors::RecsortError;
use crate::format::{sorted_file_name, unsorted_file_name, InputFile};
use crate::index::IndexEntry;
use crate::logging::{format_count, OperationTimer};
use crate::progress::ProgressTracker;
use crate::rewrite::rewrite_to_file;
use crate::sort::merge::merge_adjacent;
use crate::sort::{Backend, SortStats, Sorter};
use crate::verify::check_sorted_file;

/// Root-side scatter: scan the mapped input once and send slice `r` to rank
/// `r` as soon as its last record has been indexed. Returns the root's own
/// slice (kept locally, never sent).
pub fn scatter_index<C: Communicator>(
    comm: &mut C,
    data: &[u8],
    n: u64,
) -> crate::errors::Result<Vec<IndexEntry>> {
    let world = comm.world_size();
    let progress = ProgressTracker::new("Indexed records");
    let mut local = Vec::new();
    let mut pos = 0usize;
    let mut record = 0u64;

    for rank in 0..world {
        let count = slice_count(n, world, rank);
        let mut slice = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let Some((key, len)) = crate::format::read_header(data, pos) else {
                return Err(RecsortError::Format {
                    record,
                    reason: format!("header runs past end of file (offset {pos})"),
                });
            };
            let span = crate::format::record_span(len);
            if data.len() - pos < span {
                return Err(RecsortError::Format {
                    record,
                    reason: format!("payload of {len} bytes runs past end of file (offset {pos})"),
                });
            }
            slice.push(IndexEntry::new(key, pos as u64, len));
            progress.log_if_needed(1);
            pos += span;
            record += 1;
        }
        if rank == 0 {
            local = slice;
        } else {
            comm.send_entries(rank, TAG_SLICE, &slice)?;
        }
    }
    progress.log_final();

    Ok(local)
}

/// Non-root side of the scatter: one receive, pre-sized from the schedule.
pub fn receive_slice<C: Communicator>(comm: &mut C, n: u64) -> crate::errors::Result<Vec<IndexEntry>> {
    let count = slice_count(n, comm.world_size(), comm.rank());
    let mut slice = vec![IndexEntry::zeroed(); count as usize];
    comm.recv_entries(0, TAG_SLICE, &mut slice)?;
    Ok(slice)
}

/// Run the pairwise merge rounds over this rank's sorted slice.
///
/// Returns the merged holdings: all `n` entries on rank 0, empty on every
/// rank that sent its data away.
pub fn pairwise_merge<C: Communicator>(
    comm: &mut C,
    mut local: Vec<IndexEntry>,
    n: u64,
) -> crate::errors::Result<Vec<IndexEntry>> {
    let world = comm.world_size();
    let rank = comm.rank();

    for round in 0..rounds(world) {
        let partner = partner(rank, round);
        if partner >= world {
            continue;
        }

        if is_receiver(rank, round) {
            let expected = subtree_count(partner, round, n, world) as usize;
            if expected == 0 {
                continue;
            }
            let mut incoming = vec![IndexEntry::zeroed(); expected];
            comm.recv_entries(partner, merge_tag(round), &mut incoming)?;

            if local.is_empty() {
                local = incoming;
            } else {
                // Concatenate so the two sorted runs are adjacent, then
                // reuse the in-place merge.
                let mid = local.len();
                local.extend_from_slice(&incoming);
                merge_adjacent(&mut local, mid);
            }
        } else {
            if !local.is_empty() {
                comm.send_entries(partner, merge_tag(round), &local)?;
            }
            local = Vec::new();
            break; // inactive for all remaining rounds
        }
    }

    Ok(local)
}

/// Per-rank driver for a distributed sort.
pub struct RankDriver {
    config: SortConfig,
    backend: Backend,
    verify: bool,
}

impl RankDriver {
    /// Create a driver for the given configuration.
    #[must_use]
    pub fn new(config: SortConfig) -> Self {
        Self { config, backend: Backend::Recursive, verify: false }
    }

    /// Select the local sort backend.
    #[must_use]
    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Run the verification scan on rank 0 after rewriting.
    #[must_use]
    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Run this rank to completion.
    ///
    /// `work_dir` holds the input and output files; only rank 0 touches it.
    /// Returns the sort statistics on rank 0 and `None` elsewhere.
    pub fn run<C: Communicator>(&self, comm: &mut C, work_dir: &Path) -> Result<Option<SortStats>> {
        let rank = comm.rank();
        let world = comm.world_size();
        let n = self.config.records;
        info!(
            "rank {rank}/{world}: {} records, {} local threads",
            format_count(n),
            self.config.resolved_threads()
        );

        // Phase 1: one-shot index distribution.
        let input = if rank == 0 {
            Some(InputFile::open(
                work_dir.join(unsorted_file_name(n, self.config.payload_max)),
            )?)
        } else {
            None
        };
        let local = match &input {
            Some(input) => {
                let timer = OperationTimer::new("Building and scattering index");
                let local = scatter_index(comm, input.bytes(), n)?;
                timer.log_completion(n);
                local
            }
            None => receive_slice(comm, n)?,
        };

        // Phase 2: local sort on this rank's threads.
        let sorter = Sorter::new()
            .backend(self.backend)
            .threads(self.config.threads)
            .cutoff(self.config.cutoff);
        let local = sorter
            .sort_entries(local)
            .with_context(|| format!("rank {rank}: local sort"))?;

        // Phase 3: pairwise merge tree.
        let merged = pairwise_merge(comm, local, n)?;

        // Phase 4: rank 0 rewrites and verifies.
        if rank != 0 {
            return Ok(None);
        }
        debug_assert_eq!(merged.len() as u64, n);
        let input = input.expect("rank 0 mapped the input above");
        let out_path = work_dir.join(sorted_file_name(n, self.config.payload_max));
        let bytes_out = rewrite_to_file(&input, &merged, &out_path)?;
        if self.verify {
            check_sorted_file(&out_path, n)?;
        }
        Ok(Some(SortStats { records: n, bytes_in: input.len() as u64, bytes_out }))
    }
}
