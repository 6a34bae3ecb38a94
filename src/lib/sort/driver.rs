//! Top-level single-process sort driver.
//!
//! Owns everything the sort needs — the input mapping, the shared index,
//! the gate — and hands references to the chosen backend, so workers never
//! reach through process-wide state.

use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use super::farm::TaskGraphFarm;
use super::task_sort::merge_sort;
use crate::errors::Result as LibResult;
use crate::format::InputFile;
use crate::gate::ProgressGate;
use crate::index::{build_index, build_index_gated, IndexEntry, SharedIndex};
use crate::logging::format_count;
use crate::rewrite::rewrite_to_file;
use crate::verify::check_sorted_file;

/// Which execution backend sorts the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Recursive task parallelism with an implicit join between siblings.
    #[default]
    Recursive,
    /// Explicit task-graph farm with feedback scheduling.
    Farm,
}

/// Statistics from a sort run.
#[derive(Debug, Default)]
pub struct SortStats {
    /// Records processed.
    pub records: u64,
    /// Input file size in bytes.
    pub bytes_in: u64,
    /// Output file size in bytes (equals `bytes_in` for well-formed input).
    pub bytes_out: u64,
}

/// Sorter for binary record files.
pub struct Sorter {
    backend: Backend,
    threads: usize,
    cutoff: usize,
    overlap: bool,
    verify: bool,
}

impl Default for Sorter {
    fn default() -> Self {
        Self::new()
    }
}

impl Sorter {
    /// Create a sorter with default settings: recursive backend, host
    /// parallelism, cutoff of 10,000 records, overlapped index build.
    #[must_use]
    pub fn new() -> Self {
        Self { backend: Backend::Recursive, threads: 0, cutoff: 10_000, overlap: true, verify: false }
    }

    /// Select the execution backend.
    #[must_use]
    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Set the worker-pool size (0 means host parallelism).
    #[must_use]
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set the leaf threshold in records (also the gate notify stride).
    #[must_use]
    pub fn cutoff(mut self, cutoff: usize) -> Self {
        self.cutoff = cutoff.max(1);
        self
    }

    /// Overlap index construction with sorting (on by default).
    #[must_use]
    pub fn overlap(mut self, overlap: bool) -> Self {
        self.overlap = overlap;
        self
    }

    /// Run the verification scan over the output after rewriting.
    #[must_use]
    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Sort `records` records from `input` into `output`.
    pub fn sort(&self, input: &Path, output: &Path, records: u64) -> Result<SortStats> {
        info!("Sorting {} records from {}", format_count(records), input.display());
        info!("Backend: {:?}, cutoff: {}, overlap: {}", self.backend, self.cutoff, self.overlap);

        let mapped = InputFile::open(input)?;
        let index = self
            .sort_index(&mapped, records)
            .with_context(|| format!("sorting index of '{}'", input.display()))?;

        let bytes_out = rewrite_to_file(&mapped, &index, output)?;
        if self.verify {
            check_sorted_file(output, records)?;
        }

        Ok(SortStats { records, bytes_in: mapped.len() as u64, bytes_out })
    }

    /// Build and sort the index for a mapped input.
    pub fn sort_index(&self, input: &InputFile, records: u64) -> Result<Vec<IndexEntry>> {
        let n = usize::try_from(records).context("record count exceeds address space")?;

        let index = if self.overlap {
            self.sort_overlapped(input.bytes(), n)?
        } else {
            let entries = build_index(input.bytes(), records)?;
            self.sort_entries(entries)?
        };

        debug_assert_eq!(index.len(), n);
        Ok(index)
    }

    /// Sort an already-built index (used for distributed slices, where the
    /// entries arrive over the wire rather than from a scan).
    pub fn sort_entries(&self, entries: Vec<IndexEntry>) -> Result<Vec<IndexEntry>> {
        let n = entries.len();
        let shared = SharedIndex::from_vec(entries);
        let gate = ProgressGate::filled_to(n);
        self.run_backend(&shared, &gate, None)?;
        Ok(shared.into_vec())
    }

    /// Build the index while sorting, the builder publishing through the gate.
    fn sort_overlapped(&self, data: &[u8], n: usize) -> Result<Vec<IndexEntry>> {
        let shared = SharedIndex::with_len(n);
        let gate = ProgressGate::new();
        self.run_backend(&shared, &gate, Some(data))?;
        Ok(shared.into_vec())
    }

    /// Dispatch to the configured backend.
    ///
    /// With `scan = Some(data)` the index is built concurrently: the farm
    /// runs the scan as its `BuildIndex` task, while the recursive backend
    /// dedicates a plain thread outside the rayon pool so gate-blocked
    /// leaves can never starve the builder.
    fn run_backend(
        &self,
        shared: &SharedIndex,
        gate: &ProgressGate,
        scan: Option<&[u8]>,
    ) -> Result<()> {
        match self.backend {
            Backend::Recursive => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(self.threads)
                    .build()
                    .context("building rayon pool")?;

                let mut scan_result: LibResult<()> = Ok(());
                std::thread::scope(|scope| {
                    if let Some(data) = scan {
                        scope.spawn(|| {
                            scan_result = build_index_gated(data, shared, gate, self.cutoff);
                        });
                    }
                    pool.install(|| merge_sort(shared, self.cutoff, gate));
                });
                scan_result?;
            }
            Backend::Farm => {
                let mut farm = TaskGraphFarm::new(shared, gate)
                    .cutoff(self.cutoff)
                    .workers(self.resolved_threads());
                if let Some(data) = scan {
                    farm = farm.overlap_scan(data);
                }
                farm.run()?;
            }
        }
        Ok(())
    }

    fn resolved_threads(&self) -> usize {
        if self.threads > 0 {
            self.threads
        } else {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        }
    }
}
