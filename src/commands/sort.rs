//! Sort a record file by key.
//!
//! Builds the in-memory index, sorts it on the selected backend, and
//! rewrites the records in ascending key order.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::info;
use recsort_lib::format::{sorted_file_name, unsorted_file_name};
use recsort_lib::logging::{format_count, OperationTimer};
use recsort_lib::sort::{Backend, Sorter};

use crate::commands::command::Command;
use crate::commands::common::{SortParams, WorkDirOptions};

/// Execution backend for the index sort.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BackendArg {
    /// Recursive task parallelism (rayon pool, implicit joins)
    Recursive,
    /// Explicit task-graph farm with feedback scheduling
    Farm,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Recursive => Backend::Recursive,
            BackendArg::Farm => Backend::Farm,
        }
    }
}

/// Sort a record file.
///
/// Reads `unsorted_<records>_<payload>.bin` from the working directory and
/// writes `sorted_<records>_<payload>.bin` next to it. Only the fixed-size
/// index lives in RAM; payload bytes are copied once, mapping to mapping.
#[derive(Debug, Parser)]
#[command(
    name = "sort",
    about = "Sort a record file by key via a memory-mapped index",
    long_about = r"
Sort a binary record file by its unsigned 64-bit keys.

The sorter memory-maps the input, builds an index of {key, offset, length}
entries in one linear scan, sorts the index in parallel, and rewrites the
records in sorted order. Peak memory is the index: 24 bytes per record,
independent of payload size.

BACKENDS:

  recursive   Divide-and-conquer tasks on a work-stealing pool. Each range
              splits until the cutoff, siblings sort in parallel, parents
              merge after an implicit join.

  farm        The same merge tree built up front as an explicit task graph
              and fed to a worker farm; finished tasks feed back to an
              emitter that releases parents as their children complete.

Both backends overlap sorting with index construction: leaves wait on a
progress gate until their slice of the index exists (disable with
--no-overlap).

EXAMPLES:

  # Generate then sort 1M records with 8 threads
  recsort generate -n 1000000 -p 256
  recsort sort -n 1000000 -p 256 -t 8 -c 4096

  # Task-graph farm backend, skipping the final verification scan
  recsort sort -n 1000000 -p 256 --backend farm --skip-verify
"
)]
pub struct Sort {
    /// Sort parameters
    #[command(flatten)]
    pub params: SortParams,

    /// Execution backend
    #[arg(long = "backend", value_enum, default_value = "recursive")]
    pub backend: BackendArg,

    /// Build the whole index before sorting instead of overlapping the two
    #[arg(long = "no-overlap", default_value = "false")]
    pub no_overlap: bool,

    /// Skip the post-sort verification scan
    #[arg(long = "skip-verify", default_value = "false")]
    pub skip_verify: bool,

    /// Working directory options
    #[command(flatten)]
    pub work_dir: WorkDirOptions,
}

impl Command for Sort {
    fn execute(&self) -> Result<()> {
        let config = self.params.to_config()?;
        let input = self.work_dir.dir.join(unsorted_file_name(config.records, config.payload_max));
        let output = self.work_dir.dir.join(sorted_file_name(config.records, config.payload_max));

        info!("Input: {}", input.display());
        info!("Output: {}", output.display());
        info!("Backend: {:?}", self.backend);
        info!("Threads: {}", config.resolved_threads());
        info!("Cutoff: {}", config.cutoff);

        let timer = OperationTimer::new("Sorting");
        let stats = Sorter::new()
            .backend(self.backend.into())
            .threads(config.threads)
            .cutoff(config.cutoff)
            .overlap(!self.no_overlap)
            .verify(!self.skip_verify)
            .sort(&input, &output, config.records)?;

        info!("=== Summary ===");
        info!("Records sorted: {}", format_count(stats.records));
        info!("Bytes in: {}", format_count(stats.bytes_in));
        info!("Bytes out: {}", format_count(stats.bytes_out));
        timer.log_completion(stats.records);
        Ok(())
    }
}
