//! Verify that a record file is sorted.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;
use recsort_lib::format::sorted_file_name;
use recsort_lib::logging::OperationTimer;
use recsort_lib::verify::check_sorted_file;

use crate::commands::command::Command;
use crate::commands::common::WorkDirOptions;

/// Scan a record file and check ascending key order.
///
/// Walks all records front to back and fails on the first adjacent pair of
/// keys out of order, or on any record that does not parse.
#[derive(Debug, Parser)]
#[command(name = "verify", about = "Check that a record file is sorted by key")]
pub struct Verify {
    /// Number of records the file must hold
    #[arg(short = 'n', long = "records")]
    pub records: u64,

    /// Maximum payload size used when the file was produced (for naming)
    #[arg(short = 'p', long = "payload", default_value = "256")]
    pub payload: u32,

    /// Explicit file to check (defaults to the sorted file in the work dir)
    #[arg(short = 'f', long = "file")]
    pub file: Option<PathBuf>,

    /// Working directory options
    #[command(flatten)]
    pub work_dir: WorkDirOptions,
}

impl Command for Verify {
    fn execute(&self) -> Result<()> {
        let path = match &self.file {
            Some(path) => path.clone(),
            None => self.work_dir.dir.join(sorted_file_name(self.records, self.payload)),
        };
        info!("Verifying: {}", path.display());

        let timer = OperationTimer::new("Verifying order");
        check_sorted_file(&path, self.records)?;
        timer.log_completion(self.records);
        Ok(())
    }
}
