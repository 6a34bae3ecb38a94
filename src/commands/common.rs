//! Common CLI options shared across commands.
//!
//! This module provides shared argument structures that can be composed into
//! command structs using `#[command(flatten)]`.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use recsort_lib::SortConfig;

/// Working directory holding the unsorted input and sorted output files.
#[derive(Debug, Clone, Args)]
pub struct WorkDirOptions {
    /// Directory for input/output files
    #[arg(short = 'd', long = "dir", default_value = "files")]
    pub dir: PathBuf,
}

impl WorkDirOptions {
    /// Create the directory if it does not exist yet.
    pub fn ensure_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| anyhow::anyhow!("creating work dir '{}': {e}", self.dir.display()))
    }
}

/// The sort parameter surface: record count, payload bound, pool size, cutoff.
#[derive(Debug, Clone, Args)]
pub struct SortParams {
    /// Number of records in the file
    #[arg(short = 'n', long = "records")]
    pub records: u64,

    /// Maximum payload size in bytes (>= 8)
    #[arg(short = 'p', long = "payload", default_value = "256")]
    pub payload: u32,

    /// Worker threads (0 = host hardware concurrency)
    #[arg(short = 't', long = "threads", default_value = "0")]
    pub threads: usize,

    /// Leaf threshold in records; also the progress-notify stride
    #[arg(short = 'c', long = "cutoff", default_value = "10000")]
    pub cutoff: usize,
}

impl SortParams {
    /// Validate and convert into the library configuration.
    pub fn to_config(&self) -> Result<SortConfig> {
        if self.records == 0 {
            bail!("--records must be > 0 (got {})", self.records);
        }
        let config = SortConfig {
            records: self.records,
            payload_max: self.payload,
            threads: self.threads,
            cutoff: self.cutoff,
        };
        config.validate()?;
        Ok(config)
    }
}
