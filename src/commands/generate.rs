//! Generate a random unsorted input file.

use anyhow::Result;
use clap::Parser;
use log::info;
use recsort_lib::generate::{generate_unsorted_file, DEFAULT_SEED};
use recsort_lib::logging::OperationTimer;

use crate::commands::command::Command;
use crate::commands::common::WorkDirOptions;

/// Generate a random record file.
///
/// Writes `unsorted_<records>_<payload>.bin` into the working directory:
/// random keys, payload lengths uniform in [8, payload], random payload
/// bytes. Generation is seeded, so the same parameters always produce the
/// same file.
#[derive(Debug, Parser)]
#[command(name = "generate", about = "Generate a random unsorted record file")]
pub struct Generate {
    /// Number of records to generate
    #[arg(short = 'n', long = "records")]
    pub records: u64,

    /// Maximum payload size in bytes (>= 8)
    #[arg(short = 'p', long = "payload", default_value = "256")]
    pub payload: u32,

    /// RNG seed
    #[arg(long = "seed", default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Working directory options
    #[command(flatten)]
    pub work_dir: WorkDirOptions,
}

impl Command for Generate {
    fn execute(&self) -> Result<()> {
        if self.payload < 8 {
            anyhow::bail!("--payload must be >= 8 (got {})", self.payload);
        }
        self.work_dir.ensure_exists()?;

        let timer = OperationTimer::new("Generating records");
        let path = generate_unsorted_file(&self.work_dir.dir, self.records, self.payload, self.seed)?;
        timer.log_completion(self.records);

        info!("Output: {}", path.display());
        Ok(())
    }
}
