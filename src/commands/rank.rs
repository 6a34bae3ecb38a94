//! Run one rank of a distributed sort.
//!
//! Each process in a multi-node run executes this command with its own rank
//! id and the shared peer address list; whatever launches the processes
//! (a shell script, a scheduler) is outside the sorter. Rank 0 must see the
//! working directory holding the input file and will write the output
//! there.

use std::net::SocketAddr;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use recsort_lib::dist::{RankDriver, TcpCluster};
use recsort_lib::logging::{format_count, OperationTimer};

use crate::commands::command::Command;
use crate::commands::common::{SortParams, WorkDirOptions};
use crate::commands::sort::BackendArg;

/// Run one rank of a distributed sort over TCP.
///
/// Rank 0 scans the input once and ships each rank its index slice; every
/// rank sorts locally, then a pairwise merge tree folds the slices back
/// onto rank 0, which rewrites and verifies the output.
#[derive(Debug, Parser)]
#[command(name = "rank", about = "Run one rank of a distributed sort")]
pub struct Rank {
    /// This process's rank id in [0, P)
    #[arg(short = 'r', long = "rank")]
    pub rank: usize,

    /// host:port of every rank, in rank order (comma separated)
    #[arg(long = "peers", value_delimiter = ',', required = true)]
    pub peers: Vec<String>,

    /// Sort parameters (shared by all ranks)
    #[command(flatten)]
    pub params: SortParams,

    /// Local sort backend
    #[arg(long = "backend", value_enum, default_value = "recursive")]
    pub backend: BackendArg,

    /// Skip the post-sort verification scan on rank 0
    #[arg(long = "skip-verify", default_value = "false")]
    pub skip_verify: bool,

    /// Working directory options (used by rank 0 only)
    #[command(flatten)]
    pub work_dir: WorkDirOptions,
}

impl Command for Rank {
    fn execute(&self) -> Result<()> {
        let config = self.params.to_config()?;
        if self.rank >= self.peers.len() {
            bail!("--rank {} outside the {} configured peers", self.rank, self.peers.len());
        }
        let addrs: Vec<SocketAddr> = self
            .peers
            .iter()
            .map(|peer| peer.parse().with_context(|| format!("invalid peer address '{peer}'")))
            .collect::<Result<_>>()?;

        info!("rank {} of {}, peers: {:?}", self.rank, addrs.len(), self.peers);

        let timer = OperationTimer::new("Distributed sort");
        let mut comm = TcpCluster::connect(self.rank, &addrs)?;
        let stats = RankDriver::new(config)
            .backend(self.backend.into())
            .verify(!self.skip_verify)
            .run(&mut comm, &self.work_dir.dir)?;

        match stats {
            Some(stats) => {
                info!("=== Summary (rank 0) ===");
                info!("Records sorted: {}", format_count(stats.records));
                info!("Bytes out: {}", format_count(stats.bytes_out));
                timer.log_completion(stats.records);
            }
            None => {
                info!("rank {} done (slice shipped)", self.rank);
            }
        }
        Ok(())
    }
}
