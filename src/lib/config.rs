//! Run-time configuration shared by the sort backends.
//!
//! The CLI layer parses and validates user input; the library consumes this
//! plain value.

use crate::errors::{RecsortError, Result};
use crate::format::MIN_PAYLOAD;

/// Parameters of one sort run.
#[derive(Debug, Clone, Copy)]
pub struct SortConfig {
    /// Number of records in the input (supplied out-of-band; the file does
    /// not store it).
    pub records: u64,
    /// Maximum payload size in bytes (>= 8).
    pub payload_max: u32,
    /// Worker-pool size; 0 means the host's available parallelism.
    pub threads: usize,
    /// Leaf threshold in records; also the progress-notify stride when the
    /// index build is overlapped with sorting.
    pub cutoff: usize,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self { records: 1_000_000, payload_max: 256, threads: 0, cutoff: 10_000 }
    }
}

impl SortConfig {
    /// Validate field ranges.
    pub fn validate(&self) -> Result<()> {
        if self.payload_max < MIN_PAYLOAD {
            return Err(RecsortError::InvalidParameter {
                parameter: "payload".to_string(),
                reason: format!("must be >= {MIN_PAYLOAD} (got {})", self.payload_max),
            });
        }
        if self.cutoff == 0 {
            return Err(RecsortError::InvalidParameter {
                parameter: "cutoff".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }

    /// The worker-pool size with 0 resolved to the host's parallelism.
    #[must_use]
    pub fn resolved_threads(&self) -> usize {
        if self.threads > 0 {
            self.threads
        } else {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        }
    }
}
