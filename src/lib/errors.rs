//! Custom error types for recsort operations.

use thiserror::Error;

/// Result type alias for recsort operations
pub type Result<T> = std::result::Result<T, RecsortError>;

/// Error type for recsort operations
///
/// All of these are fatal: the driver propagates them to `main`, which
/// terminates the process. There is no local recovery and no partial-result
/// mode.
#[derive(Error, Debug)]
pub enum RecsortError {
    /// An I/O operation (open, stat, map, truncate, write) failed
    #[error("I/O failure during {op} on '{path}': {source}")]
    Io {
        /// The operation that failed
        op: &'static str,
        /// Path of the file involved
        path: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// The input file does not hold the records it is claimed to hold
    #[error("Format violation at record {record}: {reason}")]
    Format {
        /// Index of the offending record
        record: u64,
        /// Explanation of the problem
        reason: String,
    },

    /// A point-to-point message operation failed (distributed backend)
    #[error("Communication failure with rank {peer}: {reason}")]
    Comm {
        /// Rank of the peer involved
        peer: usize,
        /// Explanation of the problem
        reason: String,
    },

    /// The verification scan found adjacent keys out of order
    #[error("Output not sorted at record {record}: key {key} < previous key {prev_key}")]
    Unsorted {
        /// Index of the first out-of-order record
        record: u64,
        /// Its key
        key: u64,
        /// The preceding key
        prev_key: u64,
    },

    /// The task farm's worker/emitter plumbing broke down mid-sort
    #[error("Task farm failure: {reason}")]
    Farm {
        /// Explanation of the problem
        reason: String,
    },

    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },
}

impl RecsortError {
    /// Build an [`RecsortError::Io`] from an operation name, a path and the OS error.
    pub fn io(op: &'static str, path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io { op, path: path.as_ref().display().to_string(), source }
    }
}
