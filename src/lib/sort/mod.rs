//! Parallel index sorting.
//!
//! Two interchangeable backends over the same primitives:
//!
//! - [`task_sort`]: recursive divide-and-conquer on a rayon pool, siblings
//!   joined implicitly before each merge
//! - [`farm`]: an explicit task DAG scheduled over a worker pool with a
//!   feedback channel
//!
//! Both gate their leaves on [`crate::gate::ProgressGate`], which is what
//! lets sorting start while the index is still being built. [`driver`]
//! wires a backend to the file mappings and the rewrite pass.

pub mod driver;
pub mod farm;
pub mod merge;
pub mod task_sort;

pub use driver::{Backend, SortStats, Sorter};
pub use farm::TaskGraphFarm;
pub use task_sort::merge_sort;
