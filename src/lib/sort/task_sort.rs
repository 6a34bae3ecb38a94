//! Recursive task merge-sort with gated leaves.
//!
//! Divide-and-conquer over a contiguous index range: above the cutoff a
//! range splits at its midpoint and the halves run as parallel rayon tasks
//! with the join landing before the merge; at or below the cutoff the leaf
//! waits on the progress gate until its whole sub-range has been indexed,
//! then sorts it directly.
//!
//! The gate is consulted only at leaves. An internal merge runs after both
//! children have joined, and each child already waited for its own
//! sub-range, so the union of the parent's range is present by
//! construction.

use super::merge::{merge_adjacent, sort_run};
use crate::gate::ProgressGate;
use crate::index::SharedIndex;

/// Sort the whole index ascending by key.
///
/// Call from inside the rayon pool that should carry the subtasks (the
/// driver uses `ThreadPool::install`). The gate may already report the full
/// length if index construction finished up front.
pub fn merge_sort(index: &SharedIndex, cutoff: usize, gate: &ProgressGate) {
    if index.is_empty() {
        return;
    }
    merge_sort_range(index, 0, index.len() - 1, cutoff.max(1), gate);
}

/// Sort the inclusive range `[left, right]`.
fn merge_sort_range(
    index: &SharedIndex,
    left: usize,
    right: usize,
    cutoff: usize,
    gate: &ProgressGate,
) {
    let len = right - left + 1;
    if len <= cutoff {
        // Leaf: the slice is ours once the builder has published it.
        gate.wait_until(right + 1);
        let run = unsafe { index.range_mut(left, right) };
        sort_run(run);
        return;
    }

    let mid = left + (right - left) / 2;
    rayon::join(
        || merge_sort_range(index, left, mid, cutoff, gate),
        || merge_sort_range(index, mid + 1, right, cutoff, gate),
    );

    // Both halves joined above; the full range is exclusively ours now.
    let run = unsafe { index.range_mut(left, right) };
    merge_adjacent(run, mid - left + 1);
}
