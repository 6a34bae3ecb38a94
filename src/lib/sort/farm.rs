//! Task-graph merge-sort scheduled as a worker farm with feedback.
//!
//! The alternative to the recursive backend: the full binary merge tree is
//! materialized up front as an arena of task nodes, leaves are handed to a
//! pool of workers over a bounded channel, and completions flow back to a
//! single emitter over a feedback channel. The emitter decrements a
//! parent's join counter as each child reports in and schedules the parent
//! exactly once, when the counter hits zero. The root's completion is an
//! explicit sentinel on the feedback channel; termination never depends on
//! observing empty queues.
//!
//! # Task state machine
//!
//! ```text
//! internal node: Waiting(remaining=2) → Waiting(1) → Ready → Executing → Done
//! leaf:          Ready → Executing → Done
//! ```
//!
//! Transitions are driven only by child completion messages; `Ready →
//! Executing` is the emitter's enqueue.
//!
//! # Overlapped index construction
//!
//! When given the raw input bytes, the emitter additionally enqueues a
//! single `BuildIndex` task ahead of the leaves, so one worker performs the
//! scan while the rest start on gate-blocked leaves whose sub-range is
//! already available. This is the whole reason the gate exists.
//!
//! Both channels are sized to the total task count. Every task is enqueued
//! exactly once and reports exactly once, so no send ever blocks and the
//! farm cannot deadlock on its own plumbing.

use std::sync::atomic::{AtomicU32, Ordering};

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, trace};

use super::merge::{merge_adjacent, sort_run};
use crate::errors::{RecsortError, Result};
use crate::gate::ProgressGate;
use crate::index::{build_index_gated, SharedIndex};

/// Handle of a task in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct TaskId(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TaskKind {
    /// Leaf: gate on the range, then base sort.
    Sort,
    /// Internal: in-place merge of the two already sorted halves.
    Merge,
    /// Run the progressive index scan (at most one per farm).
    BuildIndex,
}

/// One node of the merge tree.
///
/// `remaining` is meaningful only on `Merge` nodes: initialized to 2 and
/// decremented once per child completion, with acquire/release ordering so
/// the emitter observing zero also observes the children's index writes.
struct Task {
    left: usize,
    mid: usize,
    right: usize,
    kind: TaskKind,
    parent: Option<TaskId>,
    remaining: AtomicU32,
}

/// Feedback messages from workers to the emitter.
enum Completion {
    /// A child of the given parent finished.
    Child(TaskId),
    /// The root finished: end of stream.
    Root,
    /// The index scan finished (with its outcome).
    IndexBuilt(Result<()>),
}

/// Recursively materialize the tree over `[left, right]`, collecting leaves.
fn build_tree(
    arena: &mut Vec<Task>,
    left: usize,
    right: usize,
    parent: Option<TaskId>,
    cutoff: usize,
    leaves: &mut Vec<TaskId>,
) -> TaskId {
    let id = TaskId(arena.len());
    let len = right - left + 1;

    if len <= cutoff {
        arena.push(Task {
            left,
            mid: left,
            right,
            kind: TaskKind::Sort,
            parent,
            remaining: AtomicU32::new(0),
        });
        leaves.push(id);
        return id;
    }

    let mid = left + (right - left) / 2;
    arena.push(Task {
        left,
        mid,
        right,
        kind: TaskKind::Merge,
        parent,
        remaining: AtomicU32::new(2),
    });
    build_tree(arena, left, mid, Some(id), cutoff, leaves);
    build_tree(arena, mid + 1, right, Some(id), cutoff, leaves);
    id
}

/// Farm configuration and entry point.
pub struct TaskGraphFarm<'a> {
    index: &'a SharedIndex,
    gate: &'a ProgressGate,
    cutoff: usize,
    workers: usize,
    scan_input: Option<&'a [u8]>,
}

impl<'a> TaskGraphFarm<'a> {
    /// Create a farm over `index`, gated by `gate`.
    #[must_use]
    pub fn new(index: &'a SharedIndex, gate: &'a ProgressGate) -> Self {
        Self { index, gate, cutoff: 1, workers: 1, scan_input: None }
    }

    /// Set the leaf threshold in records.
    #[must_use]
    pub fn cutoff(mut self, cutoff: usize) -> Self {
        self.cutoff = cutoff.max(1);
        self
    }

    /// Set the number of worker threads.
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Overlap index construction: one worker scans `input` into the index,
    /// publishing progress through the gate every `cutoff` records.
    ///
    /// Without this, the caller must have built the index already and the
    /// gate must report the full length.
    #[must_use]
    pub fn overlap_scan(mut self, input: &'a [u8]) -> Self {
        self.scan_input = Some(input);
        self
    }

    /// Run the farm to completion.
    pub fn run(self) -> Result<()> {
        let n = self.index.len();
        if n == 0 {
            // Nothing to sort; still honor a requested scan for its format checks.
            if let Some(data) = self.scan_input {
                build_index_gated(data, self.index, self.gate, 0)?;
            }
            return Ok(());
        }

        let mut arena: Vec<Task> = Vec::new();
        let mut leaves: Vec<TaskId> = Vec::new();

        let scan_task = self.scan_input.map(|_| {
            let id = TaskId(arena.len());
            arena.push(Task {
                left: 0,
                mid: 0,
                right: 0,
                kind: TaskKind::BuildIndex,
                parent: None,
                remaining: AtomicU32::new(0),
            });
            id
        });
        build_tree(&mut arena, 0, n - 1, None, self.cutoff, &mut leaves);

        debug!(
            "farm: {} tasks ({} leaves) over {} records, {} workers",
            arena.len(),
            leaves.len(),
            n,
            self.workers
        );

        // Every task is enqueued exactly once and reports exactly once, so
        // these capacities make every send non-blocking.
        let (work_tx, work_rx) = bounded::<TaskId>(arena.len());
        let (done_tx, done_rx) = bounded::<Completion>(arena.len());

        let arena = &arena;
        let farm = &self;
        let mut outcome = Ok(());

        std::thread::scope(|scope| {
            for _ in 0..farm.workers {
                let work_rx = work_rx.clone();
                let done_tx = done_tx.clone();
                scope.spawn(move || {
                    farm.worker_loop(arena, &work_rx, &done_tx);
                });
            }
            drop(work_rx);
            drop(done_tx);

            outcome = farm.emit(arena, scan_task, &leaves, &work_tx, &done_rx);
            // Closing the work channel releases the workers.
            drop(work_tx);
        });

        outcome
    }

    /// Worker body: execute tasks until the work channel closes.
    fn worker_loop(&self, arena: &[Task], work_rx: &Receiver<TaskId>, done_tx: &Sender<Completion>) {
        for id in work_rx.iter() {
            let task = &arena[id.0];
            let completion = match task.kind {
                TaskKind::Sort => {
                    self.gate.wait_until(task.right + 1);
                    trace!("farm: sort [{}, {}]", task.left, task.right);
                    // Exclusive: no other task covers this range until our
                    // completion message reaches the emitter.
                    let run = unsafe { self.index.range_mut(task.left, task.right) };
                    sort_run(run);
                    task.parent.map_or(Completion::Root, Completion::Child)
                }
                TaskKind::Merge => {
                    trace!("farm: merge [{}, {}] at {}", task.left, task.right, task.mid);
                    // Both children reported in before this task was
                    // enqueued, so the whole range is ours.
                    let run = unsafe { self.index.range_mut(task.left, task.right) };
                    merge_adjacent(run, task.mid - task.left + 1);
                    task.parent.map_or(Completion::Root, Completion::Child)
                }
                TaskKind::BuildIndex => {
                    let result = match self.scan_input {
                        Some(data) => {
                            build_index_gated(data, self.index, self.gate, self.cutoff)
                        }
                        None => Ok(()),
                    };
                    Completion::IndexBuilt(result)
                }
            };
            if done_tx.send(completion).is_err() {
                return;
            }
        }
    }

    /// Emitter body: seed the initial work list, then react to feedback.
    fn emit(
        &self,
        arena: &[Task],
        scan_task: Option<TaskId>,
        leaves: &[TaskId],
        work_tx: &Sender<TaskId>,
        done_rx: &Receiver<Completion>,
    ) -> Result<()> {
        let send = |id: TaskId| {
            work_tx.send(id).map_err(|_| RecsortError::Farm {
                reason: "worker pool shut down early".to_string(),
            })
        };

        // The scan goes first so a worker picks it up immediately; then the
        // whole initial work list of leaves.
        if let Some(id) = scan_task {
            send(id)?;
        }
        for &leaf in leaves {
            send(leaf)?;
        }

        let mut scan_pending = scan_task.is_some();
        let mut root_pending = true;
        let mut scan_result = Ok(());

        while scan_pending || root_pending {
            let completion = done_rx.recv().map_err(|_| RecsortError::Farm {
                reason: "feedback channel closed before root completion".to_string(),
            })?;
            match completion {
                Completion::Child(parent) => {
                    // The release of the child's decrement pairs with this
                    // acquire: observing 0 means observing both children's
                    // index writes.
                    if arena[parent.0].remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                        send(parent)?;
                    }
                }
                Completion::Root => root_pending = false,
                Completion::IndexBuilt(result) => {
                    scan_pending = false;
                    scan_result = result;
                }
            }
        }

        scan_result
    }
}
