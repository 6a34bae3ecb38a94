//! Producer/consumer progress gate.
//!
//! The gate lets sort tasks run while the index is still being built: the
//! builder advances a monotonic counter of populated entries, and a sort leaf
//! covering `[left, right]` blocks until at least `right + 1` entries exist.
//!
//! The counter never decreases during one sort and the builder always posts a
//! final `notify(n)`, so every `wait_until(m)` with `m <= n` returns.

use parking_lot::{Condvar, Mutex};

/// Monotonic counter with wait/notify semantics.
///
/// Created with `filled = 0`, advanced by the index builder, observed by sort
/// leaves. A gate that starts "already full" (index built up front) is
/// obtained via [`ProgressGate::filled_to`].
pub struct ProgressGate {
    filled: Mutex<usize>,
    cond: Condvar,
}

impl Default for ProgressGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressGate {
    /// Create a gate with no entries filled yet.
    #[must_use]
    pub fn new() -> Self {
        Self { filled: Mutex::new(0), cond: Condvar::new() }
    }

    /// Create a gate that already reports `n` entries filled.
    ///
    /// Used when the index is fully built before sorting starts, so leaves
    /// pass straight through.
    #[must_use]
    pub fn filled_to(n: usize) -> Self {
        Self { filled: Mutex::new(n), cond: Condvar::new() }
    }

    /// Advance the counter to at least `filled_now` and wake all waiters.
    ///
    /// The counter is monotonic: a stale notification never moves it
    /// backwards.
    pub fn notify(&self, filled_now: usize) {
        {
            let mut filled = self.filled.lock();
            if filled_now <= *filled {
                return;
            }
            *filled = filled_now;
        }
        self.cond.notify_all();
    }

    /// Block until at least `need` entries are filled.
    pub fn wait_until(&self, need: usize) {
        let mut filled = self.filled.lock();
        while *filled < need {
            self.cond.wait(&mut filled);
        }
    }

    /// Current value of the counter.
    #[must_use]
    pub fn filled(&self) -> usize {
        *self.filled.lock()
    }
}
