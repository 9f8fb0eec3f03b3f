use std::sync::atomic::{AtomicUsize, Ordering};

/// Countdown of outstanding loads for one batch.
///
/// Completions may race on any thread; [`complete_one`](Self::complete_one)
/// returns `Some(0)` to exactly one caller, the one that settles the batch.
#[derive(Debug)]
pub struct PendingLoads {
    remaining: AtomicUsize,
    total: usize,
}

impl PendingLoads {
    pub fn new(total: usize) -> Self {
        Self { remaining: AtomicUsize::new(total), total }
    }

    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Decrements the counter and returns the new value.
    ///
    /// Returns `None` once the counter is already zero, so surplus completions
    /// can never settle the batch twice.
    pub fn complete_one(&self) -> Option<usize> {
        self.remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .ok()
            .map(|prev| prev - 1)
    }
}
