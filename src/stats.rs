use std::sync::atomic::{AtomicU64, Ordering};

/// Queue-wide counters, populated only when `QueueConfig::enable_stats` is
/// set. Mirrors the source's `enable_if_t`-gated `Stats` struct, but as a
/// runtime record rather than a compile-time-absent field (see the Open
/// Question resolution in `DESIGN.md`).
#[derive(Debug, Default)]
pub struct Stats {
    total_enqueues: AtomicU64,
    total_dequeues: AtomicU64,
    empty_observations: AtomicU64,
}

impl Stats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_enqueue(&self) {
        self.total_enqueues.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_enqueues(&self, count: u64) {
        if count > 0 {
            self.total_enqueues.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_dequeue(&self) {
        self.total_dequeues.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dequeues(&self, count: u64) {
        if count > 0 {
            self.total_dequeues.fetch_add(count, Ordering::Relaxed);
        }
    }

    /// Counts an active producer's slot being observed empty right after a
    /// dequeue, mirroring the source's `queue_empty_count`.
    pub(crate) fn record_empty_observation(&self) {
        self.empty_observations.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn total_enqueues(&self) -> u64 {
        self.total_enqueues.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn total_dequeues(&self) -> u64 {
        self.total_dequeues.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn empty_observations(&self) -> u64 {
        self.empty_observations.load(Ordering::Relaxed)
    }
}
