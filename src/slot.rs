use crate::invariants::debug_assert_no_underflow;
use crate::ring::Ring;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// A single producer's local queue: a lock-free ring plus the bookkeeping
/// the registry needs to decide when the slot can be retired.
///
/// `approx_size` is maintained alongside the ring rather than derived from
/// it on every call, since the registry's retirement sweep and the
/// `Queue::size()` aggregate both need it without touching the ring's own
/// atomics.
pub struct Slot<T> {
    ring: Ring<T>,
    approx_size: AtomicUsize,
    active: AtomicBool,
}

impl<T> Slot<T> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: Ring::new(capacity),
            approx_size: AtomicUsize::new(0),
            active: AtomicBool::new(true),
        }
    }

    /// Pushes a single item. Only the owning producer thread calls this.
    pub fn push(&self, item: T) -> bool {
        if self.ring.push(item) {
            self.approx_size.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Pops a single item. Called by a consumer thread.
    pub fn pop(&self) -> Option<T> {
        let item = self.ring.pop()?;
        let prev = self.approx_size.fetch_sub(1, Ordering::Relaxed);
        debug_assert_no_underflow!("approx_size", prev.wrapping_sub(1));
        Some(item)
    }

    /// Drains up to `budget` items into `sink`. Returns the number drained.
    pub fn drain_into(&self, budget: usize, sink: &mut dyn FnMut(T)) -> usize {
        let drained = self.ring.drain_into(budget, sink);
        if drained > 0 {
            let prev = self
                .approx_size
                .fetch_sub(drained, Ordering::Relaxed);
            debug_assert_no_underflow!("approx_size", prev.wrapping_sub(drained));
        }
        drained
    }

    /// Approximate emptiness check: trusts the atomic counter first, falling
    /// back to the ring's own head/tail comparison as the authoritative
    /// tiebreak when the counter reads zero but a concurrent push may be
    /// mid-flight.
    pub fn is_empty(&self) -> bool {
        if self.approx_size.load(Ordering::Acquire) != 0 {
            return false;
        }
        self.ring.is_empty()
    }

    pub fn approx_size(&self) -> usize {
        self.approx_size.load(Ordering::Relaxed)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Relaxed);
    }

    /// A slot may be reaped once its producer has exited and it holds no
    /// unread items.
    pub fn is_retirable(&self) -> bool {
        !self.is_active() && self.is_empty()
    }
}
