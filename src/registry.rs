use crate::slot::Slot;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::thread::ThreadId;

struct RegistryState<T> {
    by_tid: HashMap<ThreadId, Arc<Slot<T>>>,
    /// Insertion-ordered list of every slot that still needs draining or
    /// retirement bookkeeping. A slot stays here after its producer exits
    /// until the retirement worker reaps it.
    live: Vec<Arc<Slot<T>>>,
}

impl<T> RegistryState<T> {
    fn new() -> Self {
        Self {
            by_tid: HashMap::new(),
            live: Vec::new(),
        }
    }
}

/// Maps producer threads to their `Slot`, behind a single `RwLock` so reads
/// (the common case: an already-registered producer enqueueing, or the
/// consumer scanning live slots) never contend with each other.
pub struct Registry<T> {
    state: RwLock<RegistryState<T>>,
    slot_capacity: usize,
}

impl<T> Registry<T> {
    #[must_use]
    pub fn new(slot_capacity: usize) -> Self {
        Self {
            state: RwLock::new(RegistryState::new()),
            slot_capacity,
        }
    }

    /// Returns this thread's slot, creating one on first use.
    ///
    /// Shared-read fast path for the overwhelmingly common case of a
    /// producer that already registered; falls back to an exclusive lock
    /// with a re-check (another thread may have raced us into the write
    /// path) only on the first call from a given thread.
    pub fn get_or_create_slot(&self, tid: ThreadId) -> (Arc<Slot<T>>, bool) {
        {
            let state = self.state.read().unwrap_or_else(|e| e.into_inner());
            if let Some(slot) = state.by_tid.get(&tid) {
                return (Arc::clone(slot), false);
            }
        }

        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if let Some(slot) = state.by_tid.get(&tid) {
            return (Arc::clone(slot), false);
        }

        let slot = Arc::new(Slot::new(self.slot_capacity));
        log::debug!("created slot for thread {tid:?}");
        state.by_tid.insert(tid, Arc::clone(&slot));
        state.live.push(Arc::clone(&slot));
        (slot, true)
    }

    /// Runs `f` over the current live-slot list under the shared lock. Used
    /// for both single-item and bulk dequeue so the scan never copies the
    /// list out.
    pub fn with_live<R>(&self, f: impl FnOnce(&[Arc<Slot<T>>]) -> R) -> R {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        f(&state.live)
    }

    pub fn live_len(&self) -> usize {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.live.len()
    }

    /// Counts only slots whose producer is still active. In the MPMC shape
    /// this equals `live_len()` until a producer exits; in the
    /// single-consumer shape it excludes inactive-but-draining slots, which
    /// `live_len()` would still include.
    pub fn active_count(&self) -> usize {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.live.iter().filter(|s| s.is_active()).count()
    }

    /// Called from an `ExitHandle`'s destructor. If the thread's slot is
    /// already empty, it is dropped immediately; otherwise it is marked
    /// inactive and detached from `by_tid` (so a new thread reusing the same
    /// `ThreadId`, however unlikely, cannot collide with it) but stays in
    /// `live` until the retirement worker drains and reaps it.
    pub fn on_thread_exit(&self, tid: ThreadId) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let Some(slot) = state.by_tid.remove(&tid) else {
            return;
        };

        if slot.is_empty() {
            state.live.retain(|s| !Arc::ptr_eq(s, &slot));
            log::trace!("thread {tid:?} exited with empty slot, retired immediately");
        } else {
            slot.set_active(false);
            log::trace!("thread {tid:?} exited with pending items, slot marked inactive");
        }
    }

    /// Reaps every slot that is both inactive and empty. Returns the number
    /// of slots removed.
    pub fn retire_inactive_empty(&self) -> usize {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let before = state.live.len();
        state.live.retain(|slot| !slot.is_retirable());
        before - state.live.len()
    }

    /// Drops every known slot and producer mapping. Used by `Queue::clear`.
    pub fn clear(&self) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.by_tid.clear();
        state.live.clear();
    }

    pub fn approx_size(&self) -> usize {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.live.iter().map(|s| s.approx_size()).sum()
    }

    pub fn is_empty(&self) -> bool {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.live.iter().all(|s| s.is_empty())
    }
}
