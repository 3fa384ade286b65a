use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::ThreadId;

/// Erases a queue's item type so `ExitHandle` does not need to be generic.
/// Implemented by `QueueInner<T>`, which forwards to its `Registry<T>`.
pub trait SlotOwner: Send + Sync {
    fn on_thread_exit(&self, tid: ThreadId);
}

/// A thread-local, `Drop`-triggered token. When the owning OS thread
/// terminates, its thread-local storage is torn down and this handle's
/// destructor notifies the registry that the thread's slot may need
/// retirement bookkeeping.
///
/// Holds a `Weak` reference so the handle never keeps the queue alive past
/// its last `Arc`, and an independent `queue_destroyed` flag so a handle
/// firing after the queue's own teardown is a guaranteed no-op even if the
/// `Weak` happened to still upgrade (defense in depth, matching the
/// source's `ThreadExitHelper`).
struct ExitHandle {
    tid: ThreadId,
    owner: Weak<dyn SlotOwner>,
    queue_destroyed: Arc<AtomicBool>,
}

impl Drop for ExitHandle {
    fn drop(&mut self) {
        if self.queue_destroyed.load(Ordering::Acquire) {
            return;
        }
        if let Some(owner) = self.owner.upgrade() {
            log::trace!("thread {:?} exiting, notifying registry", self.tid);
            owner.on_thread_exit(self.tid);
        }
    }
}

thread_local! {
    /// One handle per distinct queue this thread has produced into, keyed
    /// by the queue's stable identity (`Arc::as_ptr` cast to `usize`).
    static HANDLES: RefCell<HashMap<usize, ExitHandle>> = RefCell::new(HashMap::new());
}

/// Ensures the current thread has an `ExitHandle` registered for the queue
/// identified by `queue_key`. A no-op if one is already registered.
pub fn ensure_registered(
    queue_key: usize,
    owner: Weak<dyn SlotOwner>,
    queue_destroyed: Arc<AtomicBool>,
) {
    HANDLES.with(|handles| {
        let mut handles = handles.borrow_mut();
        handles.entry(queue_key).or_insert_with(|| ExitHandle {
            tid: std::thread::current().id(),
            owner,
            queue_destroyed,
        });
    });
}
