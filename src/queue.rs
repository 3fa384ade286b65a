use crate::config::{ConfigError, QueueConfig};
use crate::exit_handle::{self, SlotOwner};
use crate::registry::Registry;
use crate::retirement::{self, RetirementSignal};
use crate::stats::Stats;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread::{JoinHandle, ThreadId};

thread_local! {
    /// Rotating start index for round-robin dequeue, local to each consumer
    /// thread so concurrent consumers don't contend on a shared cursor.
    static DEQUEUE_CURSOR: Cell<usize> = Cell::new(0);
}

struct QueueInner<T> {
    registry: Arc<Registry<T>>,
    config: QueueConfig,
    stats: Option<Arc<Stats>>,
    consumer_id: Mutex<Option<ThreadId>>,
    has_consumer: AtomicBool,
    retirement_signal: Arc<RetirementSignal>,
    queue_destroyed: Arc<AtomicBool>,
}

impl<T: Send + Sync + 'static> SlotOwner for QueueInner<T> {
    fn on_thread_exit(&self, tid: ThreadId) {
        self.registry.on_thread_exit(tid);
        self.retirement_signal.notify();
    }
}

/// Concurrent multi-producer dispatch queue. Each producer thread gets its
/// own lock-free ring (a [`Slot`](crate::slot::Slot)); one or more consumer
/// threads poll across slots in round-robin order. A producer's slot is
/// retired by a background worker once the producer thread exits and the
/// slot has drained.
pub struct Queue<T> {
    inner: Arc<QueueInner<T>>,
    retirement_handle: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + Sync + 'static> Queue<T> {
    /// Builds a queue, returning `ConfigError` instead of panicking on an
    /// invalid configuration.
    pub fn try_new(config: QueueConfig) -> Result<Self, ConfigError> {
        let config = config.validate()?;
        Ok(Self::from_config(config))
    }

    /// Builds a queue, panicking on an invalid configuration.
    ///
    /// # Panics
    ///
    /// Panics if `config` fails validation (see [`QueueConfig::validate`]).
    #[must_use]
    pub fn new(config: QueueConfig) -> Self {
        let config = config
            .validate()
            .unwrap_or_else(|e| panic!("invalid QueueConfig: {e}"));
        Self::from_config(config)
    }

    fn from_config(config: QueueConfig) -> Self {
        let registry = Arc::new(Registry::new(config.initial_slot_capacity));
        let stats = if config.enable_stats {
            Some(Arc::new(Stats::new()))
        } else {
            None
        };
        let retirement_signal = Arc::new(RetirementSignal::new());
        let queue_destroyed = Arc::new(AtomicBool::new(false));

        let inner = Arc::new(QueueInner {
            registry: Arc::clone(&registry),
            config,
            stats: stats.clone(),
            consumer_id: Mutex::new(None),
            has_consumer: AtomicBool::new(false),
            retirement_signal: Arc::clone(&retirement_signal),
            queue_destroyed,
        });

        let handle = retirement::spawn(registry, retirement_signal);

        Self {
            inner,
            retirement_handle: Mutex::new(Some(handle)),
        }
    }

    fn queue_key(&self) -> usize {
        Arc::as_ptr(&self.inner).cast::<()>() as usize
    }

    fn ensure_exit_handle(&self, created: bool) {
        if !created {
            return;
        }
        let owner: Weak<dyn SlotOwner> = Arc::downgrade(&self.inner);
        exit_handle::ensure_registered(
            self.queue_key(),
            owner,
            Arc::clone(&self.inner.queue_destroyed),
        );
    }

    /// Enqueues a single item onto the calling thread's slot. Returns
    /// `false` if the queue has been destroyed or the slot is full.
    pub fn enqueue(&self, item: T) -> bool {
        if self.inner.queue_destroyed.load(Ordering::Acquire) {
            return false;
        }

        let tid = std::thread::current().id();
        let (slot, created) = self.inner.registry.get_or_create_slot(tid);
        self.ensure_exit_handle(created);

        let pushed = slot.push(item);
        if pushed {
            if let Some(stats) = &self.inner.stats {
                stats.record_enqueue();
            }
        }
        pushed
    }

    /// Enqueues every item from `items` onto the calling thread's slot,
    /// stopping at the first failure. Returns `true` only if every item was
    /// accepted (an empty iterator trivially succeeds).
    ///
    /// Below `QueueConfig::batch_threshold` items this loops over
    /// [`Queue::enqueue`]; above it, items are pushed directly into the
    /// producer's slot in one pass, matching the source's split between its
    /// plain loop and its bulk-push path.
    pub fn enqueue_bulk<I>(&self, items: I) -> bool
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        if self.inner.queue_destroyed.load(Ordering::Acquire) {
            return false;
        }

        let iter = items.into_iter();
        if iter.len() <= self.inner.config.batch_threshold {
            for item in iter {
                if !self.enqueue(item) {
                    return false;
                }
            }
            return true;
        }

        let tid = std::thread::current().id();
        let (slot, created) = self.inner.registry.get_or_create_slot(tid);
        self.ensure_exit_handle(created);

        let mut pushed_count: u64 = 0;
        let mut all_ok = true;
        for item in iter {
            if slot.push(item) {
                pushed_count += 1;
            } else {
                all_ok = false;
                break;
            }
        }

        if let Some(stats) = &self.inner.stats {
            stats.record_enqueues(pushed_count);
        }
        all_ok
    }

    fn is_permitted_consumer(&self) -> bool {
        if !self.inner.config.single_consumer {
            return true;
        }
        if !self.inner.has_consumer.load(Ordering::Acquire) {
            return false;
        }
        let tid = std::thread::current().id();
        let registered = self.inner.consumer_id.lock().unwrap_or_else(|e| e.into_inner());
        *registered == Some(tid)
    }

    /// Dequeues a single item, scanning live slots in round-robin order
    /// starting from this consumer thread's rotating cursor. Returns `None`
    /// if every slot is empty, or if `single_consumer` is set and the
    /// calling thread is not the registered consumer.
    pub fn dequeue(&self) -> Option<T> {
        if !self.is_permitted_consumer() {
            return None;
        }

        self.inner.registry.with_live(|slots| {
            let len = slots.len();
            if len == 0 {
                return None;
            }
            let start = DEQUEUE_CURSOR.with(|c| c.get()) % len;
            for offset in 0..len {
                let idx = (start + offset) % len;
                if let Some(item) = slots[idx].pop() {
                    DEQUEUE_CURSOR.with(|c| c.set(idx + 1));
                    if let Some(stats) = &self.inner.stats {
                        stats.record_dequeue();
                    }
                    self.observe_drained_slot(&slots[idx]);
                    return Some(item);
                }
            }
            None
        })
    }

    /// After a pop/drain leaves `slot` at zero, either records the
    /// observation (producer still active) or wakes the retirement worker
    /// (producer has exited), mirroring the source's `queue_empty_count` /
    /// `needGC` branch in `try_dequeue_from_producers`.
    fn observe_drained_slot(&self, slot: &crate::slot::Slot<T>) {
        if slot.approx_size() != 0 {
            return;
        }
        if slot.is_active() {
            if let Some(stats) = &self.inner.stats {
                stats.record_empty_observation();
            }
        } else {
            self.inner.retirement_signal.notify();
        }
    }

    /// Drains up to `budget` items across live slots in round-robin order,
    /// invoking `sink` once per item. Returns the number of items drained.
    pub fn dequeue_bulk(&self, budget: usize, mut sink: impl FnMut(T)) -> usize {
        if budget == 0 || !self.is_permitted_consumer() {
            return 0;
        }

        let drained = self.inner.registry.with_live(|slots| {
            let len = slots.len();
            if len == 0 {
                return 0;
            }
            let start = DEQUEUE_CURSOR.with(|c| c.get()) % len;
            let mut remaining = budget;
            let mut total = 0usize;
            let mut idx = start;
            for _ in 0..len {
                if remaining == 0 {
                    break;
                }
                let took = slots[idx].drain_into(remaining, &mut sink);
                total += took;
                remaining -= took;
                if took > 0 {
                    self.observe_drained_slot(&slots[idx]);
                }
                idx = (idx + 1) % len;
            }
            DEQUEUE_CURSOR.with(|c| c.set(idx));
            total
        });

        if drained > 0 {
            if let Some(stats) = &self.inner.stats {
                stats.record_dequeues(drained as u64);
            }
        }
        drained
    }

    /// Registers the thread that is allowed to dequeue when
    /// `single_consumer` is set. A no-op under the default multi-consumer
    /// configuration, beyond recording the id for informational purposes.
    pub fn set_consumer(&self, tid: ThreadId) {
        *self
            .inner
            .consumer_id
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(tid);
        self.inner.has_consumer.store(true, Ordering::Release);
    }

    /// Approximate total size across all live slots. May race with
    /// concurrent enqueue/dequeue; see the invariants discussion in
    /// `DESIGN.md`.
    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.registry.approx_size()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.registry.is_empty()
    }

    /// Drops every known producer slot. Primarily useful in tests and at
    /// shutdown to release ring memory without waiting for the retirement
    /// worker.
    pub fn clear(&self) {
        self.inner.registry.clear();
    }

    #[must_use]
    pub fn active_producer_count(&self) -> usize {
        self.inner.registry.active_count()
    }

    /// Returns the queue's stats if `QueueConfig::enable_stats` was set.
    #[must_use]
    pub fn get_stats(&self) -> Option<&Stats> {
        self.inner.stats.as_deref()
    }
}

impl<T> Drop for Queue<T> {
    fn drop(&mut self) {
        // Order matches the source's destructor: mark handles inert first
        // so any in-flight thread exit is a guaranteed no-op, then drop all
        // producer state, then stop and join the retirement worker.
        self.inner.queue_destroyed.store(true, Ordering::Release);
        self.inner.registry.clear();
        self.inner.retirement_signal.request_stop();
        if let Ok(mut guard) = self.retirement_handle.lock() {
            if let Some(handle) = guard.take() {
                let _ = handle.join();
            }
        }
    }
}

impl<T: Send + Sync + 'static> Default for Queue<T> {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}
