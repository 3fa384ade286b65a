//! Concurrent multi-producer dispatch queue for a connection pool's
//! request-dispatch path.
//!
//! Each producer thread owns a dedicated lock-free SPSC ring (a [`Slot`]),
//! eliminating producer-producer contention entirely. A [`Registry`] maps
//! threads to slots; one or more consumer threads drain slots in
//! round-robin order. A producer's slot is reclaimed by a background
//! retirement worker once the thread exits and the slot has drained.
//!
//! # Example
//!
//! ```
//! use dispatch_queue::{Queue, QueueConfig};
//!
//! let queue = Queue::<u64>::default();
//! queue.enqueue(42);
//!
//! let mut received = Vec::new();
//! queue.dequeue_bulk(32, |item| received.push(item));
//! assert_eq!(received, vec![42]);
//! ```
//!
//! Construction can also go through [`QueueConfig`] with custom tuning:
//!
//! ```
//! use dispatch_queue::{ConfigError, Queue, QueueConfig};
//!
//! let config = QueueConfig {
//!     batch_threshold: 64,
//!     initial_slot_capacity: 512,
//!     enable_stats: true,
//!     single_consumer: false,
//! };
//! let queue: Result<Queue<u64>, ConfigError> = Queue::try_new(config);
//! assert!(queue.is_ok());
//! ```

mod config;
mod exit_handle;
mod invariants;
mod queue;
mod registry;
mod retirement;
mod ring;
mod slot;
mod stats;

pub use config::{ConfigError, QueueConfig, DEFAULT_BATCH_THRESHOLD, DEFAULT_SLOT_CAPACITY};
pub use queue::Queue;
pub use stats::Stats;
