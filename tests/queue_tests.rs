//! Scenario suite ported from the original connection-pool dispatch queue's
//! test harness, driven with `std::thread` the way that harness drove
//! multiple producer/consumer threads.

use dispatch_queue::{ConfigError, Queue, QueueConfig};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn construction_and_setup() {
    let default_queue = Queue::<i32>::default();
    assert!(default_queue.is_empty());
    assert_eq!(default_queue.size(), 0);

    let sized_queue = Queue::<i32>::new(QueueConfig {
        initial_slot_capacity: 512,
        ..QueueConfig::default()
    });
    assert!(sized_queue.is_empty());

    let queue = Queue::<i32>::default();
    queue.set_consumer(std::thread::current().id());
    assert_eq!(queue.active_producer_count(), 0);
}

#[test]
fn single_element_enqueue_dequeue() {
    let queue = Queue::<i32>::default();
    assert!(queue.enqueue(1));
    assert!(queue.enqueue(2));
    assert!(queue.enqueue(3));

    assert_eq!(queue.size(), 3);
    assert!(!queue.is_empty());

    assert_eq!(queue.dequeue(), Some(1));
    assert_eq!(queue.dequeue(), Some(2));
    assert_eq!(queue.dequeue(), Some(3));
    assert_eq!(queue.dequeue(), None);
    assert!(queue.is_empty());
    assert_eq!(queue.size(), 0);
}

#[test]
fn owned_values_round_trip() {
    // Stands in for the source's move-semantics scenario: a heap-allocated,
    // non-Copy payload survives the enqueue/dequeue round trip intact.
    let queue = Queue::<Box<i32>>::default();
    queue.set_consumer(std::thread::current().id());

    assert!(queue.enqueue(Box::new(42)));

    let out = queue.dequeue().expect("item was enqueued");
    assert_eq!(*out, 42);
}

#[test]
fn bulk_operations() {
    let queue = Queue::<i32>::default();
    assert!(queue.enqueue_bulk(1..11));
    assert_eq!(queue.size(), 10);

    let mut output = Vec::new();
    let dequeued = queue.dequeue_bulk(5, |val| output.push(val));
    assert_eq!(dequeued, 5);
    assert_eq!(output.len(), 5);
    assert_eq!(queue.size(), 5);

    output.clear();
    let dequeued = queue.dequeue_bulk(10, |val| output.push(val));
    assert_eq!(dequeued, 5);
    assert_eq!(queue.size(), 0);
    assert!(queue.is_empty());
}

#[test]
fn edge_cases() {
    let queue = Queue::<i32>::default();
    assert_eq!(queue.dequeue(), None);

    assert!(queue.enqueue_bulk(std::iter::empty::<i32>()));

    let dequeued = queue.dequeue_bulk(0, |_| {});
    assert_eq!(dequeued, 0);

    let dequeued = queue.dequeue_bulk(10, |_| {});
    assert_eq!(dequeued, 0);
}

#[test]
fn producer_management() {
    let queue = Arc::new(Queue::<i32>::default());
    assert_eq!(queue.active_producer_count(), 0);

    let stop = Arc::new(AtomicBool::new(false));

    let q1 = Arc::clone(&queue);
    let s1 = Arc::clone(&stop);
    let producer1 = std::thread::spawn(move || {
        q1.enqueue(100);
        while !s1.load(Ordering::Relaxed) {
            std::thread::sleep(Duration::from_micros(10));
        }
    });
    wait_until(|| queue.active_producer_count() >= 1);
    assert_eq!(queue.active_producer_count(), 1);

    let q2 = Arc::clone(&queue);
    let s2 = Arc::clone(&stop);
    let producer2 = std::thread::spawn(move || {
        q2.enqueue(200);
        q2.enqueue(300);
        while !s2.load(Ordering::Relaxed) {
            std::thread::sleep(Duration::from_micros(10));
        }
    });
    wait_until(|| queue.active_producer_count() >= 2);
    assert_eq!(queue.active_producer_count(), 2);

    stop.store(true, Ordering::Relaxed);
    producer1.join().unwrap();
    producer2.join().unwrap();

    queue.clear();
    assert_eq!(queue.active_producer_count(), 0);
    assert!(queue.is_empty());
}

#[test]
fn multiple_producers() {
    const NUM_THREADS: i32 = 5;
    const ITEMS_PER_THREAD: i32 = 100;

    let queue = Arc::new(Queue::<i32>::default());
    let total_enqueued = Arc::new(AtomicUsize::new(0));

    let producers: Vec<_> = (0..NUM_THREADS)
        .map(|i| {
            let queue = Arc::clone(&queue);
            let total_enqueued = Arc::clone(&total_enqueued);
            std::thread::spawn(move || {
                for j in 0..ITEMS_PER_THREAD {
                    if queue.enqueue(i * 1000 + j) {
                        total_enqueued.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    for p in producers {
        p.join().unwrap();
    }

    let expected = (NUM_THREADS * ITEMS_PER_THREAD) as usize;
    assert_eq!(queue.size(), expected);
    assert_eq!(total_enqueued.load(Ordering::Relaxed), expected);

    let mut received = Vec::new();
    while received.len() < expected {
        if let Some(value) = queue.dequeue() {
            received.push(value);
        }
    }

    assert_eq!(received.len(), expected);
    assert!(queue.is_empty());
}

#[test]
fn consumer_thread_restriction() {
    let queue = Arc::new(Queue::<i32>::new(QueueConfig {
        single_consumer: true,
        ..QueueConfig::default()
    }));
    queue.set_consumer(std::thread::current().id());

    queue.enqueue(1);
    assert_eq!(queue.dequeue(), Some(1));

    let other = Arc::clone(&queue);
    std::thread::spawn(move || {
        assert_eq!(other.dequeue(), None);
    })
    .join()
    .unwrap();
}

#[test]
fn statistics_enabled() {
    let queue = Queue::<i32>::new(QueueConfig {
        enable_stats: true,
        ..QueueConfig::default()
    });
    queue.set_consumer(std::thread::current().id());

    for i in 0..10 {
        queue.enqueue(i);
    }
    for _ in 0..5 {
        queue.dequeue();
    }

    let stats = queue.get_stats().expect("stats enabled");
    assert_eq!(stats.total_enqueues(), 10);
    assert_eq!(stats.total_dequeues(), 5);
}

#[test]
fn concurrent_producers_consumer() {
    const PRODUCER_COUNT: i32 = 3;
    const ITEMS_PER_PRODUCER: i32 = 1000;
    const TOTAL_ITEMS: i32 = PRODUCER_COUNT * ITEMS_PER_PRODUCER;

    let queue = Arc::new(Queue::<i32>::default());
    let produced = Arc::new(AtomicUsize::new(0));
    let consumed = Arc::new(AtomicUsize::new(0));

    let producers: Vec<_> = (0..PRODUCER_COUNT)
        .map(|i| {
            let queue = Arc::clone(&queue);
            let produced = Arc::clone(&produced);
            std::thread::spawn(move || {
                for j in 0..ITEMS_PER_PRODUCER {
                    if queue.enqueue(i * ITEMS_PER_PRODUCER + j) {
                        produced.fetch_add(1, Ordering::Relaxed);
                    }
                    std::thread::sleep(Duration::from_micros(1));
                }
            })
        })
        .collect();

    let consumer_queue = Arc::clone(&queue);
    let consumer_consumed = Arc::clone(&consumed);
    let consumer = std::thread::spawn(move || {
        consumer_queue.set_consumer(std::thread::current().id());
        while (consumer_consumed.load(Ordering::Relaxed) as i32) < TOTAL_ITEMS {
            if consumer_queue.dequeue().is_some() {
                consumer_consumed.fetch_add(1, Ordering::Relaxed);
            } else {
                std::thread::yield_now();
            }
        }
    });

    for p in producers {
        p.join().unwrap();
    }
    consumer.join().unwrap();

    assert_eq!(produced.load(Ordering::Relaxed) as i32, TOTAL_ITEMS);
    assert_eq!(consumed.load(Ordering::Relaxed) as i32, TOTAL_ITEMS);
    assert!(queue.is_empty());
}

#[test]
fn thread_exit_cleanup() {
    let queue = Arc::new(Queue::<i32>::default());
    let initial_count = queue.active_producer_count();

    let q = Arc::clone(&queue);
    let temp_thread = std::thread::spawn(move || {
        for i in 0..10 {
            q.enqueue(i);
        }
    });
    temp_thread.join().unwrap();

    wait_until(|| queue.active_producer_count() == initial_count);
    assert_eq!(queue.active_producer_count(), initial_count);
}

#[test]
fn invalid_config_rejected_without_panicking() {
    let result = Queue::<i32>::try_new(QueueConfig {
        initial_slot_capacity: 100,
        ..QueueConfig::default()
    });
    assert_eq!(
        result.err(),
        Some(ConfigError::CapacityNotPowerOfTwo { got: 100 })
    );
}

/// Polls `pred` for up to a second, yielding between checks. Used for the
/// handful of assertions that depend on another thread's slot registration
/// or exit cleanup becoming visible.
fn wait_until(mut pred: impl FnMut() -> bool) {
    for _ in 0..2000 {
        if pred() {
            return;
        }
        std::thread::sleep(Duration::from_micros(500));
    }
}
