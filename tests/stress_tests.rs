//! Stress tests for concurrent producers
//!
//! These tests verify:
//! - The memory handler's bound and counts hold under contention
//! - Per-thread ordering survives concurrent acceptance
//! - Handler registration never races with dispatch
//! - Async submission from many threads drains completely

use sinklog::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const THREADS: usize = 8;
const PER_THREAD: usize = 2_000;

fn message_only_memory(capacity: usize) -> Arc<MemoryHandler> {
    Arc::new(
        MemoryHandler::builder(capacity)
            .formatter(Arc::new(LogFormatter::message_only()))
            .build(),
    )
}

/// Bound and counts are exact no matter how producers interleave
#[test]
fn test_memory_bound_under_contention() {
    let capacity = 500;
    let memory = message_only_memory(capacity);
    let registry = Arc::new(LoggerRegistry::new());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let memory = Arc::clone(&memory);
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let logger = Logger::builder(format!("T{}", t))
                    .registry(registry)
                    .formatter(Arc::new(LogFormatter::new("{tag} {message}")))
                    .handler(memory)
                    .build();
                barrier.wait();
                for i in 0..PER_THREAD {
                    let level = if i % 4 == 0 { LogLevel::Error } else { LogLevel::Info };
                    logger.log(level, i.to_string());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("producer panicked");
    }

    assert_eq!(memory.len(), capacity);
    let counts = memory.get_level_counts();
    let total = (THREADS * PER_THREAD) as u64;
    assert_eq!(counts[&LogLevel::Error], total / 4);
    assert_eq!(counts[&LogLevel::Info], total - total / 4);
    assert_eq!(counts.values().sum::<u64>(), total);
}

/// Records from one thread keep their relative order in the buffer
#[test]
fn test_per_thread_order_preserved() {
    let memory = message_only_memory(THREADS * PER_THREAD);
    let registry = Arc::new(LoggerRegistry::new());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let memory = Arc::clone(&memory);
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let logger = Logger::builder(format!("T{}", t))
                    .registry(registry)
                    .formatter(Arc::new(LogFormatter::new("{tag} {message}")))
                    .handler(memory)
                    .build();
                for i in 0..PER_THREAD {
                    logger.info(i.to_string());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("producer panicked");
    }

    let mut last_seen: HashMap<String, i64> = HashMap::new();
    for line in memory.get_logs() {
        let (tag, seq) = line.split_once(' ').expect("tag and sequence");
        let seq: i64 = seq.parse().expect("numeric sequence");
        let previous = last_seen.insert(tag.to_string(), seq).unwrap_or(-1);
        assert!(seq > previous, "{} went from {} to {}", tag, previous, seq);
    }
    assert_eq!(last_seen.len(), THREADS);
}

/// Readers snapshot while writers append and clear
#[test]
fn test_concurrent_readers_and_clear() {
    let memory = message_only_memory(64);
    let logger = Logger::builder("Mixed")
        .registry(Arc::new(LoggerRegistry::new()))
        .handler(memory.clone())
        .build();

    let writer = {
        let logger = logger.clone();
        thread::spawn(move || {
            for i in 0..5_000 {
                logger.debug(format!("w{}", i));
            }
        })
    };
    let reader = {
        let memory = Arc::clone(&memory);
        thread::spawn(move || {
            for i in 0..500 {
                assert!(memory.get_logs().len() <= 64);
                assert!(memory.get_logs_reversed().len() <= 64);
                if i % 100 == 0 {
                    memory.clear();
                }
            }
        })
    };

    writer.join().expect("writer panicked");
    reader.join().expect("reader panicked");
    assert!(memory.len() <= 64);
}

/// Registering global handlers while other threads dispatch
#[test]
fn test_registration_during_dispatch() {
    let registry = Arc::new(LoggerRegistry::new());
    let invocations = Arc::new(AtomicUsize::new(0));
    let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));

    let producers: Vec<_> = (0..4)
        .map(|t| {
            let registry = Arc::clone(&registry);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let logger = Logger::builder(format!("P{}", t)).registry(registry).build();
                let mut sent = 0usize;
                while !stop.load(Ordering::Relaxed) {
                    logger.info("tick");
                    sent += 1;
                }
                sent
            })
        })
        .collect();

    for _ in 0..50 {
        let counter = Arc::clone(&invocations);
        registry.add_handler(
            FnHandler::new(move |_: LogLevel, _: &str, _: &str| {
                counter.fetch_add(1, Ordering::Relaxed);
            })
            .into_shared(),
        );
        thread::sleep(Duration::from_millis(1));
    }
    stop.store(true, Ordering::Relaxed);

    let sent: usize = producers
        .into_iter()
        .map(|h| h.join().expect("producer panicked"))
        .sum();
    assert_eq!(registry.handler_count(), 50);
    assert!(invocations.load(Ordering::Relaxed) <= sent * 50);
}

/// Async submissions from many threads all land before shutdown returns
#[test]
fn test_async_from_many_threads() {
    let registry = Arc::new(LoggerRegistry::new());
    registry.set_async_executor(AsyncExecutor::new(4));
    let memory = message_only_memory(THREADS * 500);

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let registry = Arc::clone(&registry);
            let memory = Arc::clone(&memory);
            thread::spawn(move || {
                let logger = Logger::builder(format!("A{}", t))
                    .registry(registry)
                    .handler(memory)
                    .build();
                for i in 0..500 {
                    logger.warn_async(format!("async {}", i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("producer panicked");
    }

    assert!(registry.shutdown_async_executor(Duration::from_secs(10)));
    assert_eq!(memory.len(), THREADS * 500);
    assert_eq!(memory.get_level_counts()[&LogLevel::Warn], (THREADS * 500) as u64);
}
