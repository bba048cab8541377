//! Integration tests for the logger system
//!
//! These tests verify:
//! - Fan-out order and isolation across instance and global handlers
//! - Level filtering at both thresholds
//! - Memory handler eviction, counts and filters end to end
//! - Async dispatch and executor shutdown
//! - HTTP delivery against a local server, and retries against a dead port

use parking_lot::Mutex;
use sinklog::core::LoggerMetrics;
use sinklog::handlers::{HttpHandlerBuilder, LogPayload};
use sinklog::prelude::*;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn isolated() -> Arc<LoggerRegistry> {
    Arc::new(LoggerRegistry::new())
}

fn collecting(name: &str) -> (Arc<dyn Handler>, Arc<Mutex<Vec<String>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let handler = FnHandler::new(move |_: LogLevel, _: &str, message: &str| {
        sink.lock().push(message.to_string());
    })
    .with_name(name)
    .into_shared();
    (handler, seen)
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

#[test]
fn test_memory_capacity_two_end_to_end() {
    let memory = Arc::new(MemoryHandler::new(2));
    let logger = Logger::builder("E2E")
        .registry(isolated())
        .min_level(LogLevel::Trace)
        .formatter(Arc::new(LogFormatter::message_only()))
        .build();
    logger.add_handler(memory.clone());

    logger.info("a");
    logger.info("b");
    logger.info("c");

    let logs = memory.get_logs();
    assert_eq!(logs.len(), 2);
    assert!(logs[0].ends_with("[INFO] E2E: b"), "got {:?}", logs);
    assert!(logs[1].ends_with("[INFO] E2E: c"), "got {:?}", logs);
    assert_eq!(memory.get_level_counts()[&LogLevel::Info], 3);
}

#[test]
fn test_three_invocations_with_identical_string() {
    let registry = isolated();
    let (first, first_seen) = collecting("first");
    let (second, second_seen) = collecting("second");
    let (global, global_seen) = collecting("global");

    let logger = Logger::builder("Fan").registry(Arc::clone(&registry)).build();
    logger.add_handler(first);
    logger.add_handler(second);
    logger.add_global_handler(global);

    logger.warn("disk at 91%");

    let a = first_seen.lock().clone();
    let b = second_seen.lock().clone();
    let c = global_seen.lock().clone();
    assert_eq!(a.len(), 1);
    assert_eq!(a, b);
    assert_eq!(b, c);
    assert!(a[0].contains("[WARN] Fan: disk at 91%"));
}

#[test]
fn test_global_handlers_shared_across_loggers() {
    let registry = isolated();
    let (global, seen) = collecting("global");
    registry.add_handler(global);

    let api = Logger::builder("Api").registry(Arc::clone(&registry)).build();
    let db = Logger::builder("Db").registry(Arc::clone(&registry)).build();
    api.info("request");
    db.info("query");

    let seen = seen.lock();
    assert_eq!(seen.len(), 2);
    assert!(seen[0].contains("Api: request"));
    assert!(seen[1].contains("Db: query"));
}

#[test]
fn test_log_levels() {
    for (i, threshold) in LogLevel::ALL.iter().enumerate() {
        let memory = Arc::new(MemoryHandler::new(16));
        let logger = Logger::builder("Levels")
            .registry(isolated())
            .min_level(*threshold)
            .handler(memory.clone())
            .build();

        for level in LogLevel::ALL {
            logger.log(level, "m");
        }

        assert_eq!(memory.len(), LogLevel::COUNT - i);
        for level in &LogLevel::ALL[..i] {
            assert_eq!(memory.get_level_counts()[level], 0);
        }
        assert_eq!(logger.metrics().filtered(), i as u64);
    }
}

#[test]
fn test_global_min_level_applies_to_every_logger() {
    let registry = isolated();
    let memory = Arc::new(MemoryHandler::new(16));
    registry.add_handler(memory.clone());

    let a = Logger::builder("A").registry(Arc::clone(&registry)).build();
    let b = Logger::builder("B").registry(Arc::clone(&registry)).build();
    a.set_global_min_level(LogLevel::Error);

    a.warn("dropped");
    b.info("dropped");
    b.error("kept");

    assert_eq!(memory.len(), 1);
    assert!(memory.get_logs()[0].contains("B: kept"));
}

#[test]
fn test_failing_handler_does_not_block_siblings() {
    let diagnostics = Arc::new(Mutex::new(Vec::new()));
    let lines = Arc::clone(&diagnostics);
    let registry = Arc::new(LoggerRegistry::with_diagnostic_hook(Arc::new(
        move |line: &str| lines.lock().push(line.to_string()),
    )));

    struct Broken;
    impl Handler for Broken {
        fn handle(&self, _: LogLevel, _: &str, _: &str) -> Result<()> {
            Err(LoggerError::handler("broken", "disk full"))
        }
        fn name(&self) -> &str {
            "broken"
        }
    }

    let panicking = FnHandler::new(|_: LogLevel, _: &str, _: &str| panic!("sink exploded"))
        .with_name("panicking")
        .into_shared();
    let memory = Arc::new(MemoryHandler::new(8));

    let logger = Logger::builder("Iso").registry(registry).build();
    logger.add_handler(Arc::new(Broken));
    logger.add_handler(panicking);
    logger.add_handler(memory.clone());

    logger.error("still delivered");

    assert_eq!(memory.len(), 1);
    assert_eq!(logger.metrics().handler_failures(), 2);
    let lines = diagnostics.lock();
    assert!(lines.iter().any(|l| l.starts_with("[LOGGER ERROR]") && l.contains("disk full")));
    assert!(lines
        .iter()
        .any(|l| l.starts_with("[LOGGER CRITICAL]") && l.contains("sink exploded")));
}

#[test]
fn test_memory_tag_filter_and_structural_queries() {
    let memory = Arc::new(
        MemoryHandler::builder(10)
            .formatter(Arc::new(LogFormatter::new("{level} {tag} {message}")))
            .tags(["A"])
            .build(),
    );
    let registry = isolated();
    let a = Logger::builder("A").registry(Arc::clone(&registry)).build();
    let b = Logger::builder("B").registry(Arc::clone(&registry)).build();
    a.add_handler(memory.clone());
    b.add_handler(memory.clone());

    a.info("mentions B and ERROR");
    b.info("from B");

    assert_eq!(memory.len(), 1);
    assert!(memory.get_logs_by_tag("B").is_empty());
    assert!(memory.get_logs_by_level(LogLevel::Error).is_empty());
    assert_eq!(memory.get_logs_by_tag("A").len(), 1);
}

#[test]
fn test_context_is_stored_not_interpolated() {
    let memory = Arc::new(
        MemoryHandler::builder(4)
            .formatter(Arc::new(LogFormatter::message_only()))
            .build(),
    );
    let logger = Logger::builder("Ctx")
        .registry(isolated())
        .formatter(Arc::new(LogFormatter::new("{message}")))
        .handler(memory.clone())
        .build();

    logger.put_context("request_id", "abc-123");
    logger.put_context("", "ignored");
    logger.put_context("missing", None::<String>);
    logger.info("handled");

    assert_eq!(memory.get_logs(), vec!["handled".to_string()]);
    let context = logger.context();
    assert_eq!(context.len(), 1);
    assert_eq!(context["request_id"], FieldValue::from("abc-123"));

    {
        let _guard = logger.scoped_context("span", 7);
        assert_eq!(logger.context().len(), 2);
    }
    assert_eq!(logger.context().len(), 1);
}

#[test]
fn test_async_logging_and_shutdown() {
    let registry = isolated();
    registry.set_async_executor(AsyncExecutor::new(4));
    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&delivered);
    let logger = Logger::builder("Async")
        .registry(Arc::clone(&registry))
        .handler(
            FnHandler::new(move |_: LogLevel, _: &str, _: &str| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .into_shared(),
        )
        .build();

    for i in 0..200 {
        logger.info_async(format!("Message {}", i));
    }
    logger.debug_async("debug passes the default Verbose threshold");

    assert!(logger.shutdown_async_executor_timeout(Duration::from_secs(5)));
    assert_eq!(delivered.load(Ordering::SeqCst), 201);
    assert_eq!(logger.metrics().async_submitted(), 201);

    logger.info_async("after shutdown");
    thread::sleep(Duration::from_millis(50));
    assert_eq!(delivered.load(Ordering::SeqCst), 201);
    assert_eq!(logger.metrics().async_rejected(), 1);
}

#[test]
fn test_async_filtering_happens_at_submission() {
    let registry = isolated();
    registry.set_async_executor(AsyncExecutor::new(1));
    let logger = Logger::builder("Async")
        .registry(Arc::clone(&registry))
        .min_level(LogLevel::Warn)
        .build();

    logger.info_async("filtered");
    logger.error_async("submitted");

    let metrics: &LoggerMetrics = logger.metrics();
    assert_eq!(metrics.filtered(), 1);
    assert_eq!(metrics.async_submitted(), 1);
    assert!(registry.shutdown_async_executor(Duration::from_secs(2)));
}

#[test]
fn test_graceful_shutdown_times_out_on_slow_handler() {
    let registry = isolated();
    registry.set_async_executor(AsyncExecutor::new(1));
    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&delivered);
    let logger = Logger::builder("Slow")
        .registry(Arc::clone(&registry))
        .handler(
            FnHandler::new(move |_: LogLevel, _: &str, _: &str| {
                thread::sleep(Duration::from_millis(100));
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .into_shared(),
        )
        .build();

    for _ in 0..20 {
        logger.info_async("slow");
    }
    assert!(!logger.shutdown_async_executor_timeout(Duration::from_millis(150)));

    // Queued jobs are cancelled; only in-flight work may still land
    thread::sleep(Duration::from_millis(300));
    let settled = delivered.load(Ordering::SeqCst);
    assert!(settled < 20);
    thread::sleep(Duration::from_millis(300));
    assert_eq!(delivered.load(Ordering::SeqCst), settled);
}

/// Accepts `expected` requests, replies 200 to each, and returns the bodies
/// with their content type
fn spawn_ingest_server(expected: usize) -> (String, thread::JoinHandle<Vec<(String, String)>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind local port");
    let endpoint = format!("http://{}/ingest", listener.local_addr().unwrap());

    let handle = thread::spawn(move || {
        let mut requests = Vec::new();
        for stream in listener.incoming().take(expected) {
            let mut stream = stream.expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));

            let mut content_length = 0usize;
            let mut content_type = String::new();
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).expect("read header");
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    match name.to_ascii_lowercase().as_str() {
                        "content-length" => content_length = value.trim().parse().unwrap(),
                        "content-type" => content_type = value.trim().to_string(),
                        _ => {}
                    }
                }
            }

            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).expect("read body");
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .expect("write response");
            requests.push((content_type, String::from_utf8(body).unwrap()));
        }
        requests
    });

    (endpoint, handle)
}

#[cfg(feature = "http")]
#[test]
fn test_http_delivery_to_local_server() {
    let (endpoint, server) = spawn_ingest_server(2);
    let http = Arc::new(HttpHandler::new(HttpHandlerConfig::new(endpoint)).expect("valid endpoint"));

    let logger = Logger::builder("Main")
        .registry(isolated())
        .formatter(Arc::new(LogFormatter::message_only()))
        .build();
    logger.add_handler(http.clone());

    logger.info("HTTP log sent!");
    logger.error("quote \" inside");

    let requests = server.join().expect("server thread");
    assert!(wait_until(Duration::from_secs(5), || http.metrics().delivered() == 2));
    assert!(http.shutdown());

    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].0, "application/json; charset=UTF-8");

    let first: LogPayload = serde_json::from_str(&requests[0].1).unwrap();
    assert_eq!(first.level, LogLevel::Info);
    assert_eq!(first.tag, "Main");
    assert_eq!(first.message, "HTTP log sent!");

    let second: LogPayload = serde_json::from_str(&requests[1].1).unwrap();
    assert_eq!(second.message, "quote \" inside");
}

#[cfg(feature = "http")]
#[test]
fn test_http_retries_exhausted_against_refused_port() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = HttpHandlerConfig::new(format!("http://127.0.0.1:{}/ingest", port))
        .with_max_retries(2)
        .with_timeouts(Duration::from_millis(200), Duration::from_millis(200));

    let diagnostics = Arc::new(Mutex::new(Vec::new()));
    let lines = Arc::clone(&diagnostics);
    let http = HttpHandlerBuilder::new(config)
        .diagnostic_hook(Arc::new(move |line: &str| lines.lock().push(line.to_string())))
        .build()
        .expect("valid endpoint");

    http.handle(LogLevel::Error, "Net", "never arrives").unwrap();

    assert!(wait_until(Duration::from_secs(10), || http.metrics().dropped() == 1));
    assert_eq!(http.metrics().retried(), 2);
    assert_eq!(http.metrics().delivered(), 0);
    assert_eq!(http.queue_len(), 0);
    assert!(diagnostics.lock()[0].contains("never arrives"));
    http.shutdown();
}

#[test]
fn test_http_rejects_invalid_endpoint() {
    let result = HttpHandlerBuilder::new(HttpHandlerConfig::new("not a url")).build();
    assert!(matches!(result, Err(LoggerError::InvalidConfiguration { .. })));
}

#[test]
fn test_flush_reaches_every_handler() {
    let flushed = Arc::new(AtomicUsize::new(0));

    struct Flushing(Arc<AtomicUsize>);
    impl Handler for Flushing {
        fn handle(&self, _: LogLevel, _: &str, _: &str) -> Result<()> {
            Ok(())
        }
        fn flush(&self) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn name(&self) -> &str {
            "flushing"
        }
    }

    let registry = isolated();
    registry.add_handler(Arc::new(Flushing(Arc::clone(&flushed))));
    let logger = Logger::builder("Flush").registry(registry).build();
    logger.add_handler(Arc::new(Flushing(Arc::clone(&flushed))));

    logger.flush().expect("flush");
    assert_eq!(flushed.load(Ordering::SeqCst), 2);
}
