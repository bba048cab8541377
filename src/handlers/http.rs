//! HTTP handler for remote logging
//!
//! Records are queued without blocking the producer and POSTed one at a
//! time by a single background worker. A transport failure puts the record
//! back at the tail of the queue until `max_retries` is exhausted, after
//! which it is dropped and reported on the diagnostic channel. Errors that
//! cannot succeed on retry drop the record at once.

use crate::core::{
    DeliveryMetrics, DiagnosticHook, Diagnostics, Handler, LogLevel, LoggerError, OverflowPolicy,
    Result, DEFAULT_SHUTDOWN_TIMEOUT,
};
use crossbeam_channel::{select, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub const DEFAULT_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Settings for [`HttpHandler`]
///
/// # Example
///
/// ```
/// use sinklog::HttpHandlerConfig;
///
/// let config: HttpHandlerConfig =
///     serde_json::from_str(r#"{"endpoint":"https://logs.example.com/ingest","max_retries":5}"#)
///         .unwrap();
/// assert_eq!(config.max_retries, 5);
/// assert_eq!(config.connect_timeout_ms, 5000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpHandlerConfig {
    pub endpoint: String,
    pub max_retries: u32,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub content_type: String,
    /// Treat 4xx/5xx responses as failed deliveries. Off by default: any
    /// response from the server counts as delivered.
    pub retry_on_error_status: bool,
}

impl Default for HttpHandlerConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            max_retries: 3,
            connect_timeout_ms: 5000,
            read_timeout_ms: 5000,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            retry_on_error_status: false,
        }
    }
}

impl HttpHandlerConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.connect_timeout_ms = u64::try_from(connect.as_millis()).unwrap_or(u64::MAX);
        self.read_timeout_ms = u64::try_from(read.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn with_retry_on_error_status(mut self, enabled: bool) -> Self {
        self.retry_on_error_status = enabled;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(LoggerError::config("HttpHandler", "endpoint is empty"));
        }
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(LoggerError::config(
                "HttpHandler",
                format!("endpoint '{}' is not an http(s) URL", endpoint),
            ));
        }
        #[cfg(feature = "http")]
        reqwest::Url::parse(endpoint).map_err(|e| {
            LoggerError::config("HttpHandler", format!("invalid endpoint '{}': {}", endpoint, e))
        })?;
        Ok(())
    }
}

/// JSON body of one delivery: `{"level":..,"tag":..,"message":..}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogPayload {
    pub level: LogLevel,
    pub tag: String,
    pub message: String,
}

impl LogPayload {
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Delivers one payload. Owned and driven by the handler's worker thread.
pub trait Transport: Send {
    /// A transient `Err` is retried; any other error drops the record
    fn deliver(&mut self, payload: &LogPayload) -> Result<()>;
}

/// Blocking `reqwest` transport
///
/// The client is built on first use, on the worker thread.
#[cfg(feature = "http")]
pub struct HttpTransport {
    config: HttpHandlerConfig,
    client: Option<reqwest::blocking::Client>,
}

#[cfg(feature = "http")]
impl HttpTransport {
    pub fn new(config: HttpHandlerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            client: None,
        })
    }

    fn client(&mut self) -> Result<reqwest::blocking::Client> {
        if let Some(client) = &self.client {
            return Ok(client.clone());
        }
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(self.config.connect_timeout())
            .timeout(self.config.read_timeout())
            .build()
            .map_err(|e| LoggerError::delivery(&self.config.endpoint, e.to_string()))?;
        self.client = Some(client.clone());
        Ok(client)
    }
}

#[cfg(feature = "http")]
impl Transport for HttpTransport {
    fn deliver(&mut self, payload: &LogPayload) -> Result<()> {
        let body = payload.to_json()?;
        let client = self.client()?;

        let response = client
            .post(&self.config.endpoint)
            .header(reqwest::header::CONTENT_TYPE, &self.config.content_type)
            .body(body)
            .send()
            .map_err(|e| LoggerError::delivery(&self.config.endpoint, e.to_string()))?;

        let status = response.status();
        if self.config.retry_on_error_status && (status.is_client_error() || status.is_server_error())
        {
            return Err(LoggerError::rejected(&self.config.endpoint, status.as_u16()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct QueueEntry {
    level: LogLevel,
    tag: String,
    message: String,
    attempts: u32,
}

/// Queued remote handler
///
/// # Example
///
/// ```no_run
/// use sinklog::prelude::*;
/// use std::sync::Arc;
///
/// let http = Arc::new(HttpHandler::new(HttpHandlerConfig::new("https://example.com/log"))
///     .expect("valid endpoint"));
///
/// let logger = Logger::new("Main");
/// logger.add_handler(http.clone());
/// logger.info("HTTP log sent!");
///
/// http.shutdown();
/// ```
pub struct HttpHandler {
    endpoint: String,
    policy: OverflowPolicy,
    sender: Sender<QueueEntry>,
    receiver: Receiver<QueueEntry>,
    stop: Mutex<Option<Sender<()>>>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
    stopped: Arc<AtomicBool>,
    metrics: Arc<DeliveryMetrics>,
    diagnostics: Diagnostics,
}

impl HttpHandler {
    /// Handler using the blocking `reqwest` transport
    #[cfg(feature = "http")]
    pub fn new(config: HttpHandlerConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: HttpHandlerConfig) -> HttpHandlerBuilder {
        HttpHandlerBuilder::new(config)
    }

    fn start(
        config: HttpHandlerConfig,
        transport: Box<dyn Transport>,
        policy: OverflowPolicy,
        diagnostics: Diagnostics,
    ) -> Result<Self> {
        let (sender, receiver) = unbounded::<QueueEntry>();
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let stopped = Arc::new(AtomicBool::new(false));
        let metrics = Arc::new(DeliveryMetrics::new());

        let worker = Worker {
            queue: receiver.clone(),
            requeue: sender.clone(),
            stop: stop_rx,
            stopped: Arc::clone(&stopped),
            transport,
            max_retries: config.max_retries,
            metrics: Arc::clone(&metrics),
            diagnostics: diagnostics.clone(),
        };

        let handle = thread::Builder::new()
            .name("sinklog-http".to_string())
            .spawn(move || worker.run())?;

        Ok(Self {
            endpoint: config.endpoint,
            policy,
            sender,
            receiver,
            stop: Mutex::new(Some(stop_tx)),
            worker: Mutex::new(Some(handle)),
            stopped,
            metrics,
            diagnostics,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Records waiting for delivery, retries included
    pub fn queue_len(&self) -> usize {
        self.sender.len()
    }

    pub fn metrics(&self) -> &DeliveryMetrics {
        &self.metrics
    }

    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::Acquire)
    }

    /// Stop the worker, waiting up to [`DEFAULT_SHUTDOWN_TIMEOUT`] for an
    /// in-flight delivery. Queued records are discarded.
    pub fn shutdown(&self) -> bool {
        self.shutdown_timeout(DEFAULT_SHUTDOWN_TIMEOUT)
    }

    /// Returns `false` if the worker was still busy after `grace`; it is
    /// then left to exit on its own once the current attempt returns.
    pub fn shutdown_timeout(&self, grace: Duration) -> bool {
        self.stopped.store(true, Ordering::Release);
        drop(self.stop.lock().take());

        let completed = match self.worker.lock().take() {
            None => true,
            Some(handle) => {
                let start = Instant::now();
                loop {
                    if handle.is_finished() {
                        if handle.join().is_err() {
                            self.diagnostics
                                .error("HTTP worker thread panicked during shutdown");
                        }
                        break true;
                    }
                    if start.elapsed() >= grace {
                        self.diagnostics.warn(&format!(
                            "HTTP worker for '{}' did not stop within {:?}",
                            self.endpoint, grace
                        ));
                        break false;
                    }
                    thread::sleep(Duration::from_millis(10));
                }
            }
        };

        let discarded = self.receiver.try_iter().count() as u64;
        if discarded > 0 {
            self.metrics.record_discarded(discarded);
        }
        completed
    }

    fn apply_policy(&self) -> bool {
        match self.policy {
            OverflowPolicy::Unbounded => true,
            OverflowPolicy::DropNewest(cap) => {
                if self.sender.len() >= cap {
                    self.report_overflow();
                    return false;
                }
                true
            }
            OverflowPolicy::DropOldest(cap) => {
                while self.sender.len() >= cap {
                    if self.receiver.try_recv().is_err() {
                        break;
                    }
                    self.report_overflow();
                }
                true
            }
        }
    }

    fn report_overflow(&self) {
        let overflowed = self.metrics.record_overflowed();
        if overflowed == 0 || (overflowed + 1) % 1000 == 0 {
            self.diagnostics.warn(&format!(
                "HTTP queue for '{}' full under {}, {} logs dropped",
                self.endpoint,
                self.policy,
                overflowed + 1
            ));
        }
    }
}

impl Handler for HttpHandler {
    fn handle(&self, level: LogLevel, tag: &str, message: &str) -> Result<()> {
        if self.stopped.load(Ordering::Acquire) {
            self.metrics.record_discarded(1);
            return Ok(());
        }
        if !self.apply_policy() {
            return Ok(());
        }

        let entry = QueueEntry {
            level,
            tag: tag.to_string(),
            message: message.to_string(),
            attempts: 0,
        };
        if self.sender.send(entry).is_ok() {
            self.metrics.record_enqueued();
        }
        Ok(())
    }

    /// Delivery is asynchronous; this only reports whether the queue is
    /// still being served
    fn flush(&self) -> Result<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(LoggerError::HandlerStopped(self.endpoint.clone()))
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}

impl Drop for HttpHandler {
    fn drop(&mut self) {
        // Signal only; the worker exits after its current attempt
        self.stopped.store(true, Ordering::Release);
        drop(self.stop.get_mut().take());
    }
}

impl fmt::Debug for HttpHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpHandler")
            .field("endpoint", &self.endpoint)
            .field("policy", &self.policy)
            .field("queue_len", &self.queue_len())
            .field("running", &self.is_running())
            .finish()
    }
}

struct Worker {
    queue: Receiver<QueueEntry>,
    requeue: Sender<QueueEntry>,
    stop: Receiver<()>,
    stopped: Arc<AtomicBool>,
    transport: Box<dyn Transport>,
    max_retries: u32,
    metrics: Arc<DeliveryMetrics>,
    diagnostics: Diagnostics,
}

impl Worker {
    fn run(mut self) {
        loop {
            if self.stopped.load(Ordering::Acquire) {
                break;
            }
            select! {
                recv(self.stop) -> _ => break,
                recv(self.queue) -> entry => match entry {
                    Ok(entry) => self.attempt(entry),
                    Err(_) => break,
                },
            }
        }
    }

    fn attempt(&mut self, mut entry: QueueEntry) {
        if self.stopped.load(Ordering::Acquire) {
            self.metrics.record_discarded(1);
            return;
        }

        let payload = LogPayload {
            level: entry.level,
            tag: std::mem::take(&mut entry.tag),
            message: std::mem::take(&mut entry.message),
        };

        match self.transport.deliver(&payload) {
            Ok(()) => {
                self.metrics.record_delivered();
            }
            Err(e) if e.is_transient() && entry.attempts < self.max_retries => {
                if self.stopped.load(Ordering::Acquire) {
                    // Shutdown already drained the queue
                    self.metrics.record_discarded(1);
                    return;
                }
                entry.attempts += 1;
                entry.tag = payload.tag;
                entry.message = payload.message;
                self.metrics.record_retried();
                // Back of the queue: retries interleave with fresh records
                let _ = self.requeue.send(entry);
            }
            Err(e) if e.is_transient() => {
                self.metrics.record_dropped();
                self.diagnostics.error(&format!(
                    "HttpHandler failed to send log after {} retries: {} ({})",
                    self.max_retries, payload.message, e
                ));
            }
            Err(e) => {
                self.metrics.record_dropped();
                self.diagnostics.error(&format!(
                    "HttpHandler dropped log that cannot be delivered: {} ({})",
                    payload.message, e
                ));
            }
        }
    }
}

pub struct HttpHandlerBuilder {
    config: HttpHandlerConfig,
    transport: Option<Box<dyn Transport>>,
    policy: OverflowPolicy,
    diagnostics: Diagnostics,
}

impl HttpHandlerBuilder {
    pub fn new(config: HttpHandlerConfig) -> Self {
        Self {
            config,
            transport: None,
            policy: OverflowPolicy::default(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Replace the network transport
    #[must_use = "builder methods return a new value"]
    pub fn transport(mut self, transport: Box<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Receives drop and shutdown reports instead of stderr
    #[must_use = "builder methods return a new value"]
    pub fn diagnostic_hook(mut self, hook: DiagnosticHook) -> Self {
        self.diagnostics = Diagnostics::with_hook(hook);
        self
    }

    pub fn build(self) -> Result<HttpHandler> {
        self.config.validate()?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => Self::default_transport(&self.config)?,
        };
        HttpHandler::start(self.config, transport, self.policy, self.diagnostics)
    }

    #[cfg(feature = "http")]
    fn default_transport(config: &HttpHandlerConfig) -> Result<Box<dyn Transport>> {
        Ok(Box::new(HttpTransport::new(config.clone())?))
    }

    #[cfg(not(feature = "http"))]
    fn default_transport(_config: &HttpHandlerConfig) -> Result<Box<dyn Transport>> {
        Err(LoggerError::config(
            "HttpHandler",
            "no transport supplied and the `http` feature is disabled",
        ))
    }
}
