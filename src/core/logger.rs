//! Main logger implementation

use super::{
    context::{ContextGuard, FieldValue, LoggerContext},
    diagnostics::panic_message,
    error::{LoggerError, Result},
    executor::DEFAULT_SHUTDOWN_TIMEOUT,
    formatter::Formatter,
    handler::Handler,
    log_level::LogLevel,
    metrics::LoggerMetrics,
    registry::LoggerRegistry,
};
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A tagged logger that filters, formats once and fans out to its own
/// handlers followed by its registry's global handlers.
///
/// `Logger` is a handle: clones share handlers, level, context and metrics.
///
/// # Example
///
/// ```
/// use sinklog::prelude::*;
/// use std::sync::Arc;
///
/// let memory = Arc::new(MemoryHandler::new(100));
/// let logger = Logger::builder("Main")
///     .registry(Arc::new(LoggerRegistry::new()))
///     .min_level(LogLevel::Debug)
///     .build();
/// logger.add_handler(memory.clone());
///
/// logger.info("Application started");
/// logger.trace("filtered out");
/// assert_eq!(memory.len(), 1);
/// ```
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

struct LoggerInner {
    tag: String,
    handlers: ArcSwap<Vec<Arc<dyn Handler>>>,
    formatter: Arc<dyn Formatter>,
    min_level: AtomicU8,
    use_colors: AtomicBool,
    context: LoggerContext,
    registry: Arc<LoggerRegistry>,
    metrics: LoggerMetrics,
}

impl LoggerInner {
    fn is_enabled(&self, level: LogLevel) -> bool {
        let instance = LogLevel::from_u8(self.min_level.load(Ordering::Acquire))
            .unwrap_or(LogLevel::Verbose);
        level.is_at_least(instance) && level.is_at_least(self.registry.min_level())
    }

    /// Format once and hand the identical string to every handler
    fn dispatch(&self, level: LogLevel, message: &str) {
        let mut formatted = self.formatter.format(level, &self.tag, message);
        if self.use_colors.load(Ordering::Relaxed) {
            formatted = level.colorize(&formatted);
        }

        let instance = self.handlers.load_full();
        let global = self.registry.handlers();

        for (idx, handler) in instance.iter().chain(global.iter()).enumerate() {
            self.invoke(idx, handler.as_ref(), level, &formatted);
        }
        self.metrics.record_dispatched();
    }

    /// Per-handler isolation: neither an error nor a panic in one handler
    /// stops delivery to the next
    fn invoke(&self, idx: usize, handler: &dyn Handler, level: LogLevel, formatted: &str) {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            handler.handle(level, &self.tag, formatted)
        }));

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                self.metrics.record_handler_failure();
                self.registry.diagnostics().error(&format!(
                    "Handler #{} ({}) failed: {}",
                    idx,
                    handler.name(),
                    e
                ));
            }
            Err(payload) => {
                self.metrics.record_handler_failure();
                self.registry.diagnostics().critical(&format!(
                    "Handler #{} ({}) panicked: {}. Other handlers continue to function.",
                    idx,
                    handler.name(),
                    panic_message(payload.as_ref())
                ));
            }
        }
    }

    /// A panicking flush is contained like a panicking `handle`
    fn flush_one(&self, idx: usize, handler: &dyn Handler) -> Result<()> {
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler.flush())) {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                self.metrics.record_handler_failure();
                self.registry.diagnostics().critical(&format!(
                    "Handler #{} ({}) panicked during flush: {}. Other handlers continue to function.",
                    idx,
                    handler.name(),
                    message
                ));
                Err(LoggerError::handler(
                    handler.name(),
                    format!("panicked during flush: {}", message),
                ))
            }
        }
    }
}

fn same_handler(a: &Arc<dyn Handler>, b: &Arc<dyn Handler>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

impl Logger {
    /// Logger bound to the process-wide registry
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self::builder(tag).build()
    }

    #[must_use]
    pub fn with_formatter(tag: impl Into<String>, formatter: Arc<dyn Formatter>) -> Self {
        Self::builder(tag).formatter(formatter).build()
    }

    #[must_use]
    pub fn builder(tag: impl Into<String>) -> LoggerBuilder {
        LoggerBuilder::new(tag)
    }

    pub fn tag(&self) -> &str {
        &self.inner.tag
    }

    pub fn add_handler(&self, handler: Arc<dyn Handler>) {
        self.inner.handlers.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&handler));
            next
        });
    }

    /// Remove every registration of `handler` from this logger.
    /// Returns whether anything was removed.
    pub fn remove_handler(&self, handler: &Arc<dyn Handler>) -> bool {
        let previous = self.inner.handlers.rcu(|current| {
            current
                .iter()
                .filter(|h| !same_handler(h, handler))
                .cloned()
                .collect::<Vec<_>>()
        });
        previous.iter().any(|h| same_handler(h, handler))
    }

    pub fn handler_count(&self) -> usize {
        self.inner.handlers.load().len()
    }

    /// Register a handler on this logger's registry, shared by every logger
    /// bound to it
    pub fn add_global_handler(&self, handler: Arc<dyn Handler>) {
        self.inner.registry.add_handler(handler);
    }

    pub fn set_min_level(&self, level: LogLevel) {
        self.inner.min_level.store(level as u8, Ordering::Release);
    }

    pub fn min_level(&self) -> LogLevel {
        LogLevel::from_u8(self.inner.min_level.load(Ordering::Acquire)).unwrap_or(LogLevel::Verbose)
    }

    pub fn set_global_min_level(&self, level: LogLevel) {
        self.inner.registry.set_min_level(level);
    }

    /// Wrap every formatted line in the level's ANSI color
    pub fn enable_colors(&self, enable: bool) {
        self.inner.use_colors.store(enable, Ordering::Relaxed);
    }

    pub fn colors_enabled(&self) -> bool {
        self.inner.use_colors.load(Ordering::Relaxed)
    }

    pub fn registry(&self) -> &Arc<LoggerRegistry> {
        &self.inner.registry
    }

    /// Whether a record at `level` would pass both thresholds
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        self.inner.is_enabled(level)
    }

    pub fn put_context<K, V>(&self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.inner.context.put(key, value);
    }

    pub fn remove_context(&self, key: &str) {
        self.inner.context.remove(key);
    }

    /// Immutable snapshot of the context
    pub fn context(&self) -> HashMap<String, FieldValue> {
        self.inner.context.snapshot()
    }

    /// Context rendered as `key=value` pairs sorted by key, empty when unset
    pub fn context_fields(&self) -> String {
        self.inner.context.format_fields()
    }

    /// Set a context field for the lifetime of the returned guard
    pub fn scoped_context<K, V>(&self, key: K, value: V) -> Option<ContextGuard>
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.inner.context.scoped(key, value)
    }

    pub fn log(&self, level: LogLevel, message: impl AsRef<str>) {
        if !self.inner.is_enabled(level) {
            self.inner.metrics.record_filtered();
            return;
        }
        self.inner.dispatch(level, message.as_ref());
    }

    /// Submit the record to the registry's shared executor and return.
    ///
    /// Thresholds are evaluated now; formatting and fan-out happen on a
    /// worker. No ordering is guaranteed between async submissions. After
    /// the executor is shut down, calls are counted and ignored.
    pub fn log_async(&self, level: LogLevel, message: impl Into<String>) {
        if !self.inner.is_enabled(level) {
            self.inner.metrics.record_filtered();
            return;
        }

        let inner = Arc::clone(&self.inner);
        let message = message.into();
        let submitted = self
            .inner
            .registry
            .executor()
            .submit(move || inner.dispatch(level, &message));

        match submitted {
            Ok(()) => {
                self.inner.metrics.record_async_submitted();
            }
            Err(e) => {
                let rejected = self.inner.metrics.record_async_rejected();
                if rejected == 0 || (rejected + 1) % 1000 == 0 {
                    self.inner.registry.diagnostics().warn(&format!(
                        "{}: {} async logs rejected from '{}'",
                        e,
                        rejected + 1,
                        self.inner.tag
                    ));
                }
            }
        }
    }

    /// Flush instance handlers, then global handlers. Every handler is
    /// flushed; the first error is returned.
    pub fn flush(&self) -> Result<()> {
        let instance = self.inner.handlers.load_full();
        let global = self.inner.registry.handlers();
        let mut first_error = None;
        for (idx, handler) in instance.iter().chain(global.iter()).enumerate() {
            if let Err(e) = self.inner.flush_one(idx, handler.as_ref()) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.inner.metrics
    }

    /// Drain the registry's shared executor with the default grace period
    pub fn shutdown_async_executor(&self) -> bool {
        self.shutdown_async_executor_timeout(DEFAULT_SHUTDOWN_TIMEOUT)
    }

    pub fn shutdown_async_executor_timeout(&self, grace: Duration) -> bool {
        self.inner.registry.shutdown_async_executor(grace)
    }

    #[inline]
    pub fn verbose(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Verbose, message);
    }

    #[inline]
    pub fn trace(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Trace, message);
    }

    #[inline]
    pub fn debug(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Debug, message);
    }

    #[inline]
    pub fn info(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Info, message);
    }

    #[inline]
    pub fn warn(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Warn, message);
    }

    #[inline]
    pub fn error(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Error, message);
    }

    #[inline]
    pub fn fatal(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Fatal, message);
    }

    #[inline]
    pub fn verbose_async(&self, message: impl Into<String>) {
        self.log_async(LogLevel::Verbose, message);
    }

    #[inline]
    pub fn trace_async(&self, message: impl Into<String>) {
        self.log_async(LogLevel::Trace, message);
    }

    #[inline]
    pub fn debug_async(&self, message: impl Into<String>) {
        self.log_async(LogLevel::Debug, message);
    }

    #[inline]
    pub fn info_async(&self, message: impl Into<String>) {
        self.log_async(LogLevel::Info, message);
    }

    #[inline]
    pub fn warn_async(&self, message: impl Into<String>) {
        self.log_async(LogLevel::Warn, message);
    }

    #[inline]
    pub fn error_async(&self, message: impl Into<String>) {
        self.log_async(LogLevel::Error, message);
    }

    #[inline]
    pub fn fatal_async(&self, message: impl Into<String>) {
        self.log_async(LogLevel::Fatal, message);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("tag", &self.inner.tag)
            .field("min_level", &self.min_level())
            .field("handlers", &self.handler_count())
            .field("use_colors", &self.colors_enabled())
            .finish()
    }
}

/// Builder for constructing Logger with a fluent API
///
/// # Example
/// ```
/// use sinklog::prelude::*;
/// use std::sync::Arc;
///
/// let logger = Logger::builder("Payments")
///     .min_level(LogLevel::Info)
///     .formatter(Arc::new(LogFormatter::new("{level} {tag}: {message}")))
///     .handler(Arc::new(MemoryHandler::new(10)))
///     .colors(false)
///     .build();
/// assert_eq!(logger.handler_count(), 1);
/// ```
pub struct LoggerBuilder {
    tag: String,
    min_level: LogLevel,
    formatter: Option<Arc<dyn Formatter>>,
    use_colors: Option<bool>,
    registry: Option<Arc<LoggerRegistry>>,
    handlers: Vec<Arc<dyn Handler>>,
}

impl LoggerBuilder {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            min_level: LogLevel::Verbose,
            formatter: None,
            use_colors: None,
            registry: None,
            handlers: Vec::new(),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Defaults to the registry's default formatter
    #[must_use = "builder methods return a new value"]
    pub fn formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Defaults to the registry's color flag
    #[must_use = "builder methods return a new value"]
    pub fn colors(mut self, enabled: bool) -> Self {
        self.use_colors = Some(enabled);
        self
    }

    /// Defaults to [`LoggerRegistry::global`]
    #[must_use = "builder methods return a new value"]
    pub fn registry(mut self, registry: Arc<LoggerRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn build(self) -> Logger {
        let registry = self.registry.unwrap_or_else(LoggerRegistry::global);
        let formatter = self
            .formatter
            .unwrap_or_else(|| registry.default_formatter());
        let use_colors = self.use_colors.unwrap_or_else(|| registry.use_colors());

        Logger {
            inner: Arc::new(LoggerInner {
                tag: self.tag,
                handlers: ArcSwap::from_pointee(self.handlers),
                formatter,
                min_level: AtomicU8::new(self.min_level as u8),
                use_colors: AtomicBool::new(use_colors),
                context: LoggerContext::new(),
                registry,
                metrics: LoggerMetrics::new(),
            }),
        }
    }
}
