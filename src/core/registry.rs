//! Shared state consulted by every logger on every call
//!
//! Handlers and levels are written rarely and read constantly, so the
//! handler list is an immutable snapshot swapped atomically on registration:
//! producers never contend with each other to iterate it. The async
//! executor is only spawned the first time it is needed.

use super::diagnostics::{DiagnosticHook, Diagnostics};
use super::executor::AsyncExecutor;
use super::formatter::{Formatter, LogFormatter};
use super::handler::Handler;
use super::log_level::LogLevel;
use arc_swap::{ArcSwap, ArcSwapOption};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

static GLOBAL: OnceLock<Arc<LoggerRegistry>> = OnceLock::new();

pub struct LoggerRegistry {
    handlers: ArcSwap<Vec<Arc<dyn Handler>>>,
    min_level: AtomicU8,
    use_colors: AtomicBool,
    default_formatter: RwLock<Arc<dyn Formatter>>,
    executor: ArcSwapOption<AsyncExecutor>,
    executor_init: Mutex<()>,
    diagnostics: Diagnostics,
}

impl LoggerRegistry {
    /// An isolated registry with no handlers and a `Verbose` threshold
    pub fn new() -> Self {
        Self::with_diagnostics(Diagnostics::new())
    }

    pub fn with_diagnostic_hook(hook: DiagnosticHook) -> Self {
        Self::with_diagnostics(Diagnostics::with_hook(hook))
    }

    fn with_diagnostics(diagnostics: Diagnostics) -> Self {
        Self {
            handlers: ArcSwap::from_pointee(Vec::new()),
            min_level: AtomicU8::new(LogLevel::Verbose as u8),
            use_colors: AtomicBool::new(false),
            default_formatter: RwLock::new(Arc::new(LogFormatter::default())),
            executor: ArcSwapOption::empty(),
            executor_init: Mutex::new(()),
            diagnostics,
        }
    }

    /// The process-wide registry used by loggers built without one
    pub fn global() -> Arc<LoggerRegistry> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(LoggerRegistry::new())))
    }

    /// Append a handler shared by every logger bound to this registry
    pub fn add_handler(&self, handler: Arc<dyn Handler>) {
        self.handlers.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&handler));
            next
        });
    }

    /// Current handler snapshot, in registration order
    pub fn handlers(&self) -> Arc<Vec<Arc<dyn Handler>>> {
        self.handlers.load_full()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.load().len()
    }

    pub fn set_min_level(&self, level: LogLevel) {
        self.min_level.store(level as u8, Ordering::Release);
    }

    pub fn min_level(&self) -> LogLevel {
        LogLevel::from_u8(self.min_level.load(Ordering::Acquire)).unwrap_or(LogLevel::Verbose)
    }

    /// Initial color flag for loggers created afterwards
    pub fn set_use_colors(&self, enabled: bool) {
        self.use_colors.store(enabled, Ordering::Release);
    }

    pub fn use_colors(&self) -> bool {
        self.use_colors.load(Ordering::Acquire)
    }

    /// Formatter for loggers created afterwards without one of their own
    pub fn set_default_formatter(&self, formatter: Arc<dyn Formatter>) {
        *self.default_formatter.write() = formatter;
    }

    pub fn default_formatter(&self) -> Arc<dyn Formatter> {
        self.default_formatter.read().clone()
    }

    /// Swap the shared executor, returning the previous one (if any was
    /// created) so the caller can shut it down
    pub fn set_async_executor(&self, executor: AsyncExecutor) -> Option<Arc<AsyncExecutor>> {
        let _init = self.executor_init.lock();
        self.executor.swap(Some(Arc::new(executor)))
    }

    /// The shared executor, spawning one worker per CPU on first use
    pub fn executor(&self) -> Arc<AsyncExecutor> {
        self.executor_or_else(|diagnostics| {
            let threads = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1);
            AsyncExecutor::with_diagnostics(threads, diagnostics.clone())
        })
    }

    pub fn has_executor(&self) -> bool {
        self.executor.load().is_some()
    }

    fn executor_or_else<F>(&self, create: F) -> Arc<AsyncExecutor>
    where
        F: FnOnce(&Diagnostics) -> AsyncExecutor,
    {
        if let Some(executor) = self.executor.load_full() {
            return executor;
        }
        let _init = self.executor_init.lock();
        if let Some(executor) = self.executor.load_full() {
            return executor;
        }
        let executor = Arc::new(create(&self.diagnostics));
        self.executor.store(Some(Arc::clone(&executor)));
        executor
    }

    /// Drain the shared executor for up to `grace`, then cancel what is left.
    ///
    /// A registry that never spawned an executor gets a closed one, so later
    /// async submissions are rejected as they would be after a real drain.
    pub fn shutdown_async_executor(&self, grace: Duration) -> bool {
        let executor = self.executor_or_else(|_| AsyncExecutor::closed());
        let completed = executor.shutdown(grace);
        if !completed {
            self.diagnostics.warn(&format!(
                "Async executor did not finish within {:?}. Remaining async logs were cancelled.",
                grace
            ));
        }
        completed
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

impl Default for LoggerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LoggerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerRegistry")
            .field("handlers", &self.handler_count())
            .field("min_level", &self.min_level())
            .field("use_colors", &self.use_colors())
            .finish()
    }
}
