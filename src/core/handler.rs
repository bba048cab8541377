//! Handler trait for log output destinations

use super::{error::Result, log_level::LogLevel};
use std::fmt;

/// A sink that records one already-formatted log record.
///
/// Handlers are shared between loggers, so every method takes `&self`;
/// implementations synchronize their own state. Returning `Ok(())` for a
/// record the handler filters out is expected. Errors and panics are
/// contained by the dispatching logger and never reach the producer.
pub trait Handler: Send + Sync {
    fn handle(&self, level: LogLevel, tag: &str, message: &str) -> Result<()>;

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str;
}

/// Handler backed by a closure
///
/// # Example
///
/// ```
/// use sinklog::{FnHandler, Logger, LogLevel};
///
/// let logger = Logger::builder("Main").build();
/// logger.add_handler(FnHandler::new(|level: LogLevel, tag: &str, message: &str| {
///     println!("{} {} {}", level, tag, message);
/// }).into_shared());
/// ```
pub struct FnHandler<F> {
    name: String,
    callback: F,
}

impl<F> FnHandler<F>
where
    F: Fn(LogLevel, &str, &str) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self {
            name: "custom".to_string(),
            callback,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn into_shared(self) -> std::sync::Arc<dyn Handler>
    where
        F: 'static,
    {
        std::sync::Arc::new(self)
    }
}

impl<F> Handler for FnHandler<F>
where
    F: Fn(LogLevel, &str, &str) + Send + Sync,
{
    fn handle(&self, level: LogLevel, tag: &str, message: &str) -> Result<()> {
        (self.callback)(level, tag, message);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").field("name", &self.name).finish()
    }
}
