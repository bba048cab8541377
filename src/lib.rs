//! # sinklog
//!
//! Tagged, level-filtered logging with pluggable handlers.
//!
//! A [`Logger`] formats each record once and hands the same string to its own
//! handlers and then to the global handlers of its [`LoggerRegistry`].
//! Records can be dispatched on the calling thread or submitted to a shared
//! worker pool.
//!
//! ## Features
//!
//! - **Fan-out**: instance handlers first, then global handlers, in
//!   registration order
//! - **Isolation**: a failing or panicking handler never reaches the caller
//! - **Memory handler**: bounded FIFO buffer with level/tag filters,
//!   queries, per-level counts and callbacks
//! - **HTTP handler**: non-blocking queue with retries on a background worker
//! - **Async dispatch**: shared executor with bounded-time shutdown
//!
//! ## Example
//!
//! ```
//! use sinklog::prelude::*;
//! use std::sync::Arc;
//!
//! let memory = Arc::new(MemoryHandler::new(100));
//! let logger = Logger::builder("Main")
//!     .registry(Arc::new(LoggerRegistry::new()))
//!     .build();
//! logger.add_handler(memory.clone());
//!
//! logger.info("Application started");
//! logger.put_context("user_id", 12345);
//! logger.warn("Low disk space");
//!
//! assert_eq!(memory.len(), 2);
//! assert_eq!(memory.get_level_counts()[&LogLevel::Warn], 1);
//! ```

pub mod core;
pub mod handlers;
pub mod macros;

pub mod prelude {
    #[cfg(feature = "console")]
    pub use crate::handlers::ConsoleHandler;
    pub use crate::handlers::{
        HttpHandler, HttpHandlerConfig, MemoryHandler, MemoryHandlerBuilder, StoredRecord,
    };
    pub use crate::core::{
        AsyncExecutor, ContextGuard, FieldValue, FnHandler, Formatter, Handler, LogFormatter,
        LogLevel, Logger, LoggerBuilder, LoggerError, LoggerMetrics, LoggerRegistry,
        OverflowPolicy, Result, TimestampFormat, DEFAULT_SHUTDOWN_TIMEOUT,
    };
}

#[cfg(feature = "console")]
pub use crate::handlers::ConsoleHandler;
pub use crate::handlers::{
    BridgeHandler, BridgePriority, BridgedLogger, HttpHandler, HttpHandlerBuilder,
    HttpHandlerConfig, MemoryHandler, MemoryHandlerBuilder, PlatformLog, StderrPlatformLog,
};
pub use crate::core::{
    AsyncExecutor, ContextGuard, DeliveryMetrics, DiagnosticHook, Diagnostics, FieldValue,
    FnHandler, Formatter, Handler, LogFormatter, LogLevel, Logger, LoggerBuilder, LoggerContext,
    LoggerError, LoggerMetrics, LoggerRegistry, OverflowPolicy, Result, TimestampFormat,
    DEFAULT_SHUTDOWN_TIMEOUT,
};
