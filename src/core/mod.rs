//! Core logger types and traits

pub mod context;
pub mod diagnostics;
pub mod error;
pub mod executor;
pub mod formatter;
pub mod handler;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod overflow_policy;
pub mod registry;
pub mod timestamp;

pub use context::{ContextGuard, FieldValue, LoggerContext};
pub use diagnostics::{DiagnosticHook, Diagnostics, Severity};
pub use error::{LoggerError, Result};
pub use executor::{AsyncExecutor, DEFAULT_SHUTDOWN_TIMEOUT};
pub use formatter::{Clock, Formatter, LogFormatter, DEFAULT_TEMPLATE};
pub use handler::{FnHandler, Handler};
pub use log_level::{LogLevel, ANSI_RESET};
pub use logger::{Logger, LoggerBuilder};
pub use metrics::{DeliveryMetrics, LoggerMetrics};
pub use overflow_policy::OverflowPolicy;
pub use registry::LoggerRegistry;
pub use timestamp::{TimestampFormat, DEFAULT_TIME_PATTERN};
