//! Bridge to an operating-system logging facility
//!
//! Platform facilities usually offer fewer priorities than [`LogLevel`], so
//! levels are folded onto [`BridgePriority`] first. [`BridgeHandler`] plugs a
//! facility in as an ordinary handler; [`BridgedLogger`] instead writes the
//! raw message to the facility next to an async submission on a [`Logger`].

use crate::core::{Handler, LogLevel, Logger, Result};
use std::fmt;
use std::io::Write;

/// Priority channels exposed by typical platform log facilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BridgePriority {
    Verbose,
    Debug,
    Info,
    Warn,
    Error,
    Assert,
}

impl BridgePriority {
    /// Single-letter code used in logcat-style output
    pub fn letter(&self) -> char {
        match self {
            BridgePriority::Verbose => 'V',
            BridgePriority::Debug => 'D',
            BridgePriority::Info => 'I',
            BridgePriority::Warn => 'W',
            BridgePriority::Error => 'E',
            BridgePriority::Assert => 'A',
        }
    }
}

impl From<LogLevel> for BridgePriority {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Verbose | LogLevel::Trace => BridgePriority::Verbose,
            LogLevel::Debug => BridgePriority::Debug,
            LogLevel::Info => BridgePriority::Info,
            LogLevel::Warn => BridgePriority::Warn,
            LogLevel::Error => BridgePriority::Error,
            LogLevel::Fatal => BridgePriority::Assert,
        }
    }
}

impl fmt::Display for BridgePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// A platform logging call
pub trait PlatformLog: Send + Sync {
    fn write(&self, priority: BridgePriority, tag: &str, message: &str) -> Result<()>;
}

/// Writes `I/tag: message` lines to stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrPlatformLog;

impl StderrPlatformLog {
    pub fn render(priority: BridgePriority, tag: &str, message: &str) -> String {
        format!("{}/{}: {}", priority.letter(), tag, message)
    }
}

impl PlatformLog for StderrPlatformLog {
    fn write(&self, priority: BridgePriority, tag: &str, message: &str) -> Result<()> {
        writeln!(
            std::io::stderr().lock(),
            "{}",
            Self::render(priority, tag, message)
        )?;
        Ok(())
    }
}

/// Forwards every record it receives to a platform facility
pub struct BridgeHandler<P> {
    platform: P,
}

impl<P: PlatformLog> BridgeHandler<P> {
    pub fn new(platform: P) -> Self {
        Self { platform }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }
}

impl<P: PlatformLog> Handler for BridgeHandler<P> {
    fn handle(&self, level: LogLevel, tag: &str, message: &str) -> Result<()> {
        self.platform.write(level.into(), tag, message)
    }

    fn name(&self) -> &str {
        "bridge"
    }
}

/// Pairs a [`Logger`] with a platform facility
///
/// Each call submits the message asynchronously through the logger and also
/// writes the raw, unformatted message to the platform. The two deliveries
/// are independent: the platform write is not subject to the logger's
/// thresholds. With [`with_context`](Self::with_context) the logger's
/// context fields are appended to the platform line.
///
/// # Example
///
/// ```
/// use sinklog::prelude::*;
/// use sinklog::handlers::{BridgedLogger, StderrPlatformLog};
///
/// let bridged = BridgedLogger::new(Logger::new("App"), StderrPlatformLog);
/// bridged.i("Android log!");
/// ```
pub struct BridgedLogger<P> {
    logger: Logger,
    platform: P,
    append_context: bool,
}

impl<P: PlatformLog> BridgedLogger<P> {
    pub fn new(logger: Logger, platform: P) -> Self {
        Self {
            logger,
            platform,
            append_context: false,
        }
    }

    #[must_use]
    pub fn with_context(mut self, enabled: bool) -> Self {
        self.append_context = enabled;
        self
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        let fields = if self.append_context {
            self.logger.context_fields()
        } else {
            String::new()
        };
        let written = if fields.is_empty() {
            self.platform.write(level.into(), self.logger.tag(), &message)
        } else {
            let line = format!("{} {}", message, fields);
            self.platform.write(level.into(), self.logger.tag(), &line)
        };
        if let Err(e) = written {
            self.logger
                .registry()
                .diagnostics()
                .error(&format!("Platform log write failed: {}", e));
        }
        self.logger.log_async(level, message);
    }

    pub fn v(&self, message: impl Into<String>) {
        self.log(LogLevel::Verbose, message);
    }

    pub fn d(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn i(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn w(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn e(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    /// "What a terrible failure": logged at `Fatal`
    pub fn wtf(&self, message: impl Into<String>) {
        self.log(LogLevel::Fatal, message);
    }
}
