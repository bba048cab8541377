//! Console handler

use crate::core::{Formatter, Handler, LogFormatter, LogLevel, Result};
use colored::Colorize;
use std::io::Write;
use std::sync::Arc;

/// Prints each record on its own line, coloring the whole line by level
///
/// `Error` and `Fatal` go to stderr, everything else to stdout.
///
/// # Example
///
/// ```
/// use sinklog::prelude::*;
/// use std::sync::Arc;
///
/// let logger = Logger::new("Main");
/// logger.add_handler(Arc::new(ConsoleHandler::new()));
/// logger.info("Console log!");
/// ```
pub struct ConsoleHandler {
    use_colors: bool,
    formatter: Arc<dyn Formatter>,
}

impl ConsoleHandler {
    /// Colored output, message printed as received
    pub fn new() -> Self {
        Self::with_colors(true)
    }

    pub fn with_colors(use_colors: bool) -> Self {
        Self {
            use_colors,
            formatter: Arc::new(LogFormatter::message_only()),
        }
    }

    /// Re-render each record through `formatter` before printing
    #[must_use]
    pub fn with_formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = formatter;
        self
    }

    fn render(&self, level: LogLevel, tag: &str, message: &str) -> String {
        let line = self.formatter.format(level, tag, message);
        if self.use_colors {
            line.color(level.color_code()).to_string()
        } else {
            line
        }
    }
}

impl Default for ConsoleHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for ConsoleHandler {
    fn handle(&self, level: LogLevel, tag: &str, message: &str) -> Result<()> {
        let output = self.render(level, tag, message);
        match level {
            LogLevel::Error | LogLevel::Fatal => writeln!(std::io::stderr().lock(), "{}", output)?,
            _ => writeln!(std::io::stdout().lock(), "{}", output)?,
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        std::io::stdout().flush()?;
        std::io::stderr().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}
