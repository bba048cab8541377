//! Log level definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reset sequence appended after an ANSI color code
pub const ANSI_RESET: &str = "\u{1b}[0m";

/// Severity of a log record.
///
/// The declaration order is the filtering order: every threshold check in the
/// crate reduces to [`LogLevel::is_at_least`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum LogLevel {
    Verbose = 0,
    Trace = 1,
    Debug = 2,
    #[default]
    Info = 3,
    Warn = 4,
    Error = 5,
    Fatal = 6,
}

impl LogLevel {
    /// Every level, lowest first
    pub const ALL: [LogLevel; 7] = [
        LogLevel::Verbose,
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Fatal,
    ];

    /// Number of levels
    pub const COUNT: usize = Self::ALL.len();

    #[inline]
    pub fn is_at_least(self, threshold: LogLevel) -> bool {
        self >= threshold
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub(crate) fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            LogLevel::Verbose => "VERBOSE",
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// Raw ANSI escape used when a record is decorated before it reaches a sink
    pub fn ansi_code(&self) -> &'static str {
        match self {
            LogLevel::Verbose => "\u{1b}[90m",
            LogLevel::Trace => "\u{1b}[34m",
            LogLevel::Debug => "\u{1b}[36m",
            LogLevel::Info => "\u{1b}[32m",
            LogLevel::Warn => "\u{1b}[33m",
            LogLevel::Error => "\u{1b}[31m",
            LogLevel::Fatal => "\u{1b}[35m",
        }
    }

    /// Wrap `text` in this level's color
    pub fn colorize(&self, text: &str) -> String {
        format!("{}{}{}", self.ansi_code(), text, ANSI_RESET)
    }

    #[cfg(feature = "console")]
    pub fn color_code(&self) -> colored::Color {
        use colored::Color::*;
        match self {
            LogLevel::Verbose => BrightBlack,
            LogLevel::Trace => Blue,
            LogLevel::Debug => Cyan,
            LogLevel::Info => Green,
            LogLevel::Warn => Yellow,
            LogLevel::Error => Red,
            LogLevel::Fatal => Magenta,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "VERBOSE" => Ok(LogLevel::Verbose),
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "FATAL" => Ok(LogLevel::Fatal),
            _ => Err(format!("Invalid log level: '{}'", s)),
        }
    }
}
