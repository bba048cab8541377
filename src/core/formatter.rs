//! Message formatting
//!
//! A [`Formatter`] turns `(level, tag, message)` into the single string every
//! handler receives. [`LogFormatter`] is the template-based implementation:
//!
//! - `{time}` - the rendered timestamp
//! - `{level}` - the level name, optionally colored
//! - `{tag}` - the logger tag
//! - `{message}` - the message text
//!
//! The template is parsed once. Placeholder text appearing inside a tag or a
//! message is copied through verbatim.

use super::log_level::LogLevel;
use super::timestamp::TimestampFormat;
use chrono::{DateTime, Local};
use std::fmt;
use std::sync::Arc;

/// Template used when none is configured
pub const DEFAULT_TEMPLATE: &str = "[{time}] [{level}] {tag}: {message}";

/// Source of the wall-clock time used for `{time}`
pub type Clock = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

pub trait Formatter: Send + Sync {
    fn format(&self, level: LogLevel, tag: &str, message: &str) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Time,
    Level,
    Tag,
    Message,
}

fn parse_template(template: &str) -> Vec<Segment> {
    const PLACEHOLDERS: [(&str, Segment); 4] = [
        ("{time}", Segment::Time),
        ("{level}", Segment::Level),
        ("{tag}", Segment::Tag),
        ("{message}", Segment::Message),
    ];

    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = template;

    'scan: while let Some(ch) = rest.chars().next() {
        if ch == '{' {
            for (token, segment) in PLACEHOLDERS.iter() {
                if let Some(after) = rest.strip_prefix(token) {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(segment.clone());
                    rest = after;
                    continue 'scan;
                }
            }
        }
        literal.push(ch);
        rest = &rest[ch.len_utf8()..];
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    segments
}

/// Template-based formatter
///
/// # Example
///
/// ```
/// use sinklog::{Formatter, LogFormatter, LogLevel, TimestampFormat};
///
/// let formatter = LogFormatter::new("{level} | {tag}: {message}");
/// assert_eq!(formatter.format(LogLevel::Info, "Main", "started"), "INFO | Main: started");
///
/// let timed = LogFormatter::default().with_timestamp(TimestampFormat::pattern("%H:%M:%S"));
/// let line = timed.format(LogLevel::Warn, "Net", "slow");
/// assert!(line.ends_with("[WARN] Net: slow"));
/// ```
#[derive(Clone)]
pub struct LogFormatter {
    template: String,
    segments: Vec<Segment>,
    timestamp: TimestampFormat,
    color_level: bool,
    clock: Option<Clock>,
}

impl LogFormatter {
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        Self {
            segments: parse_template(&template),
            template,
            timestamp: TimestampFormat::default(),
            color_level: false,
            clock: None,
        }
    }

    /// Formatter that passes the message through untouched
    pub fn message_only() -> Self {
        Self::new("{message}")
    }

    #[must_use]
    pub fn with_timestamp(mut self, format: TimestampFormat) -> Self {
        self.timestamp = format;
        self
    }

    /// Shorthand for a strftime pattern timestamp
    #[must_use]
    pub fn with_time_pattern(self, pattern: &str) -> Self {
        self.with_timestamp(TimestampFormat::pattern(pattern))
    }

    /// Wrap the `{level}` placeholder in the level's ANSI color
    #[must_use]
    pub fn with_level_colors(mut self, enabled: bool) -> Self {
        self.color_level = enabled;
        self
    }

    /// Replace the wall clock, e.g. with a frozen one in tests
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn format_at(
        &self,
        level: LogLevel,
        tag: &str,
        message: &str,
        at: &DateTime<Local>,
    ) -> String {
        let mut out = String::with_capacity(self.template.len() + tag.len() + message.len() + 24);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Time => out.push_str(&self.timestamp.format(at)),
                Segment::Level if self.color_level => out.push_str(&level.colorize(level.to_str())),
                Segment::Level => out.push_str(level.to_str()),
                Segment::Tag => out.push_str(tag),
                Segment::Message => out.push_str(message),
            }
        }
        out
    }

    fn now(&self) -> DateTime<Local> {
        match &self.clock {
            Some(clock) => clock(),
            None => Local::now(),
        }
    }
}

impl Default for LogFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

impl Formatter for LogFormatter {
    fn format(&self, level: LogLevel, tag: &str, message: &str) -> String {
        let at = self.now();
        self.format_at(level, tag, message, &at)
    }
}

impl fmt::Debug for LogFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogFormatter")
            .field("template", &self.template)
            .field("timestamp", &self.timestamp)
            .field("color_level", &self.color_level)
            .field("clock", &self.clock.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn frozen() -> Clock {
        let at = Local.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        Arc::new(move || at)
    }

    #[test]
    fn test_default_template() {
        let formatter = LogFormatter::default().with_clock(frozen());
        assert_eq!(
            formatter.format(LogLevel::Info, "Main", "Application started"),
            "[2025-03-14 09:26:53] [INFO] Main: Application started"
        );
    }

    #[test]
    fn test_frozen_clock_is_deterministic() {
        let formatter = LogFormatter::default().with_clock(frozen());
        let first = formatter.format(LogLevel::Error, "Db", "timeout");
        let second = formatter.format(LogLevel::Error, "Db", "timeout");
        assert_eq!(first, second);
    }

    #[test]
    fn test_placeholders_in_message_are_not_expanded() {
        let formatter = LogFormatter::new("{tag}: {message}");
        assert_eq!(
            formatter.format(LogLevel::Debug, "{level}", "literal {tag} and {time}"),
            "{level}: literal {tag} and {time}"
        );
    }

    #[test]
    fn test_unknown_braces_are_literal() {
        let formatter = LogFormatter::new("{{level}} {unknown} {message}");
        assert_eq!(formatter.format(LogLevel::Warn, "t", "m"), "{WARN} {unknown} m");
    }

    #[test]
    fn test_level_colors() {
        let formatter = LogFormatter::new("{level}").with_level_colors(true);
        assert_eq!(
            formatter.format(LogLevel::Error, "t", "m"),
            "\u{1b}[31mERROR\u{1b}[0m"
        );
    }

    #[test]
    fn test_message_only() {
        let formatter = LogFormatter::message_only();
        assert_eq!(formatter.format(LogLevel::Fatal, "tag", "raw"), "raw");
    }

    #[test]
    fn test_custom_time_pattern() {
        let formatter = LogFormatter::new("{time}|{message}")
            .with_time_pattern("%H:%M")
            .with_clock(frozen());
        assert_eq!(formatter.format(LogLevel::Info, "t", "x"), "09:26|x");
    }
}
