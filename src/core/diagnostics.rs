//! Fallback channel for the logger's own faults
//!
//! Sink failures never reach the producer. They are reported here instead,
//! either to a user-supplied hook or to stderr.

use std::fmt;
use std::sync::Arc;

/// Callback receiving diagnostic lines
pub type DiagnosticHook = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
    Critical,
}

impl Severity {
    fn label(&self) -> &'static str {
        match self {
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }
}

#[derive(Clone, Default)]
pub struct Diagnostics {
    hook: Option<DiagnosticHook>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self { hook: None }
    }

    pub fn with_hook(hook: DiagnosticHook) -> Self {
        Self { hook: Some(hook) }
    }

    pub fn report(&self, severity: Severity, message: &str) {
        let line = format!("[LOGGER {}] {}", severity.label(), message);
        match &self.hook {
            Some(hook) => hook(&line),
            None => eprintln!("{}", line),
        }
    }

    #[inline]
    pub fn warn(&self, message: &str) {
        self.report(Severity::Warning, message);
    }

    #[inline]
    pub fn error(&self, message: &str) {
        self.report(Severity::Error, message);
    }

    #[inline]
    pub fn critical(&self, message: &str) {
        self.report(Severity::Critical, message);
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

/// Extract a readable message from a caught panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
