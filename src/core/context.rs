//! Per-logger contextual metadata
//!
//! This module provides:
//! - `FieldValue`: value type for context entries
//! - `LoggerContext`: concurrent key-value store owned by a logger
//! - `ContextGuard`: RAII guard for scoped context
//!
//! Context is stored beside the logger and is not interpolated into the
//! formatted message.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Value type for context fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(fl) => write!(f, "{}", fl),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Null => write!(f, "null"),
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i as i64)
    }
}

impl From<u32> for FieldValue {
    fn from(i: u32) -> Self {
        FieldValue::Int(i as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// Logger-scoped context
///
/// Empty keys and `Null` values count as absent and are ignored, never
/// stored.
///
/// # Example
///
/// ```
/// use sinklog::LoggerContext;
///
/// let ctx = LoggerContext::new();
/// ctx.put("service", "api-gateway");
/// ctx.put("version", "1.2.3");
/// ctx.put("", "ignored");
///
/// assert_eq!(ctx.snapshot().len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LoggerContext {
    fields: Arc<RwLock<HashMap<String, FieldValue>>>,
}

impl LoggerContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a field. Returns whether it was stored.
    pub fn put<K, V>(&self, key: K, value: V) -> bool
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let key = key.into();
        let value = value.into();
        if key.is_empty() || value.is_null() {
            return false;
        }
        self.fields.write().insert(key, value);
        true
    }

    pub fn remove(&self, key: &str) -> Option<FieldValue> {
        if key.is_empty() {
            return None;
        }
        self.fields.write().remove(key)
    }

    pub fn get(&self, key: &str) -> Option<FieldValue> {
        self.fields.read().get(key).cloned()
    }

    pub fn clear(&self) {
        self.fields.write().clear();
    }

    /// Point-in-time copy; later writes do not affect it
    pub fn snapshot(&self) -> HashMap<String, FieldValue> {
        self.fields.read().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.read().is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.read().len()
    }

    /// Format fields as sorted key=value pairs
    pub fn format_fields(&self) -> String {
        let fields = self.fields.read();
        let mut pairs: Vec<_> = fields.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        pairs.sort();
        pairs.join(" ")
    }

    /// Set a field that is removed again when the guard drops
    ///
    /// Returns `None` when the key or value is absent.
    pub fn scoped<K, V>(&self, key: K, value: V) -> Option<ContextGuard>
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let key = key.into();
        if !self.put(key.clone(), value) {
            return None;
        }
        Some(ContextGuard {
            context: Arc::clone(&self.fields),
            key,
        })
    }
}

/// RAII guard for scoped context fields
///
/// When dropped, removes the field from the logger context.
#[must_use = "the field is removed as soon as the guard is dropped"]
pub struct ContextGuard {
    context: Arc<RwLock<HashMap<String, FieldValue>>>,
    key: String,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        self.context.write().remove(&self.key);
    }
}
