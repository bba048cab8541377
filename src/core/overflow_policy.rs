//! Overflow policies for delivery queues
//!
//! A remote handler's queue is unbounded by default: under a sustained
//! outage it grows without limit while retries cycle. A bounded policy caps
//! it at the cost of losing records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a delivery queue does when a new record arrives
///
/// # Example
///
/// ```
/// use sinklog::OverflowPolicy;
///
/// assert_eq!(OverflowPolicy::default(), OverflowPolicy::Unbounded);
/// let policy = OverflowPolicy::DropOldest(10_000);
/// assert_eq!(policy.capacity(), Some(10_000));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverflowPolicy {
    /// Always enqueue
    #[default]
    Unbounded,

    /// Discard the incoming record once this many are queued
    DropNewest(usize),

    /// Discard queued records, oldest first, to make room
    DropOldest(usize),
}

impl OverflowPolicy {
    pub fn capacity(&self) -> Option<usize> {
        match self {
            OverflowPolicy::Unbounded => None,
            OverflowPolicy::DropNewest(cap) | OverflowPolicy::DropOldest(cap) => Some(*cap),
        }
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::Unbounded => write!(f, "Unbounded"),
            OverflowPolicy::DropNewest(cap) => write!(f, "DropNewest({})", cap),
            OverflowPolicy::DropOldest(cap) => write!(f, "DropOldest({})", cap),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_policy_display() {
        assert_eq!(OverflowPolicy::Unbounded.to_string(), "Unbounded");
        assert_eq!(OverflowPolicy::DropNewest(5).to_string(), "DropNewest(5)");
        assert_eq!(OverflowPolicy::DropOldest(7).to_string(), "DropOldest(7)");
    }

    #[test]
    fn test_overflow_policy_from_config() {
        let policy: OverflowPolicy = serde_json::from_str(r#"{"DropNewest":100}"#).unwrap();
        assert_eq!(policy, OverflowPolicy::DropNewest(100));
        assert_eq!(OverflowPolicy::Unbounded.capacity(), None);
    }
}
