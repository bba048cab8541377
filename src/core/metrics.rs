//! Counters for logger and delivery observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Dispatch statistics for one logger
///
/// # Example
///
/// ```
/// use sinklog::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
/// metrics.record_dispatched();
/// metrics.record_filtered();
///
/// assert_eq!(metrics.dispatched(), 1);
/// assert_eq!(metrics.filtered(), 1);
/// ```
#[derive(Debug, Default)]
pub struct LoggerMetrics {
    /// Records that passed filtering and were fanned out
    dispatched: AtomicU64,

    /// Records dropped by the instance or global threshold
    filtered: AtomicU64,

    /// Handler invocations that returned an error or panicked
    handler_failures: AtomicU64,

    /// Async submissions accepted by the executor
    async_submitted: AtomicU64,

    /// Async submissions refused after executor shutdown
    async_rejected: AtomicU64,
}

impl LoggerMetrics {
    pub const fn new() -> Self {
        Self {
            dispatched: AtomicU64::new(0),
            filtered: AtomicU64::new(0),
            handler_failures: AtomicU64::new(0),
            async_submitted: AtomicU64::new(0),
            async_rejected: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn filtered(&self) -> u64 {
        self.filtered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn handler_failures(&self) -> u64 {
        self.handler_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn async_submitted(&self) -> u64 {
        self.async_submitted.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn async_rejected(&self) -> u64 {
        self.async_rejected.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_dispatched(&self) -> u64 {
        self.dispatched.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_filtered(&self) -> u64 {
        self.filtered.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_handler_failure(&self) -> u64 {
        self.handler_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_async_submitted(&self) -> u64 {
        self.async_submitted.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_async_rejected(&self) -> u64 {
        self.async_rejected.fetch_add(1, Ordering::Relaxed)
    }
}

/// Delivery statistics for a queued remote handler
#[derive(Debug, Default)]
pub struct DeliveryMetrics {
    enqueued: AtomicU64,
    delivered: AtomicU64,
    retried: AtomicU64,
    dropped: AtomicU64,
    overflowed: AtomicU64,
    discarded_on_shutdown: AtomicU64,
}

impl DeliveryMetrics {
    pub const fn new() -> Self {
        Self {
            enqueued: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            retried: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            overflowed: AtomicU64::new(0),
            discarded_on_shutdown: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Failed attempts that were put back on the queue
    #[inline]
    pub fn retried(&self) -> u64 {
        self.retried.load(Ordering::Relaxed)
    }

    /// Records given up on after exhausting retries
    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Records discarded by a bounded queue policy
    #[inline]
    pub fn overflowed(&self) -> u64 {
        self.overflowed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn discarded_on_shutdown(&self) -> u64 {
        self.discarded_on_shutdown.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn record_enqueued(&self) -> u64 {
        self.enqueued.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn record_delivered(&self) -> u64 {
        self.delivered.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn record_retried(&self) -> u64 {
        self.retried.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn record_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn record_overflowed(&self) -> u64 {
        self.overflowed.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn record_discarded(&self, count: u64) -> u64 {
        self.discarded_on_shutdown.fetch_add(count, Ordering::Relaxed)
    }
}
