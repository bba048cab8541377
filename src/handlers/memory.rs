//! Bounded in-memory handler
//!
//! Keeps the last `capacity` accepted records, oldest evicted first. Each
//! record keeps its level and tag beside the rendered text, so level and
//! tag queries match fields rather than substrings of the message.

use crate::core::{Formatter, Handler, LogFormatter, LogLevel, Result};
use arc_swap::ArcSwap;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

/// Subscriber invoked with every accepted, formatted record
pub type LogCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Identifies a registered callback for removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

const ALL_LEVELS_MASK: u8 = (1 << LogLevel::COUNT) - 1;

fn level_mask(levels: &[LogLevel]) -> u8 {
    if levels.is_empty() {
        return ALL_LEVELS_MASK;
    }
    levels.iter().fold(0, |mask, level| mask | (1 << level.index()))
}

/// A record as retained by [`MemoryHandler`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub level: LogLevel,
    pub tag: String,
    pub text: String,
}

struct Buffer {
    records: VecDeque<StoredRecord>,
    counts: [u64; LogLevel::COUNT],
}

/// # Example
///
/// ```
/// use sinklog::{Handler, LogFormatter, LogLevel, MemoryHandler};
/// use std::sync::Arc;
///
/// let memory = MemoryHandler::builder(2)
///     .formatter(Arc::new(LogFormatter::new("{level} {tag}: {message}")))
///     .build();
///
/// for msg in ["a", "b", "c"] {
///     memory.handle(LogLevel::Info, "Main", msg).unwrap();
/// }
///
/// assert_eq!(memory.get_logs(), vec!["INFO Main: b", "INFO Main: c"]);
/// assert_eq!(memory.get_level_counts()[&LogLevel::Info], 3);
/// ```
pub struct MemoryHandler {
    capacity: usize,
    formatter: Arc<dyn Formatter>,
    use_colors: bool,
    buffer: Mutex<Buffer>,
    enabled_levels: AtomicU8,
    enabled_tags: RwLock<HashSet<String>>,
    callbacks: ArcSwap<Vec<(CallbackId, LogCallback)>>,
    next_callback: AtomicU64,
}

impl MemoryHandler {
    /// Capacity below one is raised to one
    pub fn new(capacity: usize) -> Self {
        Self::builder(capacity).build()
    }

    pub fn builder(capacity: usize) -> MemoryHandlerBuilder {
        MemoryHandlerBuilder::new(capacity)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Replace the level filter; an empty slice enables every level
    pub fn set_enabled_levels(&self, levels: &[LogLevel]) {
        self.enabled_levels.store(level_mask(levels), Ordering::Release);
    }

    pub fn enabled_levels(&self) -> Vec<LogLevel> {
        let mask = self.enabled_levels.load(Ordering::Acquire);
        LogLevel::ALL
            .into_iter()
            .filter(|level| mask & (1 << level.index()) != 0)
            .collect()
    }

    /// Replace the tag filter; no tags means every tag is accepted
    pub fn set_enabled_tags<I, S>(&self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: HashSet<String> = tags.into_iter().map(Into::into).collect();
        *self.enabled_tags.write() = tags;
    }

    pub fn add_callback(&self, callback: LogCallback) -> CallbackId {
        let id = CallbackId(self.next_callback.fetch_add(1, Ordering::Relaxed));
        self.callbacks.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push((id, Arc::clone(&callback)));
            next
        });
        id
    }

    pub fn remove_callback(&self, id: CallbackId) -> bool {
        let previous = self.callbacks.rcu(|current| {
            current
                .iter()
                .filter(|(existing, _)| *existing != id)
                .cloned()
                .collect::<Vec<_>>()
        });
        previous.iter().any(|(existing, _)| *existing == id)
    }

    fn accepts(&self, level: LogLevel, tag: &str) -> bool {
        if self.enabled_levels.load(Ordering::Acquire) & (1 << level.index()) == 0 {
            return false;
        }
        let tags = self.enabled_tags.read();
        tags.is_empty() || tags.contains(tag)
    }

    /// Snapshot in insertion order
    pub fn get_logs(&self) -> Vec<String> {
        self.buffer.lock().records.iter().map(|r| r.text.clone()).collect()
    }

    /// Snapshot, newest first
    pub fn get_logs_reversed(&self) -> Vec<String> {
        self.buffer
            .lock()
            .records
            .iter()
            .rev()
            .map(|r| r.text.clone())
            .collect()
    }

    pub fn get_logs_by_level(&self, level: LogLevel) -> Vec<String> {
        self.select(|record| record.level == level)
    }

    pub fn get_logs_by_tag(&self, tag: &str) -> Vec<String> {
        self.select(|record| record.tag == tag)
    }

    /// Snapshot of full records, in insertion order
    pub fn records(&self) -> Vec<StoredRecord> {
        self.buffer.lock().records.iter().cloned().collect()
    }

    fn select(&self, predicate: impl Fn(&StoredRecord) -> bool) -> Vec<String> {
        self.buffer
            .lock()
            .records
            .iter()
            .filter(|record| predicate(record))
            .map(|record| record.text.clone())
            .collect()
    }

    /// Accepted records per level since creation or the last [`clear`](Self::clear).
    /// Eviction does not decrement these.
    pub fn get_level_counts(&self) -> BTreeMap<LogLevel, u64> {
        let counts = self.buffer.lock().counts;
        LogLevel::ALL
            .into_iter()
            .map(|level| (level, counts[level.index()]))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().records.is_empty()
    }

    /// Drop all records and reset counters; filters are kept
    pub fn clear(&self) {
        let mut buffer = self.buffer.lock();
        buffer.records.clear();
        buffer.counts = [0; LogLevel::COUNT];
    }
}

impl Handler for MemoryHandler {
    fn handle(&self, level: LogLevel, tag: &str, message: &str) -> Result<()> {
        if !self.accepts(level, tag) {
            return Ok(());
        }

        let mut text = self.formatter.format(level, tag, message);
        if self.use_colors {
            text = level.colorize(&text);
        }

        {
            let mut buffer = self.buffer.lock();
            buffer.records.push_back(StoredRecord {
                level,
                tag: tag.to_string(),
                text: text.clone(),
            });
            buffer.counts[level.index()] += 1;
            while buffer.records.len() > self.capacity {
                buffer.records.pop_front();
            }
        }

        for (_, callback) in self.callbacks.load().iter() {
            callback(&text);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

impl fmt::Debug for MemoryHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryHandler")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("use_colors", &self.use_colors)
            .field("enabled_levels", &self.enabled_levels())
            .finish()
    }
}

pub struct MemoryHandlerBuilder {
    capacity: usize,
    formatter: Option<Arc<dyn Formatter>>,
    use_colors: bool,
    levels: Vec<LogLevel>,
    tags: Vec<String>,
}

impl MemoryHandlerBuilder {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            formatter: None,
            use_colors: false,
            levels: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Defaults to a [`LogFormatter`] with the standard template
    #[must_use = "builder methods return a new value"]
    pub fn formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn colors(mut self, enabled: bool) -> Self {
        self.use_colors = enabled;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn levels(mut self, levels: &[LogLevel]) -> Self {
        self.levels = levels.to_vec();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> MemoryHandler {
        let capacity = self.capacity.max(1);
        MemoryHandler {
            capacity,
            formatter: self
                .formatter
                .unwrap_or_else(|| Arc::new(LogFormatter::default())),
            use_colors: self.use_colors,
            buffer: Mutex::new(Buffer {
                records: VecDeque::with_capacity(capacity.min(1024)),
                counts: [0; LogLevel::COUNT],
            }),
            enabled_levels: AtomicU8::new(level_mask(&self.levels)),
            enabled_tags: RwLock::new(self.tags.into_iter().collect()),
            callbacks: ArcSwap::from_pointee(Vec::new()),
            next_callback: AtomicU64::new(0),
        }
    }
}
