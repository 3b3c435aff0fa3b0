use std::collections::VecDeque;
use std::sync::Arc;

use log::info;
use parking_lot::Mutex;

/// Receives one line for each breakpoint that matched with logging enabled
///
/// Entries arrive oldest first.  What to keep, and for how long, is up to the sink.
pub trait LogSink {
    fn append_entry(&self, text: String);
}

/// Keeps the most recent entries in memory, dropping the oldest once full
#[derive(Clone)]
pub struct MemoryLog {
    entries: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl MemoryLog {
    pub const DEFAULT_CAPACITY: usize = 1000;

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(Self::DEFAULT_CAPACITY)))),
            capacity: capacity.max(1),
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for MemoryLog {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

impl LogSink for MemoryLog {
    fn append_entry(&self, text: String) {
        let mut entries = self.entries.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(text);
    }
}

/// Forwards entries to the `log` facade
#[derive(Copy, Clone, Debug, Default)]
pub struct LogFacadeSink;

impl LogSink for LogFacadeSink {
    fn append_entry(&self, text: String) {
        info!("{}", text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oldest_entries_are_dropped_first() {
        let log = MemoryLog::with_capacity(2);
        let shared = log.clone();
        log.append_entry("one".to_string());
        log.append_entry("two".to_string());
        log.append_entry("three".to_string());
        assert_eq!(shared.entries(), vec!["two".to_string(), "three".to_string()]);
    }
}
