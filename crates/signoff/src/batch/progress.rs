//! Ephemeral per-request batch progress.
//!
//! Readers take a snapshot without touching the request lock. Entries are
//! owned by the running batch and disappear when its `ProgressEntry` drops,
//! whichever way the batch ends.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use serde::Serialize;

/// Point-in-time view of a running batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub current: u32,
    pub total: u32,
}

#[derive(Debug)]
struct ProgressCounter {
    current: AtomicU32,
    total: u32,
}

impl ProgressCounter {
    fn snapshot(&self) -> BatchProgress {
        BatchProgress {
            current: self.current.load(Ordering::Acquire),
            total: self.total,
        }
    }
}

/// Shared table of running batches keyed by request id.
#[derive(Clone, Default)]
pub struct ProgressTable {
    entries: Arc<RwLock<HashMap<String, Arc<ProgressCounter>>>>,
}

impl ProgressTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a batch for `request_id` with `current = 0`.
    ///
    /// A stale entry for the same request is replaced.
    pub fn start(&self, request_id: &str, total: u32) -> ProgressEntry {
        let counter = Arc::new(ProgressCounter {
            current: AtomicU32::new(0),
            total,
        });
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(request_id.to_string(), Arc::clone(&counter));
        }
        ProgressEntry {
            request_id: request_id.to_string(),
            counter,
            table: self.clone(),
        }
    }

    pub fn get(&self, request_id: &str) -> Option<BatchProgress> {
        let entries = self.entries.read().ok()?;
        entries.get(request_id).map(|c| c.snapshot())
    }
}

/// Handle held by a running batch. Removes its table entry on drop.
pub struct ProgressEntry {
    request_id: String,
    counter: Arc<ProgressCounter>,
    table: ProgressTable,
}

impl ProgressEntry {
    /// Increments `current` and returns the new snapshot.
    pub fn advance(&self) -> BatchProgress {
        let current = self.counter.current.fetch_add(1, Ordering::AcqRel) + 1;
        BatchProgress {
            current,
            total: self.counter.total,
        }
    }

    pub fn snapshot(&self) -> BatchProgress {
        self.counter.snapshot()
    }
}

impl Drop for ProgressEntry {
    fn drop(&mut self) {
        if let Ok(mut entries) = self.table.entries.write() {
            // Only remove our own counter; a newer batch may have replaced it.
            if entries
                .get(&self.request_id)
                .is_some_and(|c| Arc::ptr_eq(c, &self.counter))
            {
                entries.remove(&self.request_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_advance_and_drop() {
        let table = ProgressTable::new();
        let entry = table.start("r1", 3);
        assert_eq!(table.get("r1"), Some(BatchProgress { current: 0, total: 3 }));

        assert_eq!(entry.advance(), BatchProgress { current: 1, total: 3 });
        assert_eq!(entry.advance().current, 2);
        assert_eq!(table.get("r1").unwrap().current, 2);

        drop(entry);
        assert!(table.get("r1").is_none());
        assert!(table.entries.read().unwrap().is_empty());
    }

    #[test]
    fn test_stale_entry_drop_keeps_replacement() {
        let table = ProgressTable::new();
        let old = table.start("r1", 2);
        let new = table.start("r1", 5);
        drop(old);

        assert_eq!(table.get("r1").unwrap().total, 5);
        drop(new);
        assert!(table.get("r1").is_none());
    }

    #[test]
    fn test_entries_are_independent() {
        let table = ProgressTable::new();
        let a = table.start("a", 1);
        let _b = table.start("b", 2);
        a.advance();
        assert_eq!(table.get("b").unwrap().current, 0);
        assert_eq!(table.entries.read().unwrap().len(), 2);
    }
}
