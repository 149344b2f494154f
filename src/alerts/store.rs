//! Concurrent store of tracked alerts keyed by source URL
//!
//! A URL first enters the store as a pending placeholder (`register`), which keeps a
//! second report of the same URL from starting another initial fetch. The
//! placeholder is later replaced by a real record (`put`) or dropped (`delete`).

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::record::AlertRecord;

#[derive(Debug, Clone)]
enum Entry {
    Pending,
    Tracked(Arc<AlertRecord>),
}

/// URL → record map shared by the poll loop, registration tasks and mute requests
///
/// The map lock is only held for single lookups or to copy out the list of
/// records; it is never held while a caller's closure runs.
#[derive(Debug, Default)]
pub struct AlertStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl AlertStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `url` if absent; returns whether it was newly inserted
    pub fn register(&self, url: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        if entries.contains_key(url) {
            return false;
        }

        entries.insert(url.to_string(), Entry::Pending);
        true
    }

    /// Store a record under `url`, replacing any placeholder
    pub fn put(&self, url: &str, record: Arc<AlertRecord>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string(), Entry::Tracked(record));
    }

    /// Get the tracked record for `url` (placeholders are not returned)
    pub fn get(&self, url: &str) -> Option<Arc<AlertRecord>> {
        match self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
        {
            Some(Entry::Tracked(record)) => Some(Arc::clone(record)),
            _ => None,
        }
    }

    /// Check if `url` is tracked or pending
    pub fn contains(&self, url: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(url)
    }

    /// Remove whatever is stored under `url`
    pub fn delete(&self, url: &str) -> Option<Arc<AlertRecord>> {
        match self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(url)
        {
            Some(Entry::Tracked(record)) => Some(record),
            _ => None,
        }
    }

    /// Remove `record` only if it is still the one stored under its URL
    pub fn delete_record(&self, record: &Arc<AlertRecord>) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        match entries.get(record.url()) {
            Some(Entry::Tracked(current)) if Arc::ptr_eq(current, record) => {
                entries.remove(record.url());
                true
            }
            _ => false,
        }
    }

    /// Copy out all tracked records
    pub fn records(&self) -> Vec<Arc<AlertRecord>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter_map(|entry| match entry {
                Entry::Tracked(record) => Some(Arc::clone(record)),
                Entry::Pending => None,
            })
            .collect()
    }

    /// Visit every tracked record until `visit` returns `false`
    ///
    /// Iterates over a copy, so `visit` may freely call back into the store,
    /// including deleting the record being visited.
    pub fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(&Arc<AlertRecord>) -> bool,
    {
        for record in self.records() {
            if !visit(&record) {
                break;
            }
        }
    }

    /// Number of tracked records (placeholders excluded)
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|entry| matches!(entry, Entry::Tracked(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
