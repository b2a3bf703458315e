use crate::record::LookupRecord;
use dashmap::DashMap;

/// Session-scoped cache of lookup results keyed by player identity.
///
/// Entries live until the process exits; there is no eviction and no TTL, so
/// the cache grows with the number of distinct players seen in a session.
/// Empty records are refused so that a failed lookup can be retried later.
#[derive(Debug, Default)]
pub struct LookupCache {
    entries: DashMap<String, LookupRecord>,
}

impl LookupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<LookupRecord> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Stores a record. Returns `false` (and stores nothing) for empty records.
    pub fn put(&self, key: impl Into<String>, record: LookupRecord) -> bool {
        if record.is_empty() {
            return false;
        }
        self.entries.insert(key.into(), record);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
