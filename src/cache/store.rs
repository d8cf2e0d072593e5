//! Cache storage backends.

use crate::cache::format::CacheEntry;
use crate::GateError;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// Keyed storage for cache entries, one entry per fingerprint.
///
/// Implementations must make `save` atomic per key: a concurrent reader
/// sees either the old entry or the new one, never a partial write.
pub trait CacheStore: Send + Sync {
    /// Load the entry for a fingerprint, stale or not.
    fn load(&self, fingerprint: &str) -> Result<Option<CacheEntry>, GateError>;

    /// Insert or replace the entry for `entry.fingerprint`.
    fn save(&self, entry: CacheEntry) -> Result<(), GateError>;

    /// Delete one entry. Returns whether it existed.
    fn delete(&self, fingerprint: &str) -> Result<bool, GateError>;

    /// Delete all entries. Returns how many were removed.
    fn clear(&self) -> Result<usize, GateError>;

    /// Delete entries with `created_at <= cutoff`. Returns how many were removed.
    fn purge_created_before(&self, cutoff: DateTime<Utc>) -> Result<usize, GateError>;

    /// Snapshot of all entries.
    fn entries(&self) -> Result<Vec<CacheEntry>, GateError>;
}

/// In-memory store backed by a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheStore for MemoryStore {
    fn load(&self, fingerprint: &str) -> Result<Option<CacheEntry>, GateError> {
        Ok(self.entries.get(fingerprint).map(|e| e.value().clone()))
    }

    fn save(&self, entry: CacheEntry) -> Result<(), GateError> {
        self.entries.insert(entry.fingerprint.clone(), entry);
        Ok(())
    }

    fn delete(&self, fingerprint: &str) -> Result<bool, GateError> {
        Ok(self.entries.remove(fingerprint).is_some())
    }

    fn clear(&self) -> Result<usize, GateError> {
        let count = self.entries.len();
        self.entries.clear();
        Ok(count)
    }

    fn purge_created_before(&self, cutoff: DateTime<Utc>) -> Result<usize, GateError> {
        let stale: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.created_at <= cutoff)
            .map(|e| e.key().clone())
            .collect();

        // Re-check under the shard lock so an entry refreshed in between survives.
        let removed = stale
            .iter()
            .filter(|key| {
                self.entries
                    .remove_if(key.as_str(), |_, e| e.created_at <= cutoff)
                    .is_some()
            })
            .count();

        Ok(removed)
    }

    fn entries(&self) -> Result<Vec<CacheEntry>, GateError> {
        Ok(self.entries.iter().map(|e| e.value().clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, MockClock};
    use crate::crypto::digest::fingerprint;
    use crate::protocol::models::ValidationResult;
    use serde_json::Map;

    fn entry(token: &str, valid: bool, clock: &MockClock) -> CacheEntry {
        let result = if valid {
            ValidationResult::granted(Map::new())
        } else {
            ValidationResult::denied("nope")
        };
        CacheEntry::new(fingerprint(token), result, clock)
    }

    #[test]
    fn save_replaces_existing_entry() {
        let clock = MockClock::from_rfc3339("2025-01-15T12:00:00Z");
        let store = MemoryStore::new();

        store.save(entry("t", true, &clock)).unwrap();
        store.save(entry("t", false, &clock)).unwrap();

        assert_eq!(store.len(), 1);
        let loaded = store.load(&fingerprint("t")).unwrap().unwrap();
        assert!(!loaded.result.valid);
    }

    #[test]
    fn delete_and_clear() {
        let clock = MockClock::from_rfc3339("2025-01-15T12:00:00Z");
        let store = MemoryStore::new();
        store.save(entry("a", true, &clock)).unwrap();
        store.save(entry("b", true, &clock)).unwrap();

        assert!(store.delete(&fingerprint("a")).unwrap());
        assert!(!store.delete(&fingerprint("a")).unwrap());
        assert_eq!(store.clear().unwrap(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn purge_only_removes_old_entries() {
        let clock = MockClock::from_rfc3339("2025-01-15T12:00:00Z");
        let store = MemoryStore::new();
        store.save(entry("old", true, &clock)).unwrap();
        let cutoff = clock.now_utc();
        clock.advance_secs(10);
        store.save(entry("new", true, &clock)).unwrap();

        assert_eq!(store.purge_created_before(cutoff).unwrap(), 1);
        assert!(store.load(&fingerprint("old")).unwrap().is_none());
        assert!(store.load(&fingerprint("new")).unwrap().is_some());
    }
}
