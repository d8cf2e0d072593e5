//! Token validation cache.
//!
//! [`TokenCache`] maps a token's fingerprint to its last validation outcome
//! and hides entries older than the configured duration. Storage is pluggable
//! through [`CacheStore`].

pub mod file;
pub mod format;
pub mod store;
pub mod sweeper;

use crate::clock::Clock;
use crate::crypto::digest::fingerprint;
use crate::protocol::models::ValidationResult;
use crate::GateError;
use format::{stale_cutoff, CacheEntry};
use std::sync::Arc;
use std::time::Duration;

pub use file::FileStore;
pub use store::{CacheStore, MemoryStore};
pub use sweeper::start_cache_sweeper;

/// Entry counts reported by [`TokenCache::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// All entries, stale ones included.
    pub total: usize,
    /// Entries holding a valid result.
    pub valid: usize,
    /// Entries holding a denied result.
    pub invalid: usize,
    /// Entries past their lifetime and awaiting the sweep.
    pub stale: usize,
}

/// Freshness-aware view over a [`CacheStore`].
pub struct TokenCache {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    duration: Duration,
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("duration", &self.duration)
            .finish_non_exhaustive()
    }
}

impl TokenCache {
    /// Create a cache over `store` whose entries live for `duration`.
    pub fn new(store: Arc<dyn CacheStore>, clock: Arc<dyn Clock>, duration: Duration) -> Self {
        Self {
            store,
            clock,
            duration,
        }
    }

    /// Cached result for a token, or `None` when absent or stale.
    ///
    /// Stale entries are left in place for the sweep; they are never returned.
    pub fn get(&self, token: &str) -> Result<Option<ValidationResult>, GateError> {
        let Some(entry) = self.store.load(&fingerprint(token))? else {
            return Ok(None);
        };

        if entry.is_fresh(self.clock.now_utc(), self.duration) {
            Ok(Some(entry.result))
        } else {
            Ok(None)
        }
    }

    /// Store a result for a token, replacing any previous entry.
    pub fn put(&self, token: &str, result: &ValidationResult) -> Result<(), GateError> {
        let entry = CacheEntry::new(fingerprint(token), result.clone(), self.clock.as_ref());
        self.store.save(entry)
    }

    /// Clear one token's entry, or every entry when `token` is `None`.
    /// Returns how many entries were removed.
    pub fn clear(&self, token: Option<&str>) -> Result<usize, GateError> {
        match token {
            Some(token) => Ok(usize::from(self.store.delete(&fingerprint(token))?)),
            None => self.store.clear(),
        }
    }

    /// Delete every entry that is stale now. Returns how many were removed.
    pub fn sweep_expired(&self) -> Result<usize, GateError> {
        match stale_cutoff(self.clock.now_utc(), self.duration) {
            Some(cutoff) => self.store.purge_created_before(cutoff),
            None => Ok(0),
        }
    }

    /// Count entries by outcome and freshness.
    pub fn stats(&self) -> Result<CacheStats, GateError> {
        let now = self.clock.now_utc();
        let mut stats = CacheStats::default();
        for entry in self.store.entries()? {
            stats.total += 1;
            if entry.result.valid {
                stats.valid += 1;
            } else {
                stats.invalid += 1;
            }
            if !entry.is_fresh(now, self.duration) {
                stats.stale += 1;
            }
        }
        Ok(stats)
    }

    /// Configured entry lifetime.
    pub fn duration(&self) -> Duration {
        self.duration
    }
}
