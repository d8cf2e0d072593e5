//! Token cache entry format.
//!
//! An entry stores the last validation outcome for one token fingerprint and
//! when it was written. Freshness is a pure function of `created_at`, the
//! configured duration, and the current time:
//!
//! `fresh  <=>  now < created_at + duration`
//!
//! An entry written "in the future" (clock skew between writers) counts as
//! age zero.

use crate::clock::Clock;
use crate::protocol::models::ValidationResult;
use crate::GateError;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cached validation outcome for one token fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// SHA-256 hex fingerprint of the token.
    pub fingerprint: String,

    /// The cached outcome.
    pub result: ValidationResult,

    /// When this entry was written.
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Create an entry stamped with the clock's current time.
    pub fn new(fingerprint: String, result: ValidationResult, clock: &dyn Clock) -> Self {
        Self {
            fingerprint,
            result,
            created_at: clock.now_utc(),
        }
    }

    /// Whether the entry may still be served at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>, duration: Duration) -> bool {
        match now.signed_duration_since(self.created_at).to_std() {
            Ok(age) => age < duration,
            // Negative age
            Err(_) => true,
        }
    }

    /// Serialize the entry to JSON.
    pub fn to_json(&self) -> Result<String, GateError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| GateError::CacheIO(format!("Failed to serialize cache entry: {}", e)))
    }

    /// Deserialize an entry from JSON.
    pub fn from_json(json: &str) -> Result<Self, GateError> {
        serde_json::from_str(json)
            .map_err(|e| GateError::CacheIO(format!("Failed to deserialize cache entry: {}", e)))
    }
}

/// Latest `created_at` that is stale at `now`, or `None` when the duration
/// is too large for anything to be stale yet.
pub fn stale_cutoff(now: DateTime<Utc>, duration: Duration) -> Option<DateTime<Utc>> {
    let delta = TimeDelta::from_std(duration).ok()?;
    now.checked_sub_signed(delta)
}
