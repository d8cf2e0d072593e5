//! Token Validator: cache lookup, remote validation, cache write.
//!
//! Per call:
//! 1. Look the token up in the cache; a fresh hit is returned as-is
//! 2. On a miss, ask the authority
//! 3. Write the answer to the cache (denials included) and return it
//!
//! Concurrent misses for the same token each reach the authority; there is
//! no single-flight de-duplication. The last writer's answer stays cached.

use crate::cache::{CacheStats, TokenCache};
use crate::client::Authority;
use crate::crypto::digest::short_fingerprint;
use crate::protocol::models::ValidationResult;
use crate::GateError;
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves token validity through the cache and the authority.
pub struct TokenValidator {
    authority: Arc<dyn Authority>,
    cache: Arc<TokenCache>,
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidator")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl TokenValidator {
    /// Create a validator over an authority and a cache.
    pub fn new(authority: Arc<dyn Authority>, cache: Arc<TokenCache>) -> Self {
        Self { authority, cache }
    }

    /// Validate a token. Always returns a result, never fails.
    ///
    /// Cache read failures are logged and treated as a miss; cache write
    /// failures are logged and the fresh result is still returned. An empty
    /// token is denied without a remote call and is not cached.
    pub fn validate_token(&self, token: &str) -> ValidationResult {
        if token.is_empty() {
            return ValidationResult::denied(GateError::MalformedToken("empty".to_string()).to_string());
        }

        let fp = short_fingerprint(token);

        match self.cache.get(token) {
            Ok(Some(cached)) => {
                debug!(fingerprint = %fp, valid = cached.valid, "Token cache hit");
                return cached;
            }
            Ok(None) => debug!(fingerprint = %fp, "Token cache miss"),
            Err(e) => warn!(error = %e, fingerprint = %fp, "Token cache read failed, validating remotely"),
        }

        let result = self.authority.validate(token);

        if let Err(e) = self.cache.put(token, &result) {
            warn!(error = %e, fingerprint = %fp, "Failed to cache validation result");
        }

        result
    }

    /// Clear one token's cached result, or all of them.
    pub fn clear_cache(&self, token: Option<&str>) -> Result<usize, GateError> {
        self.cache.clear(token)
    }

    /// Delete stale cache entries now.
    pub fn sweep_expired(&self) -> Result<usize, GateError> {
        self.cache.sweep_expired()
    }

    /// Cache entry counts.
    pub fn cache_stats(&self) -> Result<CacheStats, GateError> {
        self.cache.stats()
    }

    /// The underlying cache, for wiring the background sweeper.
    pub fn cache(&self) -> &Arc<TokenCache> {
        &self.cache
    }
}
