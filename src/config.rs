//! Contentgate configuration.

use crate::GateError;
use serde::Deserialize;
use std::time::Duration;

/// Default cache lifetime for a validation result (1 hour).
pub const DEFAULT_CACHE_DURATION_SECS: u64 = 3600;

/// Default interval of the background cache sweep (1 day).
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Shortest cache lifetime accepted by [`GateConfig::validate`].
pub const MIN_CACHE_DURATION_SECS: u64 = 300;

/// Environment variable prefix read by [`GateConfig::from_env`].
pub const ENV_PREFIX: &str = "CONTENTGATE_";

/// Configuration for the gating core.
///
/// Built once per process and passed to each component's constructor.
/// Can be assembled in code (starting from [`Default`]) or read from
/// `CONTENTGATE_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// API key for the authority. Empty means "not configured": validation
    /// then fails closed instead of erroring.
    pub api_key: String,

    /// Base URL for the authority's reporting and analytics API.
    pub api_base_url: String,

    /// Token validation endpoint. Defaults to `<api_base_url>/validate-token`.
    pub validation_url: Option<String>,

    /// Marketplace where readers obtain tokens; linked from denial notices.
    pub marketplace_url: String,

    /// Public URL of this site, sent with access reports.
    pub site_url: String,

    /// How long a validation result stays in the cache.
    pub cache_duration_secs: u64,

    /// Timeout for validation calls.
    pub validation_timeout_secs: u64,

    /// Timeout for reporting and analytics calls.
    pub api_timeout_secs: u64,

    /// Interval of the background cache sweep.
    pub sweep_interval_secs: u64,

    /// Content types that are gated.
    pub protected_types: Vec<String>,

    /// Category ids with an explicit protection rule.
    pub protected_categories: Vec<u64>,

    /// Tag ids with an explicit protection rule.
    pub protected_tags: Vec<u64>,

    /// Query parameter carrying a token.
    pub token_query_param: String,

    /// Cookie carrying a token.
    pub token_cookie: String,

    /// Terminate feed responses when access is denied.
    pub protect_feeds: bool,

    /// Gate the content field of API responses.
    pub protect_api: bool,

    /// Emit crawler-deterrent response headers.
    pub add_headers: bool,

    /// Product identifier used in the outbound User-Agent.
    pub user_agent_product: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_url: "https://api.contentbridge.com/v1".to_string(),
            validation_url: None,
            marketplace_url: "https://market.contentbridge.com".to_string(),
            site_url: String::new(),
            cache_duration_secs: DEFAULT_CACHE_DURATION_SECS,
            validation_timeout_secs: 10,
            api_timeout_secs: 30,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            protected_types: vec!["post".to_string(), "page".to_string()],
            protected_categories: Vec::new(),
            protected_tags: Vec::new(),
            token_query_param: "access_token".to_string(),
            token_cookie: "cb_access_token".to_string(),
            protect_feeds: true,
            protect_api: true,
            add_headers: true,
            user_agent_product: "contentgate".to_string(),
        }
    }
}

impl GateConfig {
    /// Read configuration from `CONTENTGATE_*` environment variables.
    ///
    /// Unset variables keep their defaults. List fields are comma-separated,
    /// e.g. `CONTENTGATE_PROTECTED_TYPES=post,page,guide`.
    pub fn from_env() -> Result<Self, GateError> {
        let config: Self = envy::prefixed(ENV_PREFIX)
            .from_env()
            .map_err(|e| GateError::ConfigError(format!("Failed to read environment: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for obvious errors.
    ///
    /// A missing API key is deliberately not an error here: it surfaces as a
    /// failed validation per request.
    pub fn validate(&self) -> Result<(), GateError> {
        if self.cache_duration_secs < MIN_CACHE_DURATION_SECS {
            return Err(GateError::ConfigError(format!(
                "cache_duration_secs must be at least {}, got {}",
                MIN_CACHE_DURATION_SECS, self.cache_duration_secs
            )));
        }
        if self.api_base_url.is_empty() {
            return Err(GateError::ConfigError(
                "api_base_url cannot be empty".to_string(),
            ));
        }
        if self.validation_url.as_deref().is_some_and(str::is_empty) {
            return Err(GateError::ConfigError(
                "validation_url cannot be empty when set".to_string(),
            ));
        }
        if self.validation_timeout_secs == 0 || self.api_timeout_secs == 0 {
            return Err(GateError::ConfigError(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        if self.sweep_interval_secs == 0 {
            return Err(GateError::ConfigError(
                "sweep_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.token_query_param.is_empty() || self.token_cookie.is_empty() {
            return Err(GateError::ConfigError(
                "token_query_param and token_cookie cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolved validation endpoint.
    pub fn validation_endpoint(&self) -> String {
        match &self.validation_url {
            Some(url) => url.clone(),
            None => format!("{}/validate-token", self.api_base_url.trim_end_matches('/')),
        }
    }

    /// Cache lifetime as a `Duration`.
    pub fn cache_duration(&self) -> Duration {
        Duration::from_secs(self.cache_duration_secs)
    }

    /// Validation call timeout.
    pub fn validation_timeout(&self) -> Duration {
        Duration::from_secs(self.validation_timeout_secs)
    }

    /// Reporting/analytics call timeout.
    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    /// Background sweep interval.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Whether an API key is present.
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}
