//! Access Gate: the per-request decision and its rendering surfaces.
//!
//! Each request runs one synchronous cycle:
//! 1. Evaluate the protection policy for the content item
//! 2. Extract a token from the request
//! 3. Resolve it through the [`TokenValidator`]
//! 4. Allow (and record) or substitute a generic notice
//!
//! Diagnostics land in [`ProtectionDecision::deny_reason`] and the logs;
//! rendered output never carries them.

pub mod request;
pub mod templates;

use crate::cache::{start_cache_sweeper, CacheStore, TokenCache};
use crate::client::{Authority, AuthorityClient};
use crate::clock::{Clock, SystemClock};
use crate::config::GateConfig;
use crate::content::ContentCatalog;
use crate::crypto::digest::short_fingerprint;
use crate::policy::access::{protection_status, ProtectionStatus};
use crate::protocol::models::ContentId;
use crate::recorder::{AccessRecorder, RecordStore, RequestMetadata};
use crate::validator::TokenValidator;
use crate::GateError;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

pub use request::{extract_token, GateRequest};

/// Response headers deterring automated collection of protected pages.
pub const PROTECTION_HEADERS: [(&str, &str); 3] = [
    ("X-Robots-Tag", "noai, noimageai"),
    ("X-ContentBridge-Protected", "true"),
    ("Permission-Policy", "browsing-topics=()"),
];

/// Outcome of gating one request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProtectionDecision {
    /// The content item is gated.
    pub protect: bool,
    /// The request may see the original content.
    pub allow: bool,
    /// Notice to render instead of the content, when denied.
    pub substituted_content: Option<String>,
    /// Internal diagnostic for logs. Never rendered.
    pub deny_reason: Option<String>,
}

/// What a feed renderer should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedOutcome {
    /// Render the feed item normally.
    Continue,
    /// Stop the feed response and emit this message.
    Terminate(String),
}

/// Collaborators for [`AccessGate::from_parts`].
pub struct GateParts {
    /// Validation and reporting service.
    pub authority: Arc<dyn Authority>,
    /// Host content lookup.
    pub catalog: Arc<dyn ContentCatalog>,
    /// Backend for the token cache.
    pub cache_store: Arc<dyn CacheStore>,
    /// Backend for access records.
    pub record_store: Arc<dyn RecordStore>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
}

enum Verdict {
    Unprotected,
    Granted { token: String, claims: Map<String, Value> },
    Denied { reason: String },
}

/// Gates content requests.
pub struct AccessGate {
    config: Arc<GateConfig>,
    catalog: Arc<dyn ContentCatalog>,
    validator: Arc<TokenValidator>,
    recorder: Arc<AccessRecorder>,
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGate")
            .field("config", &self.config)
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}

impl AccessGate {
    /// Create a gate talking to the configured authority over HTTP.
    pub fn new(
        config: GateConfig,
        catalog: Arc<dyn ContentCatalog>,
        cache_store: Arc<dyn CacheStore>,
        record_store: Arc<dyn RecordStore>,
    ) -> Result<Self, GateError> {
        let authority = Arc::new(AuthorityClient::new(&config)?);
        Self::from_parts(
            config,
            GateParts {
                authority,
                catalog,
                cache_store,
                record_store,
                clock: Arc::new(SystemClock),
            },
        )
    }

    /// Create a gate from explicit collaborators.
    pub fn from_parts(config: GateConfig, parts: GateParts) -> Result<Self, GateError> {
        config.validate()?;

        let cache = Arc::new(TokenCache::new(
            parts.cache_store,
            parts.clock.clone(),
            config.cache_duration(),
        ));
        let validator = Arc::new(TokenValidator::new(parts.authority.clone(), cache));
        let recorder = Arc::new(AccessRecorder::new(
            parts.catalog.clone(),
            parts.authority,
            parts.record_store,
            parts.clock,
        ));

        Ok(Self {
            config: Arc::new(config),
            catalog: parts.catalog,
            validator,
            recorder,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// The validator, for cache administration.
    pub fn validator(&self) -> &Arc<TokenValidator> {
        &self.validator
    }

    /// The recorder, for local statistics.
    pub fn recorder(&self) -> &Arc<AccessRecorder> {
        &self.recorder
    }

    /// Protection verdict and the rule behind it.
    pub fn protection_status(&self, content_id: ContentId) -> ProtectionStatus {
        protection_status(self.catalog.get(content_id).as_ref(), &self.config)
    }

    /// Whether requests for an item need a valid token.
    pub fn should_protect(&self, content_id: ContentId) -> bool {
        self.protection_status(content_id).protected
    }

    /// Token carried by a request, per the configured parameter names.
    pub fn extract_token(&self, request: &GateRequest) -> Option<String> {
        extract_token(request, &self.config.token_query_param, &self.config.token_cookie)
    }

    /// Gate a full-content request. A granted access is recorded.
    ///
    /// Recording runs inline, including the upstream access report, so a
    /// granted request can wait up to `api_timeout_secs` on a slow
    /// authority before this returns. Denials and unprotected content never
    /// make that call.
    pub fn decide(&self, content_id: ContentId, request: &GateRequest) -> ProtectionDecision {
        match self.evaluate(content_id, request) {
            Verdict::Unprotected => ProtectionDecision {
                protect: false,
                allow: true,
                ..ProtectionDecision::default()
            },
            Verdict::Granted { token, claims } => {
                self.record(content_id, &token, &claims, request);
                ProtectionDecision {
                    protect: true,
                    allow: true,
                    ..ProtectionDecision::default()
                }
            }
            Verdict::Denied { reason } => ProtectionDecision {
                protect: true,
                allow: false,
                substituted_content: Some(templates::access_denied(&self.config, content_id)),
                deny_reason: Some(reason),
            },
        }
    }

    /// Full content: the original when allowed, else the denial notice.
    pub fn protect_content(&self, content_id: ContentId, request: &GateRequest, content: &str) -> String {
        let decision = self.decide(content_id, request);
        match decision.substituted_content {
            Some(notice) if !decision.allow => notice,
            _ => content.to_string(),
        }
    }

    /// Excerpt: the original when allowed, else a short teaser. Not recorded.
    ///
    /// An empty `excerpt` falls back to the item's stored excerpt.
    pub fn protect_excerpt(&self, content_id: ContentId, request: &GateRequest, excerpt: &str) -> String {
        let excerpt = if excerpt.trim().is_empty() {
            self.catalog
                .get(content_id)
                .map(|meta| meta.excerpt)
                .unwrap_or_default()
        } else {
            excerpt.to_string()
        };
        match self.evaluate(content_id, request) {
            Verdict::Denied { .. } => templates::excerpt_preview(&self.config, content_id, &excerpt),
            _ => excerpt,
        }
    }

    /// Feed item: terminate the feed when feeds are protected and access is
    /// denied. Not recorded.
    pub fn protect_feed(&self, content_id: ContentId, request: &GateRequest) -> FeedOutcome {
        if !self.config.protect_feeds {
            return FeedOutcome::Continue;
        }
        match self.evaluate(content_id, request) {
            Verdict::Denied { .. } => FeedOutcome::Terminate(templates::FEED_DENIED_MESSAGE.to_string()),
            _ => FeedOutcome::Continue,
        }
    }

    /// Rendered content field of an API response, gated like full content
    /// when API protection is on. Not recorded.
    pub fn filter_rest_content(&self, content_id: ContentId, request: &GateRequest, rendered: &str) -> String {
        if !self.config.protect_api {
            return rendered.to_string();
        }
        match self.evaluate(content_id, request) {
            Verdict::Denied { .. } => templates::access_denied(&self.config, content_id),
            _ => rendered.to_string(),
        }
    }

    /// Crawler-deterrent headers to add to a response, if enabled.
    pub fn protection_headers(&self) -> Vec<(&'static str, &'static str)> {
        if self.config.add_headers {
            PROTECTION_HEADERS.to_vec()
        } else {
            Vec::new()
        }
    }

    /// Start the background cache sweep at the configured interval.
    /// Must be called from within a Tokio runtime.
    pub fn start_sweeper(&self) -> JoinHandle<()> {
        start_cache_sweeper(Arc::clone(self.validator.cache()), self.config.sweep_interval())
    }

    fn evaluate(&self, content_id: ContentId, request: &GateRequest) -> Verdict {
        if !self.should_protect(content_id) {
            return Verdict::Unprotected;
        }

        let Some(token) = self.extract_token(request) else {
            debug!(content_id, "Access denied: no token");
            return Verdict::Denied {
                reason: "No access token provided".to_string(),
            };
        };

        let result = self.validator.validate_token(&token);
        if result.valid {
            Verdict::Granted {
                token,
                claims: result.data,
            }
        } else {
            debug!(
                content_id,
                fingerprint = %short_fingerprint(&token),
                reason = %result.message,
                "Access denied: token rejected"
            );
            Verdict::Denied {
                reason: result.message,
            }
        }
    }

    fn record(&self, content_id: ContentId, token: &str, claims: &Map<String, Value>, request: &GateRequest) {
        let metadata = RequestMetadata {
            client_address: request.client_address(),
            user_agent: request.user_agent().map(String::from),
        };
        self.recorder.record(content_id, token, claims, &metadata);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::client::MockAuthority;
    use crate::clock::MockClock;
    use crate::content::{ContentMeta, MemoryCatalog};
    use crate::recorder::MemoryRecordStore;

    struct Fixture {
        authority: Arc<MockAuthority>,
        records: Arc<MemoryRecordStore>,
        gate: AccessGate,
    }

    fn fixture(config: GateConfig) -> Fixture {
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.insert(ContentMeta::new(42, "post").with_excerpt("A long story about gated things"));
        catalog.insert(ContentMeta::new(43, "attachment"));
        let authority = Arc::new(MockAuthority::new());
        authority.grant("valid_abc", Map::new());
        authority.deny("invalid_xyz", "Token expired");
        let records = Arc::new(MemoryRecordStore::new());

        let gate = AccessGate::from_parts(
            config,
            GateParts {
                authority: authority.clone(),
                catalog,
                cache_store: Arc::new(MemoryStore::new()),
                record_store: records.clone(),
                clock: Arc::new(MockClock::from_rfc3339("2025-01-15T12:00:00Z")),
            },
        )
        .unwrap();

        Fixture {
            authority,
            records,
            gate,
        }
    }

    fn with_token(token: &str) -> GateRequest {
        GateRequest::new().with_query("access_token", token)
    }

    #[test]
    fn valid_token_sees_content_and_is_recorded() {
        let f = fixture(GateConfig::default());
        let out = f.gate.protect_content(42, &with_token("valid_abc"), "<p>Body</p>");
        assert_eq!(out, "<p>Body</p>");
        assert_eq!(f.records.len(), 1);
        assert_eq!(f.authority.reports().len(), 1);
    }

    #[test]
    fn access_report_completes_before_decide_returns() {
        let f = fixture(GateConfig::default());
        f.gate.decide(42, &with_token("valid_abc"));
        assert_eq!(f.authority.reports(), vec![(42, "valid_abc".to_string())]);

        f.gate.decide(42, &with_token("invalid_xyz"));
        f.gate.decide(43, &with_token("valid_abc"));
        assert_eq!(f.authority.reports().len(), 1);
    }

    #[test]
    fn invalid_token_gets_generic_notice() {
        let f = fixture(GateConfig::default());
        let decision = f.gate.decide(42, &with_token("invalid_xyz"));
        assert!(decision.protect);
        assert!(!decision.allow);
        assert_eq!(decision.deny_reason.as_deref(), Some("Token expired"));

        let notice = decision.substituted_content.unwrap();
        assert!(notice.contains("protected"));
        assert!(!notice.contains("Token expired"));
        assert!(f.records.is_empty());
    }

    #[test]
    fn missing_token_is_denied_without_remote_call() {
        let f = fixture(GateConfig::default());
        let decision = f.gate.decide(42, &GateRequest::new());
        assert!(!decision.allow);
        assert_eq!(f.authority.validate_calls(), 0);
    }

    #[test]
    fn unprotected_content_passes_without_token() {
        let f = fixture(GateConfig::default());
        assert_eq!(f.gate.protect_content(43, &GateRequest::new(), "file"), "file");
        assert_eq!(f.gate.protect_content(999, &GateRequest::new(), "nothing"), "nothing");
        assert!(f.records.is_empty());
    }

    #[test]
    fn excerpt_feed_and_api_surfaces_do_not_record() {
        let f = fixture(GateConfig::default());
        let request = with_token("valid_abc");
        assert_eq!(f.gate.protect_excerpt(42, &request, "teaser"), "teaser");
        assert_eq!(f.gate.protect_feed(42, &request), FeedOutcome::Continue);
        assert_eq!(f.gate.filter_rest_content(42, &request, "body"), "body");
        assert!(f.records.is_empty());
    }

    #[test]
    fn denied_excerpt_is_a_preview() {
        let f = fixture(GateConfig::default());
        let out = f.gate.protect_excerpt(42, &GateRequest::new(), "A long story about gated things");
        assert!(out.contains("(Protected Content)"));
        assert!(out.contains("content_id=42"));
    }

    #[test]
    fn empty_excerpt_uses_stored_excerpt() {
        let f = fixture(GateConfig::default());
        let denied = f.gate.protect_excerpt(42, &GateRequest::new(), "");
        assert!(denied.starts_with("A long story about gated things..."));

        let allowed = f.gate.protect_excerpt(42, &with_token("valid_abc"), "  ");
        assert_eq!(allowed, "A long story about gated things");
    }

    #[test]
    fn denied_feed_terminates_when_enabled() {
        let f = fixture(GateConfig::default());
        assert_eq!(
            f.gate.protect_feed(42, &GateRequest::new()),
            FeedOutcome::Terminate(templates::FEED_DENIED_MESSAGE.to_string())
        );

        let relaxed = fixture(GateConfig {
            protect_feeds: false,
            ..GateConfig::default()
        });
        assert_eq!(relaxed.gate.protect_feed(42, &GateRequest::new()), FeedOutcome::Continue);
    }

    #[test]
    fn api_filter_respects_toggle() {
        let f = fixture(GateConfig::default());
        assert!(f.gate.filter_rest_content(42, &GateRequest::new(), "body").contains("protected"));

        let open = fixture(GateConfig {
            protect_api: false,
            ..GateConfig::default()
        });
        assert_eq!(open.gate.filter_rest_content(42, &GateRequest::new(), "body"), "body");
    }

    #[test]
    fn protection_headers_respect_toggle() {
        let f = fixture(GateConfig::default());
        assert!(f.gate.protection_headers().contains(&("X-Robots-Tag", "noai, noimageai")));

        let quiet = fixture(GateConfig {
            add_headers: false,
            ..GateConfig::default()
        });
        assert!(quiet.gate.protection_headers().is_empty());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = GateConfig {
            cache_duration_secs: 60,
            ..GateConfig::default()
        };
        let result = AccessGate::from_parts(
            config,
            GateParts {
                authority: Arc::new(MockAuthority::new()),
                catalog: Arc::new(MemoryCatalog::new()),
                cache_store: Arc::new(MemoryStore::new()),
                record_store: Arc::new(MemoryRecordStore::new()),
                clock: Arc::new(MockClock::from_rfc3339("2025-01-15T12:00:00Z")),
            },
        );
        assert!(matches!(result, Err(GateError::ConfigError(_))));
    }
}
