//! # Contentgate
//!
//! **Bearer-token gating for published content.**
//!
//! Contentgate decides, per request, whether a reader may see a protected
//! content item. Tokens are validated against a remote authority, the
//! answer is cached by token fingerprint, and every granted access is
//! recorded locally (with anonymized client metadata) and reported
//! upstream.
//!
//! ## Features
//!
//! - **Default-protect policy**: protected content types are gated unless
//!   explicitly exempted; category and tag rules only confirm protection
//! - **Cached validation**: one authority call per token per cache window,
//!   denials included
//! - **Fail closed**: an unreachable authority or missing API key denies
//! - **Generic notices**: diagnostics go to logs, never to rendered output
//! - **Privacy-preserving records**: fingerprints instead of tokens, IPs
//!   with the host part zeroed
//!
//! ## Quickstart
//!
//! ```no_run
//! use contentgate::{
//!     AccessGate, ContentMeta, GateConfig, GateRequest, MemoryCatalog, MemoryRecordStore,
//!     MemoryStore,
//! };
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), contentgate::GateError> {
//!     let config = GateConfig {
//!         api_key: "your-api-key".to_string(),
//!         site_url: "https://blog.example.org".to_string(),
//!         ..GateConfig::default()
//!     };
//!
//!     let catalog = Arc::new(MemoryCatalog::new());
//!     catalog.insert(ContentMeta::new(42, "post"));
//!
//!     let gate = AccessGate::new(
//!         config,
//!         catalog,
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(MemoryRecordStore::new()),
//!     )?;
//!
//!     let request = GateRequest::new().with_bearer("reader-token");
//!     let html = gate.protect_content(42, &request, "<p>The full article</p>");
//!     println!("{}", html);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! - `api_key`: authority API key; without it every token is denied
//! - `cache_duration_secs`: validation cache lifetime (minimum 300)
//! - `protected_types`: content types that are gated
//! - `protect_feeds`, `protect_api`, `add_headers`: surface toggles
//!
//! See [`GateConfig`] for full documentation, and [`GateConfig::from_env`]
//! for reading `CONTENTGATE_*` environment variables.

#![deny(missing_docs)]
#![doc(html_root_url = "https://docs.rs/contentgate/0.1.0")]

// Core modules
pub mod clock;
pub mod config;
pub mod errors;

// Token fingerprinting
pub mod crypto;

// Protocol layer
pub mod protocol;

// Client layer
pub mod client;

// Cache layer
pub mod cache;

// Validation
pub mod validator;

// Content and policy
pub mod content;
pub mod policy;

// Request gating (main public API)
pub mod gate;

// Recording and reporting
pub mod analytics;
pub mod recorder;

// Re-exports for public API
pub use analytics::{Analytics, AnalyticsOverview, DailySummary};
pub use cache::{CacheStats, CacheStore, FileStore, MemoryStore, TokenCache};
pub use client::{Authority, AuthorityClient};
pub use clock::{Clock, SystemClock};
pub use config::GateConfig;
pub use content::{ContentCatalog, ContentMeta, MemoryCatalog};
pub use errors::GateError;
pub use gate::{AccessGate, FeedOutcome, GateParts, GateRequest, ProtectionDecision};
pub use policy::access::{ProtectionReason, ProtectionStatus};
pub use protocol::models::{ContentId, DateRange, ValidationResult};
pub use recorder::{
    AccessRecord, AccessRecorder, JsonlRecordStore, LocalStats, MemoryRecordStore, RecordOutcome,
    RecordStore, RequestMetadata,
};
pub use validator::TokenValidator;

#[cfg(any(test, feature = "test-seams"))]
pub use clock::MockClock;
#[cfg(any(test, feature = "test-seams"))]
pub use client::MockAuthority;
