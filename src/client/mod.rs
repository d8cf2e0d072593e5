//! Remote authority client.
//!
//! Every outbound call goes through the [`Authority`] trait, so network
//! flakiness stays behind one boundary and tests can swap in a mock.

pub mod http;
#[cfg(any(test, feature = "test-seams"))]
pub mod mock;

use crate::protocol::models::{ContentId, DateRange, ValidationResult};
use crate::GateError;
use serde_json::Value;

/// The validation and analytics service of record.
pub trait Authority: Send + Sync {
    /// Validate a token.
    ///
    /// Never fails: transport problems, bad status codes, malformed bodies
    /// and a missing API key all come back as `valid: false` with a
    /// diagnostic message.
    fn validate(&self, token: &str) -> ValidationResult;

    /// Report a successful content access. Best-effort; callers log errors.
    fn report_access(&self, content_id: ContentId, token: &str) -> Result<(), GateError>;

    /// Revenue aggregates for a date range.
    fn revenue_report(&self, range: &DateRange) -> Result<Value, GateError>;

    /// Per-content performance aggregates for a date range.
    fn content_performance(&self, range: &DateRange) -> Result<Value, GateError>;

    /// Usage by consuming company for a date range.
    fn company_usage(&self, range: &DateRange) -> Result<Value, GateError>;
}

pub use http::AuthorityClient;
#[cfg(any(test, feature = "test-seams"))]
pub use mock::MockAuthority;
