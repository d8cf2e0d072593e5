//! In-process authority double for tests.

use crate::client::Authority;
use crate::protocol::models::{ContentId, DateRange, ValidationResult};
use crate::GateError;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Authority double with scripted answers and call counters.
///
/// Unknown tokens are denied with "Unknown token".
#[derive(Debug, Default)]
pub struct MockAuthority {
    answers: Mutex<HashMap<String, ValidationResult>>,
    validate_calls: AtomicUsize,
    reports: Mutex<Vec<(ContentId, String)>>,
    fail_reports: AtomicBool,
    revenue: Mutex<Option<Value>>,
}

impl MockAuthority {
    /// Create an authority that knows no tokens.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a valid answer for a token.
    pub fn grant(&self, token: &str, claims: Map<String, Value>) {
        self.answers
            .lock()
            .insert(token.to_string(), ValidationResult::granted(claims));
    }

    /// Script a denied answer for a token.
    pub fn deny(&self, token: &str, message: &str) {
        self.answers
            .lock()
            .insert(token.to_string(), ValidationResult::denied(message));
    }

    /// Make subsequent access reports fail with a transport error.
    pub fn fail_reports(&self, fail: bool) {
        self.fail_reports.store(fail, Ordering::SeqCst);
    }

    /// Set the body returned by the revenue report.
    pub fn set_revenue(&self, value: Value) {
        *self.revenue.lock() = Some(value);
    }

    /// Number of validation calls received.
    pub fn validate_calls(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    /// Access reports received, in order.
    pub fn reports(&self) -> Vec<(ContentId, String)> {
        self.reports.lock().clone()
    }
}

impl Authority for MockAuthority {
    fn validate(&self, token: &str) -> ValidationResult {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        self.answers
            .lock()
            .get(token)
            .cloned()
            .unwrap_or_else(|| ValidationResult::denied("Unknown token"))
    }

    fn report_access(&self, content_id: ContentId, token: &str) -> Result<(), GateError> {
        if self.fail_reports.load(Ordering::SeqCst) {
            return Err(GateError::Transport("connection refused".to_string()));
        }
        self.reports.lock().push((content_id, token.to_string()));
        Ok(())
    }

    fn revenue_report(&self, _range: &DateRange) -> Result<Value, GateError> {
        self.revenue
            .lock()
            .clone()
            .ok_or_else(|| GateError::Transport("revenue unavailable".to_string()))
    }

    fn content_performance(&self, _range: &DateRange) -> Result<Value, GateError> {
        Ok(json!([]))
    }

    fn company_usage(&self, _range: &DateRange) -> Result<Value, GateError> {
        Ok(json!([]))
    }
}
