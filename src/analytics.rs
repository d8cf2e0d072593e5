//! Analytics views for the admin surface.
//!
//! Figures come from the authority's reporting API. Totals over locally
//! stored records live on [`AccessRecorder::local_stats`].
//!
//! [`AccessRecorder::local_stats`]: crate::recorder::AccessRecorder::local_stats

use crate::client::Authority;
use crate::clock::Clock;
use crate::protocol::models::DateRange;
use crate::GateError;
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Revenue, content and company reports for one range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsOverview {
    /// Revenue report.
    pub revenue: Value,
    /// Per-content performance report.
    pub content: Value,
    /// Usage by consuming company.
    pub companies: Value,
}

/// Headline numbers for one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    /// The day summarized.
    pub date: NaiveDate,
    /// Paid requests.
    pub total_requests: u64,
    /// Revenue earned.
    pub total_revenue: f64,
    /// Distinct tokens seen.
    pub unique_tokens: u64,
}

/// Reads the authority's reports.
pub struct Analytics {
    authority: Arc<dyn Authority>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Analytics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analytics").finish_non_exhaustive()
    }
}

impl Analytics {
    /// Create an analytics view.
    pub fn new(authority: Arc<dyn Authority>, clock: Arc<dyn Clock>) -> Self {
        Self { authority, clock }
    }

    /// All three remote reports. Any failure fails the whole call.
    pub fn overview(&self, range: &DateRange) -> Result<AnalyticsOverview, GateError> {
        let revenue = logged("revenue", self.authority.revenue_report(range))?;
        let content = logged("content", self.authority.content_performance(range))?;
        let companies = logged("companies", self.authority.company_usage(range))?;
        Ok(AnalyticsOverview {
            revenue,
            content,
            companies,
        })
    }

    /// Headline numbers for one day from the revenue report. Missing
    /// fields count as zero.
    pub fn daily_summary(&self, date: NaiveDate) -> Result<DailySummary, GateError> {
        let report = logged("revenue", self.authority.revenue_report(&DateRange::day(date)))?;

        Ok(DailySummary {
            date,
            total_requests: number(&report, "total_requests") as u64,
            total_revenue: number(&report, "total_revenue"),
            unique_tokens: number(&report, "unique_tokens") as u64,
        })
    }

    /// [`Analytics::daily_summary`] for yesterday (UTC).
    pub fn yesterday_summary(&self) -> Result<DailySummary, GateError> {
        let yesterday = self.clock.now_utc().date_naive() - Duration::days(1);
        self.daily_summary(yesterday)
    }
}

fn logged(report: &str, result: Result<Value, GateError>) -> Result<Value, GateError> {
    if let Err(e) = &result {
        warn!(error = %e, report, "Failed to fetch analytics report");
    }
    result
}

/// Numeric field of a JSON object; numeric strings are accepted.
fn number(report: &Value, field: &str) -> f64 {
    match report.get(field) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockAuthority;
    use crate::clock::MockClock;
    use serde_json::json;

    fn analytics(authority: Arc<MockAuthority>) -> Analytics {
        Analytics::new(
            authority,
            Arc::new(MockClock::from_rfc3339("2025-01-15T12:00:00Z")),
        )
    }

    #[test]
    fn overview_combines_reports() {
        let authority = Arc::new(MockAuthority::new());
        authority.set_revenue(json!({"total_revenue": 12.5}));
        let range = DateRange::day(NaiveDate::from_ymd_opt(2025, 1, 14).unwrap());

        let overview = analytics(authority).overview(&range).unwrap();
        assert_eq!(overview.revenue["total_revenue"], json!(12.5));
        assert_eq!(overview.content, json!([]));
        assert_eq!(overview.companies, json!([]));
    }

    #[test]
    fn overview_fails_when_any_report_fails() {
        let authority = Arc::new(MockAuthority::new());
        let range = DateRange::day(NaiveDate::from_ymd_opt(2025, 1, 14).unwrap());
        assert!(analytics(authority).overview(&range).is_err());
    }

    #[test]
    fn yesterday_summary_reads_totals() {
        let authority = Arc::new(MockAuthority::new());
        authority.set_revenue(json!({
            "total_requests": 120,
            "total_revenue": "3.60",
            "unique_tokens": 7
        }));

        let summary = analytics(authority).yesterday_summary().unwrap();
        assert_eq!(summary.date, NaiveDate::from_ymd_opt(2025, 1, 14).unwrap());
        assert_eq!(summary.total_requests, 120);
        assert!((summary.total_revenue - 3.6).abs() < f64::EPSILON);
        assert_eq!(summary.unique_tokens, 7);
    }

    #[test]
    fn missing_fields_default_to_zero() {
        let authority = Arc::new(MockAuthority::new());
        authority.set_revenue(json!({}));
        let summary = analytics(authority)
            .daily_summary(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())
            .unwrap();
        assert_eq!(summary.total_requests, 0);
        assert_eq!(summary.total_revenue, 0.0);
    }
}
