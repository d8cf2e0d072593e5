//! Authority wire types and the normalized validation result.

use crate::clock::Clock;
use crate::GateError;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier of a content item in the host's catalog.
pub type ContentId = u64;

/// Requester type sent with every validation request.
pub const REQUESTER_TYPE: &str = "publisher";

/// Body of a validation request.
#[derive(Debug, Clone, Serialize)]
pub struct ValidateRequest<'a> {
    /// The bearer token being validated.
    pub token: &'a str,
    /// Requester type, always [`REQUESTER_TYPE`].
    #[serde(rename = "type")]
    pub requester: &'static str,
}

impl<'a> ValidateRequest<'a> {
    /// Build a publisher validation request.
    pub fn publisher(token: &'a str) -> Self {
        Self {
            token,
            requester: REQUESTER_TYPE,
        }
    }
}

/// Body of an access report.
#[derive(Debug, Clone, Serialize)]
pub struct AccessReport<'a> {
    /// Content that was served.
    pub post_id: ContentId,
    /// Token that unlocked it.
    pub token: &'a str,
    /// Site that served it.
    pub site_url: &'a str,
}

/// Outcome of validating a token.
///
/// Produced by the authority client or read back from the cache. Never
/// mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the token grants access.
    pub valid: bool,

    /// Human-readable reason; empty when valid. For logs only.
    #[serde(default)]
    pub message: String,

    /// Claims returned by the authority (expiry, owner id, ...).
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl ValidationResult {
    /// A successful validation with the given claims.
    pub fn granted(data: Map<String, Value>) -> Self {
        Self {
            valid: true,
            message: String::new(),
            data,
        }
    }

    /// A failed validation carrying a diagnostic message and no claims.
    pub fn denied(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
            data: Map::new(),
        }
    }

    /// Normalize an authority response body.
    ///
    /// - `valid` is the truthiness of the `valid` field (absent is false).
    /// - `message` is `result`, else `message`, else empty; cleared when valid.
    /// - `data` is the `data` object if present, else the whole body.
    pub fn from_authority_body(body: &[u8]) -> Result<Self, GateError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| GateError::Protocol(format!("Invalid JSON from authority: {}", e)))?;

        let Value::Object(mut object) = value else {
            return Err(GateError::Protocol(
                "Authority response is not a JSON object".to_string(),
            ));
        };

        let valid = object.get("valid").is_some_and(is_truthy);

        let message = if valid {
            String::new()
        } else {
            ["result", "message"]
                .iter()
                .find_map(|key| object.get(*key).and_then(Value::as_str))
                .unwrap_or_default()
                .to_string()
        };

        let data = match object.remove("data") {
            Some(Value::Object(claims)) => claims,
            Some(other) => {
                object.insert("data".to_string(), other);
                object
            }
            None => object,
        };

        Ok(Self {
            valid,
            message,
            data,
        })
    }
}

/// Loose truthiness of a JSON value: `false`, `null`, `0`, `""`, `"0"`,
/// empty arrays and empty objects are false.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Inclusive range of calendar days for analytics queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Create a range; `start` must not be after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, GateError> {
        if start > end {
            return Err(GateError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// A single day.
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// The last `days` days ending today (UTC). `last_days(30, ..)` spans
    /// today and the 30 days before it.
    ///
    /// Fails when the start would fall outside the representable calendar.
    pub fn last_days(days: u32, clock: &dyn Clock) -> Result<Self, GateError> {
        let end = clock.now_utc().date_naive();
        let start = end
            .checked_sub_signed(Duration::days(i64::from(days)))
            .ok_or_else(|| GateError::InvalidDateRange {
                start: format!("{} days before {}", days, end),
                end: end.to_string(),
            })?;
        Ok(Self { start, end })
    }

    /// First day.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day.
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whether a date falls inside the range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Query parameters as sent to the authority.
    pub fn query_params(&self) -> [(&'static str, String); 2] {
        [
            ("start_date", self.start.format("%Y-%m-%d").to_string()),
            ("end_date", self.end.format("%Y-%m-%d").to_string()),
        ]
    }
}
