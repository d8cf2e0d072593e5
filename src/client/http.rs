//! Reqwest-based HTTP client for the authority API.
//!
//! Validation and reporting calls are blocking with explicit per-request
//! timeouts. Validation failures are normalized into a denied
//! [`ValidationResult`]; reporting failures are returned as errors for the
//! caller to log.

use crate::client::Authority;
use crate::config::GateConfig;
use crate::crypto::digest::short_fingerprint;
use crate::protocol::models::{AccessReport, ContentId, DateRange, ValidateRequest, ValidationResult};
use crate::GateError;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Authority HTTP client.
#[derive(Debug)]
pub struct AuthorityClient {
    client: Client,
    user_agent: String,
    api_key: String,
    api_base_url: String,
    validation_url: String,
    site_url: String,
    validation_timeout: Duration,
    api_timeout: Duration,
}

impl AuthorityClient {
    /// Create a new authority client from config.
    pub fn new(config: &GateConfig) -> Result<Self, GateError> {
        let client = Client::builder()
            .timeout(config.api_timeout())
            .build()
            .map_err(|e| GateError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            user_agent: build_user_agent(config),
            api_key: config.api_key.trim().to_string(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            validation_url: config.validation_endpoint(),
            site_url: config.site_url.clone(),
            validation_timeout: config.validation_timeout(),
            api_timeout: config.api_timeout(),
        })
    }

    /// Validate a token, keeping the failure kind.
    ///
    /// [`Authority::validate`] wraps this and folds errors into a denied
    /// result; use this directly when the caller needs to tell "denied"
    /// from "unreachable".
    pub fn try_validate(&self, token: &str) -> Result<ValidationResult, GateError> {
        self.require_api_key()?;

        let request = self
            .client
            .post(&self.validation_url)
            .timeout(self.validation_timeout)
            .json(&ValidateRequest::publisher(token));

        let body = self.send(request)?;
        ValidationResult::from_authority_body(&body)
    }

    /// Check that the configured API key is accepted by the authority.
    pub fn validate_credentials(&self) -> Result<bool, GateError> {
        let value = self.get_json("/validate", &[])?;
        Ok(value.get("valid").and_then(Value::as_bool).unwrap_or(false))
    }

    /// Get the configured API base URL.
    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    /// Get the resolved validation endpoint.
    pub fn validation_url(&self) -> &str {
        &self.validation_url
    }

    fn require_api_key(&self) -> Result<(), GateError> {
        if self.api_key.is_empty() {
            return Err(GateError::MissingApiKey);
        }
        Ok(())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path)
    }

    fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, GateError> {
        self.require_api_key()?;
        let request = self
            .client
            .get(self.endpoint(path))
            .timeout(self.api_timeout)
            .query(query);
        decode_json(&self.send(request)?)
    }

    fn post_json<T: Serialize>(&self, path: &str, body: &T) -> Result<Vec<u8>, GateError> {
        self.require_api_key()?;
        let request = self
            .client
            .post(self.endpoint(path))
            .timeout(self.api_timeout)
            .json(body);
        self.send(request)
    }

    /// Attach common headers, send, and return the body of a 2xx response.
    fn send(&self, request: RequestBuilder) -> Result<Vec<u8>, GateError> {
        let response = request
            .header(USER_AGENT, &self.user_agent)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(ACCEPT, "application/json")
            .send()
            .map_err(transport_error)?;

        let status = response.status();
        let body = response
            .bytes()
            .map_err(|e| GateError::Transport(format!("Failed to read body: {}", e)))?
            .to_vec();

        if !status.is_success() {
            return Err(GateError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        Ok(body)
    }

    fn analytics(&self, path: &str, range: &DateRange) -> Result<Value, GateError> {
        self.get_json(path, &range.query_params())
    }
}

impl Authority for AuthorityClient {
    fn validate(&self, token: &str) -> ValidationResult {
        match self.try_validate(token) {
            Ok(result) => {
                if !result.valid {
                    debug!(
                        fingerprint = %short_fingerprint(token),
                        reason = %result.message,
                        "Authority denied token"
                    );
                }
                result
            }
            Err(e) => {
                warn!(
                    error = %e,
                    fingerprint = %short_fingerprint(token),
                    "Token validation failed"
                );
                ValidationResult::denied(e.to_string())
            }
        }
    }

    fn report_access(&self, content_id: ContentId, token: &str) -> Result<(), GateError> {
        let report = AccessReport {
            post_id: content_id,
            token,
            site_url: &self.site_url,
        };
        self.post_json("/access", &report)?;
        Ok(())
    }

    fn revenue_report(&self, range: &DateRange) -> Result<Value, GateError> {
        self.analytics("/analytics/revenue", range)
    }

    fn content_performance(&self, range: &DateRange) -> Result<Value, GateError> {
        self.analytics("/analytics/content", range)
    }

    fn company_usage(&self, range: &DateRange) -> Result<Value, GateError> {
        self.analytics("/analytics/companies", range)
    }
}

fn transport_error(e: reqwest::Error) -> GateError {
    if e.is_timeout() {
        GateError::Transport(format!("Request timed out: {}", e))
    } else {
        GateError::Transport(format!("Request failed: {}", e))
    }
}

fn decode_json(body: &[u8]) -> Result<Value, GateError> {
    serde_json::from_slice(body)
        .map_err(|e| GateError::Protocol(format!("Invalid API response format: {}", e)))
}

/// Pull `message` out of an error body, if there is one.
fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from))
        .unwrap_or_else(|| "Unknown API error".to_string())
}

/// Build a User-Agent string from config.
///
/// Format: `<product>/contentgate-<version>`
pub fn build_user_agent(config: &GateConfig) -> String {
    format!(
        "{}/contentgate-{}",
        config.user_agent_product,
        env!("CARGO_PKG_VERSION")
    )
}
