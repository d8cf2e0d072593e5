//! Contentgate error types.

use thiserror::Error;

/// Errors raised inside the gating core.
///
/// None of these reach a rendering surface: each component recovers at its
/// boundary and logs the error.
#[derive(Debug, Error)]
pub enum GateError {
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// No API key configured for the authority.
    #[error("API key not configured")]
    MissingApiKey,

    /// HTTP transport error talking to the authority (DNS, connect, timeout).
    #[error("Authority transport error: {0}")]
    Transport(String),

    /// The authority answered with a non-success status.
    #[error("Authority returned status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message from the response body, or a generic one.
        message: String,
    },

    /// The authority answered with a body we could not interpret.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Token cache I/O error.
    #[error("Cache I/O error: {0}")]
    CacheIO(String),

    /// Access record I/O error.
    #[error("Record I/O error: {0}")]
    RecordIO(String),

    /// Token is empty, oversized, or contains forbidden characters.
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// Content id does not resolve to a content item.
    #[error("Content {0} not found")]
    ContentNotFound(u64),

    /// Content exists but is not published.
    #[error("Content {0} is not published")]
    ContentNotPublished(u64),

    /// Date range has its start after its end.
    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange {
        /// Range start (YYYY-MM-DD).
        start: String,
        /// Range end (YYYY-MM-DD).
        end: String,
    },
}

impl GateError {
    /// Whether the authority could not be reached or understood, as opposed
    /// to a local problem.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            GateError::Transport(_) | GateError::Status { .. } | GateError::Protocol(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_errors_are_classified() {
        assert!(GateError::Transport("timeout".into()).is_remote());
        assert!(GateError::Status {
            status: 502,
            message: "bad gateway".into()
        }
        .is_remote());
        assert!(!GateError::MissingApiKey.is_remote());
        assert!(!GateError::CacheIO("disk full".into()).is_remote());
    }

    #[test]
    fn status_error_display() {
        let err = GateError::Status {
            status: 401,
            message: "Unauthorized".into(),
        };
        assert_eq!(err.to_string(), "Authority returned status 401: Unauthorized");
    }
}
