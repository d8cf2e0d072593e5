//! SHA-256 token fingerprints.

use sha2::{Digest, Sha256};

/// Longest token accepted from a request, in bytes.
pub const MAX_TOKEN_LEN: usize = 4096;

/// Compute the fingerprint of a token: lowercase hex SHA-256.
///
/// Tokens are only ever stored or looked up by this value.
pub fn fingerprint(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Short fingerprint prefix for log fields.
pub fn short_fingerprint(token: &str) -> String {
    let mut fp = fingerprint(token);
    fp.truncate(12);
    fp
}

/// Check that a token is usable as a bearer credential.
///
/// Rejects empty tokens, tokens longer than [`MAX_TOKEN_LEN`], and tokens
/// containing whitespace or control characters.
pub fn check_token(token: &str) -> Result<(), crate::GateError> {
    if token.is_empty() {
        return Err(crate::GateError::MalformedToken("empty".to_string()));
    }
    if token.len() > MAX_TOKEN_LEN {
        return Err(crate::GateError::MalformedToken(format!(
            "{} bytes exceeds {}",
            token.len(),
            MAX_TOKEN_LEN
        )));
    }
    if token.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(crate::GateError::MalformedToken(
            "contains whitespace or control characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GateError;

    #[test]
    fn fingerprint_of_empty_string() {
        assert_eq!(
            fingerprint(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn fingerprint_is_deterministic_and_distinct() {
        assert_eq!(fingerprint("valid_abc"), fingerprint("valid_abc"));
        assert_ne!(fingerprint("valid_abc"), fingerprint("valid_abd"));
        assert_eq!(fingerprint("valid_abc").len(), 64);
        assert!(!fingerprint("valid_abc").contains("valid_abc"));
    }

    #[test]
    fn short_fingerprint_is_prefix() {
        let full = fingerprint("token");
        assert!(full.starts_with(&short_fingerprint("token")));
        assert_eq!(short_fingerprint("token").len(), 12);
    }

    #[test]
    fn check_token_rejects_malformed() {
        assert!(check_token("abc.DEF-123_x").is_ok());
        assert!(matches!(check_token(""), Err(GateError::MalformedToken(_))));
        assert!(matches!(check_token("a b"), Err(GateError::MalformedToken(_))));
        assert!(matches!(check_token("a\u{0}b"), Err(GateError::MalformedToken(_))));
        let long = "x".repeat(MAX_TOKEN_LEN + 1);
        assert!(matches!(check_token(&long), Err(GateError::MalformedToken(_))));
    }
}
