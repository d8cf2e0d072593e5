//! Inbound request view and token extraction.

use crate::crypto::digest::check_token;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, COOKIE, USER_AGENT};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Headers consulted for the client address, in order, before the socket
/// address.
pub const CLIENT_ADDRESS_HEADERS: [&str; 6] = [
    "client-ip",
    "x-forwarded-for",
    "x-forwarded",
    "x-cluster-client-ip",
    "forwarded-for",
    "forwarded",
];

/// The parts of an inbound request the gate looks at.
#[derive(Debug, Clone, Default)]
pub struct GateRequest {
    headers: HeaderMap,
    query: HashMap<String, String>,
    cookies: HashMap<String, String>,
    remote_addr: Option<String>,
}

impl GateRequest {
    /// An empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a header map and a raw query string (without `?`).
    /// Cookies are read from the `Cookie` header on demand.
    pub fn from_parts(headers: HeaderMap, query_string: Option<&str>, remote_addr: Option<String>) -> Self {
        let mut request = Self {
            headers,
            remote_addr,
            ..Self::default()
        };
        if let Some(qs) = query_string {
            request = request.with_query_string(qs);
        }
        request
    }

    /// Add a header. Invalid names or values are skipped.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => debug!(header = name, "Skipping invalid request header"),
        }
        self
    }

    /// Add a `Bearer` Authorization header.
    pub fn with_bearer(self, token: &str) -> Self {
        self.with_header(AUTHORIZATION.as_str(), &format!("Bearer {}", token))
    }

    /// Add a query parameter. Later values replace earlier ones.
    pub fn with_query(mut self, name: &str, value: &str) -> Self {
        self.query.insert(name.to_string(), value.to_string());
        self
    }

    /// Add every parameter of a URL-encoded query string.
    pub fn with_query_string(mut self, query_string: &str) -> Self {
        let query_string = query_string.strip_prefix('?').unwrap_or(query_string);
        for (name, value) in url::form_urlencoded::parse(query_string.as_bytes()) {
            self.query.insert(name.into_owned(), value.into_owned());
        }
        self
    }

    /// Add a cookie.
    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.insert(name.to_string(), value.to_string());
        self
    }

    /// Set the socket peer address.
    pub fn with_remote_addr(mut self, addr: &str) -> Self {
        self.remote_addr = Some(addr.to_string());
        self
    }

    /// Request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header as a string.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// A query parameter.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// A cookie, from explicitly added cookies or the `Cookie` header.
    pub fn cookie(&self, name: &str) -> Option<String> {
        if let Some(value) = self.cookies.get(name) {
            return Some(value.clone());
        }
        self.headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.trim_matches('"').to_string())
    }

    /// User-Agent header, if present.
    pub fn user_agent(&self) -> Option<&str> {
        self.headers.get(USER_AGENT).and_then(|v| v.to_str().ok())
    }

    /// Best guess at the client address: the first entry of the first
    /// proxy header present, else the socket address. Not anonymized.
    pub fn client_address(&self) -> Option<String> {
        for name in CLIENT_ADDRESS_HEADERS {
            let Some(value) = self.header(name) else {
                continue;
            };
            let first = value.split(',').next().unwrap_or_default().trim();
            // RFC 7239 form: `for=192.0.2.60;proto=https`
            let first = match first.split(';').find_map(|p| p.trim().strip_prefix("for=")) {
                Some(addr) => addr.trim_matches('"'),
                None => first,
            };
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
        self.remote_addr.clone()
    }
}

/// Token from the `Authorization: Bearer` header, if any.
fn bearer_token(request: &GateRequest) -> Option<String> {
    request
        .headers
        .get_all(AUTHORIZATION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|value| {
            let mut parts = value.split_whitespace();
            let scheme = parts.next()?;
            if !scheme.eq_ignore_ascii_case("bearer") {
                return None;
            }
            parts.next().map(String::from)
        })
}

/// Extract the access token from a request.
///
/// Sources, first match wins: `Authorization: Bearer <token>`, then the
/// query parameter, then the cookie. A malformed token from the winning
/// source is dropped (logged) and the request counts as tokenless.
pub fn extract_token(request: &GateRequest, query_param: &str, cookie_name: &str) -> Option<String> {
    let (source, token) = if let Some(token) = bearer_token(request) {
        ("header", token)
    } else if let Some(token) = request.query(query_param).filter(|t| !t.is_empty()) {
        ("query", token.to_string())
    } else if let Some(token) = request.cookie(cookie_name).filter(|t| !t.is_empty()) {
        ("cookie", token)
    } else {
        return None;
    };

    match check_token(&token) {
        Ok(()) => Some(token),
        Err(e) => {
            warn!(error = %e, source, "Dropping malformed access token");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(request: &GateRequest) -> Option<String> {
        extract_token(request, "access_token", "cb_access_token")
    }

    #[test]
    fn header_takes_precedence_over_query_and_cookie() {
        let request = GateRequest::new()
            .with_bearer("from_header")
            .with_query("access_token", "from_query")
            .with_cookie("cb_access_token", "from_cookie");
        assert_eq!(extract(&request).as_deref(), Some("from_header"));
    }

    #[test]
    fn query_takes_precedence_over_cookie() {
        let request = GateRequest::new()
            .with_query("access_token", "from_query")
            .with_cookie("cb_access_token", "from_cookie");
        assert_eq!(extract(&request).as_deref(), Some("from_query"));
    }

    #[test]
    fn cookie_is_last_resort() {
        let request = GateRequest::new().with_header("cookie", "theme=dark; cb_access_token=c00kie");
        assert_eq!(extract(&request).as_deref(), Some("c00kie"));
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        let request = GateRequest::new().with_header("authorization", "bearer abc123");
        assert_eq!(extract(&request).as_deref(), Some("abc123"));
    }

    #[test]
    fn non_bearer_authorization_falls_through() {
        let request = GateRequest::new()
            .with_header("authorization", "Basic dXNlcjpwYXNz")
            .with_query("access_token", "q");
        assert_eq!(extract(&request).as_deref(), Some("q"));
    }

    #[test]
    fn bare_bearer_falls_through() {
        let request = GateRequest::new()
            .with_header("authorization", "Bearer")
            .with_query("access_token", "q");
        assert_eq!(extract(&request).as_deref(), Some("q"));
    }

    #[test]
    fn no_token_anywhere() {
        assert_eq!(extract(&GateRequest::new()), None);
        let empty_query = GateRequest::new().with_query("access_token", "");
        assert_eq!(extract(&empty_query), None);
    }

    #[test]
    fn malformed_token_is_dropped() {
        let long = "x".repeat(5000);
        let request = GateRequest::new().with_query("access_token", &long);
        assert_eq!(extract(&request), None);
    }

    #[test]
    fn query_string_is_decoded() {
        let request = GateRequest::from_parts(HeaderMap::new(), Some("?p=1&access_token=a%2Bb"), None);
        assert_eq!(request.query("access_token"), Some("a+b"));
        assert_eq!(extract(&request).as_deref(), Some("a+b"));
    }

    #[test]
    fn custom_parameter_names() {
        let request = GateRequest::new().with_query("cb_token", "alt");
        assert_eq!(extract_token(&request, "cb_token", "x").as_deref(), Some("alt"));
        assert_eq!(extract(&request), None);
    }

    #[test]
    fn client_address_prefers_proxy_headers() {
        let request = GateRequest::new()
            .with_header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .with_remote_addr("10.0.0.1");
        assert_eq!(request.client_address().as_deref(), Some("203.0.113.7"));

        let direct = GateRequest::new().with_remote_addr("198.51.100.4");
        assert_eq!(direct.client_address().as_deref(), Some("198.51.100.4"));

        assert_eq!(GateRequest::new().client_address(), None);
    }

    #[test]
    fn forwarded_header_for_parameter_is_unwrapped() {
        let request = GateRequest::new().with_header("forwarded", "for=192.0.2.60;proto=https, for=10.0.0.2");
        assert_eq!(request.client_address().as_deref(), Some("192.0.2.60"));
    }

    #[test]
    fn client_ip_header_wins_over_forwarded_for() {
        let request = GateRequest::new()
            .with_header("x-forwarded-for", "203.0.113.7")
            .with_header("client-ip", "192.0.2.55");
        assert_eq!(request.client_address().as_deref(), Some("192.0.2.55"));
    }
}
