//! Client metadata scrubbing before anything is stored.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Longest user-agent kept on an access record, in characters.
pub const MAX_USER_AGENT_CHARS: usize = 255;

/// Zero the host part of an address: the last octet of IPv4, the last
/// segment of IPv6. Accepts bare addresses and `addr:port` forms.
///
/// Returns `None` for anything that does not parse, so a raw value can
/// never end up stored.
pub fn anonymize_ip(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let ip = raw
        .parse::<IpAddr>()
        .or_else(|_| raw.parse::<SocketAddr>().map(|s| s.ip()))
        .ok()?;

    let masked = match ip {
        IpAddr::V4(v4) => {
            let [a, b, c, _] = v4.octets();
            IpAddr::V4(Ipv4Addr::new(a, b, c, 0))
        }
        IpAddr::V6(v6) => {
            let mut segments = v6.segments();
            segments[7] = 0;
            IpAddr::V6(Ipv6Addr::from(segments))
        }
    };
    Some(masked.to_string())
}

/// Strip control characters and cap to [`MAX_USER_AGENT_CHARS`].
pub fn cap_user_agent(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_control())
        .take(MAX_USER_AGENT_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipv4_last_octet_is_zeroed() {
        assert_eq!(anonymize_ip("203.0.113.77").as_deref(), Some("203.0.113.0"));
        assert_eq!(anonymize_ip(" 10.1.2.3 ").as_deref(), Some("10.1.2.0"));
    }

    #[test]
    fn ipv6_last_segment_is_zeroed() {
        assert_eq!(
            anonymize_ip("2001:db8:85a3::8a2e:370:7334").as_deref(),
            Some("2001:db8:85a3::8a2e:370:0")
        );
    }

    #[test]
    fn socket_addresses_lose_port_and_host() {
        assert_eq!(anonymize_ip("198.51.100.9:443").as_deref(), Some("198.51.100.0"));
        assert_eq!(anonymize_ip("[2001:db8::1]:8080").as_deref(), Some("2001:db8::"));
    }

    #[test]
    fn unparseable_addresses_are_dropped() {
        assert_eq!(anonymize_ip("unknown"), None);
        assert_eq!(anonymize_ip(""), None);
        assert_eq!(anonymize_ip("for=192.0.2.60"), None);
    }

    #[test]
    fn user_agent_is_capped_and_cleaned() {
        let long = "a".repeat(400);
        assert_eq!(cap_user_agent(&long).chars().count(), MAX_USER_AGENT_CHARS);
        assert_eq!(cap_user_agent("Bot/1.0\r\nX-Evil: 1"), "Bot/1.0X-Evil: 1");
    }
}
