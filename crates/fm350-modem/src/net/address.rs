//! Address tokens from PDP-context queries (`AT+CGPADDR`, `AT+GTDNS`).
//!
//! The modem reports addresses as dot-separated decimal bytes: four for
//! IPv4, sixteen for IPv6 (`"32.1.13.184.0.0.…"`). IPv6 tokens are rewritten
//! as colon-separated hex groups of two bytes each.

use std::net::IpAddr;

pub const CGPADDR_PREFIX: &str = "+CGPADDR: ";
pub const GTDNS_PREFIX: &str = "+GTDNS: ";

/// Prefix length attached to IPv4 addresses when configuring the interface.
pub const IPV4_PREFIX_LEN: u8 = 24;
/// Prefix length attached to IPv6 addresses when configuring the interface.
pub const IPV6_PREFIX_LEN: u8 = 64;

/// Convert one address token to text, with a `/24` or `/64` suffix when
/// `masked`.
pub fn decode_token(token: &str, masked: bool) -> String {
    let token = token.trim().trim_matches('"');
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() == 4 {
        return if masked {
            format!("{token}/{IPV4_PREFIX_LEN}")
        } else {
            token.to_string()
        };
    }

    let mut ipv6 = String::with_capacity(parts.len() * 3);
    for (i, part) in parts.iter().enumerate() {
        if i > 0 && i % 2 == 0 {
            ipv6.push(':');
        }
        let byte: u32 = part.trim().parse().unwrap_or(0);
        ipv6.push_str(&format!("{byte:02x}"));
    }
    if masked {
        ipv6.push_str(&format!("/{IPV6_PREFIX_LEN}"));
    }
    ipv6
}

/// Address tokens of an `AT+CGPADDR=<cid>` reply, context id dropped.
/// `None` when the reply does not carry the expected prefix.
pub fn pdp_address_tokens(reply: &str) -> Option<Vec<&str>> {
    let body = reply.strip_prefix(CGPADDR_PREFIX)?;
    Some(body.split(',').skip(1).collect())
}

/// DNS servers from an `AT+GTDNS=<cid>` reply, unmasked.
///
/// Every line with the `+GTDNS: ` prefix contributes its fields after the
/// leading context id. A field that does not decode to a valid address is
/// logged and skipped.
pub fn dns_servers(reply: &str) -> Vec<String> {
    let mut servers = Vec::new();
    for line in reply.lines() {
        let Some(body) = line.trim().strip_prefix(GTDNS_PREFIX) else {
            continue;
        };
        for token in body.split(',').skip(1) {
            let addr = decode_token(token, false);
            match addr.parse::<IpAddr>() {
                Ok(_) => servers.push(addr),
                Err(e) => tracing::warn!(token, addr = %addr, error = %e, "skipping DNS entry"),
            }
        }
    }
    servers
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;

    const V6_TOKEN: &str = "32.1.13.184.0.0.0.0.0.0.0.0.0.0.0.1";

    #[test]
    fn ipv4_token() {
        assert_eq!(decode_token("192.168.1.5", false), "192.168.1.5");
        assert_eq!(decode_token("\"192.168.1.5\"", true), "192.168.1.5/24");
    }

    #[test]
    fn ipv6_token() {
        let text = decode_token(V6_TOKEN, false);
        assert_eq!(text, "2001:0db8:0000:0000:0000:0000:0000:0001");
        let parsed: Ipv6Addr = text.parse().unwrap();
        assert_eq!(parsed, "2001:db8::1".parse::<Ipv6Addr>().unwrap());
        assert_eq!(
            decode_token(&format!("\"{V6_TOKEN}\""), true),
            "2001:0db8:0000:0000:0000:0000:0000:0001/64"
        );
    }

    #[test]
    fn cgpaddr_tokens() {
        let reply = format!("+CGPADDR: 5,\"10.20.30.40\",\"{V6_TOKEN}\"");
        let tokens = pdp_address_tokens(&reply).unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(decode_token(tokens[0], true), "10.20.30.40/24");
        assert!(pdp_address_tokens("+CGPADDR5").is_none());
    }

    #[test]
    fn dns_from_multiline_reply() {
        let reply = format!(
            "+GTDNS: 5,\"8.8.8.8\",\"8.8.4.4\"\n+GTDNS: 5,\"{V6_TOKEN}\",\"bogus\""
        );
        let servers = dns_servers(&reply);
        assert_eq!(
            servers,
            vec![
                "8.8.8.8".to_string(),
                "8.8.4.4".to_string(),
                "2001:0db8:0000:0000:0000:0000:0000:0001".to_string(),
            ]
        );
    }

    #[test]
    fn dns_ignores_foreign_lines() {
        assert!(dns_servers("OK").is_empty());
        assert!(dns_servers("").is_empty());
    }
}
