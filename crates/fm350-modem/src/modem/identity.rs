//! Operator name and device identity replies.

pub const GTCURCAR_PREFIX: &str = "+GTCURCAR: ";
pub const GTAPPVER_PREFIX: &str = "+GTAPPVER: ";
pub const CFSN_PREFIX: &str = "+CFSN: ";
pub const GTPKGVER_PREFIX: &str = "+GTPKGVER: ";

/// Operator name from a full `AT+GTCURCAR?` reply.
///
/// The name is the second comma-separated field, quotes trimmed. A reply
/// with another prefix yields `"Unknown"`; one with a single field yields
/// an empty name.
pub fn operator_name(reply: &str) -> String {
    let Some(body) = reply.strip_prefix(GTCURCAR_PREFIX) else {
        return "Unknown".to_string();
    };
    body.split(',')
        .nth(1)
        .map(|name| trim_quotes(name).to_string())
        .unwrap_or_default()
}

/// Strip surrounding double quotes.
pub fn trim_quotes(value: &str) -> &str {
    value.trim_matches('"')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_from_second_field() {
        assert_eq!(operator_name("+GTCURCAR: 3,\"Vodafone\",1"), "Vodafone");
    }

    #[test]
    fn operator_single_field_is_empty() {
        assert_eq!(operator_name("+GTCURCAR: 0"), "");
    }

    #[test]
    fn operator_wrong_prefix_is_unknown() {
        assert_eq!(operator_name("+COPS: 0,0,\"TIM\""), "Unknown");
        assert_eq!(operator_name(""), "Unknown");
    }

    #[test]
    fn quotes_trimmed() {
        assert_eq!(trim_quotes("\"81600.0000.00.29\""), "81600.0000.00.29");
        assert_eq!(trim_quotes("plain"), "plain");
    }
}
