//! Network registration state from `AT+C5GREG?` and `AT+CEREG?`.

use serde::Serialize;
use std::fmt;

pub const C5GREG_PREFIX: &str = "+C5GREG: ";
pub const CEREG_PREFIX: &str = "+CEREG: ";

/// Reply prefix (after the mnemonic) meaning "not registered".
const NOT_REGISTERED: &str = "0,";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    NotRegistered,
    #[serde(rename = "registered_4g")]
    Registered4G,
    #[serde(rename = "registered_5g")]
    Registered5G,
}

impl RegistrationStatus {
    /// Decide from both prefix-stripped replies. 5G wins over 4G.
    pub fn from_replies(nr_reply: &str, lte_reply: &str) -> RegistrationStatus {
        if !nr_reply.starts_with(NOT_REGISTERED) {
            RegistrationStatus::Registered5G
        } else if !lte_reply.starts_with(NOT_REGISTERED) {
            RegistrationStatus::Registered4G
        } else {
            RegistrationStatus::NotRegistered
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RegistrationStatus::NotRegistered => "Not connected",
            RegistrationStatus::Registered4G => "4G",
            RegistrationStatus::Registered5G => "5G",
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lte_when_nr_not_registered() {
        assert_eq!(
            RegistrationStatus::from_replies("0,5", "1,5"),
            RegistrationStatus::Registered4G
        );
    }

    #[test]
    fn nr_takes_priority() {
        assert_eq!(
            RegistrationStatus::from_replies("1,1", "1,5"),
            RegistrationStatus::Registered5G
        );
    }

    #[test]
    fn neither_registered() {
        assert_eq!(
            RegistrationStatus::from_replies("0,0", "0,4"),
            RegistrationStatus::NotRegistered
        );
    }

    #[test]
    fn serializes_snake_case() {
        let v = serde_json::to_value(RegistrationStatus::Registered5G).unwrap();
        assert_eq!(v, "registered_5g");
        let v = serde_json::to_value(RegistrationStatus::NotRegistered).unwrap();
        assert_eq!(v, "not_registered");
    }
}
