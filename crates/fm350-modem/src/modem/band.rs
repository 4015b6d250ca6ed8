//! # Radio Access Technology and Band Configuration (`AT+GTACT?`)
//!
//! The reply lists the RAT mode, two preferred technologies, then every
//! enabled band as a vendor numeric code:
//!
//! ```text
//! +GTACT: <rat>,<pref1>,<pref2>[,<band>...]
//! ```
//!
//! ## Band codes
//!
//! | Code range    | Technology | Label            |
//! |---------------|------------|------------------|
//! | 1–10          | UMTS       | `UMTS_<code>`    |
//! | 101–171       | LTE        | `LTE_<code-100>` |
//! | 501–509       | NR         | `NR_<code-500>`  |
//! | 5010–5099     | NR         | `NR_<code-5000>` |
//! | 50100–50512   | NR         | `NR_<code-50000>`|
//!
//! Codes outside every range are rendered as the bare decimal code.

use std::fmt;

use serde::Serialize;

pub const GTACT_PREFIX: &str = "+GTACT: ";

// ─── Band Codes ─────────────────────────────────────────────────────────────

/// A decoded band code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    /// UMTS band number.
    Umts(i64),
    /// LTE (E-UTRA) band number.
    Lte(i64),
    /// NR band number, from any of the three numbering eras.
    Nr(i64),
    /// A code outside every known range.
    Raw(i64),
}

impl Band {
    pub fn from_code(code: i64) -> Band {
        match code {
            1..=10 => Band::Umts(code),
            101..=171 => Band::Lte(code - 100),
            501..=509 => Band::Nr(code - 500),
            5010..=5099 => Band::Nr(code - 5000),
            50100..=50512 => Band::Nr(code - 50000),
            _ => Band::Raw(code),
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Band::Umts(n) => write!(f, "UMTS_{n}"),
            Band::Lte(n) => write!(f, "LTE_{n}"),
            Band::Nr(n) => write!(f, "NR_{n}"),
            Band::Raw(n) => write!(f, "{n}"),
        }
    }
}

/// Label for a band code given as reply text.
pub fn band_label(code: &str) -> String {
    Band::from_code(parse_code(code)).to_string()
}

// ─── RAT / Preferred Technology ─────────────────────────────────────────────

/// Label for the RAT mode code.
pub fn rat_label(code: &str) -> String {
    let code = parse_code(code);
    let name = match code {
        1 => "UMTS",
        2 => "LTE",
        4 => "LTE/UMTS",
        10 => "Automatic",
        14 => "NR-RAN",
        16 => "NR-RAN/WCDMA",
        17 => "NR-RAN/LTE",
        20 => "NR-RAN/WCDMA/LTE",
        _ => return format!("Unknown ({code})"),
    };
    format!("{name} ({code})")
}

/// Label for a preferred-technology code.
pub fn preferred_act_label(code: &str) -> String {
    let code = parse_code(code);
    let name = match code {
        2 => "WCDMA",
        3 => "LTE",
        6 => "NR-RAN",
        _ => return format!("Unknown ({code})"),
    };
    format!("{name} ({code})")
}

/// Non-numeric codes read as 0.
fn parse_code(code: &str) -> i64 {
    code.trim().parse().unwrap_or(0)
}

// ─── Band Configuration ─────────────────────────────────────────────────────

/// Decoded `AT+GTACT?` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BandConfiguration {
    pub rat: String,
    pub preferred_act1: String,
    pub preferred_act2: String,
    /// Enabled bands in reply order.
    pub bands: Vec<String>,
}

impl BandConfiguration {
    /// Decode a prefix-stripped reply. Missing header fields read as code 0.
    pub fn from_reply(body: &str) -> BandConfiguration {
        let fields: Vec<&str> = body.split(',').collect();
        let field = |i: usize| fields.get(i).copied().unwrap_or("");
        BandConfiguration {
            rat: rat_label(field(0)),
            preferred_act1: preferred_act_label(field(1)),
            preferred_act2: preferred_act_label(field(2)),
            bands: fields.iter().skip(3).map(|b| band_label(b)).collect(),
        }
    }

    /// Number of enabled NR bands.
    pub fn count_nr(&self) -> usize {
        self.bands.iter().filter(|b| b.starts_with("NR_")).count()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_boundaries() {
        let cases = [
            (1, "UMTS_1"),
            (10, "UMTS_10"),
            (101, "LTE_1"),
            (171, "LTE_71"),
            (501, "NR_1"),
            (509, "NR_9"),
            (5010, "NR_10"),
            (5099, "NR_99"),
            (50100, "NR_100"),
            (50512, "NR_512"),
        ];
        for (code, label) in cases {
            assert_eq!(Band::from_code(code).to_string(), label, "code {code}");
        }
    }

    #[test]
    fn out_of_range_codes_verbatim() {
        for code in [0, 11, 100, 172, 500, 510, 5009, 5100, 50099, 50513] {
            assert_eq!(Band::from_code(code), Band::Raw(code));
            assert_eq!(Band::from_code(code).to_string(), code.to_string());
        }
    }

    #[test]
    fn rat_and_preferred_tables() {
        assert_eq!(rat_label("17"), "NR-RAN/LTE (17)");
        assert_eq!(rat_label("10"), "Automatic (10)");
        assert_eq!(rat_label("3"), "Unknown (3)");
        assert_eq!(preferred_act_label("6"), "NR-RAN (6)");
        assert_eq!(preferred_act_label("x"), "Unknown (0)");
    }

    #[test]
    fn decodes_full_reply() {
        let cfg = BandConfiguration::from_reply("17,6,3,101,103,107,5041,50078,50258");
        assert_eq!(cfg.rat, "NR-RAN/LTE (17)");
        assert_eq!(cfg.preferred_act1, "NR-RAN (6)");
        assert_eq!(cfg.preferred_act2, "LTE (3)");
        assert_eq!(
            cfg.bands,
            vec!["LTE_1", "LTE_3", "LTE_7", "NR_41", "50078", "NR_258"]
        );
        assert_eq!(cfg.count_nr(), 2);
    }

    #[test]
    fn short_reply_degrades() {
        let cfg = BandConfiguration::from_reply("");
        assert_eq!(cfg.rat, "Unknown (0)");
        assert_eq!(cfg.preferred_act2, "Unknown (0)");
        assert!(cfg.bands.is_empty());
    }
}
