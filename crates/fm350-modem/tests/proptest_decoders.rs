//! Property-based tests for the reply decoders: signal formulas, band
//! ranges, address tokens and temperature scaling.

use proptest::prelude::*;

use fm350_modem::modem::band::{band_label, Band};
use fm350_modem::modem::signal::{decode_rsrp, decode_rsrq, decode_sinr, Signal};
use fm350_modem::modem::temperature::{decode_line, SENSORS};
use fm350_modem::net::address::decode_token;

// ─── Signal ─────────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn rsrp_formula(raw in 0i32..512) {
        let expected = if raw < 128 { raw - 156 } else { 0 };
        prop_assert_eq!(decode_rsrp(raw), expected);
    }

    #[test]
    fn rsrq_formula(raw in 0i32..512) {
        let expected = if raw < 128 { raw as f32 * 0.5 - 43.0 } else { 0.0 };
        prop_assert_eq!(decode_rsrq(raw), expected);
    }

    #[test]
    fn sinr_formula(raw in 0i32..512) {
        let expected = if raw < 128 { raw as f32 * 0.5 - 23.0 } else { 0.0 };
        prop_assert_eq!(decode_sinr(raw), expected);
    }

    #[test]
    fn cesq_uses_last_three_fields(
        head in proptest::collection::vec(0i32..256, 6),
        rsrq in 0i32..128,
        rsrp in 0i32..128,
        sinr in 0i32..128,
    ) {
        let mut fields: Vec<String> = head.iter().map(|v| v.to_string()).collect();
        fields.extend([rsrq, rsrp, sinr].iter().map(|v| v.to_string()));
        let signal = Signal::from_reply(&format!("+CESQ: {}", fields.join(",")));
        prop_assert_eq!(signal.rsrp_dbm, rsrp - 156);
        prop_assert_eq!(signal.rsrq_db, decode_rsrq(rsrq));
        prop_assert_eq!(signal.sinr_db, decode_sinr(sinr));
    }

    #[test]
    fn cesq_wrong_field_count_is_unknown(n in 0usize..20) {
        prop_assume!(n != 9);
        let fields = vec!["60"; n].join(",");
        prop_assert_eq!(Signal::from_reply(&format!("+CESQ: {fields}")), Signal::default());
    }
}

// ─── Bands ──────────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn lte_range(code in 101i64..=171) {
        prop_assert_eq!(band_label(&code.to_string()), format!("LTE_{}", code - 100));
    }

    #[test]
    fn nr_ranges(code in prop_oneof![501i64..=509, 5010i64..=5099, 50100i64..=50512]) {
        let label = Band::from_code(code).to_string();
        prop_assert!(label.starts_with("NR_"), "{} -> {}", code, label);
    }

    #[test]
    fn codes_outside_ranges_are_verbatim(
        code in prop_oneof![11i64..=100, 172i64..=500, 510i64..=5009, 5100i64..=50099, 50513i64..=99999]
    ) {
        prop_assert_eq!(band_label(&code.to_string()), code.to_string());
    }
}

// ─── Address tokens ─────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn ipv4_token_passthrough(octets in any::<[u8; 4]>()) {
        let token = octets.iter().map(|o| o.to_string()).collect::<Vec<_>>().join(".");
        prop_assert_eq!(decode_token(&token, false), token.clone());
        prop_assert_eq!(decode_token(&format!("\"{token}\""), true), format!("{token}/24"));
    }

    #[test]
    fn ipv6_token_matches_std(bytes in any::<[u8; 16]>()) {
        let token = bytes.iter().map(|b| b.to_string()).collect::<Vec<_>>().join(".");
        let text = decode_token(&token, false);
        let parsed: std::net::Ipv6Addr = text.parse().unwrap();
        prop_assert_eq!(parsed.octets(), bytes);
        prop_assert!(decode_token(&token, true).ends_with("/64"));
    }
}

// ─── Temperature ────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn temperature_in_catalog(index in 1usize..=SENSORS.len(), milli in -40_000i64..150_000) {
        let r = decode_line(&format!("+GTSENRDTEMP: {index},{milli}")).unwrap();
        prop_assert_eq!(r.sensor, SENSORS[index - 1]);
        prop_assert_eq!(r.celsius, milli as f64 / 1000.0);
    }

    #[test]
    fn temperature_outside_catalog_dropped(index in (SENSORS.len() + 1)..1000usize) {
        let line = format!("+GTSENRDTEMP: {},25000", index);
        prop_assert!(decode_line(&line).is_none(), "kept {}", line);
    }

    #[test]
    fn temperature_any_index_never_panics(index in any::<i64>()) {
        let line = format!("+GTSENRDTEMP: {},25000", index);
        let kept = decode_line(&line).is_some();
        prop_assert_eq!(kept, (1..=SENSORS.len() as i64).contains(&index));
    }
}
