//! # Extended Signal Quality (`AT+CESQ`)
//!
//! The reply carries nine comma-separated raw codes:
//!
//! ```text
//! +CESQ: <rxlev>,<ber>,<rscp>,<ecno>,<rsrq>,<rsrp>,<ss_rsrq>,<ss_rsrp>,<ss_sinr>
//! ```
//!
//! Only the NR synchronisation-signal triple (fields 6–8) is decoded. A code
//! of 128 or above means "not known or not detectable" and maps to 0.

use serde::Serialize;

pub const CESQ_PREFIX: &str = "+CESQ: ";

const CESQ_FIELDS: usize = 9;
const UNKNOWN_CODE: i32 = 128;

/// NR synchronisation-signal metrics. A zero field means unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Signal {
    /// SS Reference Signal Received Quality in dB.
    pub rsrq_db: f32,
    /// SS Reference Signal Received Power in dBm.
    pub rsrp_dbm: i32,
    /// SS Signal-to-Interference-plus-Noise Ratio in dB.
    pub sinr_db: f32,
}

impl Signal {
    /// Decode a full `AT+CESQ` reply. A wrong prefix or field count yields
    /// the all-unknown signal.
    pub fn from_reply(reply: &str) -> Signal {
        let Some(body) = reply.strip_prefix(CESQ_PREFIX) else {
            return Signal::default();
        };
        let fields: Vec<&str> = body.split(',').collect();
        if fields.len() != CESQ_FIELDS {
            return Signal::default();
        }
        Signal {
            rsrq_db: decode_rsrq(parse_code(fields[6])),
            rsrp_dbm: decode_rsrp(parse_code(fields[7])),
            sinr_db: decode_sinr(parse_code(fields[8])),
        }
    }

    /// Whether the received power is known.
    pub fn has_power(&self) -> bool {
        self.rsrp_dbm != 0
    }
}

/// Non-numeric codes read as 0.
fn parse_code(field: &str) -> i32 {
    field.trim().parse().unwrap_or(0)
}

/// `raw − 156` dBm.
pub fn decode_rsrp(raw: i32) -> i32 {
    if raw < UNKNOWN_CODE { raw - 156 } else { 0 }
}

/// `raw × 0.5 − 43` dB.
pub fn decode_rsrq(raw: i32) -> f32 {
    if raw < UNKNOWN_CODE {
        raw as f32 * 0.5 - 43.0
    } else {
        0.0
    }
}

/// `raw × 0.5 − 23` dB.
pub fn decode_sinr(raw: i32) -> f32 {
    if raw < UNKNOWN_CODE {
        raw as f32 * 0.5 - 23.0
    } else {
        0.0
    }
}
