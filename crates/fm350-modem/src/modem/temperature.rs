//! Thermal sensor readout (`AT+GTSENRDTEMP=0`).
//!
//! Each reply line is `+GTSENRDTEMP: <index>,<millidegrees>` with a 1-based
//! index into [`SENSORS`].

use serde::Serialize;

pub const GTSENRDTEMP_PREFIX: &str = "+GTSENRDTEMP: ";

/// Sensor catalog, in modem index order.
pub const SENSORS: [&str; 23] = [
    "soc_max",
    "cpu_little0",
    "cpu_little1",
    "cpu_little2",
    "cpu_little3",
    "gpu0",
    "gpu1",
    "dramc",
    "mmsys",
    "md_5g",
    "md_4g",
    "md_3g",
    "soc_dram_ntc",
    "ltepa_ntc",
    "nrpa_ntc",
    "rf_ntc",
    "md_rf",
    "conn_gps",
    "pmic",
    "pmic_vcore",
    "pmic_vproc",
    "pmic_vgpu",
    "unknown",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TemperatureReading {
    pub sensor: &'static str,
    pub celsius: f64,
}

/// Decode one reply line. Lines with another prefix or an index outside the
/// catalog yield `None`.
pub fn decode_line(line: &str) -> Option<TemperatureReading> {
    let body = line.trim().strip_prefix(GTSENRDTEMP_PREFIX)?;
    let mut fields = body.split(',');
    let index: i64 = fields.next()?.trim().parse().unwrap_or(0);
    let raw: i64 = fields.next().map(|f| f.trim().parse().unwrap_or(0)).unwrap_or(0);
    let sensor = index
        .checked_sub(1)
        .and_then(|i| usize::try_from(i).ok())
        .and_then(|i| SENSORS.get(i).copied())?;
    Some(TemperatureReading {
        sensor,
        celsius: raw as f64 / 1000.0,
    })
}

/// Decode a full multi-line reply, skipping and logging unusable lines.
pub fn decode_reply(reply: &str) -> Vec<TemperatureReading> {
    reply
        .lines()
        .filter_map(|line| {
            let reading = decode_line(line);
            if reading.is_none() && !line.trim().is_empty() {
                tracing::warn!(line = line.trim(), "unusable temperature line");
            }
            reading
        })
        .collect()
}
