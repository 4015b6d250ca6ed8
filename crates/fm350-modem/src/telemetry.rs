//! Telemetry aggregation and presentation records.
//!
//! A [`Record`] is an ordered list of named fields. It renders either as
//! compact JSON (one object, keys in insertion order) or as aligned
//! `Label: value` lines; both renderings always carry the same fields.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::thread;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::error::{ModemError, Result};
use crate::modem::band::BandConfiguration;
use crate::modem::registration::RegistrationStatus;
use crate::modem::signal::Signal;
use crate::modem::temperature::TemperatureReading;
use crate::session::Modem;

// ─── Record ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub key: String,
    pub label: String,
    pub value: Value,
    /// Human-readable rendering of `value`.
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<Field>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field rendered from its value.
    pub fn with(self, key: &str, label: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        let text = render(&value);
        self.with_text(key, label, value, text)
    }

    /// Append a field with an explicit text rendering. A repeated key
    /// replaces the earlier value in place.
    pub fn with_text(
        mut self,
        key: &str,
        label: &str,
        value: impl Into<Value>,
        text: impl Into<String>,
    ) -> Self {
        let field = Field {
            key: key.to_string(),
            label: label.to_string(),
            value: value.into(),
            text: text.into(),
        };
        match self.fields.iter_mut().find(|f| f.key == key) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|f| f.key == key).map(|f| &f.value)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// One `Label: value` line per field, values aligned.
    pub fn to_text(&self) -> String {
        let width = self
            .fields
            .iter()
            .map(|f| f.label.len() + 1)
            .max()
            .unwrap_or(0);
        self.fields
            .iter()
            .map(|f| format!("{:<width$} {}", format!("{}:", f.label), f.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for field in &self.fields {
            map.serialize_entry(&field.key, &field.value)?;
        }
        map.end()
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(render).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

// ─── Device Info ────────────────────────────────────────────────────────────

/// One snapshot of identity, registration and radio state.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    pub firmware: String,
    pub serial_number: String,
    pub version: String,
    pub imei: String,
    pub has_sim: bool,
    pub registration: RegistrationStatus,
    pub operator: String,
    pub signal: Signal,
}

impl DeviceInfo {
    pub fn collect<T: Read + Write>(modem: &mut Modem<T>) -> Result<Self> {
        Ok(DeviceInfo {
            firmware: modem.firmware()?,
            serial_number: modem.serial_number()?,
            version: modem.package_version()?,
            imei: modem.imei()?,
            has_sim: modem.has_sim_pin()?,
            registration: modem.registration()?,
            operator: modem.operator()?,
            signal: modem.signal()?,
        })
    }

    pub fn to_record(&self) -> Record {
        let s = &self.signal;
        Record::new()
            .with("firmware", "Firmware", self.firmware.as_str())
            .with("serialnumber", "Serial Num", self.serial_number.as_str())
            .with("version", "Version", self.version.as_str())
            .with("imei", "IMEI", self.imei.as_str())
            .with("has_sim", "Has SIM", self.has_sim)
            .with_text(
                "net_status",
                "Net Type",
                serde_json::to_value(self.registration).unwrap_or(Value::Null),
                self.registration.label(),
            )
            .with("operator", "Operator", self.operator.as_str())
            .with_text(
                "signal",
                "Signal",
                serde_json::to_value(s).unwrap_or(Value::Null),
                format!(
                    "{} dBm (q:{:.1}, n:{:.1} dB)",
                    s.rsrp_dbm, s.rsrq_db, s.sinr_db
                ),
            )
    }
}

pub fn band_record(cfg: &BandConfiguration) -> Record {
    Record::new()
        .with("rat", "RAT", cfg.rat.as_str())
        .with("preferred_act1", "Preferred Act 1", cfg.preferred_act1.as_str())
        .with("preferred_act2", "Preferred Act 2", cfg.preferred_act2.as_str())
        .with("bands", "Bands", cfg.bands.clone())
}

/// Sensor name to degrees Celsius, in reply order.
pub fn temperature_record(readings: &[TemperatureReading]) -> Record {
    readings.iter().fold(Record::new(), |rec, r| {
        rec.with_text(r.sensor, r.sensor, r.celsius, format!("{:.3}", r.celsius))
    })
}

// ─── Signal Monitor ─────────────────────────────────────────────────────────

pub const SIGNAL_WINDOW: usize = 32;

/// Sliding window of received-power samples, oldest first.
#[derive(Debug, Clone)]
pub struct SignalHistory {
    samples: VecDeque<i32>,
    capacity: usize,
}

impl Default for SignalHistory {
    fn default() -> Self {
        Self::with_capacity(SIGNAL_WINDOW)
    }
}

impl SignalHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, rsrp_dbm: i32) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(rsrp_dbm);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.samples.iter().copied()
    }
}

/// Continuous signal polling.
pub struct SignalMonitor {
    history: SignalHistory,
}

impl Default for SignalMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalMonitor {
    pub fn new() -> Self {
        Self {
            history: SignalHistory::default(),
        }
    }

    pub fn history(&self) -> &SignalHistory {
        &self.history
    }

    /// Sample forever, handing each sample with known power to `sink`.
    ///
    /// Returns only on a modem error or when `sink` fails.
    pub fn run<T, E, F>(&mut self, modem: &mut Modem<T>, mut sink: F) -> std::result::Result<(), E>
    where
        T: Read + Write,
        E: From<ModemError>,
        F: FnMut(&Signal, &SignalHistory) -> std::result::Result<(), E>,
    {
        if !modem.is_connected()? {
            return Err(ModemError::precondition("Modem is not connected!").into());
        }
        let interval = modem.timing().poll_interval;
        loop {
            let signal = modem.signal()?;
            if signal.has_power() {
                self.history.push(signal.rsrp_dbm);
                sink(&signal, &self.history)?;
            } else {
                tracing::debug!("no received power, skipping sample");
            }
            thread::sleep(interval);
        }
    }
}
