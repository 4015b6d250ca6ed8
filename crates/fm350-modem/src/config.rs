//! Tool configuration: TOML file, defaults and network device discovery.
//!
//! Every key in the file is optional; blank strings count as unset.

use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::at::channel::{ChannelConfig, DEFAULT_RECV_BUFFER, MIN_RECV_BUFFER};
use crate::error::{ModemError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/fm350.toml";
pub const DEFAULT_BAUD: u32 = 115_200;
pub const DEFAULT_TIMEOUT_MS: u64 = 300;
pub const DEFAULT_CONTEXT_ID: u32 = 5;

/// USB network interfaces bound to the RNDIS host driver.
pub const RNDIS_SYSFS_ROOT: &str = "/sys/bus/usb/drivers/rndis_host";

/// On-disk form: every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModemConfigInput {
    pub serial: Option<String>,
    pub baud: Option<u32>,
    /// Per-read/write timeout, milliseconds.
    pub timeout: Option<u64>,
    pub context_id: Option<u32>,
    pub netdev: Option<String>,
    pub simpin: Option<String>,
    pub apn: Option<String>,
    pub route: Option<bool>,
    pub recv_buffer: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModemConfig {
    pub serial: String,
    pub baud: u32,
    pub timeout_ms: u64,
    pub context_id: u32,
    /// `None` until set or discovered, see [`ModemConfig::resolve_netdev`].
    pub netdev: Option<String>,
    pub sim_pin: Option<String>,
    pub apn: Option<String>,
    pub route: bool,
    pub recv_buffer: usize,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            serial: String::new(),
            baud: DEFAULT_BAUD,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            context_id: DEFAULT_CONTEXT_ID,
            netdev: None,
            sim_pin: None,
            apn: None,
            route: false,
            recv_buffer: DEFAULT_RECV_BUFFER,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

impl ModemConfigInput {
    pub fn resolve(self) -> ModemConfig {
        let defaults = ModemConfig::default();
        ModemConfig {
            serial: non_empty(self.serial).unwrap_or(defaults.serial),
            baud: self.baud.unwrap_or(defaults.baud),
            timeout_ms: self.timeout.unwrap_or(defaults.timeout_ms),
            context_id: self.context_id.unwrap_or(defaults.context_id),
            netdev: non_empty(self.netdev),
            sim_pin: non_empty(self.simpin),
            apn: non_empty(self.apn),
            route: self.route.unwrap_or(defaults.route),
            recv_buffer: self
                .recv_buffer
                .unwrap_or(defaults.recv_buffer)
                .max(MIN_RECV_BUFFER),
        }
    }
}

impl ModemConfig {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return Ok(ModemConfig::default());
        }
        let parsed: ModemConfigInput = toml::from_str(input)
            .map_err(|e| ModemError::Config(format!("invalid config TOML: {e}")))?;
        Ok(parsed.resolve())
    }

    /// Load `path`. A missing file yields the defaults; an unreadable or
    /// malformed one is a config error.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => {
                let cfg = Self::from_toml_str(&text)?;
                tracing::debug!(path = %path.display(), config = ?cfg, "config loaded");
                Ok(cfg)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(ModemConfig::default())
            }
            Err(e) => Err(ModemError::Config(format!("{}: {e}", path.display()))),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.serial.trim().is_empty() {
            return Err(ModemError::Config("serial device path is required".into()));
        }
        if self.baud < 1 {
            return Err(ModemError::Config("baud must be at least 1".into()));
        }
        if self.timeout_ms < 1 {
            return Err(ModemError::Config("timeout must be at least 1 ms".into()));
        }
        if self.context_id < 1 {
            return Err(ModemError::Config("context id must be at least 1".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn channel(&self, log_traffic: bool) -> ChannelConfig {
        ChannelConfig {
            recv_buffer: self.recv_buffer,
            log_traffic,
        }
    }

    /// The configured network device, or the first one found under
    /// `sysfs_root`.
    pub fn resolve_netdev(&self, sysfs_root: &Path) -> Result<String> {
        if let Some(name) = &self.netdev {
            return Ok(name.clone());
        }
        discover_netdev(sysfs_root).ok_or_else(|| {
            ModemError::precondition(format!(
                "no network device configured and none found under {}",
                sysfs_root.display()
            ))
        })
    }
}

/// First `<root>/<usb-if>/net/<name>` where `<usb-if>` contains a `:`.
pub fn discover_netdev(root: &Path) -> Option<String> {
    let mut interfaces: Vec<_> = fs::read_dir(root)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.contains(':'))
        })
        .collect();
    interfaces.sort();

    for iface in interfaces {
        let Ok(entries) = fs::read_dir(iface.join("net")) else {
            continue;
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();
        names.sort();
        if let Some(name) = names.into_iter().next() {
            tracing::debug!(netdev = %name, usb_if = %iface.display(), "network device discovered");
            return Some(name);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_default() {
        let cfg = ModemConfig::from_toml_str("  \n").unwrap();
        assert_eq!(cfg, ModemConfig::default());
        assert_eq!(cfg.baud, 115_200);
        assert_eq!(cfg.timeout_ms, 300);
        assert_eq!(cfg.context_id, 5);
        assert!(!cfg.route);
    }

    #[test]
    fn parse_toml_config() {
        let toml = r#"
            serial = "/dev/ttyUSB2"
            baud = 921600
            timeout = 500
            context_id = 3
            netdev = "usb0"
            simpin = "1234"
            apn = "internet"
            route = true
        "#;
        let cfg = ModemConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.serial, "/dev/ttyUSB2");
        assert_eq!(cfg.baud, 921_600);
        assert_eq!(cfg.timeout(), Duration::from_millis(500));
        assert_eq!(cfg.context_id, 3);
        assert_eq!(cfg.netdev.as_deref(), Some("usb0"));
        assert_eq!(cfg.sim_pin.as_deref(), Some("1234"));
        assert_eq!(cfg.apn.as_deref(), Some("internet"));
        assert!(cfg.route);
        cfg.validate().unwrap();
    }

    #[test]
    fn blank_strings_are_unset() {
        let cfg = ModemConfig::from_toml_str("apn = \"  \"\nsimpin = \"\"").unwrap();
        assert!(cfg.apn.is_none());
        assert!(cfg.sim_pin.is_none());
    }

    #[test]
    fn recv_buffer_has_floor() {
        let cfg = ModemConfig::from_toml_str("recv_buffer = 8").unwrap();
        assert_eq!(cfg.recv_buffer, MIN_RECV_BUFFER);
    }

    #[test]
    fn malformed_toml_is_config_error() {
        let err = ModemConfig::from_toml_str("baud = \"fast\"").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut cfg = ModemConfig::default();
        assert!(cfg.validate().is_err());
        cfg.serial = "/dev/ttyUSB2".into();
        cfg.validate().unwrap();
        cfg.context_id = 0;
        assert!(cfg.validate().is_err());
        cfg.context_id = 5;
        cfg.timeout_ms = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ModemConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, ModemConfig::default());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fm350.toml");
        fs::write(&path, "serial = \"/dev/ttyUSB3\"\n").unwrap();
        assert_eq!(ModemConfig::load(&path).unwrap().serial, "/dev/ttyUSB3");
    }

    #[test]
    fn discovers_rndis_netdev() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("module")).unwrap();
        fs::create_dir_all(root.path().join("2-1:1.0/net/usb0")).unwrap();
        assert_eq!(discover_netdev(root.path()).as_deref(), Some("usb0"));
    }

    #[test]
    fn discovery_ignores_non_interface_dirs() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("bind/net/eth9")).unwrap();
        assert!(discover_netdev(root.path()).is_none());
        assert!(discover_netdev(&root.path().join("missing")).is_none());
    }

    #[test]
    fn explicit_netdev_wins_over_discovery() {
        let root = tempfile::tempdir().unwrap();
        let cfg = ModemConfig {
            netdev: Some("wwan0".into()),
            ..ModemConfig::default()
        };
        assert_eq!(cfg.resolve_netdev(root.path()).unwrap(), "wwan0");
        let err = ModemConfig::default().resolve_netdev(root.path()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Precondition);
    }
}
