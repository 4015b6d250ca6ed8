//! Host network link capability.
//!
//! [`NetLink`] is the narrow surface the synchronizer needs: look up a
//! device, list/add/delete addresses, set the link up or down and install a
//! default route. [`IpRoute2`] implements it with the `ip` tool from
//! iproute2; tests use [`crate::test_util::RecordingLink`].

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::process::Command;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{ModemError, Result};

/// An interface address with its prefix length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IfAddr {
    pub ip: IpAddr,
    pub prefix_len: u8,
}

impl IfAddr {
    pub fn is_ipv4(&self) -> bool {
        self.ip.is_ipv4()
    }
}

impl fmt::Display for IfAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.ip, self.prefix_len)
    }
}

impl FromStr for IfAddr {
    type Err = String;

    /// Parse CIDR notation, e.g. `10.0.0.2/24`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (ip, len) = s
            .split_once('/')
            .ok_or_else(|| format!("missing prefix length: {s}"))?;
        let ip: IpAddr = ip.parse().map_err(|e| format!("{s}: {e}"))?;
        let prefix_len: u8 = len.parse().map_err(|e| format!("{s}: {e}"))?;
        let max = if ip.is_ipv4() { 32 } else { 128 };
        if prefix_len > max {
            return Err(format!("{s}: prefix length out of range"));
        }
        Ok(IfAddr { ip, prefix_len })
    }
}

pub trait NetLink {
    /// Fail with [`ModemError::Link`] when `name` does not exist.
    fn lookup(&mut self, name: &str) -> Result<()>;
    /// Every address currently assigned to `name`, both families.
    fn addresses(&mut self, name: &str) -> Result<Vec<IfAddr>>;
    fn add_address(&mut self, name: &str, addr: &IfAddr) -> Result<()>;
    fn del_address(&mut self, name: &str, addr: &IfAddr) -> Result<()>;
    fn set_up(&mut self, name: &str, up: bool) -> Result<()>;
    /// Install a default route through `gateway` on `name`.
    fn add_default_route(&mut self, name: &str, gateway: Ipv4Addr) -> Result<()>;
}

/// [`NetLink`] backed by the iproute2 `ip` command.
///
/// Requires `CAP_NET_ADMIN` for every mutating call.
#[derive(Debug, Clone)]
pub struct IpRoute2 {
    program: String,
}

impl Default for IpRoute2 {
    fn default() -> Self {
        Self {
            program: "ip".to_string(),
        }
    }
}

impl IpRoute2 {
    pub fn new() -> Self {
        Self::default()
    }

    fn run(&self, args: &[&str]) -> Result<Vec<u8>> {
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|e| ModemError::link(format!("failed to run {}: {e}", self.program)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ModemError::link(format!(
                "{} {}: {}",
                self.program,
                args.join(" "),
                stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}

impl NetLink for IpRoute2 {
    fn lookup(&mut self, name: &str) -> Result<()> {
        self.run(&["-j", "link", "show", "dev", name]).map(|_| ())
    }

    fn addresses(&mut self, name: &str) -> Result<Vec<IfAddr>> {
        let out = self.run(&["-j", "addr", "show", "dev", name])?;
        parse_addr_json(&out)
    }

    fn add_address(&mut self, name: &str, addr: &IfAddr) -> Result<()> {
        self.run(&["addr", "add", &addr.to_string(), "dev", name])
            .map(|_| ())
    }

    fn del_address(&mut self, name: &str, addr: &IfAddr) -> Result<()> {
        self.run(&["addr", "del", &addr.to_string(), "dev", name])
            .map(|_| ())
    }

    fn set_up(&mut self, name: &str, up: bool) -> Result<()> {
        let state = if up { "up" } else { "down" };
        self.run(&["link", "set", name, state]).map(|_| ())
    }

    fn add_default_route(&mut self, name: &str, gateway: Ipv4Addr) -> Result<()> {
        self.run(&[
            "route",
            "add",
            "default",
            "via",
            &gateway.to_string(),
            "dev",
            name,
        ])
        .map(|_| ())
    }
}

#[derive(Debug, Deserialize)]
struct IpLinkJson {
    #[serde(default)]
    addr_info: Vec<AddrInfoJson>,
}

#[derive(Debug, Deserialize)]
struct AddrInfoJson {
    local: IpAddr,
    prefixlen: u8,
}

/// Parse `ip -j addr show` output.
fn parse_addr_json(raw: &[u8]) -> Result<Vec<IfAddr>> {
    let links: Vec<IpLinkJson> = serde_json::from_slice(raw)
        .map_err(|e| ModemError::link(format!("unexpected ip output: {e}")))?;
    Ok(links
        .into_iter()
        .flat_map(|l| l.addr_info)
        .map(|a| IfAddr {
            ip: a.local,
            prefix_len: a.prefixlen,
        })
        .collect())
}
