//! In-memory stand-ins for the serial port and the host network link.
//!
//! Used by this crate's unit tests and by the scenario tests under `tests/`.
//! [`ScriptedPort`] plays back canned modem replies; [`RecordingLink`] keeps
//! interface state in memory and logs every call.

use std::collections::{BTreeMap, VecDeque};
use std::io::{self, Read, Write};
use std::net::Ipv4Addr;

use crate::error::{ModemError, Result};
use crate::net::link::{IfAddr, NetLink};

#[derive(Debug, Clone)]
struct Expectation {
    command: String,
    reply: Vec<u8>,
}

/// Scripted duplex port.
///
/// Expectations are consumed in order: writing the expected command makes
/// its reply readable. A read with nothing pending behaves like a serial
/// timeout. Writes beyond the script are recorded and produce no reply.
#[derive(Debug, Default)]
pub struct ScriptedPort {
    expectations: VecDeque<Expectation>,
    pending: VecDeque<u8>,
    written: Vec<String>,
    read_error: Option<io::ErrorKind>,
}

impl ScriptedPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// When `command` (without CR-LF) is written, reply with `reply`.
    pub fn expect(&mut self, command: &str, reply: &str) -> &mut Self {
        self.expectations.push_back(Expectation {
            command: command.to_string(),
            reply: reply.as_bytes().to_vec(),
        });
        self
    }

    /// Make `reply` readable right away, as unsolicited or stale data.
    pub fn push_reply(&mut self, reply: &str) -> &mut Self {
        self.pending.extend(reply.as_bytes());
        self
    }

    pub fn fail_next_read(&mut self, kind: io::ErrorKind) -> &mut Self {
        self.read_error = Some(kind);
        self
    }

    /// Every line written so far, CR-LF included.
    pub fn written(&self) -> Vec<String> {
        self.written.clone()
    }

    /// Commands written so far, without terminators.
    pub fn commands(&self) -> Vec<String> {
        self.written
            .iter()
            .map(|w| w.trim_end_matches("\r\n").to_string())
            .collect()
    }

    pub fn remaining_expectations(&self) -> usize {
        self.expectations.len()
    }
}

impl Read for ScriptedPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(kind) = self.read_error.take() {
            return Err(io::Error::new(kind, "scripted read failure"));
        }
        if self.pending.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no data"));
        }
        let n = buf.len().min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for ScriptedPort {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(data).to_string();
        let command = text.trim_end_matches("\r\n").to_string();
        self.written.push(text);
        if let Some(next) = self.expectations.pop_front() {
            if next.command != command {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("unexpected command: expected {:?}, got {:?}", next.command, command),
                ));
            }
            self.pending.extend(next.reply);
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// In-memory [`NetLink`] that records every operation.
#[derive(Debug, Default)]
pub struct RecordingLink {
    links: BTreeMap<String, LinkState>,
    /// Human-readable log of calls, e.g. `"down wwan0"`, `"add wwan0 10.0.0.2/24"`.
    pub ops: Vec<String>,
    /// Addresses whose `add_address` call fails.
    pub reject: Vec<IfAddr>,
    /// When set, `add_default_route` fails.
    pub fail_routes: bool,
}

#[derive(Debug, Default, Clone)]
pub struct LinkState {
    pub up: bool,
    pub addrs: Vec<IfAddr>,
    pub gateways: Vec<Ipv4Addr>,
}

impl RecordingLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_link(mut self, name: &str, addrs: &[&str]) -> Self {
        let addrs = addrs
            .iter()
            .map(|a| a.parse().expect("test address"))
            .collect();
        self.links.insert(
            name.to_string(),
            LinkState {
                up: false,
                addrs,
                gateways: Vec::new(),
            },
        );
        self
    }

    pub fn state(&self, name: &str) -> Option<&LinkState> {
        self.links.get(name)
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut LinkState> {
        self.links
            .get_mut(name)
            .ok_or_else(|| ModemError::link(format!("no such device: {name}")))
    }
}

impl NetLink for RecordingLink {
    fn lookup(&mut self, name: &str) -> Result<()> {
        self.ops.push(format!("lookup {name}"));
        self.get_mut(name).map(|_| ())
    }

    fn addresses(&mut self, name: &str) -> Result<Vec<IfAddr>> {
        self.ops.push(format!("list {name}"));
        Ok(self.get_mut(name)?.addrs.clone())
    }

    fn add_address(&mut self, name: &str, addr: &IfAddr) -> Result<()> {
        self.ops.push(format!("add {name} {addr}"));
        if self.reject.contains(addr) {
            return Err(ModemError::link(format!("file exists: {addr}")));
        }
        self.get_mut(name)?.addrs.push(*addr);
        Ok(())
    }

    fn del_address(&mut self, name: &str, addr: &IfAddr) -> Result<()> {
        self.ops.push(format!("del {name} {addr}"));
        self.get_mut(name)?.addrs.retain(|a| a != addr);
        Ok(())
    }

    fn set_up(&mut self, name: &str, up: bool) -> Result<()> {
        self.ops
            .push(format!("{} {name}", if up { "up" } else { "down" }));
        self.get_mut(name)?.up = up;
        Ok(())
    }

    fn add_default_route(&mut self, name: &str, gateway: Ipv4Addr) -> Result<()> {
        self.ops.push(format!("route {name} via {gateway}"));
        if self.fail_routes {
            return Err(ModemError::link("network is unreachable"));
        }
        self.get_mut(name)?.gateways.push(gateway);
        Ok(())
    }
}
