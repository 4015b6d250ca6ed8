//! Reconcile a host interface with the modem's PDP-context addresses.
//!
//! Only IPv4 is managed here. IPv6 addresses on the interface are left in
//! place on flush and IPv6 tokens reported by the modem are not assigned;
//! the interface is expected to obtain those through DHCPv6/SLAAC.

use std::net::{IpAddr, Ipv4Addr};

use super::address::{decode_token, pdp_address_tokens};
use super::link::{IfAddr, NetLink};
use crate::error::{ModemError, Result};

pub struct NetSync<L> {
    link: L,
    netdev: String,
}

impl<L: NetLink> NetSync<L> {
    pub fn new(link: L, netdev: impl Into<String>) -> Self {
        Self {
            link,
            netdev: netdev.into(),
        }
    }

    pub fn netdev(&self) -> &str {
        &self.netdev
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    /// Fail early when the device does not exist.
    pub fn lookup(&mut self) -> Result<()> {
        self.link.lookup(&self.netdev)
    }

    /// Bring the link down and remove every IPv4 address from it.
    pub fn flush(&mut self) -> Result<()> {
        if let Err(e) = self.link.set_up(&self.netdev, false) {
            tracing::warn!(netdev = %self.netdev, error = %e, "failed to set link down");
        }
        let addrs = self.link.addresses(&self.netdev)?;
        for addr in addrs.iter().filter(|a| a.is_ipv4()) {
            match self.link.del_address(&self.netdev, addr) {
                Ok(()) => tracing::debug!(netdev = %self.netdev, addr = %addr, "address removed"),
                Err(e) => {
                    tracing::warn!(netdev = %self.netdev, addr = %addr, error = %e, "failed to remove address")
                }
            }
        }
        Ok(())
    }

    /// Assign the IPv4 addresses of an `AT+CGPADDR` reply, then bring the
    /// link up. Returns the addresses actually added.
    ///
    /// A token that fails to parse or to be added is logged and skipped.
    pub fn configure(&mut self, cgpaddr_reply: &str) -> Result<Vec<IfAddr>> {
        let tokens = pdp_address_tokens(cgpaddr_reply).ok_or_else(|| {
            ModemError::Protocol(format!(
                "Failed to get local net configuration: {cgpaddr_reply}"
            ))
        })?;
        tracing::info!(netdev = %self.netdev, "connecting the modem to the network");

        let mut added = Vec::new();
        for token in tokens {
            let text = decode_token(token, true);
            let addr: IfAddr = match text.parse() {
                Ok(addr) => addr,
                Err(e) => {
                    tracing::warn!(addr = %text, error = %e, "failed to parse address");
                    continue;
                }
            };
            if !addr.is_ipv4() {
                tracing::debug!(addr = %addr, "leaving IPv6 to DHCPv6");
                continue;
            }
            if let Err(e) = self.link.add_address(&self.netdev, &addr) {
                tracing::warn!(netdev = %self.netdev, addr = %addr, error = %e, "failed to add address");
                continue;
            }
            tracing::info!(netdev = %self.netdev, addr = %addr, "address assigned");
            added.push(addr);
        }
        self.link.set_up(&self.netdev, true)?;
        Ok(added)
    }

    /// Install a default route for every IPv4 address on the interface,
    /// via the `.1` host of its network. Any failure aborts.
    pub fn install_default_routes(&mut self) -> Result<Vec<Ipv4Addr>> {
        self.link.lookup(&self.netdev)?;
        let addrs = self.link.addresses(&self.netdev)?;
        let mut gateways = Vec::new();
        for addr in addrs {
            let IpAddr::V4(v4) = addr.ip else {
                continue;
            };
            let gateway = gateway_for(v4);
            self.link.add_default_route(&self.netdev, gateway)?;
            tracing::info!(netdev = %self.netdev, gateway = %gateway, "default route added");
            gateways.push(gateway);
        }
        Ok(gateways)
    }
}

/// The address with its last octet set to 1.
pub fn gateway_for(addr: Ipv4Addr) -> Ipv4Addr {
    let [a, b, c, _] = addr.octets();
    Ipv4Addr::new(a, b, c, 1)
}
