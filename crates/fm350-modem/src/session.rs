//! # Modem Session
//!
//! [`Modem`] owns the command driver and the selected PDP context id for the
//! whole process. It exposes one method per modem query and drives the PDP
//! context state machine:
//!
//! ```text
//!               connect: PIN, APN, CGACT=1, settle, sync interface
//! Disconnected ───────────────────────────────────────────────▶ Connected
//!      ▲                                                            │
//!      └──────────── disconnect: CGACT=0, settle, flush ◀──────────┘
//! ```
//!
//! Requesting the state the modem is already in is a
//! [`ModemError::Precondition`], never a no-op.

use std::io::{Read, Write};
use std::thread;
use std::time::Duration;

use crate::at::channel::{open_serial, ChannelConfig, CommandChannel};
use crate::at::driver::AtDriver;
use crate::config::ModemConfig;
use crate::error::{ModemError, Result};
use crate::modem::band::{BandConfiguration, GTACT_PREFIX};
use crate::modem::identity::{
    operator_name, trim_quotes, CFSN_PREFIX, GTAPPVER_PREFIX, GTPKGVER_PREFIX,
};
use crate::modem::registration::{RegistrationStatus, C5GREG_PREFIX, CEREG_PREFIX};
use crate::modem::signal::Signal;
use crate::modem::temperature::{self, TemperatureReading};
use crate::net::address::dns_servers;
use crate::net::link::{IfAddr, NetLink};
use crate::net::sync::NetSync;
use crate::sms::{self, SmsCodec, SmsMessage};

const UNLOCK_BANDS: &str = r#"AT+EPBSEH="FF","FFFF","ffffffff","ffffffffffffffff""#;
const CIREPI_PREFIX: &str = "+CIREPI";
const CPIN_READY: &str = "+CPIN: READY";

/// Fixed delays of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Pause between handshake probes.
    pub probe_backoff: Duration,
    /// Wait after every context (de)activation and band unlock.
    pub context_settle: Duration,
    /// Signal monitor sampling period.
    pub poll_interval: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            probe_backoff: Duration::from_secs(1),
            context_settle: Duration::from_secs(5),
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl Timing {
    /// No delays at all.
    pub fn immediate() -> Self {
        Self {
            probe_backoff: Duration::ZERO,
            context_settle: Duration::ZERO,
            poll_interval: Duration::ZERO,
        }
    }
}

pub struct Modem<T> {
    driver: AtDriver<T>,
    cid: u32,
    timing: Timing,
}

impl Modem<Box<dyn serialport::SerialPort>> {
    /// Validate `config`, open its serial device and synchronise.
    pub fn open(config: &ModemConfig, log_traffic: bool) -> Result<Self> {
        config.validate()?;
        let port = open_serial(&config.serial, config.baud, config.timeout())?;
        tracing::info!(serial = %config.serial, cid = config.context_id, "modem session opening");
        Self::from_port(
            port,
            &config.channel(log_traffic),
            config.context_id,
            Timing::default(),
        )
    }
}

impl<T: Read + Write> Modem<T> {
    /// Wrap an already-open transport and run the startup handshake.
    pub fn from_port(port: T, channel: &ChannelConfig, cid: u32, timing: Timing) -> Result<Self> {
        let mut driver = AtDriver::new(CommandChannel::new(port, channel));
        driver.handshake(timing.probe_backoff)?;
        Ok(Self {
            driver,
            cid,
            timing,
        })
    }

    pub fn context_id(&self) -> u32 {
        self.cid
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn port(&self) -> &T {
        self.driver.channel().get_ref()
    }

    /// Release the transport.
    pub fn close(self) {
        drop(self.driver.into_channel().into_inner());
        tracing::debug!("modem session closed");
    }

    fn settle(&self) {
        thread::sleep(self.timing.context_settle);
    }

    /// Full functionality reset; the modem reboots.
    pub fn reset(&mut self) -> Result<String> {
        self.driver.send("AT+CFUN=1,1", true)
    }

    // ─── SIM / PDP context ──────────────────────────────────────────────

    pub fn has_sim_pin(&mut self) -> Result<bool> {
        Ok(self.driver.send("AT+CPIN?", false)? == CPIN_READY)
    }

    /// Unlock the SIM. Nothing is sent when it is already unlocked.
    pub fn set_sim_pin(&mut self, pin: &str) -> Result<()> {
        if self.has_sim_pin()? {
            return Ok(());
        }
        if pin.is_empty() {
            return Err(ModemError::precondition("Modem requires SIM card PIN number."));
        }
        self.unlock_sim(pin)
    }

    fn unlock_sim(&mut self, pin: &str) -> Result<()> {
        self.driver.send(&format!("AT+CPIN=\"{pin}\""), false)?;
        let status = self.driver.send("AT+CPIN?", false)?;
        if status != CPIN_READY {
            return Err(ModemError::Protocol(status));
        }
        tracing::info!("SIM unlocked");
        Ok(())
    }

    pub fn set_apn(&mut self, apn: &str) -> Result<()> {
        self.driver
            .send(&format!("AT+CGDCONT={},\"IPV4V6\",\"{apn}\"", self.cid), false)?;
        tracing::info!(apn, cid = self.cid, "APN set");
        Ok(())
    }

    /// Raw `AT+CGPADDR` reply for the session's context.
    pub fn pdp_addresses(&mut self) -> Result<String> {
        self.driver.send(&format!("AT+CGPADDR={}", self.cid), false)
    }

    /// Whether the context has addresses. An error reply means no.
    pub fn is_connected(&mut self) -> Result<bool> {
        match self.pdp_addresses() {
            Ok(reply) => Ok(!reply.contains("ERROR")),
            Err(ModemError::Protocol(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Activate or deactivate the context, then wait for the modem to settle.
    pub fn set_context(&mut self, enable: bool) -> Result<()> {
        let state = u8::from(enable);
        self.driver
            .send(&format!("AT+CGACT={state},{}", self.cid), true)?;
        self.settle();
        Ok(())
    }

    /// Bring the context up and configure `net` with its IPv4 addresses.
    /// Returns the addresses assigned to the interface.
    pub fn connect<L: NetLink>(
        &mut self,
        net: &mut NetSync<L>,
        sim_pin: Option<&str>,
        apn: Option<&str>,
    ) -> Result<Vec<IfAddr>> {
        if self.is_connected()? {
            return Err(ModemError::precondition("Modem is already connected."));
        }
        if !self.has_sim_pin()? {
            let pin = sim_pin
                .filter(|p| !p.is_empty())
                .ok_or_else(|| ModemError::precondition("Modem requires SIM card PIN number."))?;
            self.unlock_sim(pin)?;
        }
        let apn = apn
            .filter(|a| !a.is_empty())
            .ok_or_else(|| ModemError::precondition("Cannot connect without an apn."))?;
        self.set_apn(apn)?;

        net.lookup()?;
        self.set_context(true)?;
        if !self.is_connected()? {
            return Err(ModemError::Protocol("Failed to connect.".into()));
        }
        net.flush()?;
        let reply = self.pdp_addresses()?;
        let added = net.configure(&reply)?;
        tracing::info!(netdev = net.netdev(), addrs = added.len(), "modem connected");
        Ok(added)
    }

    /// Deactivate the context and flush `net`.
    pub fn disconnect<L: NetLink>(&mut self, net: &mut NetSync<L>) -> Result<()> {
        if !self.is_connected()? {
            return Err(ModemError::precondition("Modem already disconnected."));
        }
        net.lookup()?;
        self.set_context(false)?;
        if self.is_connected()? {
            return Err(ModemError::Protocol("Failed to disconnect.".into()));
        }
        net.flush()?;
        tracing::info!(netdev = net.netdev(), "modem disconnected");
        Ok(())
    }

    /// DNS servers of the active context.
    pub fn dns(&mut self) -> Result<Vec<String>> {
        if !self.is_connected()? {
            return Err(ModemError::precondition(
                "Modem needs to be connected to retrieve the DNS configuration.",
            ));
        }
        let reply = self.driver.send(&format!("AT+GTDNS={}", self.cid), false)?;
        Ok(dns_servers(&reply))
    }

    // ─── Telemetry queries ──────────────────────────────────────────────

    /// Both registration queries are always issued; 5G wins.
    pub fn registration(&mut self) -> Result<RegistrationStatus> {
        let nr = self.driver.send_expect("AT+C5GREG?", C5GREG_PREFIX, false)?;
        let lte = self.driver.send_expect("AT+CEREG?", CEREG_PREFIX, false)?;
        Ok(RegistrationStatus::from_replies(&nr, &lte))
    }

    pub fn operator(&mut self) -> Result<String> {
        Ok(operator_name(&self.driver.send("AT+GTCURCAR?", false)?))
    }

    pub fn signal(&mut self) -> Result<Signal> {
        Ok(Signal::from_reply(&self.driver.send("AT+CESQ", false)?))
    }

    pub fn firmware(&mut self) -> Result<String> {
        self.identity("AT+GTAPPVER?", GTAPPVER_PREFIX)
    }

    pub fn serial_number(&mut self) -> Result<String> {
        self.identity("AT+CFSN", CFSN_PREFIX)
    }

    pub fn package_version(&mut self) -> Result<String> {
        self.identity("AT+GTPKGVER?", GTPKGVER_PREFIX)
    }

    pub fn imei(&mut self) -> Result<String> {
        Ok(trim_quotes(&self.driver.send("AT+CGSN", false)?).to_string())
    }

    fn identity(&mut self, command: &str, prefix: &str) -> Result<String> {
        let reply = self.driver.send_expect(command, prefix, false)?;
        Ok(trim_quotes(&reply).to_string())
    }

    pub fn band_configuration(&mut self) -> Result<BandConfiguration> {
        let body = self.driver.send_expect("AT+GTACT?", GTACT_PREFIX, false)?;
        Ok(BandConfiguration::from_reply(&body))
    }

    pub fn temperatures(&mut self) -> Result<Vec<TemperatureReading>> {
        Ok(temperature::decode_reply(
            &self.driver.send("AT+GTSENRDTEMP=0", false)?,
        ))
    }

    /// Enable every supported band, then wait for the modem to settle.
    pub fn unlock_bands(&mut self) -> Result<String> {
        let reply = self.driver.send_expect(UNLOCK_BANDS, CIREPI_PREFIX, false)?;
        self.settle();
        tracing::info!(reply = %reply, "all bands unlocked");
        Ok(reply.trim_start_matches(':').trim().to_string())
    }

    /// Every stored message that `codec` can decode.
    pub fn sms_list(&mut self, codec: &dyn SmsCodec) -> Result<Vec<SmsMessage>> {
        let reply = self.driver.send("AT+CMGL=4", false)?;
        Ok(sms::decode_listing(&reply, codec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_util::ScriptedPort;

    fn modem(script: impl FnOnce(&mut ScriptedPort)) -> Modem<ScriptedPort> {
        let mut port = ScriptedPort::new();
        port.expect("AT", "OK").expect("AT+CMEE=2", "OK");
        script(&mut port);
        Modem::from_port(port, &ChannelConfig::default(), 5, Timing::immediate()).unwrap()
    }

    #[test]
    fn sim_pin_not_sent_when_ready() {
        let mut m = modem(|p| {
            p.expect("AT+CPIN?", "+CPIN: READY\r\n\r\nOK");
        });
        m.set_sim_pin("1234").unwrap();
        assert_eq!(m.port().remaining_expectations(), 0);
        assert!(!m.port().commands().iter().any(|c| c.starts_with("AT+CPIN=")));
    }

    #[test]
    fn sim_pin_rejected_keeps_modem_text() {
        let mut m = modem(|p| {
            p.expect("AT+CPIN?", "+CPIN: SIM PIN\r\nOK")
                .expect("AT+CPIN=\"0000\"", "+CME ERROR: incorrect password")
                .expect("AT+CPIN?", "+CPIN: SIM PIN\r\nOK");
        });
        let err = m.set_sim_pin("0000").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert_eq!(err.to_string(), "+CPIN: SIM PIN");
    }

    #[test]
    fn empty_pin_is_precondition() {
        let mut m = modem(|p| {
            p.expect("AT+CPIN?", "+CPIN: SIM PIN\r\nOK");
        });
        assert_eq!(m.set_sim_pin("").unwrap_err().kind(), ErrorKind::Precondition);
    }

    #[test]
    fn connected_means_no_error_text() {
        let mut m = modem(|p| {
            p.expect("AT+CGPADDR=5", "+CGPADDR: 5,\"10.0.0.2\"\r\nOK")
                .expect("AT+CGPADDR=5", "+CME ERROR: 3")
                .expect("AT+CGPADDR=5", "ERROR");
        });
        assert!(m.is_connected().unwrap());
        assert!(!m.is_connected().unwrap());
        assert!(!m.is_connected().unwrap());
    }

    #[test]
    fn context_activation_command() {
        let mut m = modem(|p| {
            p.expect("AT+CGACT=1,5", "OK").expect("AT+CGACT=0,5", "OK");
        });
        m.set_context(true).unwrap();
        m.set_context(false).unwrap();
        assert_eq!(m.port().remaining_expectations(), 0);
    }

    #[test]
    fn identity_strings_trimmed() {
        let mut m = modem(|p| {
            p.expect("AT+GTAPPVER?", "+GTAPPVER: \"81600.0000.00.29.21.05\"\r\nOK")
                .expect("AT+CFSN", "+CFSN: \"JPDPLR1234\"\r\nOK")
                .expect("AT+GTPKGVER?", "+GTPKGVER: \"19500.0000.00.29.21.05_2\"\r\nOK")
                .expect("AT+CGSN", "\"869000123456789\"\r\nOK");
        });
        assert_eq!(m.firmware().unwrap(), "81600.0000.00.29.21.05");
        assert_eq!(m.serial_number().unwrap(), "JPDPLR1234");
        assert_eq!(m.package_version().unwrap(), "19500.0000.00.29.21.05_2");
        assert_eq!(m.imei().unwrap(), "869000123456789");
    }

    #[test]
    fn dns_requires_connection() {
        let mut m = modem(|p| {
            p.expect("AT+CGPADDR=5", "+CME ERROR: 3");
        });
        assert_eq!(m.dns().unwrap_err().kind(), ErrorKind::Precondition);
    }

    #[test]
    fn unlock_strips_cirepi() {
        let mut m = modem(|p| {
            p.expect(UNLOCK_BANDS, "+CIREPI: 1\r\nOK");
        });
        assert_eq!(m.unlock_bands().unwrap(), "1");
    }

    #[test]
    fn reset_keeps_ok() {
        let mut m = modem(|p| {
            p.expect("AT+CFUN=1,1", "\r\nOK\r\n");
        });
        assert_eq!(m.reset().unwrap(), "OK");
    }
}
