//! AT command driver: request/response over a [`CommandChannel`].
//!
//! ```text
//!            drain, "AT"
//! Unsynced ─────────────▶ "OK" ──▶ Ready ──▶ AT+CMEE=2
//!    ▲                    │
//!    └── ATE0, backoff ◀──┘ "AT\nOK" (echo on)
//! ```

use std::io::{Read, Write};
use std::thread;
use std::time::Duration;

use super::channel::CommandChannel;
use crate::error::{ModemError, Result};

/// Handshake phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Unsynchronized,
    Ready,
}

pub struct AtDriver<T> {
    channel: CommandChannel<T>,
    phase: SyncState,
}

impl<T: Read + Write> AtDriver<T> {
    pub fn new(channel: CommandChannel<T>) -> Self {
        Self {
            channel,
            phase: SyncState::Unsynchronized,
        }
    }

    pub fn phase(&self) -> SyncState {
        self.phase
    }

    /// Synchronise with the modem, disabling local echo if needed, then
    /// enable verbose error reporting.
    ///
    /// Retries without bound: a modem that is still booting keeps this
    /// loop spinning, one `backoff` per attempt.
    pub fn handshake(&mut self, backoff: Duration) -> Result<()> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            // Discard stale bytes left from a previous session.
            self.channel.read()?;
            let reply = self.send("AT", true)?;
            if reply == "OK" {
                break;
            }
            if reply == "AT\nOK" {
                tracing::debug!("modem echo enabled, disabling");
                self.send("ATE0", false)?;
            } else {
                tracing::debug!(attempts, reply = %reply, "modem not ready");
            }
            thread::sleep(backoff);
        }
        self.phase = SyncState::Ready;
        tracing::debug!(attempts, "modem synchronized");
        self.send("AT+CMEE=2", false)?;
        Ok(())
    }

    /// Issue `command` and return the reply.
    ///
    /// Unless `keep_ok` is set, a bare `OK` reply becomes empty and trailing
    /// `OK` lines are stripped. A reply beginning with `ERROR` is returned as
    /// [`ModemError::Protocol`] with the raw text.
    pub fn send(&mut self, command: &str, keep_ok: bool) -> Result<String> {
        self.channel.write(command)?;
        let mut reply = self.channel.read()?;
        if !keep_ok {
            reply = strip_ok(&reply);
        }
        if reply.starts_with("ERROR") {
            tracing::warn!(command, reply = %reply, "modem rejected command");
            return Err(ModemError::Protocol(reply));
        }
        Ok(reply)
    }

    /// [`send`](Self::send), then strip `prefix` from the reply if present.
    /// A reply without the prefix is returned unchanged.
    pub fn send_expect(&mut self, command: &str, prefix: &str, keep_ok: bool) -> Result<String> {
        let reply = self.send(command, keep_ok)?;
        Ok(match reply.strip_prefix(prefix) {
            Some(rest) => rest.to_string(),
            None => reply,
        })
    }

    pub fn channel(&self) -> &CommandChannel<T> {
        &self.channel
    }

    pub fn into_channel(self) -> CommandChannel<T> {
        self.channel
    }
}

/// Reduce a bare `OK` to empty and drop every `\nOK` terminator.
pub fn strip_ok(reply: &str) -> String {
    if reply == "OK" {
        String::new()
    } else {
        reply.replace("\nOK", "")
    }
}
