//! Line-normalising command channel over a duplex byte stream.
//!
//! The channel owns the transport for the whole session. Each [`read`] is a
//! single bounded read: whatever the modem has produced within the transport
//! timeout, up to [`ChannelConfig::recv_buffer`] bytes. Longer replies are
//! truncated at that bound.
//!
//! [`read`]: CommandChannel::read

use std::io::{self, Read, Write};
use std::time::Duration;

use crate::error::Result;

/// Default receive bound in bytes.
pub const DEFAULT_RECV_BUFFER: usize = 2048;

/// Smallest receive bound accepted by [`ChannelConfig`].
pub const MIN_RECV_BUFFER: usize = 64;

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Upper bound on a single reply, in bytes.
    pub recv_buffer: usize,
    /// Log every write/read at `info` instead of `debug`.
    pub log_traffic: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            recv_buffer: DEFAULT_RECV_BUFFER,
            log_traffic: false,
        }
    }
}

/// Open a serial device 8-N-1 with the given baud rate and per-read/write
/// timeout.
pub fn open_serial(
    path: &str,
    baud: u32,
    timeout: Duration,
) -> Result<Box<dyn serialport::SerialPort>> {
    let port = serialport::new(path, baud)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .timeout(timeout)
        .open()
        .map_err(io::Error::from)?;
    tracing::debug!(path, baud, timeout_ms = timeout.as_millis() as u64, "serial port open");
    Ok(port)
}

pub struct CommandChannel<T> {
    port: T,
    buf: Vec<u8>,
    log_traffic: bool,
}

impl<T: Read + Write> CommandChannel<T> {
    pub fn new(port: T, config: &ChannelConfig) -> Self {
        Self {
            port,
            buf: vec![0u8; config.recv_buffer.max(MIN_RECV_BUFFER)],
            log_traffic: config.log_traffic,
        }
    }

    /// Send `text` followed by CR-LF.
    pub fn write(&mut self, text: &str) -> Result<()> {
        if self.log_traffic {
            tracing::info!(command = text, "AT write");
        } else {
            tracing::debug!(command = text, "AT write");
        }
        let mut line = Vec::with_capacity(text.len() + 2);
        line.extend_from_slice(text.as_bytes());
        line.extend_from_slice(b"\r\n");
        self.port.write_all(&line)?;
        self.port.flush()?;
        Ok(())
    }

    /// Read one reply, trimmed, with CR/LF runs collapsed to a single `\n`.
    ///
    /// A transport timeout yields an empty reply; any other I/O failure is
    /// a transport error.
    pub fn read(&mut self) -> Result<String> {
        let n = match self.port.read(&mut self.buf) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => 0,
            Err(e) => return Err(e.into()),
        };
        let reply = normalize_reply(&String::from_utf8_lossy(&self.buf[..n]));
        if self.log_traffic {
            tracing::info!(reply = %reply, "AT read");
        } else {
            tracing::debug!(reply = %reply, bytes = n, "AT read");
        }
        Ok(reply)
    }

    pub fn get_ref(&self) -> &T {
        &self.port
    }

    pub fn into_inner(self) -> T {
        self.port
    }
}

/// Trim surrounding whitespace and collapse every run of `\r`/`\n` into one
/// `\n`.
pub fn normalize_reply(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_break = false;
    for c in raw.trim().chars() {
        if c == '\r' || c == '\n' {
            if !in_break {
                out.push('\n');
                in_break = true;
            }
        } else {
            out.push(c);
            in_break = false;
        }
    }
    out
}
