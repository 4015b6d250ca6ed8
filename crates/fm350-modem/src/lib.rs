//! # fm350-modem
//!
//! Drives an FM350-class 5G modem over its AT command port and keeps a host
//! network interface in step with the modem's PDP context.
//!
//! | Layer | Module |
//! |---|---|
//! | serial channel, command driver, handshake | [`at`] |
//! | reply decoders | [`modem`] |
//! | address tokens, link capability, interface sync | [`net`] |
//! | session and PDP context state machine | [`session`] |
//! | device-info snapshot, records, signal monitor | [`telemetry`] |
//! | SMS listing and PDU decoding | [`sms`] |
//!
//! Every operation returns [`error::Result`]; deciding what is fatal is left
//! to the caller.

pub mod at;
pub mod config;
pub mod error;
pub mod modem;
pub mod net;
pub mod session;
pub mod sms;
pub mod telemetry;
pub mod test_util;

pub use config::ModemConfig;
pub use error::{ErrorKind, ModemError, Result};
pub use session::{Modem, Timing};
