//! AT command protocol engine: a line-normalising channel over the serial
//! port and a driver that issues commands and runs the startup handshake.

pub mod channel;
pub mod driver;

pub use channel::{ChannelConfig, CommandChannel};
pub use driver::{AtDriver, SyncState};
