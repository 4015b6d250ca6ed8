//! Error taxonomy for modem operations.
//!
//! Every fallible operation in this crate returns [`Result<T>`]. Nothing here
//! terminates the process; the binary decides which failures are fatal.

use thiserror::Error;

/// Broad category of a [`ModemError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Read/write failure on the serial channel.
    Transport,
    /// The modem replied with an `ERROR` marker.
    Protocol,
    /// A request was made in a state that does not allow it.
    Precondition,
    /// The host network link capability failed.
    Link,
    /// Invalid or unreadable configuration.
    Config,
    /// SMS PDU decoding failed.
    Sms,
}

#[derive(Debug, Error)]
pub enum ModemError {
    #[error("serial transport failed: {0}")]
    Transport(#[from] std::io::Error),
    /// Raw modem error text, verbatim (e.g. `ERROR` or a CME detail).
    #[error("{0}")]
    Protocol(String),
    #[error("{0}")]
    Precondition(String),
    #[error("network link: {0}")]
    Link(String),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("sms decode: {0}")]
    Sms(#[from] crate::sms::SmsError),
}

impl ModemError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModemError::Transport(_) => ErrorKind::Transport,
            ModemError::Protocol(_) => ErrorKind::Protocol,
            ModemError::Precondition(_) => ErrorKind::Precondition,
            ModemError::Link(_) => ErrorKind::Link,
            ModemError::Config(_) => ErrorKind::Config,
            ModemError::Sms(_) => ErrorKind::Sms,
        }
    }

    pub(crate) fn precondition(msg: impl Into<String>) -> Self {
        ModemError::Precondition(msg.into())
    }

    pub(crate) fn link(msg: impl Into<String>) -> Self {
        ModemError::Link(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ModemError>;
