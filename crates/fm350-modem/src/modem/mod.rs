//! # Modem Reply Decoders
//!
//! Pure functions from raw `AT` replies to typed telemetry: signal quality,
//! registration state, operator and identity strings, RAT/band
//! configuration and thermal sensors. A reply of the wrong shape degrades to
//! an empty, zero or `"Unknown"` value; none of these decoders fail.

pub mod band;
pub mod identity;
pub mod registration;
pub mod signal;
pub mod temperature;
