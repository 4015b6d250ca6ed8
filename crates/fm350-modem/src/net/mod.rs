//! Host network side: address-token decoding, the link capability and the
//! interface synchronizer driven by PDP-context state.

pub mod address;
pub mod link;
pub mod sync;

pub use link::{IfAddr, IpRoute2, NetLink};
pub use sync::NetSync;
