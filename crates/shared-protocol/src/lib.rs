//! Shared Protocol Definitions for Sealink
//!
//! This crate contains the values that cross the transport boundary between
//! two peers: identity bundles, ciphertext envelopes, and session settings.
//! It does no cryptography itself.

mod error;
mod packets;
mod session;

pub use error::*;
pub use packets::*;
pub use session::*;

/// Maximum encoded packet size accepted by `Packet::from_bytes`
pub const MAX_PACKET_SIZE: usize = 1 << 20;
