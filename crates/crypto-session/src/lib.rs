//! Crypto Session - End-to-End Encryption for Sealink
//!
//! Signed X25519 key agreement between two peers, followed by ChaCha20-based
//! message protection over the resulting shared secret.
//!
//! ```text
//! Session::initialize()          Ed25519 signing pair + X25519 exchange pair
//!        │
//!        ▼
//! export_public_identity()  ──►  peer: verify signature with the bundle's
//!                                      signing key, abort on failure
//!        │
//!        ▼
//! compute_shared_secret()        raw X25519, identical on both sides
//!        │
//!        ▼
//! SessionCipher                  ChaCha20-Poly1305 / ChaCha20 stream
//! ```
//!
//! Transport, key persistence, and choosing which scheme protects which
//! message are left to the caller.

mod cipher;
mod encoding;
mod error;
mod global;
mod handshake;
mod keys;
mod session;

pub use cipher::*;
pub use encoding::{bytes_to_utf8, from_hex, from_hex_array, to_hex, utf8_to_bytes};
pub use error::*;
pub use global::global;
pub use handshake::{
    export_public_identity, sign_exchange_public_key, verify_exchange_signature, verify_identity,
};
pub use keys::*;
pub use session::*;

/// Ed25519 verification key size
pub const SIGNING_PUBLIC_KEY_SIZE: usize = 32;

/// Ed25519 private key size (seed followed by public key)
pub const SIGNING_PRIVATE_KEY_SIZE: usize = 64;

/// X25519 public and private key size
pub const EXCHANGE_KEY_SIZE: usize = 32;

/// Ed25519 signature size
pub const SIGNATURE_SIZE: usize = 64;

/// Shared secret size (256 bits / 32 bytes)
pub const SHARED_SECRET_SIZE: usize = 32;

/// Nonce size for ChaCha20Poly1305 (96 bits / 12 bytes)
pub const AEAD_NONCE_SIZE: usize = 12;

/// Nonce size for the ChaCha20 stream schemes (64 bits / 8 bytes)
pub const STREAM_NONCE_SIZE: usize = 8;

/// Authentication tag size (128 bits / 16 bytes)
pub const TAG_SIZE: usize = 16;
