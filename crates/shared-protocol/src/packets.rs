//! Packet definitions for identity exchange and encrypted payloads

use bincode::Options;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{MAX_PACKET_SIZE, ProtocolError, ProtocolResult};

/// Type of packet being transmitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum PacketType {
    /// Signed public identity bundle (sent before any shared secret exists)
    Identity = 0x01,
    /// Authenticated ciphertext with its 12-byte nonce
    Sealed = 0x10,
    /// Unauthenticated stream ciphertext with its 8-byte nonce
    Stream = 0x20,
    /// Unauthenticated stream ciphertext under the implicit fixed nonce
    FixedStream = 0x21,
}

/// Public half of a peer's identity.
///
/// `exchange_key_signature` is the Ed25519 signature made with the signing
/// key over `exchange_public_key`. Receivers verify it against
/// `signing_public_key` from this same bundle.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicIdentity {
    pub signing_public_key: [u8; 32],
    pub exchange_public_key: [u8; 32],
    #[serde(with = "serde_array64")]
    pub exchange_key_signature: [u8; 64],
}

impl PublicIdentity {
    /// Serialize to bytes for transmission
    pub fn to_bytes(&self) -> ProtocolResult<Bytes> {
        encode(self)
    }

    /// Deserialize from received bytes
    pub fn from_bytes(data: &[u8]) -> ProtocolResult<Self> {
        decode(data)
    }
}

impl std::fmt::Debug for PublicIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicIdentity")
            .field("signing_public_key", &short_hex(&self.signing_public_key))
            .field("exchange_public_key", &short_hex(&self.exchange_public_key))
            .finish_non_exhaustive()
    }
}

/// Authenticated ciphertext (tag appended) with the nonce it was sealed under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedEnvelope {
    pub nonce: [u8; 12],
    #[serde(with = "serde_bytes")]
    pub ciphertext: Vec<u8>,
}

/// Stream ciphertext with the random nonce it was produced under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEnvelope {
    pub nonce: [u8; 8],
    #[serde(with = "serde_bytes")]
    pub ciphertext: Vec<u8>,
}

/// Everything one peer sends another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Packet {
    Identity(PublicIdentity),
    Sealed(SealedEnvelope),
    Stream(StreamEnvelope),
    FixedStream(#[serde(with = "serde_bytes")] Vec<u8>),
}

impl Packet {
    pub fn packet_type(&self) -> PacketType {
        match self {
            Self::Identity(_) => PacketType::Identity,
            Self::Sealed(_) => PacketType::Sealed,
            Self::Stream(_) => PacketType::Stream,
            Self::FixedStream(_) => PacketType::FixedStream,
        }
    }

    /// Serialize to bytes for transmission
    pub fn to_bytes(&self) -> ProtocolResult<Bytes> {
        encode(self)
    }

    /// Deserialize from received bytes
    pub fn from_bytes(data: &[u8]) -> ProtocolResult<Self> {
        decode(data)
    }
}

fn wire_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_PACKET_SIZE as u64)
        .reject_trailing_bytes()
}

fn encode<T: Serialize>(value: &T) -> ProtocolResult<Bytes> {
    let encoded = wire_options().serialize(value)?;
    Ok(Bytes::from(encoded))
}

fn decode<T: for<'de> Deserialize<'de>>(data: &[u8]) -> ProtocolResult<T> {
    if data.len() > MAX_PACKET_SIZE {
        return Err(ProtocolError::PacketTooLarge {
            size: data.len(),
            max: MAX_PACKET_SIZE,
        });
    }
    Ok(wire_options().deserialize(data)?)
}

fn short_hex(bytes: &[u8]) -> String {
    bytes.iter().take(8).map(|b| format!("{b:02x}")).collect()
}

mod serde_bytes {
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        serde::Deserialize::deserialize(deserializer)
    }
}

// serde only derives for arrays up to 32 elements
mod serde_array64 {
    use serde::{Deserializer, Serializer, de::Error};

    pub fn serialize<S>(bytes: &[u8; 64], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 64], D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes: Vec<u8> = serde::Deserialize::deserialize(deserializer)?;
        let len = bytes.len();
        bytes
            .try_into()
            .map_err(|_| D::Error::invalid_length(len, &"64 bytes"))
    }
}
