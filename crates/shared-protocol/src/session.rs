//! Peer identifiers and session settings

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ProtocolError, ProtocolResult};

/// Unique peer identifier
///
/// Chosen by the transport collaborator; the crypto layer only uses it as the
/// key under which a peer's shared secret is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerId(pub Uuid);

impl PeerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Format as user-friendly display string (UUID)
    pub fn to_display_string(&self) -> String {
        self.0.to_string().to_uppercase()
    }

    /// Parse from display string, with or without separators
    pub fn from_display_string(s: &str) -> ProtocolResult<Self> {
        let trimmed = s.trim();
        if let Ok(uuid) = Uuid::parse_str(trimmed) {
            return Ok(Self(uuid));
        }

        let cleaned: String = trimmed.chars().filter(|c| c.is_alphanumeric()).collect();
        if cleaned.len() != 32 {
            return Err(ProtocolError::InvalidPeerId);
        }
        Uuid::parse_str(&cleaned.to_lowercase())
            .map(Self)
            .map_err(|_| ProtocolError::InvalidPeerId)
    }
}

impl Default for PeerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

/// Default bound on per-peer secrets held by one session
pub const DEFAULT_MAX_PEERS: usize = 64;

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Permit the fixed-nonce stream mode.
    ///
    /// The fixed nonce is a public constant, so every message sent in this
    /// mode must use a key that is never used for another message. Off unless
    /// a deployment opts in.
    pub allow_fixed_nonce: bool,
    /// Maximum number of peers with an established shared secret
    pub max_peers: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            allow_fixed_nonce: false,
            max_peers: DEFAULT_MAX_PEERS,
        }
    }
}

impl SessionConfig {
    /// Parse a JSON document; absent fields take their defaults
    pub fn from_json(json: &str) -> ProtocolResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render as pretty-printed JSON
    pub fn to_json(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Builder-style opt-in for the fixed-nonce stream mode
    pub fn with_fixed_nonce(mut self) -> Self {
        self.allow_fixed_nonce = true;
        self
    }
}
