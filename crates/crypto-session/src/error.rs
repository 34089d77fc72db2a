//! Crypto session error types

use thiserror::Error;

/// Cryptographic operation error
///
/// The variants stay distinct so callers can tell "run the handshake first"
/// apart from "the ciphertext was tampered with".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("Session keys have not been generated")]
    Uninitialized,

    #[error("No shared secret established")]
    NoSharedSecret,

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: authentication tag mismatch")]
    AuthenticationFailed,

    #[error("Invalid {what} length: expected {expected}, got {actual}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Private key does not match its public half")]
    MismatchedKeyPair,

    #[error("Peer exchange key is a low-order point")]
    WeakPublicKey,

    #[error("Invalid hex input: {0}")]
    InvalidHex(String),

    #[error("Decrypted bytes are not valid UTF-8")]
    InvalidUtf8,

    #[error("Exchange key signature rejected")]
    SignatureRejected,

    #[error("Fixed-nonce stream mode is disabled for this session")]
    FixedNonceDisabled,

    #[error("Peer limit reached: at most {max} peers")]
    PeerLimitReached { max: usize },
}

impl CryptoError {
    /// True for every flavour of badly-shaped input (lengths, hex, UTF-8)
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidLength { .. }
                | Self::MismatchedKeyPair
                | Self::WeakPublicKey
                | Self::InvalidHex(_)
                | Self::InvalidUtf8
        )
    }
}

pub type CryptoResult<T> = Result<T, CryptoError>;
