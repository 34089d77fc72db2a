//! Session: one identity, its key store, and the handshake and cipher
//! operations that run against it

use shared_protocol::{PeerId, PublicIdentity, SealedEnvelope, SessionConfig, StreamEnvelope};
use tracing::{debug, warn};

use crate::cipher::SessionCipher;
use crate::handshake::{self, verify_identity};
use crate::keys::{ExchangeKeyPair, KeyMaterial, KeyStore, SharedSecret, SigningKeyPair};
use crate::{CryptoError, CryptoResult, EXCHANGE_KEY_SIZE, SIGNATURE_SIZE, SIGNING_PUBLIC_KEY_SIZE};

/// One identity's end-to-end encryption state.
///
/// Construct one per identity; nothing is shared between sessions.
pub struct Session {
    config: SessionConfig,
    store: KeyStore,
}

impl Session {
    /// New session without keys; call [`Session::initialize`] before use
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            store: KeyStore::new(),
        }
    }

    /// Session that starts out initialized with existing key pairs
    pub fn from_keys(
        config: SessionConfig,
        signing: SigningKeyPair,
        exchange: ExchangeKeyPair,
    ) -> Self {
        Self {
            config,
            store: KeyStore::with_material(KeyMaterial { signing, exchange }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn key_store(&self) -> &KeyStore {
        &self.store
    }

    /// Generate the signing and exchange key pairs. Idempotent.
    pub fn initialize(&self) {
        self.store.initialize();
    }

    pub fn is_initialized(&self) -> bool {
        self.store.is_initialized()
    }

    pub fn signing_public_key(&self) -> CryptoResult<[u8; SIGNING_PUBLIC_KEY_SIZE]> {
        self.store.signing_public_key()
    }

    pub fn exchange_public_key(&self) -> CryptoResult<[u8; EXCHANGE_KEY_SIZE]> {
        self.store.exchange_public_key()
    }

    // Handshake

    pub fn sign_exchange_public_key(&self) -> CryptoResult<[u8; SIGNATURE_SIZE]> {
        handshake::sign_exchange_public_key(&self.store)
    }

    pub fn export_public_identity(&self) -> CryptoResult<PublicIdentity> {
        handshake::export_public_identity(&self.store)
    }

    /// Stateless signature check; see [`handshake::verify_exchange_signature`]
    pub fn verify_exchange_signature(
        exchange_public_key: &[u8],
        signature: &[u8],
        signing_public_key: &[u8],
    ) -> CryptoResult<bool> {
        handshake::verify_exchange_signature(exchange_public_key, signature, signing_public_key)
    }

    /// Derive the shared secret with a peer's exchange key and make it active.
    ///
    /// Performs no signature check; verify the peer's bundle first.
    pub fn compute_shared_secret(&self, peer_exchange_key: &[u8]) -> CryptoResult<SharedSecret> {
        self.store.compute_shared_secret(peer_exchange_key)
    }

    /// Verify a peer's bundle and, if it checks out, derive and record the
    /// shared secret for that peer. The secret also becomes the active one.
    pub fn establish(&self, peer: PeerId, identity: &PublicIdentity) -> CryptoResult<SharedSecret> {
        if !verify_identity(identity) {
            warn!(%peer, "refusing peer identity with bad exchange key signature");
            return Err(CryptoError::SignatureRejected);
        }

        let secret =
            self.store
                .establish_peer(peer, &identity.exchange_public_key, self.config.max_peers)?;
        debug!(%peer, "handshake complete");
        Ok(secret)
    }

    pub fn forget_peer(&self, peer: &PeerId) -> bool {
        self.store.forget_peer(peer)
    }

    pub fn peers(&self) -> Vec<PeerId> {
        self.store.peers()
    }

    // Ciphers

    /// Cipher bound to the active shared secret
    pub fn cipher(&self) -> CryptoResult<SessionCipher> {
        Ok(self.bind(self.store.active_secret()?))
    }

    /// Cipher bound to the secret established with `peer`
    pub fn peer_cipher(&self, peer: &PeerId) -> CryptoResult<SessionCipher> {
        Ok(self.bind(self.store.peer_secret(peer)?))
    }

    fn bind(&self, key: SharedSecret) -> SessionCipher {
        SessionCipher::new(key, self.config.allow_fixed_nonce)
    }

    pub fn encrypt_authenticated(&self, plaintext: &[u8]) -> CryptoResult<SealedEnvelope> {
        self.cipher()?.encrypt_authenticated(plaintext)
    }

    pub fn decrypt_authenticated(&self, ciphertext: &[u8], nonce: &[u8]) -> CryptoResult<Vec<u8>> {
        self.cipher()?.decrypt_authenticated(ciphertext, nonce)
    }

    pub fn encrypt_stream(&self, plaintext: &[u8]) -> CryptoResult<StreamEnvelope> {
        Ok(self.cipher()?.encrypt_stream(plaintext))
    }

    pub fn decrypt_stream(&self, ciphertext: &[u8], nonce: &[u8]) -> CryptoResult<Vec<u8>> {
        self.cipher()?.decrypt_stream(ciphertext, nonce)
    }

    pub fn encrypt_stream_fixed_nonce(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        self.cipher()?.encrypt_stream_fixed_nonce(plaintext)
    }

    pub fn decrypt_stream_fixed_nonce(&self, ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        self.cipher()?.decrypt_stream_fixed_nonce(ciphertext)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
