//! Key material store: the signing pair, the exchange pair, and shared secrets

use std::collections::HashMap;
use std::sync::OnceLock;

use ed25519_dalek::{Signer, SigningKey};
use parking_lot::RwLock;
use rand::rngs::OsRng;
use shared_protocol::PeerId;
use tracing::debug;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::encoding::{to_array, to_hex};
use crate::{
    CryptoError, CryptoResult, EXCHANGE_KEY_SIZE, SHARED_SECRET_SIZE, SIGNATURE_SIZE,
    SIGNING_PRIVATE_KEY_SIZE, SIGNING_PUBLIC_KEY_SIZE,
};

/// Long-term Ed25519 identity
pub struct SigningKeyPair {
    signing: SigningKey,
}

impl SigningKeyPair {
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::generate(&mut OsRng),
        }
    }

    /// Restore from the 64-byte `seed || public key` encoding
    pub fn from_keypair_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        let bytes: Zeroizing<[u8; SIGNING_PRIVATE_KEY_SIZE]> =
            Zeroizing::new(to_array(bytes, "signing private key")?);
        let signing =
            SigningKey::from_keypair_bytes(&bytes).map_err(|_| CryptoError::MismatchedKeyPair)?;
        Ok(Self { signing })
    }

    pub fn public_key(&self) -> [u8; SIGNING_PUBLIC_KEY_SIZE] {
        self.signing.verifying_key().to_bytes()
    }

    /// The 64-byte `seed || public key` encoding
    pub fn private_key(&self) -> Zeroizing<[u8; SIGNING_PRIVATE_KEY_SIZE]> {
        Zeroizing::new(self.signing.to_keypair_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_SIZE] {
        self.signing.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningKeyPair({}...)", &to_hex(&self.public_key())[..16])
    }
}

/// X25519 key pair used for Diffie-Hellman
pub struct ExchangeKeyPair {
    secret: StaticSecret,
    public: PublicKey,
}

impl ExchangeKeyPair {
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Restore from a 32-byte scalar
    pub fn from_private_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        let bytes: [u8; EXCHANGE_KEY_SIZE] = to_array(bytes, "exchange private key")?;
        let secret = StaticSecret::from(bytes);
        let public = PublicKey::from(&secret);
        Ok(Self { secret, public })
    }

    pub fn public_key(&self) -> [u8; EXCHANGE_KEY_SIZE] {
        self.public.to_bytes()
    }

    pub fn private_key(&self) -> Zeroizing<[u8; EXCHANGE_KEY_SIZE]> {
        Zeroizing::new(self.secret.to_bytes())
    }

    /// Raw X25519 of our scalar with the peer's point, no KDF applied
    ///
    /// A low-order peer point produces an all-zero output and is rejected.
    pub fn diffie_hellman(&self, peer_public: &[u8]) -> CryptoResult<SharedSecret> {
        let peer: [u8; EXCHANGE_KEY_SIZE] = to_array(peer_public, "exchange public key")?;
        let shared = self.secret.diffie_hellman(&PublicKey::from(peer));
        if !shared.was_contributory() {
            return Err(CryptoError::WeakPublicKey);
        }
        Ok(SharedSecret(*shared.as_bytes()))
    }
}

impl std::fmt::Debug for ExchangeKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ExchangeKeyPair({}...)", &to_hex(&self.public_key())[..16])
    }
}

/// 32-byte symmetric key
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; SHARED_SECRET_SIZE]);

impl SharedSecret {
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        Ok(Self(to_array(bytes, "shared secret")?))
    }

    pub fn as_bytes(&self) -> &[u8; SHARED_SECRET_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}

/// Both key pairs of one identity, generated together
#[derive(Debug)]
pub struct KeyMaterial {
    pub signing: SigningKeyPair,
    pub exchange: ExchangeKeyPair,
}

impl KeyMaterial {
    pub fn generate() -> Self {
        Self {
            signing: SigningKeyPair::generate(),
            exchange: ExchangeKeyPair::generate(),
        }
    }
}

#[derive(Default)]
struct SecretTable {
    active: Option<SharedSecret>,
    peers: HashMap<PeerId, SharedSecret>,
}

/// Owns one session's key material.
///
/// Key pairs are generated once and never change afterwards. The active
/// shared secret and the per-peer table sit behind a lock, so writes are
/// serialized here rather than by the caller.
#[derive(Default)]
pub struct KeyStore {
    material: OnceLock<KeyMaterial>,
    secrets: RwLock<SecretTable>,
}

impl KeyStore {
    /// An empty store; call `initialize` before use
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that is already initialized with the given key pairs
    pub fn with_material(material: KeyMaterial) -> Self {
        Self {
            material: OnceLock::from(material),
            secrets: RwLock::default(),
        }
    }

    /// Generate both key pairs. Calling again is a no-op.
    pub fn initialize(&self) {
        self.material.get_or_init(|| {
            let material = KeyMaterial::generate();
            debug!(
                signing = %&to_hex(&material.signing.public_key())[..16],
                exchange = %&to_hex(&material.exchange.public_key())[..16],
                "generated session key pairs"
            );
            material
        });
    }

    pub fn is_initialized(&self) -> bool {
        self.material.get().is_some()
    }

    pub fn material(&self) -> CryptoResult<&KeyMaterial> {
        self.material.get().ok_or(CryptoError::Uninitialized)
    }

    pub fn signing_public_key(&self) -> CryptoResult<[u8; SIGNING_PUBLIC_KEY_SIZE]> {
        Ok(self.material()?.signing.public_key())
    }

    pub fn exchange_public_key(&self) -> CryptoResult<[u8; EXCHANGE_KEY_SIZE]> {
        Ok(self.material()?.exchange.public_key())
    }

    /// Diffie-Hellman with the peer's exchange key; the result replaces the
    /// active shared secret.
    pub fn compute_shared_secret(&self, peer_public: &[u8]) -> CryptoResult<SharedSecret> {
        let secret = self.material()?.exchange.diffie_hellman(peer_public)?;
        self.secrets.write().active = Some(secret.clone());
        debug!("active shared secret replaced");
        Ok(secret)
    }

    /// Like `compute_shared_secret`, and also records the secret under `peer`.
    ///
    /// A new peer beyond `max_peers` is refused; an existing one is overwritten.
    pub fn establish_peer(
        &self,
        peer: PeerId,
        peer_public: &[u8],
        max_peers: usize,
    ) -> CryptoResult<SharedSecret> {
        let secret = self.material()?.exchange.diffie_hellman(peer_public)?;

        let mut secrets = self.secrets.write();
        if !secrets.peers.contains_key(&peer) && secrets.peers.len() >= max_peers {
            return Err(CryptoError::PeerLimitReached { max: max_peers });
        }
        secrets.peers.insert(peer, secret.clone());
        secrets.active = Some(secret.clone());
        debug!(%peer, peers = secrets.peers.len(), "peer shared secret established");

        Ok(secret)
    }

    pub fn active_secret(&self) -> CryptoResult<SharedSecret> {
        self.secrets
            .read()
            .active
            .clone()
            .ok_or(CryptoError::NoSharedSecret)
    }

    pub fn peer_secret(&self, peer: &PeerId) -> CryptoResult<SharedSecret> {
        self.secrets
            .read()
            .peers
            .get(peer)
            .cloned()
            .ok_or(CryptoError::NoSharedSecret)
    }

    /// Drop a peer's secret. The active secret is left alone.
    pub fn forget_peer(&self, peer: &PeerId) -> bool {
        self.secrets.write().peers.remove(peer).is_some()
    }

    pub fn peers(&self) -> Vec<PeerId> {
        self.secrets.read().peers.keys().copied().collect()
    }
}
