//! Symmetric encryption over a shared secret
//!
//! Three schemes, all ChaCha20-based:
//!
//! | Scheme | Integrity | Nonce on the wire |
//! |---|---|---|
//! | ChaCha20-Poly1305 (IETF) | Poly1305 tag | 12 random bytes |
//! | ChaCha20 stream | none | 8 random bytes |
//! | ChaCha20 stream, fixed nonce | none | none |
//!
//! The fixed-nonce scheme reuses [`FIXED_STREAM_NONCE`] for every message,
//! so two messages under one key leak the XOR of their plaintexts. A key used
//! with it must encrypt exactly one message. Sessions refuse the scheme unless
//! their configuration opts in.

use chacha20::ChaCha20Legacy;
use chacha20::cipher::{KeyIvInit, StreamCipher};
use chacha20poly1305::{
    ChaCha20Poly1305, Key, Nonce,
    aead::{Aead, KeyInit},
};
use rand::RngCore;
use rand::rngs::OsRng;
use shared_protocol::{SealedEnvelope, StreamEnvelope};
use tracing::warn;

use crate::encoding::{bytes_to_utf8, to_array};
use crate::keys::SharedSecret;
use crate::{AEAD_NONCE_SIZE, CryptoError, CryptoResult, STREAM_NONCE_SIZE, TAG_SIZE};

/// Nonce shared implicitly by both ends of the fixed-nonce stream scheme
pub const FIXED_STREAM_NONCE: [u8; STREAM_NONCE_SIZE] = [0u8; STREAM_NONCE_SIZE];

/// Encrypt with ChaCha20-Poly1305 under a fresh random nonce, no associated data
pub fn seal(key: &SharedSecret, plaintext: &[u8]) -> CryptoResult<SealedEnvelope> {
    let mut nonce = [0u8; AEAD_NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    Ok(SealedEnvelope { nonce, ciphertext })
}

/// Decrypt and verify ChaCha20-Poly1305 output (ciphertext with tag appended)
pub fn open(key: &SharedSecret, ciphertext: &[u8], nonce: &[u8]) -> CryptoResult<Vec<u8>> {
    let nonce: [u8; AEAD_NONCE_SIZE] = to_array(nonce, "nonce")?;
    if ciphertext.len() < TAG_SIZE {
        return Err(CryptoError::InvalidLength {
            what: "ciphertext",
            expected: TAG_SIZE,
            actual: ciphertext.len(),
        });
    }

    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    cipher
        .decrypt(Nonce::from_slice(&nonce), ciphertext)
        .map_err(|_| {
            warn!(len = ciphertext.len(), "authenticated decryption rejected");
            CryptoError::AuthenticationFailed
        })
}

/// XOR `data` with the ChaCha20 keystream for `key` and `nonce`.
///
/// The same call encrypts and decrypts.
pub fn apply_stream(key: &SharedSecret, nonce: &[u8; STREAM_NONCE_SIZE], data: &[u8]) -> Vec<u8> {
    let mut buffer = data.to_vec();
    let mut cipher = ChaCha20Legacy::new(key.as_bytes().into(), nonce.into());
    cipher.apply_keystream(&mut buffer);
    buffer
}

/// Authenticated encryption under an externally supplied 32-byte key
pub fn encrypt_authenticated_with_key(key: &[u8], plaintext: &[u8]) -> CryptoResult<SealedEnvelope> {
    seal(&SharedSecret::from_bytes(key)?, plaintext)
}

/// Authenticated decryption under an externally supplied 32-byte key
pub fn decrypt_authenticated_with_key(
    key: &[u8],
    ciphertext: &[u8],
    nonce: &[u8],
) -> CryptoResult<Vec<u8>> {
    open(&SharedSecret::from_bytes(key)?, ciphertext, nonce)
}

/// As [`decrypt_authenticated_with_key`], decoding the plaintext as UTF-8
pub fn decrypt_authenticated_text_with_key(
    key: &[u8],
    ciphertext: &[u8],
    nonce: &[u8],
) -> CryptoResult<String> {
    bytes_to_utf8(&decrypt_authenticated_with_key(key, ciphertext, nonce)?)
}

/// All cipher operations bound to one shared secret.
///
/// Holds its own copy of the key, so it stays usable (and unchanged) if the
/// session later establishes a different secret.
#[derive(Clone)]
pub struct SessionCipher {
    key: SharedSecret,
    allow_fixed_nonce: bool,
}

impl SessionCipher {
    pub fn new(key: SharedSecret, allow_fixed_nonce: bool) -> Self {
        Self {
            key,
            allow_fixed_nonce,
        }
    }

    pub fn encrypt_authenticated(&self, plaintext: &[u8]) -> CryptoResult<SealedEnvelope> {
        seal(&self.key, plaintext)
    }

    pub fn decrypt_authenticated(&self, ciphertext: &[u8], nonce: &[u8]) -> CryptoResult<Vec<u8>> {
        open(&self.key, ciphertext, nonce)
    }

    pub fn decrypt_authenticated_text(&self, ciphertext: &[u8], nonce: &[u8]) -> CryptoResult<String> {
        bytes_to_utf8(&self.decrypt_authenticated(ciphertext, nonce)?)
    }

    pub fn open_envelope(&self, envelope: &SealedEnvelope) -> CryptoResult<Vec<u8>> {
        self.decrypt_authenticated(&envelope.ciphertext, &envelope.nonce)
    }

    /// Unauthenticated stream encryption under a fresh random 8-byte nonce
    pub fn encrypt_stream(&self, plaintext: &[u8]) -> StreamEnvelope {
        let mut nonce = [0u8; STREAM_NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);
        let ciphertext = apply_stream(&self.key, &nonce, plaintext);
        StreamEnvelope { nonce, ciphertext }
    }

    pub fn decrypt_stream(&self, ciphertext: &[u8], nonce: &[u8]) -> CryptoResult<Vec<u8>> {
        let nonce: [u8; STREAM_NONCE_SIZE] = to_array(nonce, "nonce")?;
        Ok(apply_stream(&self.key, &nonce, ciphertext))
    }

    pub fn encrypt_stream_fixed_nonce(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        self.check_fixed_nonce()?;
        Ok(apply_stream(&self.key, &FIXED_STREAM_NONCE, plaintext))
    }

    pub fn decrypt_stream_fixed_nonce(&self, ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        self.check_fixed_nonce()?;
        Ok(apply_stream(&self.key, &FIXED_STREAM_NONCE, ciphertext))
    }

    fn check_fixed_nonce(&self) -> CryptoResult<()> {
        if self.allow_fixed_nonce {
            Ok(())
        } else {
            Err(CryptoError::FixedNonceDisabled)
        }
    }
}

impl std::fmt::Debug for SessionCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCipher")
            .field("allow_fixed_nonce", &self.allow_fixed_nonce)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{from_hex, to_hex};
    use proptest::prelude::*;

    fn test_key(byte: u8) -> SharedSecret {
        SharedSecret::from_bytes(&[byte; 32]).unwrap()
    }

    fn cipher(byte: u8) -> SessionCipher {
        SessionCipher::new(test_key(byte), true)
    }

    #[test]
    fn test_sealed_layout() {
        let envelope = cipher(7).encrypt_authenticated(b"hello").unwrap();
        assert_eq!(envelope.nonce.len(), AEAD_NONCE_SIZE);
        assert_eq!(envelope.ciphertext.len(), 5 + TAG_SIZE);
    }

    #[test]
    fn test_fresh_nonce_per_message() {
        let cipher = cipher(7);
        let a = cipher.encrypt_authenticated(b"same").unwrap();
        let b = cipher.encrypt_authenticated(b"same").unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);

        let a = cipher.encrypt_stream(b"same");
        let b = cipher.encrypt_stream(b"same");
        assert_ne!(a.nonce, b.nonce);
    }

    #[test]
    fn test_wrong_key_is_authentication_failure() {
        let envelope = cipher(1).encrypt_authenticated(b"secret").unwrap();
        assert_eq!(
            cipher(2).open_envelope(&envelope).unwrap_err(),
            CryptoError::AuthenticationFailed
        );
    }

    #[test]
    fn test_malformed_inputs_are_not_authentication_failures() {
        let cipher = cipher(1);
        let envelope = cipher.encrypt_authenticated(b"secret").unwrap();

        let err = cipher
            .decrypt_authenticated(&envelope.ciphertext, &envelope.nonce[..8])
            .unwrap_err();
        assert!(err.is_malformed_input());

        let err = cipher.decrypt_authenticated(&[0u8; 4], &envelope.nonce).unwrap_err();
        assert!(err.is_malformed_input());

        let err = cipher.decrypt_stream(b"abc", &[0u8; 12]).unwrap_err();
        assert!(err.is_malformed_input());
    }

    #[test]
    fn test_empty_plaintext() {
        let cipher = cipher(3);
        let envelope = cipher.encrypt_authenticated(b"").unwrap();
        assert_eq!(envelope.ciphertext.len(), TAG_SIZE);
        assert!(cipher.open_envelope(&envelope).unwrap().is_empty());

        let envelope = cipher.encrypt_stream(b"");
        assert!(envelope.ciphertext.is_empty());
    }

    #[test]
    fn test_text_decryption() {
        let cipher = cipher(4);
        let envelope = cipher.encrypt_authenticated("grüße".as_bytes()).unwrap();
        let text = cipher
            .decrypt_authenticated_text(&envelope.ciphertext, &envelope.nonce)
            .unwrap();
        assert_eq!(text, "grüße");

        let envelope = cipher.encrypt_authenticated(&[0xFF, 0xFE]).unwrap();
        assert_eq!(
            cipher
                .decrypt_authenticated_text(&envelope.ciphertext, &envelope.nonce)
                .unwrap_err(),
            CryptoError::InvalidUtf8
        );
    }

    #[test]
    fn test_static_key_variants() {
        let key = [0x42u8; 32];
        let envelope = encrypt_authenticated_with_key(&key, b"broadcast").unwrap();

        let bytes =
            decrypt_authenticated_with_key(&key, &envelope.ciphertext, &envelope.nonce).unwrap();
        assert_eq!(bytes, b"broadcast");
        let text =
            decrypt_authenticated_text_with_key(&key, &envelope.ciphertext, &envelope.nonce)
                .unwrap();
        assert_eq!(text, "broadcast");

        let mut tampered = envelope.ciphertext.clone();
        tampered[0] ^= 1;
        assert_eq!(
            decrypt_authenticated_with_key(&key, &tampered, &envelope.nonce).unwrap_err(),
            CryptoError::AuthenticationFailed
        );

        assert!(
            encrypt_authenticated_with_key(&key[..16], b"x")
                .unwrap_err()
                .is_malformed_input()
        );
    }

    #[test]
    fn test_fixed_nonce_gated() {
        let locked = SessionCipher::new(test_key(5), false);
        assert_eq!(
            locked.encrypt_stream_fixed_nonce(b"x").unwrap_err(),
            CryptoError::FixedNonceDisabled
        );
        assert_eq!(
            locked.decrypt_stream_fixed_nonce(b"x").unwrap_err(),
            CryptoError::FixedNonceDisabled
        );
    }

    #[test]
    fn test_fixed_nonce_is_deterministic() {
        let cipher = cipher(6);
        let a = cipher.encrypt_stream_fixed_nonce(b"one message").unwrap();
        let b = cipher.encrypt_stream_fixed_nonce(b"one message").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), b"one message".len());
    }

    #[test]
    fn test_fixed_nonce_reuse_leaks_xor() {
        let cipher = cipher(6);
        let p1 = b"attack at dawn!!";
        let p2 = b"retreat at dusk!";
        let c1 = cipher.encrypt_stream_fixed_nonce(p1).unwrap();
        let c2 = cipher.encrypt_stream_fixed_nonce(p2).unwrap();

        let ciphertext_xor: Vec<u8> = c1.iter().zip(&c2).map(|(a, b)| a ^ b).collect();
        let plaintext_xor: Vec<u8> = p1.iter().zip(p2).map(|(a, b)| a ^ b).collect();
        assert_eq!(ciphertext_xor, plaintext_xor);
    }

    #[test]
    fn test_stream_keystream_vector() {
        // ChaCha20, 20 rounds, all-zero key and 64-bit nonce: first keystream block
        let key = SharedSecret::from_bytes(&[0u8; 32]).unwrap();
        let keystream = apply_stream(&key, &FIXED_STREAM_NONCE, &[0u8; 32]);
        assert_eq!(
            keystream,
            from_hex("76b8e0ada0f13d90405d6ae55386bd28bdd219b8a08ded1aa836efcc8b770dc7").unwrap()
        );
        assert_eq!(to_hex(&keystream[..4]), "76b8e0ad");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_authenticated_roundtrip(
            key in prop::array::uniform32(any::<u8>()),
            plaintext in prop::collection::vec(any::<u8>(), 0..1024),
        ) {
            let cipher = SessionCipher::new(SharedSecret::from_bytes(&key).unwrap(), false);
            let envelope = cipher.encrypt_authenticated(&plaintext).unwrap();
            prop_assert_eq!(cipher.open_envelope(&envelope).unwrap(), plaintext);
        }

        #[test]
        fn prop_stream_roundtrip(
            key in prop::array::uniform32(any::<u8>()),
            plaintext in prop::collection::vec(any::<u8>(), 0..1024),
        ) {
            let cipher = SessionCipher::new(SharedSecret::from_bytes(&key).unwrap(), true);

            let envelope = cipher.encrypt_stream(&plaintext);
            prop_assert_eq!(envelope.ciphertext.len(), plaintext.len());
            prop_assert_eq!(
                cipher.decrypt_stream(&envelope.ciphertext, &envelope.nonce).unwrap(),
                plaintext.clone()
            );

            let fixed = cipher.encrypt_stream_fixed_nonce(&plaintext).unwrap();
            prop_assert_eq!(cipher.decrypt_stream_fixed_nonce(&fixed).unwrap(), plaintext);
        }

        #[test]
        fn prop_any_bit_flip_is_rejected(
            plaintext in prop::collection::vec(any::<u8>(), 0..256),
            position in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let cipher = cipher(9);
            let envelope = cipher.encrypt_authenticated(&plaintext).unwrap();

            let mut tampered = envelope.ciphertext.clone();
            let i = position.index(tampered.len());
            tampered[i] ^= 1 << bit;

            prop_assert_eq!(
                cipher.decrypt_authenticated(&tampered, &envelope.nonce),
                Err(CryptoError::AuthenticationFailed)
            );
        }
    }
}
