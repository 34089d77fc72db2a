//! Signed exchange-key handshake
//!
//! Each side publishes a [`PublicIdentity`]: its Ed25519 verification key,
//! its X25519 exchange key, and a signature binding the two. A receiver checks
//! the signature against the verification key carried in the same bundle
//! before using the exchange key, so a substituted exchange key is caught
//! unless the attacker also holds the signing key.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use shared_protocol::PublicIdentity;
use tracing::warn;

use crate::encoding::to_array;
use crate::keys::KeyStore;
use crate::{CryptoResult, EXCHANGE_KEY_SIZE, SIGNATURE_SIZE, SIGNING_PUBLIC_KEY_SIZE};

/// Sign our exchange public key with our signing key
pub fn sign_exchange_public_key(store: &KeyStore) -> CryptoResult<[u8; SIGNATURE_SIZE]> {
    let material = store.material()?;
    Ok(material.signing.sign(&material.exchange.public_key()))
}

/// Check `signature` over `exchange_public_key` against `signing_public_key`.
///
/// A signature that does not verify, or a verification key that is not a
/// valid curve point, yields `Ok(false)`. Only wrongly sized inputs are
/// errors.
pub fn verify_exchange_signature(
    exchange_public_key: &[u8],
    signature: &[u8],
    signing_public_key: &[u8],
) -> CryptoResult<bool> {
    let exchange: [u8; EXCHANGE_KEY_SIZE] = to_array(exchange_public_key, "exchange public key")?;
    let signature: [u8; SIGNATURE_SIZE] = to_array(signature, "signature")?;
    let signing: [u8; SIGNING_PUBLIC_KEY_SIZE] =
        to_array(signing_public_key, "signing public key")?;

    let Ok(verifying_key) = VerifyingKey::from_bytes(&signing) else {
        warn!("peer signing key is not a valid point");
        return Ok(false);
    };

    let valid = verifying_key
        .verify(&exchange, &Signature::from_bytes(&signature))
        .is_ok();
    if !valid {
        warn!("exchange key signature did not verify");
    }
    Ok(valid)
}

/// Verify a received bundle using the signing key it carries
pub fn verify_identity(identity: &PublicIdentity) -> bool {
    // All three fields are fixed-size, so only the verdict can vary
    matches!(
        verify_exchange_signature(
            &identity.exchange_public_key,
            &identity.exchange_key_signature,
            &identity.signing_public_key,
        ),
        Ok(true)
    )
}

/// Bundle our public keys with a fresh signature over the exchange key
pub fn export_public_identity(store: &KeyStore) -> CryptoResult<PublicIdentity> {
    let material = store.material()?;
    Ok(PublicIdentity {
        signing_public_key: material.signing.public_key(),
        exchange_public_key: material.exchange.public_key(),
        exchange_key_signature: sign_exchange_public_key(store)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CryptoError;
    use proptest::prelude::*;

    fn ready_store() -> KeyStore {
        let store = KeyStore::new();
        store.initialize();
        store
    }

    #[test]
    fn test_signature_verifies() {
        let store = ready_store();
        let signature = sign_exchange_public_key(&store).unwrap();
        let valid = verify_exchange_signature(
            &store.exchange_public_key().unwrap(),
            &signature,
            &store.signing_public_key().unwrap(),
        )
        .unwrap();
        assert!(valid);
    }

    #[test]
    fn test_uninitialized_store_cannot_sign_or_export() {
        let store = KeyStore::new();
        assert_eq!(
            sign_exchange_public_key(&store).unwrap_err(),
            CryptoError::Uninitialized
        );
        assert_eq!(
            export_public_identity(&store).unwrap_err(),
            CryptoError::Uninitialized
        );
    }

    #[test]
    fn test_exported_identity_is_self_consistent() {
        let store = ready_store();
        let identity = export_public_identity(&store).unwrap();
        assert_eq!(identity.signing_public_key, store.signing_public_key().unwrap());
        assert_eq!(identity.exchange_public_key, store.exchange_public_key().unwrap());
        assert!(verify_identity(&identity));
    }

    #[test]
    fn test_wrong_signing_key_rejected() {
        let ours = ready_store();
        let other = ready_store();
        let identity = export_public_identity(&ours).unwrap();

        let valid = verify_exchange_signature(
            &identity.exchange_public_key,
            &identity.exchange_key_signature,
            &other.signing_public_key().unwrap(),
        )
        .unwrap();
        assert!(!valid);
    }

    #[test]
    fn test_wrong_sizes_are_errors() {
        let err = verify_exchange_signature(&[0u8; 32], &[0u8; 63], &[0u8; 32]).unwrap_err();
        assert!(err.is_malformed_input());
        let err = verify_exchange_signature(&[0u8; 33], &[0u8; 64], &[0u8; 32]).unwrap_err();
        assert!(err.is_malformed_input());
        let err = verify_exchange_signature(&[0u8; 32], &[0u8; 64], &[]).unwrap_err();
        assert!(err.is_malformed_input());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_any_mutation_fails_verification(
            field in 0usize..3,
            index in 0usize..64,
            bit in 0u8..8,
        ) {
            let store = ready_store();
            let mut identity = export_public_identity(&store).unwrap();
            let mask = 1u8 << bit;
            match field {
                0 => identity.exchange_public_key[index % 32] ^= mask,
                1 => identity.exchange_key_signature[index] ^= mask,
                _ => identity.signing_public_key[index % 32] ^= mask,
            }

            let verdict = verify_exchange_signature(
                &identity.exchange_public_key,
                &identity.exchange_key_signature,
                &identity.signing_public_key,
            );
            prop_assert_eq!(verdict, Ok(false));
        }
    }
}
