// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-256-GCM envelope codec.
//!
//! Every call to [`encrypt`] draws a fresh 96-bit nonce from the system
//! CSPRNG; callers cannot supply one. Stored layout:
//!
//! ```text
//! version (1) | nonce (12) | ciphertext (n) | tag (16)
//! ```
//!
//! The version byte is bound as associated data. Any failure to parse or
//! authenticate an envelope is reported as `DecryptionFailure`, without
//! saying which check failed.

use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};
use strongroom_core::StrongroomError;
use zeroize::Zeroizing;

use crate::memory::MasterKey;

/// Envelope layout version.
pub const ENVELOPE_VERSION: u8 = 1;
/// Nonce length in bytes.
pub const NONCE_LEN: usize = 12;
/// Authentication tag length in bytes.
pub const TAG_LEN: usize = 16;
/// Smallest well-formed envelope (empty plaintext).
pub const MIN_ENVELOPE_LEN: usize = 1 + NONCE_LEN + TAG_LEN;

/// Nonce, ciphertext and tag produced by one encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    nonce: [u8; NONCE_LEN],
    /// Ciphertext with the tag appended.
    sealed: Vec<u8>,
}

impl Envelope {
    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    /// Ciphertext followed by the 16-byte tag.
    pub fn sealed(&self) -> &[u8] {
        &self.sealed
    }

    /// Serialize to the stored byte layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + NONCE_LEN + self.sealed.len());
        out.push(ENVELOPE_VERSION);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.sealed);
        out
    }

    /// Parse the stored byte layout.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StrongroomError> {
        if bytes.len() < MIN_ENVELOPE_LEN || bytes[0] != ENVELOPE_VERSION {
            return Err(StrongroomError::DecryptionFailure);
        }
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&bytes[1..1 + NONCE_LEN]);
        Ok(Self {
            nonce,
            sealed: bytes[1 + NONCE_LEN..].to_vec(),
        })
    }
}

fn aead_key(key: &MasterKey) -> Result<LessSafeKey, StrongroomError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key.as_bytes())
        .map_err(|_| StrongroomError::Internal("failed to create AES-256-GCM key".to_string()))?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypt plaintext under `key` with a fresh random nonce.
pub fn encrypt(key: &MasterKey, plaintext: &[u8]) -> Result<Envelope, StrongroomError> {
    let sealing_key = aead_key(key)?;

    let mut nonce = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce)
        .map_err(|_| StrongroomError::Internal("failed to generate random nonce".to_string()))?;

    let mut sealed = plaintext.to_vec();
    sealing_key
        .seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce),
            Aad::from([ENVELOPE_VERSION]),
            &mut sealed,
        )
        .map_err(|_| StrongroomError::Internal("AES-256-GCM encryption failed".to_string()))?;

    Ok(Envelope { nonce, sealed })
}

/// Verify and decrypt an envelope. No plaintext is returned unless the tag checks out.
pub fn decrypt(key: &MasterKey, envelope: &Envelope) -> Result<Zeroizing<Vec<u8>>, StrongroomError> {
    let opening_key = aead_key(key).map_err(|_| StrongroomError::DecryptionFailure)?;

    let mut in_out = Zeroizing::new(envelope.sealed.clone());
    let len = opening_key
        .open_in_place(
            Nonce::assume_unique_for_key(envelope.nonce),
            Aad::from([ENVELOPE_VERSION]),
            &mut in_out,
        )
        .map_err(|_| StrongroomError::DecryptionFailure)?
        .len();

    in_out.truncate(len);
    Ok(in_out)
}

/// Parse and decrypt stored bytes in one step.
pub fn open_bytes(key: &MasterKey, bytes: &[u8]) -> Result<Zeroizing<Vec<u8>>, StrongroomError> {
    decrypt(key, &Envelope::from_bytes(bytes)?)
}

/// Generate a random key (used by tests and tooling, never persisted).
pub fn generate_random_key() -> Result<MasterKey, StrongroomError> {
    let mut key = MasterKey::zeroed()?;
    SystemRandom::new()
        .fill(key.as_mut_bytes())
        .map_err(|_| StrongroomError::Internal("failed to generate random key".to_string()))?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let key = generate_random_key().unwrap();
        let envelope = encrypt(&key, b"hunter2").unwrap();
        assert_eq!(decrypt(&key, &envelope).unwrap().as_slice(), b"hunter2");
    }

    #[test]
    fn nonces_differ_between_calls() {
        let key = generate_random_key().unwrap();
        let a = encrypt(&key, b"same input").unwrap();
        let b = encrypt(&key, b"same input").unwrap();
        assert_ne!(a.nonce(), b.nonce());
        assert_ne!(a.sealed(), b.sealed());
    }

    #[test]
    fn envelope_layout_has_fixed_overhead() {
        let key = generate_random_key().unwrap();
        let bytes = encrypt(&key, b"hello").unwrap().to_bytes();
        assert_eq!(bytes.len(), MIN_ENVELOPE_LEN + 5);
        assert_eq!(bytes[0], ENVELOPE_VERSION);
    }

    #[test]
    fn wrong_key_is_decryption_failure() {
        let key1 = generate_random_key().unwrap();
        let key2 = generate_random_key().unwrap();
        let envelope = encrypt(&key1, b"secret").unwrap();
        assert!(matches!(
            decrypt(&key2, &envelope),
            Err(StrongroomError::DecryptionFailure)
        ));
    }

    #[test]
    fn malformed_bytes_are_decryption_failure() {
        let key = generate_random_key().unwrap();
        for bytes in [&[][..], &[ENVELOPE_VERSION; 10][..], &[9u8; 64][..]] {
            assert!(matches!(
                open_bytes(&key, bytes),
                Err(StrongroomError::DecryptionFailure)
            ));
        }
    }

    #[test]
    fn empty_plaintext_roundtrips() {
        let key = generate_random_key().unwrap();
        let bytes = encrypt(&key, b"").unwrap().to_bytes();
        assert!(open_bytes(&key, &bytes).unwrap().is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn any_plaintext_roundtrips(plaintext in proptest::collection::vec(any::<u8>(), 0..512)) {
            let key = generate_random_key().unwrap();
            let bytes = encrypt(&key, &plaintext).unwrap().to_bytes();
            let opened = open_bytes(&key, &bytes).unwrap();
            prop_assert_eq!(opened.as_slice(), plaintext.as_slice());
        }

        #[test]
        fn any_single_byte_flip_is_rejected(
            plaintext in proptest::collection::vec(any::<u8>(), 0..128),
            position in any::<prop::sample::Index>(),
            mask in 1u8..=255,
        ) {
            let key = generate_random_key().unwrap();
            let mut bytes = encrypt(&key, &plaintext).unwrap().to_bytes();
            let i = position.index(bytes.len());
            bytes[i] ^= mask;
            prop_assert!(matches!(
                open_bytes(&key, &bytes),
                Err(StrongroomError::DecryptionFailure)
            ));
        }
    }
}
