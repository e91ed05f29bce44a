//! AES-256-GCM sealing for onion frames and circuit payloads.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;

use crate::err::CryptoError;

/// Nonce length used by AES-GCM.
const NONCE_LEN: usize = 12;

/// Seal `plaintext` under `key`, returning `nonce || ciphertext_with_tag`.
///
/// A fresh random nonce is generated per call and prepended to the output
/// so that [`open`] is self-contained given only the key.
pub fn seal(key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, Payload { msg: plaintext, aad: &[] })
        .map_err(|_| CryptoError::AeadFailed)?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Open a value produced by [`seal`], returning the original plaintext.
///
/// Any tampering with the nonce, ciphertext, or tag causes this to fail;
/// callers in the relay's data path must treat such failures as a silent
/// drop (§4.3), never surface them on the wire.
pub fn open(key: &[u8; 32], sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if sealed.len() < NONCE_LEN {
        return Err(CryptoError::AeadFailed);
    }
    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, Payload { msg: ciphertext, aad: &[] })
        .map_err(|_| CryptoError::AeadFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_then_open_round_trips() {
        let key = [9u8; 32];
        let plaintext = b"circuit payload bytes";
        let sealed = seal(&key, plaintext).unwrap();
        let opened = open(&key, &sealed).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn tampering_any_byte_causes_open_to_fail() {
        let key = [9u8; 32];
        let mut sealed = seal(&key, b"hello").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(open(&key, &sealed).is_err());
    }

    #[test]
    fn wrong_key_fails_to_open() {
        let key_a = [1u8; 32];
        let key_b = [2u8; 32];
        let sealed = seal(&key_a, b"hello").unwrap();
        assert!(open(&key_b, &sealed).is_err());
    }

    #[test]
    fn two_seals_of_the_same_plaintext_differ() {
        let key = [3u8; 32];
        let a = seal(&key, b"same plaintext").unwrap();
        let b = seal(&key, b"same plaintext").unwrap();
        assert_ne!(a, b, "nonces must be randomized per seal");
    }
}
