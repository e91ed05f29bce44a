//! Key derivation: session keys, per-circuit keys, and relay fingerprints.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::kem::SharedSecret;

type HmacSha256 = Hmac<Sha256>;

/// Domain separator for the relay session key derivation (§4.3).
const SESSION_KEY_INFO: &[u8] = b"tallow-relay-session-v1";

/// Domain separator prefix for the per-circuit key derivation (§4.3).
const CIRCUIT_KEY_INFO_PREFIX: &[u8] = b"tallow-circuit-";

/// Derive the 32-byte AEAD session key from a HELLO handshake's shared secret.
///
/// `session_key = HMAC-SHA256(HMAC-SHA256(zeros32, shared_secret), info || 0x01)`
pub fn derive_session_key(shared_secret: &SharedSecret) -> [u8; 32] {
    let zeros = [0u8; 32];
    let prk = hmac_sha256(&zeros, shared_secret.as_bytes());

    let mut info = Vec::with_capacity(SESSION_KEY_INFO.len() + 1);
    info.extend_from_slice(SESSION_KEY_INFO);
    info.push(0x01);

    hmac_sha256(&prk, &info)
}

/// Derive the 32-byte per-circuit AEAD key from a CREATE_CIRCUIT handshake's
/// shared secret and the circuit id.
///
/// `circuit_key = HMAC-SHA256(shared_secret, "tallow-circuit-" || circuit_id)`
pub fn derive_circuit_key(shared_secret: &SharedSecret, circuit_id: &str) -> [u8; 32] {
    let mut info = Vec::with_capacity(CIRCUIT_KEY_INFO_PREFIX.len() + circuit_id.len());
    info.extend_from_slice(CIRCUIT_KEY_INFO_PREFIX);
    info.extend_from_slice(circuit_id.as_bytes());

    hmac_sha256(shared_secret.as_bytes(), &info)
}

/// Compute `HMAC-SHA256(key, data)`, returning the raw 32-byte tag.
fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    // `HmacSha256::new_from_slice` only fails for invalid key lengths, and
    // HMAC accepts keys of any length.
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// Compute a relay's fingerprint: the first 8 bytes of `sha256(public_key)`, hex-encoded.
pub fn public_key_fingerprint(public_key_bytes: &[u8]) -> String {
    let digest = Sha256::digest(public_key_bytes);
    hex::encode(&digest[..8])
}

/// Compute a relay's stable identifier: `"relay-" || fingerprint`.
pub fn relay_id(public_key_bytes: &[u8]) -> String {
    format!("relay-{}", public_key_fingerprint(public_key_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kem::KemKeyPair;

    #[test]
    fn session_key_derivation_is_deterministic_and_both_sides_agree() {
        let keypair = KemKeyPair::generate();
        let (ct, client_secret) = keypair.public_key().encapsulate().unwrap();
        let relay_secret = keypair.decapsulate(&ct).unwrap();

        let client_key = derive_session_key(&client_secret);
        let relay_key = derive_session_key(&relay_secret);
        assert_eq!(client_key, relay_key);
    }

    #[test]
    fn circuit_key_depends_on_circuit_id() {
        let keypair = KemKeyPair::generate();
        let (_, secret) = keypair.public_key().encapsulate().unwrap();

        let key_a = derive_circuit_key(&secret, "aaaaaaaaaaaaaaaa");
        let key_b = derive_circuit_key(&secret, "bbbbbbbbbbbbbbbb");
        assert_ne!(key_a, key_b);
    }

    #[test]
    fn relay_id_matches_contract_format() {
        let keypair = KemKeyPair::generate();
        let id = relay_id(keypair.public_key().as_bytes());
        assert!(id.starts_with("relay-"));
        assert_eq!(id.len(), "relay-".len() + 16);
    }
}
