//! Post-quantum handshake primitives for the Tallow relay network:
//! ML-KEM-768 key encapsulation, HMAC-SHA256 key derivation, AES-256-GCM
//! sealing, and the on-disk relay identity keystore.

mod aead;
mod err;
mod kdf;
mod kem;
mod keymgr;

pub use aead::{open, seal};
pub use err::CryptoError;
pub use kdf::{derive_circuit_key, derive_session_key, public_key_fingerprint, relay_id};
pub use kem::{
    KemCiphertext, KemKeyPair, KemPublicKey, KemSecretKey, SharedSecret, CIPHERTEXT_BYTES,
    PUBLIC_KEY_BYTES, SECRET_KEY_BYTES, SHARED_SECRET_BYTES,
};
pub use keymgr::KeyManager;
