//! Crypto-layer errors.

use thiserror::Error;

/// Errors produced by key management, handshake or sealing operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CryptoError {
    /// A public key, secret key, ciphertext or shared secret had the wrong length.
    #[error("invalid {field} length: expected {expected} bytes, got {got}")]
    InvalidLength {
        /// Which value failed the length check.
        field: &'static str,
        /// The length it should have had.
        expected: usize,
        /// The length it actually had.
        got: usize,
    },

    /// ML-KEM decapsulation failed (malformed ciphertext).
    #[error("KEM decapsulation failed")]
    DecapsulationFailed,

    /// AEAD seal/open failed; on open, this indicates tampering or the wrong key.
    #[error("AEAD operation failed")]
    AeadFailed,

    /// The on-disk key material could not be read or was corrupt.
    #[error("failed to load keystore at {path}: {reason}")]
    KeystoreLoad {
        /// Path that failed to load.
        path: String,
        /// Human-readable reason.
        reason: String,
    },

    /// The on-disk key material could not be written.
    #[error("failed to persist keystore at {path}: {reason}")]
    KeystoreSave {
        /// Path that failed to save.
        path: String,
        /// Human-readable reason.
        reason: String,
    },
}
