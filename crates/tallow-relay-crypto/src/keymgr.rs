//! Loads, generates and persists a relay's long-lived ML-KEM-768 identity keypair.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::err::CryptoError;
use crate::kdf::{public_key_fingerprint, relay_id};
use crate::kem::{KemCiphertext, KemKeyPair, KemPublicKey, KemSecretKey, SharedSecret};
use crate::kem::{CIPHERTEXT_BYTES, PUBLIC_KEY_BYTES, SECRET_KEY_BYTES};

/// Owns a relay's long-lived identity keypair.
///
/// The keypair is generated on first run and persisted to `keystore_path`;
/// subsequent starts load it back so the relay's identity (and therefore
/// its `relay_id`) is stable across restarts.
pub struct KeyManager {
    keypair: KemKeyPair,
    keystore_path: PathBuf,
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager")
            .field("keypair", &"<redacted>")
            .field("keystore_path", &self.keystore_path)
            .finish()
    }
}

impl KeyManager {
    /// Load the keypair at `keystore_path`, generating and persisting a new
    /// one if the file does not exist.
    ///
    /// A corrupt (but present) key file is a fatal startup error, per §4.2.
    pub fn load_or_generate(keystore_path: impl Into<PathBuf>) -> Result<Self, CryptoError> {
        let keystore_path = keystore_path.into();

        if keystore_path.exists() {
            let keypair = Self::read_keystore(&keystore_path)?;
            info!(path = %keystore_path.display(), "loaded relay identity keypair");
            return Ok(Self { keypair, keystore_path });
        }

        let keypair = KemKeyPair::generate();
        Self::write_keystore(&keystore_path, &keypair)?;
        info!(path = %keystore_path.display(), "generated new relay identity keypair");
        Ok(Self { keypair, keystore_path })
    }

    fn read_keystore(path: &Path) -> Result<KemKeyPair, CryptoError> {
        let bytes = fs::read(path).map_err(|e| CryptoError::KeystoreLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        if bytes.len() != PUBLIC_KEY_BYTES + SECRET_KEY_BYTES {
            return Err(CryptoError::KeystoreLoad {
                path: path.display().to_string(),
                reason: format!(
                    "expected {} bytes, found {}",
                    PUBLIC_KEY_BYTES + SECRET_KEY_BYTES,
                    bytes.len()
                ),
            });
        }
        let public_key = KemPublicKey::from_bytes(&bytes[..PUBLIC_KEY_BYTES])?;
        let secret_key = KemSecretKey::from_bytes(&bytes[PUBLIC_KEY_BYTES..])?;
        Ok(KemKeyPair::from_parts(public_key, secret_key))
    }

    fn write_keystore(path: &Path, keypair: &KemKeyPair) -> Result<(), CryptoError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CryptoError::KeystoreSave {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        }

        let mut bytes = Vec::with_capacity(PUBLIC_KEY_BYTES + SECRET_KEY_BYTES);
        bytes.extend_from_slice(keypair.public_key().as_bytes());
        bytes.extend_from_slice(keypair.secret_key().as_bytes());

        fs::write(path, &bytes).map_err(|e| CryptoError::KeystoreSave {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            if let Err(e) = fs::set_permissions(path, perms) {
                warn!(path = %path.display(), error = %e, "failed to restrict keystore file permissions");
            }
        }

        Ok(())
    }

    /// Return the path this keypair was loaded from or persisted to.
    pub fn keystore_path(&self) -> &Path {
        &self.keystore_path
    }

    /// Return the relay's public key bytes.
    pub fn public_key_bytes(&self) -> &[u8; PUBLIC_KEY_BYTES] {
        self.keypair.public_key().as_bytes()
    }

    /// Return the relay's fingerprint: the first 8 bytes of
    /// `sha256(public_key)`, hex-encoded.
    pub fn public_key_fingerprint(&self) -> String {
        public_key_fingerprint(self.keypair.public_key().as_bytes())
    }

    /// Return the relay's stable identifier, `"relay-" || fingerprint`.
    pub fn relay_id(&self) -> String {
        relay_id(self.keypair.public_key().as_bytes())
    }

    /// Decapsulate a ciphertext addressed to this relay's public key.
    pub fn decapsulate(&self, ciphertext_bytes: &[u8]) -> Result<SharedSecret, CryptoError> {
        if ciphertext_bytes.len() != CIPHERTEXT_BYTES {
            return Err(CryptoError::InvalidLength {
                field: "hello/create_circuit ciphertext",
                expected: CIPHERTEXT_BYTES,
                got: ciphertext_bytes.len(),
            });
        }
        let ciphertext = KemCiphertext::from_bytes(ciphertext_bytes)?;
        self.keypair.decapsulate(&ciphertext)
    }
}

// `KemSecretKey` already zeroizes on drop; dropping `keypair` here wipes
// the secret key material from memory when the relay shuts down.
impl Drop for KeyManager {
    fn drop(&mut self) {
        tracing::debug!("wiping relay identity secret key from memory");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_and_reloads_a_stable_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.key");

        let first = KeyManager::load_or_generate(&path).unwrap();
        let first_id = first.relay_id();
        drop(first);

        let second = KeyManager::load_or_generate(&path).unwrap();
        assert_eq!(second.relay_id(), first_id);
    }

    #[test]
    fn corrupt_keystore_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.key");
        fs::write(&path, b"not a keypair").unwrap();

        let err = KeyManager::load_or_generate(&path).unwrap_err();
        assert!(matches!(err, CryptoError::KeystoreLoad { .. }));
    }

    #[test]
    fn fingerprint_has_sixteen_hex_characters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.key");
        let mgr = KeyManager::load_or_generate(&path).unwrap();
        assert_eq!(mgr.public_key_fingerprint().len(), 16);
        assert_eq!(mgr.relay_id(), format!("relay-{}", mgr.public_key_fingerprint()));
    }
}
