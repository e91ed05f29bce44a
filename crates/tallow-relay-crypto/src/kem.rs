//! ML-KEM-768 key encapsulation, wrapping the `ml-kem` crate's generic API
//! behind fixed-size byte types so the rest of the relay never touches
//! the underlying lattice types directly.

use ml_kem::{kem::Decapsulate, kem::Encapsulate, Encoded, EncodedSizeUser, KemCore, MlKem768};
use rand_chacha::ChaCha20Rng;
use rand_core::{OsRng, SeedableRng};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::err::CryptoError;

/// ML-KEM-768 public key size in bytes.
pub const PUBLIC_KEY_BYTES: usize = 1184;
/// ML-KEM-768 secret key size in bytes.
pub const SECRET_KEY_BYTES: usize = 2400;
/// ML-KEM-768 ciphertext size in bytes.
pub const CIPHERTEXT_BYTES: usize = 1088;
/// ML-KEM-768 shared secret size in bytes.
pub const SHARED_SECRET_BYTES: usize = 32;

/// An ML-KEM-768 public (encapsulation) key.
#[derive(Clone, PartialEq, Eq)]
pub struct KemPublicKey {
    bytes: [u8; PUBLIC_KEY_BYTES],
}

impl KemPublicKey {
    /// Parse a public key from its raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != PUBLIC_KEY_BYTES {
            return Err(CryptoError::InvalidLength {
                field: "kem public key",
                expected: PUBLIC_KEY_BYTES,
                got: bytes.len(),
            });
        }
        let mut arr = [0u8; PUBLIC_KEY_BYTES];
        arr.copy_from_slice(bytes);
        Ok(Self { bytes: arr })
    }

    /// Return the raw public key bytes.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_BYTES] {
        &self.bytes
    }

    /// Encapsulate a fresh shared secret to this public key, returning the
    /// ciphertext to send to the key's owner and the locally-derived shared
    /// secret.
    pub fn encapsulate(&self) -> Result<(KemCiphertext, SharedSecret), CryptoError> {
        type EkEncoded = Encoded<<MlKem768 as KemCore>::EncapsulationKey>;

        let ek_encoded =
            EkEncoded::try_from(&self.bytes[..]).map_err(|_| CryptoError::InvalidLength {
                field: "kem public key",
                expected: PUBLIC_KEY_BYTES,
                got: self.bytes.len(),
            })?;
        let ek = <MlKem768 as KemCore>::EncapsulationKey::from_bytes(&ek_encoded);

        let mut rng = OsRng;
        let (ct, ss) = ek
            .encapsulate(&mut rng)
            .map_err(|_| CryptoError::DecapsulationFailed)?;

        let mut ct_bytes = [0u8; CIPHERTEXT_BYTES];
        ct_bytes.copy_from_slice(ct.as_slice());
        let mut ss_bytes = [0u8; SHARED_SECRET_BYTES];
        ss_bytes.copy_from_slice(ss.as_slice());

        Ok((
            KemCiphertext { bytes: ct_bytes },
            SharedSecret { bytes: ss_bytes },
        ))
    }
}

impl std::fmt::Debug for KemPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KemPublicKey({:02x?}...)", &self.bytes[..8])
    }
}

/// An ML-KEM-768 secret (decapsulation) key. Zeroed on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KemSecretKey {
    bytes: [u8; SECRET_KEY_BYTES],
}

impl KemSecretKey {
    /// Parse a secret key from its raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != SECRET_KEY_BYTES {
            return Err(CryptoError::InvalidLength {
                field: "kem secret key",
                expected: SECRET_KEY_BYTES,
                got: bytes.len(),
            });
        }
        let mut arr = [0u8; SECRET_KEY_BYTES];
        arr.copy_from_slice(bytes);
        Ok(Self { bytes: arr })
    }

    /// Return the raw secret key bytes. Callers must not log or persist
    /// this value outside of the keystore file.
    pub fn as_bytes(&self) -> &[u8; SECRET_KEY_BYTES] {
        &self.bytes
    }

    /// Decapsulate a ciphertext produced by [`KemPublicKey::encapsulate`]
    /// for the matching public key.
    pub fn decapsulate(&self, ciphertext: &KemCiphertext) -> Result<SharedSecret, CryptoError> {
        type DkEncoded = Encoded<<MlKem768 as KemCore>::DecapsulationKey>;
        type CtEncoded = ml_kem::Ciphertext<MlKem768>;

        let dk_encoded = DkEncoded::try_from(&self.bytes[..]).map_err(|_| CryptoError::InvalidLength {
            field: "kem secret key",
            expected: SECRET_KEY_BYTES,
            got: self.bytes.len(),
        })?;
        let dk = <MlKem768 as KemCore>::DecapsulationKey::from_bytes(&dk_encoded);

        let ct = CtEncoded::try_from(&ciphertext.bytes[..]).map_err(|_| CryptoError::InvalidLength {
            field: "kem ciphertext",
            expected: CIPHERTEXT_BYTES,
            got: ciphertext.bytes.len(),
        })?;

        let ss = dk.decapsulate(&ct).map_err(|_| CryptoError::DecapsulationFailed)?;

        let mut ss_bytes = [0u8; SHARED_SECRET_BYTES];
        ss_bytes.copy_from_slice(ss.as_slice());
        Ok(SharedSecret { bytes: ss_bytes })
    }
}

impl std::fmt::Debug for KemSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KemSecretKey([REDACTED])")
    }
}

/// An ML-KEM-768 ciphertext.
#[derive(Clone, PartialEq, Eq)]
pub struct KemCiphertext {
    bytes: [u8; CIPHERTEXT_BYTES],
}

impl KemCiphertext {
    /// Parse a ciphertext from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != CIPHERTEXT_BYTES {
            return Err(CryptoError::InvalidLength {
                field: "kem ciphertext",
                expected: CIPHERTEXT_BYTES,
                got: bytes.len(),
            });
        }
        let mut arr = [0u8; CIPHERTEXT_BYTES];
        arr.copy_from_slice(bytes);
        Ok(Self { bytes: arr })
    }

    /// Return the raw ciphertext bytes.
    pub fn as_bytes(&self) -> &[u8; CIPHERTEXT_BYTES] {
        &self.bytes
    }
}

impl std::fmt::Debug for KemCiphertext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KemCiphertext({:02x?}...)", &self.bytes[..8])
    }
}

/// A shared secret produced by encapsulation or decapsulation. Zeroed on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret {
    bytes: [u8; SHARED_SECRET_BYTES],
}

impl SharedSecret {
    /// Return the raw shared secret bytes.
    pub fn as_bytes(&self) -> &[u8; SHARED_SECRET_BYTES] {
        &self.bytes
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SharedSecret([REDACTED])")
    }
}

/// An ML-KEM-768 keypair.
#[derive(Clone)]
pub struct KemKeyPair {
    public_key: KemPublicKey,
    secret_key: KemSecretKey,
}

impl KemKeyPair {
    /// Generate a fresh random keypair.
    pub fn generate() -> Self {
        let mut rng = OsRng;
        Self::generate_with_rng(&mut rng)
    }

    /// Generate a keypair deterministically from a 32-byte seed. Used by
    /// tests; relay identities in production always call [`Self::generate`].
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let mut rng = ChaCha20Rng::from_seed(*seed);
        Self::generate_with_rng(&mut rng)
    }

    fn generate_with_rng(rng: &mut impl rand_core::CryptoRngCore) -> Self {
        let (dk, ek) = MlKem768::generate(rng);

        let mut pk_bytes = [0u8; PUBLIC_KEY_BYTES];
        pk_bytes.copy_from_slice(ek.as_bytes().as_slice());
        let mut sk_bytes = [0u8; SECRET_KEY_BYTES];
        sk_bytes.copy_from_slice(dk.as_bytes().as_slice());

        Self {
            public_key: KemPublicKey { bytes: pk_bytes },
            secret_key: KemSecretKey { bytes: sk_bytes },
        }
    }

    /// Reconstruct a keypair from its persisted secret key bytes, by
    /// recomputing the public key is not possible for ML-KEM without the
    /// seed; instead the keystore persists both halves together.
    pub fn from_parts(public_key: KemPublicKey, secret_key: KemSecretKey) -> Self {
        Self { public_key, secret_key }
    }

    /// Return the public key half.
    pub fn public_key(&self) -> &KemPublicKey {
        &self.public_key
    }

    /// Return the secret key half.
    pub fn secret_key(&self) -> &KemSecretKey {
        &self.secret_key
    }

    /// Decapsulate a ciphertext using this keypair's secret key.
    pub fn decapsulate(&self, ciphertext: &KemCiphertext) -> Result<SharedSecret, CryptoError> {
        self.secret_key.decapsulate(ciphertext)
    }
}

impl std::fmt::Debug for KemKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KemKeyPair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encapsulate_then_decapsulate_round_trips() {
        let keypair = KemKeyPair::generate();
        let (ct, ss) = keypair.public_key().encapsulate().unwrap();
        let decapsulated = keypair.decapsulate(&ct).unwrap();
        assert_eq!(ss.as_bytes(), decapsulated.as_bytes());
    }

    #[test]
    fn deterministic_from_seed() {
        let seed = [7u8; 32];
        let a = KemKeyPair::from_seed(&seed);
        let b = KemKeyPair::from_seed(&seed);
        assert_eq!(a.public_key().as_bytes(), b.public_key().as_bytes());
        assert_eq!(a.secret_key().as_bytes(), b.secret_key().as_bytes());
    }

    #[test]
    fn wrong_keypair_decapsulates_to_a_different_secret() {
        let a = KemKeyPair::generate();
        let b = KemKeyPair::generate();
        let (ct, ss) = a.public_key().encapsulate().unwrap();
        let wrong = b.decapsulate(&ct).unwrap();
        assert_ne!(ss.as_bytes(), wrong.as_bytes());
    }

    #[test]
    fn invalid_public_key_length_is_rejected() {
        let err = KemPublicKey::from_bytes(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidLength { .. }));
    }
}
