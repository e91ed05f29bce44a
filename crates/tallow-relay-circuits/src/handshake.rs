//! Pure protocol logic for the onion handshake (§4.3): HELLO key
//! agreement, CREATE_CIRCUIT, the EXTEND_CIRCUIT payload codec, and the
//! RELAY_DATA layer-peeling helpers.
//!
//! Nothing here performs network I/O. Dialling the next hop and driving
//! the WebSocket connections is the relay server's job; this module only
//! knows how to turn bytes into keys and keys into bytes.

use rand::Rng;

use tallow_relay_crypto::{
    derive_circuit_key, derive_session_key, open, seal, KemPublicKey, KeyManager,
    CIPHERTEXT_BYTES, PUBLIC_KEY_BYTES,
};

use crate::err::HandshakeError;

/// The single version byte this relay speaks.
pub const HELLO_VERSION: u8 = 1;

/// Status byte used in `CIRCUIT_CREATED` and `CIRCUIT_EXTENDED` bodies.
pub const STATUS_OK: u8 = 0x01;

/// Result of a successful HELLO exchange.
pub struct HelloOutcome {
    /// `version || ciphertext`, to be sent back to the client verbatim.
    pub response_bytes: Vec<u8>,
    pub session_key: [u8; 32],
}

impl std::fmt::Debug for HelloOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HelloOutcome")
            .field("response_bytes", &self.response_bytes)
            .field("session_key", &"<redacted>")
            .finish()
    }
}

/// Process a client's HELLO: `version:u8 || hybrid_public_key`.
///
/// The client's public key is an ephemeral ML-KEM-768 encapsulation key
/// generated fresh for this connection; the relay encapsulates to it so
/// both sides land on the same `session_key` without either side ever
/// transmitting key material the other didn't already have a public half of.
pub fn process_hello(hello_payload: &[u8]) -> Result<HelloOutcome, HandshakeError> {
    if hello_payload.len() < 1 + PUBLIC_KEY_BYTES {
        return Err(HandshakeError::HelloTooShort);
    }
    let client_public_key = KemPublicKey::from_bytes(&hello_payload[1..1 + PUBLIC_KEY_BYTES])?;
    let (ciphertext, shared_secret) = client_public_key.encapsulate()?;
    let session_key = derive_session_key(&shared_secret);

    let mut response_bytes = Vec::with_capacity(1 + CIPHERTEXT_BYTES);
    response_bytes.push(HELLO_VERSION);
    response_bytes.extend_from_slice(ciphertext.as_bytes());

    Ok(HelloOutcome {
        response_bytes,
        session_key,
    })
}

/// Result of a successful CREATE_CIRCUIT.
pub struct CreateCircuitOutcome {
    pub circuit_id: String,
    pub circuit_key: [u8; 32],
}

/// Process a CREATE_CIRCUIT: the client's ciphertext is addressed to this
/// relay's long-lived identity key, so decapsulation goes through the
/// [`KeyManager`] rather than an ephemeral keypair.
pub fn process_create_circuit(
    key_manager: &KeyManager,
    ciphertext_bytes: &[u8],
    requested_circuit_id: Option<String>,
) -> Result<CreateCircuitOutcome, HandshakeError> {
    let shared_secret = key_manager.decapsulate(ciphertext_bytes)?;
    let circuit_id = requested_circuit_id.unwrap_or_else(generate_circuit_id);
    let circuit_key = derive_circuit_key(&shared_secret, &circuit_id);
    Ok(CreateCircuitOutcome {
        circuit_id,
        circuit_key,
    })
}

/// Generate a fresh server-side circuit id: 16 random bytes, hex-encoded
/// to the 32-character form required by the wire contract.
pub fn generate_circuit_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

/// The plaintext carried inside an EXTEND_CIRCUIT payload.
pub struct ExtendRequest {
    pub next_hop_address: String,
    pub next_hop_ciphertext: Vec<u8>,
}

/// Open an EXTEND_CIRCUIT payload (sealed under the circuit key) and parse
/// its `next_hop_address || 0x00 || next_hop_ciphertext` plaintext.
pub fn open_extend_payload(circuit_key: &[u8; 32], sealed: &[u8]) -> Result<ExtendRequest, HandshakeError> {
    let plaintext = open(circuit_key, sealed)?;
    let separator = plaintext
        .iter()
        .position(|&b| b == 0x00)
        .ok_or(HandshakeError::InvalidExtendPayload)?;

    let next_hop_address = String::from_utf8(plaintext[..separator].to_vec())
        .map_err(|_| HandshakeError::InvalidExtendPayload)?;
    let next_hop_ciphertext = plaintext[separator + 1..].to_vec();
    if next_hop_ciphertext.len() != CIPHERTEXT_BYTES {
        return Err(HandshakeError::InvalidExtendPayload);
    }

    Ok(ExtendRequest {
        next_hop_address,
        next_hop_ciphertext,
    })
}

/// Build the sealed `CIRCUIT_EXTENDED` response: status byte sealed under
/// the circuit key, then sealed again under the session key.
pub fn seal_circuit_extended(circuit_key: &[u8; 32], session_key: &[u8; 32]) -> Result<Vec<u8>, HandshakeError> {
    let inner = seal(circuit_key, &[STATUS_OK])?;
    let outer = seal(session_key, &inner)?;
    Ok(outer)
}

/// Peel one layer of a RELAY_DATA frame under the circuit key.
///
/// Returns `None` on any decryption failure. Per §4.3 and §4.10 this must
/// never be surfaced to the client as a distinguishable error: a bad
/// decryption and an unknown circuit id must look identical on the wire.
pub fn open_relay_data(circuit_key: &[u8; 32], sealed: &[u8]) -> Option<Vec<u8>> {
    open(circuit_key, sealed).ok()
}

/// Seal a plaintext payload for RELAY_DATA forwarding under the circuit key.
pub fn seal_relay_data(circuit_key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>, HandshakeError> {
    Ok(seal(circuit_key, plaintext)?)
}

/// Seal a HEARTBEAT_ACK body under the session key.
pub fn seal_heartbeat_ack(session_key: &[u8; 32]) -> Result<Vec<u8>, HandshakeError> {
    Ok(seal(session_key, &[STATUS_OK])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tallow_relay_crypto::KemKeyPair;

    #[test]
    fn hello_round_trip_derives_matching_session_keys() {
        let client_keypair = KemKeyPair::generate();
        let mut hello = vec![HELLO_VERSION];
        hello.extend_from_slice(client_keypair.public_key().as_bytes());

        let outcome = process_hello(&hello).unwrap();
        assert_eq!(outcome.response_bytes[0], HELLO_VERSION);

        let ciphertext_bytes = &outcome.response_bytes[1..];
        let ciphertext = tallow_relay_crypto::KemCiphertext::from_bytes(ciphertext_bytes).unwrap();
        let client_shared_secret = client_keypair.decapsulate(&ciphertext).unwrap();
        let client_session_key = derive_session_key(&client_shared_secret);

        assert_eq!(client_session_key, outcome.session_key);
    }

    #[test]
    fn hello_too_short_is_rejected() {
        let err = process_hello(&[HELLO_VERSION]).unwrap_err();
        assert!(matches!(err, HandshakeError::HelloTooShort));
    }

    #[test]
    fn create_circuit_generates_a_32_char_hex_id_when_none_requested() {
        let dir = tempfile::tempdir().unwrap();
        let key_manager = KeyManager::load_or_generate(dir.path().join("relay.key")).unwrap();

        let (ciphertext, _secret) = KemPublicKey::from_bytes(key_manager.public_key_bytes())
            .unwrap()
            .encapsulate()
            .unwrap();

        let outcome = process_create_circuit(&key_manager, ciphertext.as_bytes(), None).unwrap();
        assert_eq!(outcome.circuit_id.len(), 32);
        assert!(outcome.circuit_id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn create_circuit_honors_a_client_proposed_id() {
        let dir = tempfile::tempdir().unwrap();
        let key_manager = KeyManager::load_or_generate(dir.path().join("relay.key")).unwrap();
        let (ciphertext, _secret) = KemPublicKey::from_bytes(key_manager.public_key_bytes())
            .unwrap()
            .encapsulate()
            .unwrap();

        let outcome =
            process_create_circuit(&key_manager, ciphertext.as_bytes(), Some("c".repeat(32))).unwrap();
        assert_eq!(outcome.circuit_id, "c".repeat(32));
    }

    #[test]
    fn extend_payload_round_trips() {
        let circuit_key = [5u8; 32];
        let next_hop_keypair = KemKeyPair::generate();
        let (next_hop_ct, _) = next_hop_keypair.public_key().encapsulate().unwrap();

        let mut plaintext = b"wss://relay-b.example:9443".to_vec();
        plaintext.push(0x00);
        plaintext.extend_from_slice(next_hop_ct.as_bytes());
        let sealed = seal(&circuit_key, &plaintext).unwrap();

        let request = open_extend_payload(&circuit_key, &sealed).unwrap();
        assert_eq!(request.next_hop_address, "wss://relay-b.example:9443");
        assert_eq!(request.next_hop_ciphertext, next_hop_ct.as_bytes());
    }

    #[test]
    fn relay_data_tamper_is_a_silent_none_not_an_error() {
        let circuit_key = [7u8; 32];
        let mut sealed = seal_relay_data(&circuit_key, b"payload").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xFF;
        assert!(open_relay_data(&circuit_key, &sealed).is_none());
    }
}
