use thiserror::Error;

use tallow_relay_crypto::CryptoError;

/// Errors from the onion handshake state machine (§4.3).
///
/// These never carry enough detail to distinguish a key-agreement
/// failure from a malformed payload on the wire: both collapse to
/// `HANDSHAKE_FAILED` or a silent drop, per §4.10.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("hello payload too short")]
    HelloTooShort,
    #[error("a session has already been negotiated on this connection")]
    AlreadyAuthenticated,
    #[error("client must complete HELLO before this operation")]
    NotAuthenticated,
    #[error("client has reached its circuit limit")]
    TooManyCircuits,
    #[error("extend payload is malformed")]
    InvalidExtendPayload,
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Errors from [`crate::circuit::CircuitTable`] operations.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum CircuitError {
    #[error("no circuit with that id")]
    NotFound,
    #[error("a circuit with that id already exists")]
    AlreadyExists,
}
