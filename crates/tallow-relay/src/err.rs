//! The relay binary's top-level error type. Library crates keep their
//! own concrete error enums; this type collapses them at the process
//! boundary, where `main` reports a fatal startup error and exits 1.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Crypto(#[from] tallow_relay_crypto::CryptoError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
