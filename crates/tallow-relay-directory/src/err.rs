use thiserror::Error;

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum DirectoryError {
    #[error("registration rejected: {reason}")]
    InvalidRegistration { reason: String },
    #[error("no relay with that id")]
    NotFound,
}

#[derive(Debug, Error)]
pub enum DirectoryClientError {
    #[error("transport error talking to directory: {0}")]
    Transport(String),
    #[error("directory returned HTTP {0}")]
    Http(u16),
    #[error("failed to decode directory response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for DirectoryClientError {
    fn from(err: reqwest::Error) -> Self {
        DirectoryClientError::Transport(err.to_string())
    }
}
