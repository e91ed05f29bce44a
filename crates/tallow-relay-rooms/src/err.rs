use thiserror::Error;

/// Errors surfaced by [`crate::room::RoomManager`].
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum RoomError {
    #[error("no room exists for that code")]
    RoomNotFound,
    #[error("room already has two peers")]
    RoomFull,
    #[error("room has expired")]
    RoomExpired,
    #[error("maximum number of concurrent rooms reached")]
    MaxRoomsReached,
    #[error("could not generate a unique room code after {attempts} attempts")]
    CodeGenerationFailed { attempts: u32 },
}
