use thiserror::Error;

/// Rejected-intent taxonomy. The `Display` text of a variant is what the
/// originating connection receives in an `error_message` event; room state
/// is never mutated on any of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Invalid name. Use 1-20 characters without markup.")]
    InvalidName,

    #[error("Room not found")]
    RoomNotFound,

    #[error("Room is full (max {0} players)")]
    RoomFull(usize),

    #[error("Only the host can do that")]
    NotHost,

    #[error("Only the drawer can do that")]
    NotDrawer,

    #[error("Need at least 2 players to start")]
    NotEnoughPlayers,

    #[error("Invalid word selection")]
    WordNotOffered,

    #[error("That action is not valid right now")]
    WrongPhase,

    #[error("You are not in a room")]
    NotInRoom,

    #[error("Malformed message: {0}")]
    Protocol(String),
}
