//! Error types for Roomcast.

use thiserror::Error;

/// Common error type for Roomcast.
///
/// The per-command variants render as the text that follows `"Err: "` in the
/// reply a command author sees.
#[derive(Error, Debug)]
pub enum RoomError {
    /// Join with a name that is already present in the room.
    #[error("name already taken: {0}")]
    NameTaken(String),

    /// Command or leave referencing a name that is not joined.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// `/ignore` on a name that is already ignored.
    #[error("user already ignored: {0}")]
    AlreadyIgnored(String),

    /// `/unignore` on a name that is not ignored.
    #[error("user not ignored: {0}")]
    NotIgnored(String),

    /// `/ignore` targeting the author.
    #[error("cannot ignore self")]
    CannotIgnoreSelf,

    /// Unrecognized slash-command.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// A command was invoked without a required argument.
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    /// Chat input longer than the configured limit.
    #[error("message too long (max {0} characters)")]
    MessageTooLong(usize),

    /// Empty or over-long name.
    #[error("invalid name")]
    InvalidName,

    /// Send or join after the room was closed.
    #[error("room closed")]
    RoomClosed,

    /// `serve` called while another serve loop owns the room.
    #[error("room is already being served")]
    AlreadyServing,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for Roomcast operations.
pub type Result<T> = std::result::Result<T, RoomError>;
