//! Roomcast - message routing and room state for a shell-reachable chat room.
//!
//! Connections join a [`Room`], forward their input lines to it, and drain
//! their [`Member`] mailbox into a screen. The room routes every event through
//! one serve loop so all members see a consistent order.

pub mod chat;
pub mod config;
pub mod error;
pub mod logging;

pub use chat::{
    parse_input, ChatCommand, ChatInput, CommandInvocation, Identity, Member, Message,
    MessageKind, Room, Screen, UserConfig, NEWLINE,
};
pub use config::Config;
pub use error::{Result, RoomError};
