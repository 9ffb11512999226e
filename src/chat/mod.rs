//! Chat module for Roomcast.
//!
//! This module provides the room core:
//! - Messages and their per-member rendering
//! - Identities with ignore lists, and per-user quiet mode
//! - Members with bounded mailboxes draining into a screen
//! - The room serve loop (join/leave, routing, commands)
//! - Chat input parsing (/ignore, /unignore, /quiet, /names, /msg, /me)

mod command;
mod identity;
mod member;
mod message;
mod room;

pub use command::{parse_input, ChatCommand, ChatInput, CommandInvocation};
pub use identity::{fold_name, Identity, UserConfig};
pub use member::{Member, Screen};
pub use message::{Message, MessageKind, NEWLINE};
pub use room::Room;
