//! Chat input parser for Roomcast.
//!
//! Turns a raw input line into either a [`Message`] ready for routing or a
//! [`CommandInvocation`] that the room executes on its serve loop.

use super::message::Message;
use crate::RoomError;

/// Emote body used when `/me` is given no text.
const EMPTY_EMOTE: &str = "is at a loss for words.";

/// Result of parsing a chat input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    /// Message to route as-is (chat, emote, or an author-only error).
    Message(Message),
    /// Command that mutates room or user state.
    Command(CommandInvocation),
}

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// List ignored names, or ignore the given name.
    Ignore(Option<String>),
    /// Stop ignoring a name.
    Unignore(Option<String>),
    /// Toggle quiet mode.
    Quiet,
    /// List joined names.
    Names,
    /// Send a private message.
    Msg { to: Option<String>, body: String },
}

impl ChatCommand {
    /// Get the command name.
    pub fn name(&self) -> &'static str {
        match self {
            ChatCommand::Ignore(_) => "ignore",
            ChatCommand::Unignore(_) => "unignore",
            ChatCommand::Quiet => "quiet",
            ChatCommand::Names => "names",
            ChatCommand::Msg { .. } => "msg",
        }
    }
}

impl std::fmt::Display for ChatCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatCommand::Ignore(Some(name)) => write!(f, "/ignore {name}"),
            ChatCommand::Unignore(Some(name)) => write!(f, "/unignore {name}"),
            ChatCommand::Msg { to: Some(to), body } => write!(f, "/msg {to} {body}"),
            cmd => write!(f, "/{}", cmd.name()),
        }
    }
}

/// A command together with the name of the member who issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    /// Name of the issuing member.
    pub author: String,
    /// The command.
    pub command: ChatCommand,
}

/// Split off the first whitespace-delimited word; the rest is returned trimmed.
fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(pos) => (&s[..pos], s[pos..].trim()),
        None => (s, ""),
    }
}

fn optional_word(s: &str) -> Option<String> {
    let (word, _) = split_word(s);
    (!word.is_empty()).then(|| word.to_string())
}

/// Parse a chat input line from `author`.
///
/// Returns `None` for blank input.
pub fn parse_input(input: &str, author: &str) -> Option<ChatInput> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return None;
    }

    let Some(without_slash) = trimmed.strip_prefix('/') else {
        return Some(ChatInput::Message(Message::public(trimmed, author)));
    };

    let (cmd, args) = split_word(without_slash);
    let cmd = cmd.to_lowercase();

    let command = match cmd.as_str() {
        "me" => {
            let body = if args.is_empty() { EMPTY_EMOTE } else { args };
            return Some(ChatInput::Message(Message::emote(body, author)));
        }
        "ignore" => ChatCommand::Ignore(optional_word(args)),
        "unignore" => ChatCommand::Unignore(optional_word(args)),
        "quiet" => ChatCommand::Quiet,
        "names" => ChatCommand::Names,
        "msg" => {
            let (to, body) = split_word(args);
            ChatCommand::Msg {
                to: (!to.is_empty()).then(|| to.to_string()),
                body: body.to_string(),
            }
        }
        _ => {
            let err = RoomError::UnknownCommand(cmd);
            return Some(ChatInput::Message(Message::command_error(&err, author)));
        }
    };

    Some(ChatInput::Command(CommandInvocation {
        author: author.to_string(),
        command,
    }))
}
