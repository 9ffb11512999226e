//! Chat messages and their rendering.
//!
//! A [`Message`] is immutable once built. Rendering is a pure function of the
//! message and the name of the member it is rendered for.

use chrono::{DateTime, Utc};

use super::identity::fold_name;
use crate::RoomError;

/// Line terminator appended to every rendered line.
pub const NEWLINE: &str = "\r\n";

/// Body of a chat message, one variant per kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    /// Room-wide low-priority notice (join/leave). Muted by quiet mode.
    Announce { body: String },
    /// Notice addressed to one member.
    System { body: String, to: String },
    /// Direct message between two members.
    Private { body: String, from: String, to: String },
    /// Regular chat line.
    Public { body: String, from: String },
    /// Action message (e.g., "/me yawns").
    Emote { body: String, from: String },
    /// Command failure, visible only to the command author.
    CommandError { body: String, to: String },
}

/// A chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    kind: MessageKind,
    timestamp: DateTime<Utc>,
}

impl Message {
    fn new(kind: MessageKind) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
        }
    }

    /// Create an announcement.
    pub fn announce(body: impl Into<String>) -> Self {
        Self::new(MessageKind::Announce { body: body.into() })
    }

    /// Create a system message for a single member.
    pub fn system(body: impl Into<String>, to: impl Into<String>) -> Self {
        Self::new(MessageKind::System {
            body: body.into(),
            to: to.into(),
        })
    }

    /// Create a private message.
    pub fn private(
        body: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self::new(MessageKind::Private {
            body: body.into(),
            from: from.into(),
            to: to.into(),
        })
    }

    /// Create a public chat message.
    pub fn public(body: impl Into<String>, from: impl Into<String>) -> Self {
        Self::new(MessageKind::Public {
            body: body.into(),
            from: from.into(),
        })
    }

    /// Create an emote.
    pub fn emote(body: impl Into<String>, from: impl Into<String>) -> Self {
        Self::new(MessageKind::Emote {
            body: body.into(),
            from: from.into(),
        })
    }

    /// Create a command error reply for `to`.
    pub fn command_error(err: &RoomError, to: impl Into<String>) -> Self {
        Self::new(MessageKind::CommandError {
            body: format!("Err: {err}"),
            to: to.into(),
        })
    }

    /// The message kind and payload.
    pub fn kind(&self) -> &MessageKind {
        &self.kind
    }

    /// When the message was built.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Message body without any framing.
    pub fn body(&self) -> &str {
        match &self.kind {
            MessageKind::Announce { body }
            | MessageKind::System { body, .. }
            | MessageKind::Private { body, .. }
            | MessageKind::Public { body, .. }
            | MessageKind::Emote { body, .. }
            | MessageKind::CommandError { body, .. } => body,
        }
    }

    /// Name of the authoring member, if any.
    pub fn from(&self) -> Option<&str> {
        match &self.kind {
            MessageKind::Private { from, .. }
            | MessageKind::Public { from, .. }
            | MessageKind::Emote { from, .. } => Some(from),
            MessageKind::Announce { .. }
            | MessageKind::System { .. }
            | MessageKind::CommandError { .. } => None,
        }
    }

    /// Name of the single direct recipient, if the message is addressed.
    pub fn recipient(&self) -> Option<&str> {
        match &self.kind {
            MessageKind::System { to, .. }
            | MessageKind::Private { to, .. }
            | MessageKind::CommandError { to, .. } => Some(to),
            MessageKind::Announce { .. }
            | MessageKind::Public { .. }
            | MessageKind::Emote { .. } => None,
        }
    }

    /// Render the message as a terminated line for the member named `perspective`.
    pub fn render(&self, perspective: &str) -> String {
        let text = match &self.kind {
            MessageKind::Private { body, from, to }
                if fold_name(from) == fold_name(perspective) =>
            {
                format!("[PM to {to}] {body}")
            }
            _ => self.to_string(),
        };
        text + NEWLINE
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            MessageKind::Announce { body } => write!(f, " * {body}"),
            MessageKind::System { body, .. } => write!(f, "-> {body}"),
            MessageKind::Private { body, from, .. } => write!(f, "[PM from {from}] {body}"),
            MessageKind::Public { body, from } => write!(f, "{from}: {body}"),
            MessageKind::Emote { body, from } => write!(f, "** {from} {body}"),
            MessageKind::CommandError { body, .. } => write!(f, "-> {body}"),
        }
    }
}
