//! Room members.
//!
//! Joining splits a member into two halves connected by a bounded mailbox:
//! the room keeps a [`MemberSlot`] (identity, config, sending end) on its serve
//! loop, and the connection gets a [`Member`] that drains rendered lines into
//! its [`Screen`].

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

use super::identity::{Identity, UserConfig};
use crate::Result;

/// Output sink for a member's rendered lines.
///
/// Any async writer works: `write` receives whole lines and `shutdown`
/// closes the screen once the mailbox is closed.
pub trait Screen: AsyncWrite + Unpin + Send {}

impl<T: AsyncWrite + Unpin + Send + ?Sized> Screen for T {}

/// Outcome of offering a line to a mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    Queued,
    /// Mailbox full; the line was dropped.
    Dropped,
    /// The connection side is gone.
    Disconnected,
}

/// Room-side state of a joined member.
#[derive(Debug)]
pub(crate) struct MemberSlot {
    pub identity: Identity,
    pub config: UserConfig,
    mailbox: mpsc::Sender<String>,
}

impl MemberSlot {
    /// Queue a rendered line without waiting.
    pub fn deliver(&self, line: String) -> Delivery {
        match self.mailbox.try_send(line) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(_)) => Delivery::Dropped,
            Err(TrySendError::Closed(_)) => Delivery::Disconnected,
        }
    }
}

/// Connection-side handle of a joined member.
pub struct Member<S> {
    name: String,
    mailbox: mpsc::Receiver<String>,
    screen: S,
}

/// Build both halves of a member with a mailbox of `capacity` lines.
pub(crate) fn pair<S>(
    identity: Identity,
    config: UserConfig,
    capacity: usize,
    screen: S,
) -> (MemberSlot, Member<S>) {
    let (tx, rx) = mpsc::channel(capacity);
    let member = Member {
        name: identity.name().to_string(),
        mailbox: rx,
        screen,
    };
    let slot = MemberSlot {
        identity,
        config,
        mailbox: tx,
    };
    (slot, member)
}

impl<S: Screen> Member<S> {
    /// Name the member joined with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether lines are waiting in the mailbox.
    pub fn has_messages(&self) -> bool {
        !self.mailbox.is_empty()
    }

    /// Wait for the next rendered line. Returns `None` once the member has
    /// left or the room has closed and the mailbox is drained.
    pub async fn recv(&mut self) -> Option<String> {
        self.mailbox.recv().await
    }

    /// Take the next rendered line if one is waiting.
    pub fn try_recv(&mut self) -> Option<String> {
        self.mailbox.try_recv().ok()
    }

    /// Drain the mailbox into the screen until the mailbox closes, then close
    /// the screen.
    pub async fn deliver(mut self) -> Result<()> {
        while let Some(line) = self.mailbox.recv().await {
            self.screen.write_all(line.as_bytes()).await?;
            self.screen.flush().await?;
        }
        debug!(member = %self.name, "mailbox closed, closing screen");
        self.screen.shutdown().await?;
        Ok(())
    }
}
