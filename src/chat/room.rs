//! Chat room implementation for Roomcast.
//!
//! All membership state lives on a single serve loop. Every operation that
//! reads or changes membership (join, leave, routing, commands) is sent to
//! that loop over one FIFO intake queue, so the member map needs no lock and
//! events reach each member in the order they were accepted.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::command::{parse_input, ChatCommand, ChatInput, CommandInvocation};
use super::identity::{fold_name, Identity, UserConfig};
use super::member::{self, Delivery, Member, MemberSlot, Screen};
use super::message::{Message, MessageKind};
use crate::config::RoomConfig;
use crate::{Result, RoomError};

/// Work item for the serve loop.
enum Envelope {
    Message(Message),
    Command(CommandInvocation),
    Join {
        slot: MemberSlot,
        reply: oneshot::Sender<Result<()>>,
    },
    Leave {
        name: String,
        reply: oneshot::Sender<Result<()>>,
    },
    SetConfig {
        name: String,
        config: UserConfig,
        reply: oneshot::Sender<Result<()>>,
    },
    Names {
        reply: oneshot::Sender<Vec<String>>,
    },
}

struct Shared {
    config: RoomConfig,
    intake: mpsc::Sender<Envelope>,
    /// Receiving end of the intake queue, taken by the first `serve` call.
    backlog: Mutex<Option<mpsc::Receiver<Envelope>>>,
    shutdown: CancellationToken,
}

/// A chat room.
///
/// Cloning yields another handle to the same room. Nothing is routed until
/// [`Room::serve`] is running.
#[derive(Clone)]
pub struct Room {
    shared: Arc<Shared>,
}

impl Room {
    /// Create a new room.
    pub fn new(config: RoomConfig) -> Self {
        let (intake, backlog) = mpsc::channel(config.intake_capacity.max(1));
        Self {
            shared: Arc::new(Shared {
                config,
                intake,
                backlog: Mutex::new(Some(backlog)),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Run the serve loop until the room is closed.
    ///
    /// Only one serve loop may run per room.
    pub async fn serve(&self) -> Result<()> {
        let mut backlog = self
            .shared
            .backlog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(RoomError::AlreadyServing)?;

        let mut state = RoomState::new(self.shared.config.clone());
        info!("room serving");

        loop {
            tokio::select! {
                biased;
                _ = self.shared.shutdown.cancelled() => break,
                envelope = backlog.recv() => match envelope {
                    Some(envelope) => state.process(envelope),
                    None => break,
                },
            }
        }

        backlog.close();
        info!(members = state.members.len(), "room closed");
        // Dropping the state closes every mailbox.
        drop(state);
        Ok(())
    }

    /// Close the room. Pending and future calls fail with `RoomClosed`.
    pub fn close(&self) {
        if !self.shared.shutdown.is_cancelled() {
            debug!("closing room");
            self.shared.shutdown.cancel();
        }
    }

    /// Whether the room has been closed.
    pub fn is_closed(&self) -> bool {
        self.shared.shutdown.is_cancelled()
    }

    /// Join the room with default settings.
    pub async fn join<S: Screen>(&self, identity: Identity, screen: S) -> Result<Member<S>> {
        self.join_with_config(identity, UserConfig::default(), screen)
            .await
    }

    /// Join the room.
    ///
    /// On success every member, the new one included, receives
    /// `"<name> joined. (Connected: <count>)"`.
    pub async fn join_with_config<S: Screen>(
        &self,
        identity: Identity,
        config: UserConfig,
        screen: S,
    ) -> Result<Member<S>> {
        if identity.name().chars().count() > self.shared.config.max_name_length {
            return Err(RoomError::InvalidName);
        }

        let capacity = self.shared.config.mailbox_capacity.max(1);
        let (slot, member) = member::pair(identity, config, capacity, screen);
        self.request(|reply| Envelope::Join { slot, reply }).await??;
        Ok(member)
    }

    /// Remove a member and announce the departure to the rest.
    pub async fn leave(&self, name: &str) -> Result<()> {
        let name = name.to_string();
        self.request(|reply| Envelope::Leave { name, reply }).await?
    }

    /// Replace a member's delivery settings.
    pub async fn set_config(&self, name: &str, config: UserConfig) -> Result<()> {
        let name = name.to_string();
        self.request(|reply| Envelope::SetConfig {
            name,
            config,
            reply,
        })
        .await?
    }

    /// Names of the joined members, sorted case-insensitively.
    pub async fn names(&self) -> Result<Vec<String>> {
        self.request(|reply| Envelope::Names { reply }).await
    }

    /// Queue a message for routing.
    pub async fn send(&self, message: Message) -> Result<()> {
        self.enqueue(Envelope::Message(message)).await
    }

    /// Queue parsed input: messages are routed, commands are executed.
    pub async fn dispatch(&self, input: ChatInput) -> Result<()> {
        match input {
            ChatInput::Message(message) => self.send(message).await,
            ChatInput::Command(invocation) => self.enqueue(Envelope::Command(invocation)).await,
        }
    }

    /// Parse a raw input line from `author` and dispatch it. Blank lines are ignored.
    pub async fn send_input(&self, author: &str, input: &str) -> Result<()> {
        match parse_input(input, author) {
            Some(input) => self.dispatch(input).await,
            None => Ok(()),
        }
    }

    async fn enqueue(&self, envelope: Envelope) -> Result<()> {
        if self.is_closed() {
            return Err(RoomError::RoomClosed);
        }
        tokio::select! {
            _ = self.shared.shutdown.cancelled() => Err(RoomError::RoomClosed),
            sent = self.shared.intake.send(envelope) => sent.map_err(|_| RoomError::RoomClosed),
        }
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Envelope) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.enqueue(build(reply)).await?;
        tokio::select! {
            _ = self.shared.shutdown.cancelled() => Err(RoomError::RoomClosed),
            value = response => value.map_err(|_| RoomError::RoomClosed),
        }
    }
}

impl Default for Room {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}

/// Whether `member` should receive `message`.
fn wants(member: &MemberSlot, message: &Message) -> bool {
    let is = |name: &str| fold_name(name) == member.identity.key();
    match message.kind() {
        MessageKind::Announce { .. } => !member.config.quiet,
        MessageKind::Public { from, .. } | MessageKind::Emote { from, .. } => {
            !member.identity.is_ignoring(from)
        }
        MessageKind::Private { from, to, .. } => is(from) || is(to),
        MessageKind::System { to, .. } | MessageKind::CommandError { to, .. } => is(to),
    }
}

/// Membership owned by the serve loop.
struct RoomState {
    config: RoomConfig,
    /// Members keyed by folded name.
    members: HashMap<String, MemberSlot>,
}

impl RoomState {
    fn new(config: RoomConfig) -> Self {
        Self {
            config,
            members: HashMap::new(),
        }
    }

    fn process(&mut self, envelope: Envelope) {
        match envelope {
            Envelope::Message(message) => match self.check_length(&message) {
                Ok(()) => self.handle_msg(&message),
                Err(err) => {
                    if let Some(author) = message.from() {
                        debug!(
                            %author,
                            sent_at = %message.timestamp(),
                            error = %err,
                            "message rejected"
                        );
                        self.handle_msg(&Message::command_error(&err, author));
                    }
                }
            },
            Envelope::Command(invocation) => self.execute(invocation),
            Envelope::Join { slot, reply } => {
                let _ = reply.send(self.join(slot));
            }
            Envelope::Leave { name, reply } => {
                let _ = reply.send(self.leave(&name));
            }
            Envelope::SetConfig {
                name,
                config,
                reply,
            } => {
                let result = self.member_mut(&name).map(|member| member.config = config);
                let _ = reply.send(result);
            }
            Envelope::Names { reply } => {
                let _ = reply.send(self.names());
            }
        }
    }

    fn check_length(&self, message: &Message) -> Result<()> {
        let max = self.config.max_message_length;
        if message.from().is_some() && message.body().chars().count() > max {
            return Err(RoomError::MessageTooLong(max));
        }
        Ok(())
    }

    fn join(&mut self, slot: MemberSlot) -> Result<()> {
        let key = slot.identity.key();
        let name = slot.identity.name().to_string();
        if self.members.contains_key(&key) {
            return Err(RoomError::NameTaken(name));
        }

        self.members.insert(key, slot);
        let connected = self.members.len();
        info!(member = %name, connected, "member joined");
        self.handle_msg(&Message::announce(format!(
            "{name} joined. (Connected: {connected})"
        )));
        Ok(())
    }

    fn leave(&mut self, name: &str) -> Result<()> {
        let slot = self
            .members
            .remove(&fold_name(name))
            .ok_or_else(|| RoomError::UserNotFound(name.to_string()))?;
        info!(member = %slot.identity.name(), "member left");
        self.announce_departure(&slot);
        Ok(())
    }

    fn announce_departure(&mut self, slot: &MemberSlot) {
        self.handle_msg(&Message::announce(format!("{} left.", slot.identity.name())));
    }

    /// Route a message to every member entitled to it.
    ///
    /// Members found disconnected are removed and their departures announced.
    /// Evictions are processed from a queue so a mass disconnect never nests.
    fn handle_msg(&mut self, message: &Message) {
        let mut evicted: VecDeque<MemberSlot> = VecDeque::new();
        self.route(message, &mut evicted);

        while let Some(slot) = evicted.pop_front() {
            warn!(member = %slot.identity.name(), "member disconnected, evicting");
            let notice = Message::announce(format!("{} left.", slot.identity.name()));
            self.route(&notice, &mut evicted);
        }
    }

    /// Deliver one message and move disconnected members into `evicted`.
    fn route(&mut self, message: &Message, evicted: &mut VecDeque<MemberSlot>) {
        let mut disconnected = Vec::new();

        for (key, member) in &self.members {
            if !wants(member, message) {
                continue;
            }
            match member.deliver(message.render(member.identity.name())) {
                Delivery::Queued => {}
                Delivery::Dropped => {
                    warn!(member = %member.identity.name(), "mailbox full, dropping line");
                }
                Delivery::Disconnected => disconnected.push(key.clone()),
            }
        }

        evicted.extend(
            disconnected
                .into_iter()
                .filter_map(|key| self.members.remove(&key)),
        );
    }

    fn member_mut(&mut self, name: &str) -> Result<&mut MemberSlot> {
        self.members
            .get_mut(&fold_name(name))
            .ok_or_else(|| RoomError::UserNotFound(name.to_string()))
    }

    /// Resolve a name to the spelling it joined with.
    fn resolve(&self, name: &str) -> Result<String> {
        self.members
            .get(&fold_name(name))
            .map(|member| member.identity.name().to_string())
            .ok_or_else(|| RoomError::UserNotFound(name.to_string()))
    }

    fn names(&self) -> Vec<String> {
        let mut entries: Vec<_> = self.members.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
            .into_iter()
            .map(|(_, member)| member.identity.name().to_string())
            .collect()
    }

    /// Execute a command; the reply goes to the author only.
    fn execute(&mut self, invocation: CommandInvocation) {
        let CommandInvocation { author, command } = invocation;
        debug!(%author, %command, "executing command");

        let reply = match self.run_command(&author, command) {
            Ok(reply) => reply,
            Err(err) => {
                debug!(%author, error = %err, "command failed");
                Message::command_error(&err, &author)
            }
        };
        self.handle_msg(&reply);
    }

    fn run_command(&mut self, author: &str, command: ChatCommand) -> Result<Message> {
        let text = match command {
            ChatCommand::Ignore(None) => {
                let ignored = self.member_mut(author)?.identity.ignored();
                if ignored.is_empty() {
                    "0 users ignored.".to_string()
                } else {
                    format!("{} ignored: {}", ignored.len(), ignored.join(", "))
                }
            }
            ChatCommand::Ignore(Some(name)) => {
                let target = self.resolve(&name)?;
                self.member_mut(author)?.identity.ignore(&target)?;
                format!("Ignoring: {target}")
            }
            ChatCommand::Unignore(None) => return Err(RoomError::MissingArgument("user")),
            ChatCommand::Unignore(Some(name)) => {
                self.member_mut(author)?.identity.unignore(&name)?;
                format!("No longer ignoring: {name}")
            }
            ChatCommand::Quiet => {
                let quiet = self.member_mut(author)?.config.toggle_quiet();
                format!("Quiet mode is toggled {}", if quiet { "ON" } else { "OFF" })
            }
            ChatCommand::Names => {
                let names = self.names();
                format!("{} connected: {}", names.len(), names.join(", "))
            }
            ChatCommand::Msg { to, body } => {
                let to = to.ok_or(RoomError::MissingArgument("user"))?;
                if body.is_empty() {
                    return Err(RoomError::MissingArgument("message"));
                }
                let from = self.resolve(author)?;
                let to = self.resolve(&to)?;
                let message = Message::private(body, from, to);
                self.check_length(&message)?;
                return Ok(message);
            }
        };
        Ok(Message::system(text, author))
    }
}
