//! The chat listener trait and its event payloads.

use std::collections::BTreeMap;

use shoal_link::Disconnect;

use crate::user::UserRecord;

/// A channel topic announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicEvent {
    pub channel: String,
    pub topic: String,
}

/// A completed channel user list, keyed by sanitized nickname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserlistEvent {
    pub channel: String,
    pub users: BTreeMap<String, UserRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEventKind {
    Join,
    Leave,
    Kick,
}

/// Someone joined, left, or was kicked from a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEvent {
    pub channel: String,
    /// The affected nickname: the kicked user for kicks, the actor
    /// otherwise.
    pub nickname: String,
    pub identity: String,
    pub kind: ChannelEventKind,
}

/// One `+x`/`-x` change within a mode event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeChange {
    pub mode: String,
    pub param: Option<String>,
}

/// A mode change on a channel or user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeEvent {
    pub target: String,
    /// Nickname of the user who set the modes.
    pub nickname: String,
    pub modes: Vec<ModeChange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Privmsg,
    Action,
    Notice,
}

/// A chat message, emote, or notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    pub identity: String,
    pub nickname: String,
    pub target: String,
    pub message: String,
    pub kind: MessageKind,
}

/// Receives chat events. All methods default to no-ops so listeners
/// override only what they care about.
///
/// Callbacks run synchronously on the link's event order. They may
/// call back into [`ChatClient`](crate::ChatClient) operations, but
/// must not register listeners from inside a callback.
pub trait ChatListener: Send + Sync {
    /// The first successful connection of this client.
    fn on_connect(&self) {}

    /// A successful connection after an earlier one ended.
    fn on_reconnect(&self) {}

    /// The connection ended. Terminal: no automatic retry follows.
    fn on_disconnect(&self, _notice: &Disconnect) {}

    fn on_topic(&self, _event: &TopicEvent) {}

    /// A channel's user list finished arriving.
    fn on_userlist(&self, _event: &UserlistEvent) {}

    // Own channel membership changes...
    fn on_join(&self, _event: &ChannelEvent) {}
    fn on_leave(&self, _event: &ChannelEvent) {}
    fn on_kick(&self, _event: &ChannelEvent) {}

    // ...and everyone else's, kept apart so the UI never re-derives
    // "was that me".
    fn on_other_user_join(&self, _event: &ChannelEvent) {}
    fn on_other_user_leave(&self, _event: &ChannelEvent) {}
    fn on_other_user_kick(&self, _event: &ChannelEvent) {}

    /// A mode change affecting this client's identity.
    fn on_mode(&self, _event: &ModeEvent) {}

    /// A mode change set by someone else.
    fn on_other_user_mode(&self, _event: &ModeEvent) {}

    fn on_message(&self, _event: &MessageEvent) {}

    /// The server refused the connection outright.
    fn on_access_denied(&self) {}

    /// This client is banned from the named channel.
    fn on_banned(&self, _channel: &str) {}

    /// This client was kicked from (or refused by) the named channel.
    fn on_kicked(&self, _channel: &str) {}

    /// An unmapped server error.
    fn on_error(&self, _reason: &str) {}
}
