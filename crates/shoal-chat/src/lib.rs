//! Chat-domain layer for Shoal.
//!
//! [`ChatClient`] sits on top of a gateway link and turns relayed IRC
//! events into chat semantics: the current nickname and identity, an
//! autojoin channel, per-channel user tables with roles and statuses,
//! nickname-collision recovery, and a mapped error policy. The UI layer
//! talks to this crate only; it never sees wire frames.
//!
//! Multiple concurrent sessions of one user collapse to one table row:
//! the gateway appends `_<n>` suffixes to extra sessions' nicknames,
//! and the sanitized (suffix-stripped) nickname is the user key.

mod client;
mod error;
mod listener;
mod names;
mod roles;
mod user;

pub use client::{ChatClient, ChatConfig, StatusOptions};
pub use error::ChatError;
pub use listener::{
    ChannelEvent, ChannelEventKind, ChatListener, MessageEvent, MessageKind,
    ModeChange, ModeEvent, TopicEvent, UserlistEvent,
};
pub use names::{increment_nickname, sanitize_nickname, ParsedNick, PrefixMap};
pub use roles::{
    ChannelMode, ChannelModeSet, ModeAction, Role, RoleSet, StatusSet,
    UserStatus,
};
pub use user::UserRecord;
