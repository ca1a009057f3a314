//! The chat client: chat semantics over a gateway link.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use serde_json::{json, Value};

use shoal_events::Dispatcher;
use shoal_link::{Disconnect, LinkHandle, LinkListener};
use shoal_protocol::{AuthParams, ConnectionInfo, ConnectionState};

use crate::error::ChatError;
use crate::listener::{
    ChannelEvent, ChannelEventKind, ChatListener, MessageEvent, MessageKind,
    ModeChange, ModeEvent, TopicEvent, UserlistEvent,
};
use crate::names::{increment_nickname, PrefixMap};
use crate::roles::{ChannelModeSet, ModeAction, StatusSet};
use crate::user::UserRecord;

/// Events the chat dispatcher will deliver.
const CHAT_EVENTS: &[&str] = &[
    "connect",
    "reconnect",
    "disconnect",
    "topic",
    "userlist",
    "join",
    "leave",
    "kick",
    "otherUserJoin",
    "otherUserLeave",
    "otherUserKick",
    "mode",
    "otherUserMode",
    "message",
    "accessDenied",
    "banned",
    "kicked",
    "error",
];

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Chat client configuration.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Upstream IRC server the gateway should connect to.
    pub hostname: String,
    /// Upstream IRC server port.
    pub port: u16,
    /// Whether the gateway should use TLS towards the IRC server.
    pub ssl: bool,
    /// Whether extra sessions of one identity are consolidated. When
    /// set, a nickname collision is recovered silently by retrying
    /// with an incremented nickname.
    pub concurrent_sessions: bool,
    /// Accepted for API parity; no automatic retry is performed.
    /// Callers must treat a disconnect as terminal and re-invoke
    /// [`ChatClient::connect`] themselves.
    pub attempt_reconnect: bool,
}

impl ChatConfig {
    /// Config for the given IRC server with defaults: port 6697, TLS
    /// on, concurrent sessions enabled.
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            port: 6697,
            ssl: true,
            concurrent_sessions: true,
            attempt_reconnect: false,
        }
    }
}

/// Extra arguments for [`ChatClient::set_user_status`].
#[derive(Debug, Clone, Default)]
pub struct StatusOptions {
    /// For timed statuses: how long the status should hold.
    pub duration_secs: Option<u64>,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ChatState {
    /// Own current nickname; collision recovery rewrites it.
    nickname: String,
    /// Own gateway identity, adopted from the requested nickname.
    identity: String,
    autojoin: Option<String>,
    autojoin_done: bool,
    connected_before: bool,
    prefix_map: PrefixMap,
    /// Raw user-list entries accumulating until the end-of-list marker.
    pending: HashMap<String, BTreeMap<String, UserRecord>>,
    /// Completed per-channel user tables.
    channels: HashMap<String, BTreeMap<String, UserRecord>>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A chat client bound to one gateway link.
///
/// Construct with [`ChatClient::attach`], which registers the client
/// as the link's listener. All mutable state lives behind one mutex
/// and is only touched from the link's event order, so handlers never
/// contend; the lock exists for the read-side snapshot accessors.
pub struct ChatClient {
    link: LinkHandle,
    config: ChatConfig,
    state: Mutex<ChatState>,
    listeners: RwLock<Dispatcher<dyn ChatListener>>,
}

impl ChatClient {
    /// Builds a client over the given link and subscribes it to the
    /// link's events.
    pub fn attach(
        link: &LinkHandle,
        config: ChatConfig,
    ) -> Result<Arc<Self>, ChatError> {
        let client = Arc::new(Self {
            link: link.clone(),
            config,
            state: Mutex::new(ChatState::default()),
            listeners: RwLock::new(Dispatcher::new(CHAT_EVENTS)),
        });
        link.register(client.clone())?;
        Ok(client)
    }

    /// Registers a listener for chat events.
    pub fn register(&self, listener: Arc<dyn ChatListener>) {
        match self.listeners.write() {
            Ok(mut guard) => guard.register(listener),
            Err(poisoned) => poisoned.into_inner().register(listener),
        }
    }

    fn emit(&self, event: &str, invoke: impl Fn(&(dyn ChatListener + 'static))) {
        match self.listeners.read() {
            Ok(guard) => guard.dispatch(event, &invoke),
            Err(poisoned) => poisoned.into_inner().dispatch(event, &invoke),
        }
    }

    fn state(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -- operations --------------------------------------------------------

    /// Connects to the configured server as `nick` and marks `channel`
    /// for autojoin once the connection is up.
    pub async fn connect(
        &self,
        nick: &str,
        password: &str,
        channel: &str,
    ) -> Result<(), ChatError> {
        let auth = AuthParams {
            nickname: nick.to_string(),
            hostname: self.config.hostname.clone(),
            port: self.config.port,
            ssl: self.config.ssl,
            password: password.to_string(),
            channel: Some(channel.to_string()),
        };
        let state = self.link.open(auth).await?;
        if matches!(state, ConnectionState::Closed | ConnectionState::Opening)
        {
            let mut st = self.state();
            st.nickname = nick.to_string();
            st.identity = nick.to_string();
            st.autojoin = Some(channel.to_string());
            st.autojoin_done = false;
        }
        Ok(())
    }

    /// Closes the connection with an optional quit message.
    pub fn disconnect(&self, message: Option<&str>) -> Result<(), ChatError> {
        self.link.close(message.map(String::from))?;
        Ok(())
    }

    pub fn join(&self, channel: &str) -> Result<(), ChatError> {
        self.link.irc("join", json!({ "channel": channel }))?;
        Ok(())
    }

    pub fn leave(
        &self,
        channel: &str,
        message: Option<&str>,
    ) -> Result<(), ChatError> {
        self.link.irc(
            "part",
            json!({ "channel": channel, "message": message.unwrap_or_default() }),
        )?;
        Ok(())
    }

    /// Sends a message to a channel or nickname.
    pub fn send(&self, target: &str, message: &str) -> Result<(), ChatError> {
        self.link
            .irc("privmsg", json!({ "target": target, "msg": message }))?;
        Ok(())
    }

    /// Sends an emote (`/me`) to a channel or nickname.
    pub fn emote(&self, target: &str, message: &str) -> Result<(), ChatError> {
        self.link
            .irc("action", json!({ "target": target, "msg": message }))?;
        Ok(())
    }

    /// Requests a nickname change and adopts it locally.
    pub fn set_nickname(&self, nickname: &str) -> Result<(), ChatError> {
        self.state().nickname = nickname.to_string();
        self.link.irc("nick", json!({ "nick": nickname }))?;
        Ok(())
    }

    /// Applies or lifts moderation statuses on a user in a channel.
    pub fn set_user_status(
        &self,
        channel: &str,
        identity: &str,
        status: StatusSet,
        action: ModeAction,
        options: &StatusOptions,
    ) -> Result<(), ChatError> {
        let sign = action.sign();
        let modes: Vec<Value> = status
            .iter()
            .filter_map(|s| s.mode_letter())
            .map(|letter| {
                json!({ "mode": format!("{sign}{letter}"), "param": identity })
            })
            .collect();
        let mut data = json!({ "target": channel, "modes": modes });
        if let Some(secs) = options.duration_secs {
            data["duration"] = secs.into();
        }
        self.link.irc("mode", data)?;
        Ok(())
    }

    /// Applies or lifts channel-wide modes.
    pub fn set_channel_mode(
        &self,
        channel: &str,
        modes: ChannelModeSet,
        action: ModeAction,
    ) -> Result<(), ChatError> {
        let sign = action.sign();
        let modes: Vec<Value> = modes
            .iter()
            .map(|mode| json!({ "mode": format!("{sign}{}", mode.letter()) }))
            .collect();
        self.link
            .irc("mode", json!({ "target": channel, "modes": modes }))?;
        Ok(())
    }

    // -- snapshots ---------------------------------------------------------

    /// Own current nickname.
    pub fn nickname(&self) -> String {
        self.state().nickname.clone()
    }

    /// Own identity string.
    pub fn identity(&self) -> String {
        self.state().identity.clone()
    }

    /// The last completed user table for a channel, if any.
    pub fn users(&self, channel: &str) -> Option<BTreeMap<String, UserRecord>> {
        self.state().channels.get(channel).cloned()
    }

    /// Current link connection state.
    pub async fn connection_state(
        &self,
    ) -> Result<ConnectionState, ChatError> {
        Ok(self.link.state().await?)
    }

    /// The underlying link handle.
    pub fn link(&self) -> &LinkHandle {
        &self.link
    }

    // -- relayed event handling --------------------------------------------

    fn handle_options(&self, data: &Value) {
        let Some(entries) = data["prefix"].as_array() else {
            return;
        };
        let map: Vec<(char, char)> = entries
            .iter()
            .filter_map(|entry| {
                let symbol =
                    entry["symbol"].as_str().and_then(|s| s.chars().next())?;
                let mode =
                    entry["mode"].as_str().and_then(|s| s.chars().next())?;
                Some((symbol, mode))
            })
            .collect();
        if !map.is_empty() {
            tracing::debug!(prefixes = map.len(), "prefix map learned");
            self.state().prefix_map = PrefixMap::new(map);
        }
    }

    /// Accumulates one user-list page. Nothing is dispatched until the
    /// end-of-list marker.
    fn handle_userlist(&self, data: &Value) {
        let Some(channel) = data["channel"].as_str() else {
            return;
        };
        let Some(users) = data["users"].as_array() else {
            return;
        };

        let mut st = self.state();
        let prefix_map = st.prefix_map.clone();
        let table = st.pending.entry(channel.to_string()).or_default();
        for entry in users {
            let raw = match entry {
                Value::String(s) => s.as_str(),
                Value::Object(_) => match entry["nick"].as_str() {
                    Some(s) => s,
                    None => continue,
                },
                _ => continue,
            };
            let parsed = prefix_map.parse(raw);
            match table.get_mut(&parsed.key) {
                Some(record) => record.add_nickname(&parsed.nickname),
                None => {
                    let record = UserRecord::new(parsed.key.clone(), &parsed);
                    table.insert(parsed.key.clone(), record);
                }
            }
        }
    }

    /// End-of-list marker: the accumulated entries become the
    /// channel's table, replacing the previous one wholesale.
    fn handle_userlist_end(&self, data: &Value) {
        let Some(channel) = data["channel"].as_str() else {
            return;
        };
        let users = {
            let mut st = self.state();
            let users = st.pending.remove(channel).unwrap_or_default();
            st.channels.insert(channel.to_string(), users.clone());
            users
        };
        let event = UserlistEvent {
            channel: channel.to_string(),
            users,
        };
        self.emit("userlist", |l| l.on_userlist(&event));
    }

    fn handle_channel(&self, data: &Value) {
        let Some(channel) = data["channel"].as_str() else {
            return;
        };
        let kind = match data["type"].as_str() {
            Some("join") => ChannelEventKind::Join,
            Some("kick") => ChannelEventKind::Kick,
            Some("part" | "leave") => ChannelEventKind::Leave,
            other => {
                tracing::trace!(?other, "unhandled channel event type");
                return;
            }
        };
        // Kicks attribute the event to the kicked user, not the actor.
        let nickname = if kind == ChannelEventKind::Kick {
            data["kicked"].as_str()
        } else {
            data["nick"].as_str()
        };
        let Some(nickname) = nickname else {
            return;
        };
        let identity = data["ident"].as_str().unwrap_or_default();

        let mine = {
            let mut st = self.state();
            let parsed = st.prefix_map.parse(nickname);
            match kind {
                ChannelEventKind::Join => {
                    let record_identity = if identity.is_empty() {
                        parsed.key.clone()
                    } else {
                        identity.to_string()
                    };
                    let table =
                        st.channels.entry(channel.to_string()).or_default();
                    match table.get_mut(&parsed.key) {
                        Some(record) => record.add_nickname(&parsed.nickname),
                        None => {
                            let record =
                                UserRecord::new(record_identity, &parsed);
                            table.insert(parsed.key.clone(), record);
                        }
                    }
                }
                ChannelEventKind::Leave | ChannelEventKind::Kick => {
                    if let Some(table) = st.channels.get_mut(channel) {
                        if let Some(record) = table.get_mut(&parsed.key) {
                            if record.remove_nickname(&parsed.nickname) {
                                table.remove(&parsed.key);
                            }
                        }
                    }
                }
            }
            // Membership events are "mine" by nickname: other sessions
            // of this identity carry different nicknames.
            let mine = nickname == st.nickname;
            if kind == ChannelEventKind::Join
                && identity == st.identity
                && st.autojoin.as_deref() == Some(channel)
            {
                st.autojoin_done = true;
            }
            mine
        };

        let event = ChannelEvent {
            channel: channel.to_string(),
            nickname: nickname.to_string(),
            identity: identity.to_string(),
            kind,
        };
        match (mine, kind) {
            (true, ChannelEventKind::Join) => {
                self.emit("join", |l| l.on_join(&event));
            }
            (true, ChannelEventKind::Leave) => {
                self.emit("leave", |l| l.on_leave(&event));
            }
            (true, ChannelEventKind::Kick) => {
                self.emit("kick", |l| l.on_kick(&event));
            }
            (false, ChannelEventKind::Join) => {
                self.emit("otherUserJoin", |l| l.on_other_user_join(&event));
            }
            (false, ChannelEventKind::Leave) => {
                self.emit("otherUserLeave", |l| l.on_other_user_leave(&event));
            }
            (false, ChannelEventKind::Kick) => {
                self.emit("otherUserKick", |l| l.on_other_user_kick(&event));
            }
        }
    }

    fn handle_mode(&self, data: &Value) {
        let target = data["target"].as_str().unwrap_or_default();
        let nickname = data["nick"].as_str().unwrap_or_default();
        let modes: Vec<ModeChange> = data["modes"]
            .as_array()
            .map(|list| {
                list.iter()
                    .filter_map(|m| {
                        Some(ModeChange {
                            mode: m["mode"].as_str()?.to_string(),
                            param: m["param"].as_str().map(String::from),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        // Mode events are "mine" by identity, unlike membership events
        // which compare nicknames. Both behaviors are load-bearing for
        // the UI and are kept as is.
        let mine = nickname == self.state().identity;
        let event = ModeEvent {
            target: target.to_string(),
            nickname: nickname.to_string(),
            modes,
        };
        if mine {
            self.emit("mode", |l| l.on_mode(&event));
        } else {
            self.emit("otherUserMode", |l| l.on_other_user_mode(&event));
        }
    }

    fn handle_message(&self, data: &Value, kind: MessageKind) {
        let event = MessageEvent {
            identity: data["ident"].as_str().unwrap_or_default().to_string(),
            nickname: data["nick"].as_str().unwrap_or_default().to_string(),
            target: data["target"].as_str().unwrap_or_default().to_string(),
            message: data["msg"].as_str().unwrap_or_default().to_string(),
            kind,
        };
        self.emit("message", |l| l.on_message(&event));
    }

    fn handle_topic(&self, data: &Value) {
        let event = TopicEvent {
            channel: data["channel"].as_str().unwrap_or_default().to_string(),
            topic: data["topic"].as_str().unwrap_or_default().to_string(),
        };
        self.emit("topic", |l| l.on_topic(&event));
    }

    /// A quit affects every channel the user occupied; it is normalized
    /// into one synthetic leave per channel so the table maintenance
    /// has a single shrink path.
    fn handle_quit(&self, data: &Value) {
        let Some(nickname) = data["nick"].as_str() else {
            return;
        };

        let (mine, affected) = {
            let mut st = self.state();
            let parsed = st.prefix_map.parse(nickname);
            let mine = nickname == st.nickname;
            let mut affected = Vec::new();
            for (channel, table) in st.channels.iter_mut() {
                let Some(record) = table.get_mut(&parsed.key) else {
                    continue;
                };
                let identity = record.identity.clone();
                if record.remove_nickname(&parsed.nickname) {
                    table.remove(&parsed.key);
                }
                affected.push((channel.clone(), identity));
            }
            (mine, affected)
        };

        for (channel, identity) in affected {
            let event = ChannelEvent {
                channel,
                nickname: nickname.to_string(),
                identity,
                kind: ChannelEventKind::Leave,
            };
            if mine {
                self.emit("leave", |l| l.on_leave(&event));
            } else {
                self.emit("otherUserLeave", |l| l.on_other_user_leave(&event));
            }
        }
    }

    fn handle_error(&self, data: &Value) {
        let code = data["error"].as_str().unwrap_or_default();
        let reason = data["reason"].as_str().unwrap_or(code).to_string();
        let channel =
            data["channel"].as_str().unwrap_or_default().to_string();

        match code {
            "nickname_in_use" if self.config.concurrent_sessions => {
                // Silent recovery: retry with an incremented nickname,
                // no user-visible event.
                let next = {
                    let mut st = self.state();
                    let next = increment_nickname(&st.nickname);
                    st.nickname = next.clone();
                    next
                };
                tracing::info!(nickname = %next, "nickname collision, retrying");
                if let Err(e) = self.link.irc("nick", json!({ "nick": next }))
                {
                    tracing::warn!(error = %e, "nick retry failed");
                }
            }
            "cannot_send_to_channel" => {
                self.emit("kicked", |l| l.on_kicked(&channel));
            }
            "banned_from_channel" => {
                self.emit("banned", |l| l.on_banned(&channel));
            }
            "error" if reason.contains("Access denied") => {
                self.emit("accessDenied", |l| l.on_access_denied());
            }
            _ => {
                tracing::debug!(code, reason = %reason, "unmapped server error");
                self.emit("error", |l| l.on_error(&reason));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Link events
// ---------------------------------------------------------------------------

impl LinkListener for ChatClient {
    fn on_connect(&self, _info: &ConnectionInfo) {
        let (reconnect, autojoin) = {
            let mut st = self.state();
            let reconnect = st.connected_before;
            st.connected_before = true;
            (reconnect, st.autojoin.clone())
        };

        if let Some(channel) = autojoin {
            if let Err(e) = self.join(&channel) {
                tracing::warn!(error = %e, channel = %channel, "autojoin failed");
            }
        }

        if reconnect {
            self.emit("reconnect", |l| l.on_reconnect());
        } else {
            self.emit("connect", |l| l.on_connect());
        }
    }

    fn on_disconnect(&self, notice: &Disconnect) {
        {
            let mut st = self.state();
            st.channels.clear();
            st.pending.clear();
            st.autojoin_done = false;
        }
        self.emit("disconnect", |l| l.on_disconnect(notice));
    }

    fn on_irc(&self, command: &str, data: &Value) {
        match command {
            "options" => self.handle_options(data),
            "userlist" => self.handle_userlist(data),
            "userlist_end" => self.handle_userlist_end(data),
            "channel" => self.handle_channel(data),
            "mode" => self.handle_mode(data),
            "privmsg" | "message" => {
                self.handle_message(data, MessageKind::Privmsg);
            }
            "action" => self.handle_message(data, MessageKind::Action),
            "notice" => self.handle_message(data, MessageKind::Notice),
            "topic" => self.handle_topic(data),
            "quit" => self.handle_quit(data),
            "irc_error" => self.handle_error(data),
            _ => {
                tracing::trace!(command, "unhandled relay event");
            }
        }
    }
}
