//! Shared protocol types: method envelopes, handshake payloads, and the
//! connection state machine's vocabulary.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ping interval used until the gateway's `Open` frame supplies one.
pub const DEFAULT_PING_INTERVAL_MS: u64 = 15_000;

/// Heartbeat period used until the gateway's `Open` frame supplies one.
pub const DEFAULT_PING_TIMEOUT_MS: u64 = 60_000;

static NULL: Value = Value::Null;

// ---------------------------------------------------------------------------
// MethodCall — the Message-frame envelope
// ---------------------------------------------------------------------------

/// The JSON envelope inside every `Message` frame.
///
/// `method` is `"<prefix>.<command>"` where the prefix is `kiwi`
/// (gateway-level) or `irc` (a command relayed to/from the upstream IRC
/// connection). For `irc` calls the params are
/// `[connectionId, data, null]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    /// Dotted method name, e.g. `"kiwi.connect_irc"` or `"irc.privmsg"`.
    pub method: String,
    /// Positional arguments.
    #[serde(default)]
    pub params: Vec<Value>,
}

impl MethodCall {
    /// A gateway-level call: `kiwi.<command>` with the given arguments.
    pub fn kiwi(command: &str, params: Vec<Value>) -> Self {
        Self {
            method: format!("kiwi.{command}"),
            params,
        }
    }

    /// A relayed IRC call: `irc.<command>` with
    /// `[connectionId, data, null]` params.
    pub fn irc(connection_id: u64, command: &str, data: Value) -> Self {
        Self {
            method: format!("irc.{command}"),
            params: vec![connection_id.into(), data, Value::Null],
        }
    }

    /// The method prefix (`"kiwi"`, `"irc"`), if any.
    pub fn prefix(&self) -> Option<&str> {
        self.method.split_once('.').map(|(prefix, _)| prefix)
    }

    /// The method command after the prefix, if any.
    pub fn command(&self) -> Option<&str> {
        self.method.split_once('.').map(|(_, command)| command)
    }

    /// The leading connection id of an `irc` call's params.
    pub fn connection_id(&self) -> Option<u64> {
        self.params.first().and_then(Value::as_u64)
    }

    /// The data argument (second param) of an `irc` call.
    pub fn data(&self) -> &Value {
        self.params.get(1).unwrap_or(&NULL)
    }
}

// ---------------------------------------------------------------------------
// Handshake payloads
// ---------------------------------------------------------------------------

/// Payload of the gateway's `Open` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPayload {
    /// Gateway session id.
    pub sid: String,
    /// Requested keep-alive ping period in milliseconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    /// Requested heartbeat period in milliseconds.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
}

fn default_ping_interval() -> u64 {
    DEFAULT_PING_INTERVAL_MS
}

fn default_ping_timeout() -> u64 {
    DEFAULT_PING_TIMEOUT_MS
}

/// Credentials for the upstream IRC connection, consumed by the
/// `kiwi.connect_irc` call.
///
/// Ephemeral by contract: the link takes these by value and drops them
/// the moment the handshake sends them. `Debug` redacts the password so
/// the struct can appear in logs safely.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthParams {
    /// Requested nickname.
    #[serde(rename = "nick")]
    pub nickname: String,
    /// Upstream IRC server hostname.
    pub hostname: String,
    /// Upstream IRC server port.
    pub port: u16,
    /// Whether the gateway should use TLS towards the IRC server.
    pub ssl: bool,
    /// Server password, passed through verbatim.
    pub password: String,
    /// Channel to join once connected, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

impl fmt::Debug for AuthParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthParams")
            .field("nickname", &self.nickname)
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("ssl", &self.ssl)
            .field("password", &"<redacted>")
            .field("channel", &self.channel)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Connection bookkeeping
// ---------------------------------------------------------------------------

/// Details captured incrementally as the handshake progresses.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionInfo {
    /// Gateway session id from the `Open` frame.
    pub session_id: String,
    /// Keep-alive ping period.
    pub ping_interval_ms: u64,
    /// Heartbeat period.
    pub ping_timeout_ms: u64,
    /// Upstream IRC connection id; `0` until the gateway confirms it
    /// with a relayed `irc.connect`.
    pub connection_id: u64,
}

impl Default for ConnectionInfo {
    fn default() -> Self {
        Self {
            session_id: String::new(),
            ping_interval_ms: DEFAULT_PING_INTERVAL_MS,
            ping_timeout_ms: DEFAULT_PING_TIMEOUT_MS,
            connection_id: 0,
        }
    }
}

/// The link's connection state.
///
/// `Closed` and `Opened` are the only stable rest states; everything
/// else is a transient handshake or teardown stage:
///
/// ```text
/// Closed ─open()→ Opening ─socket→ SocketOpened ─Open frame→ ProxyOpened
///    ↑                                                            │
///    │                                              kiwi Message  ▼
///    └──transport closed── Closing ←close()─ Opened ←irc.connect─ ProxyConnected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection. Initial and final state.
    #[default]
    Closed,
    /// `open()` called; waiting for the socket.
    Opening,
    /// Socket is up; upgrade sent, waiting for the gateway.
    SocketOpened,
    /// Gateway session confirmed via the `Open` frame.
    ProxyOpened,
    /// Gateway is talking `kiwi` methods; safe to send credentials.
    ProxyConnected,
    /// Upstream IRC connection confirmed.
    Opened,
    /// Teardown requested by this side.
    Closing,
}

impl ConnectionState {
    /// Whether the connection is past `open()` and not tearing down.
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Closed | Self::Closing)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Closed => "closed",
            Self::Opening => "opening",
            Self::SocketOpened => "socket-opened",
            Self::ProxyOpened => "proxy-opened",
            Self::ProxyConnected => "proxy-connected",
            Self::Opened => "opened",
            Self::Closing => "closing",
        };
        write!(f, "{name}")
    }
}

// =========================================================================
// Tests
// =========================================================================
