//! The link's listener trait and event payloads.

use serde_json::Value;
use shoal_protocol::ConnectionInfo;

/// Why and how a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disconnect {
    /// Human-readable close reason.
    pub reason: String,
    /// `true` unless this side initiated the close.
    pub closed_by_server: bool,
    /// Whether the connection had fully reached `Opened`.
    pub existing_connection: bool,
}

/// Receives link events. All methods default to no-ops so listeners
/// override only what they care about.
///
/// Methods are invoked synchronously from the link actor task, in frame
/// order — a later frame is never delivered before an earlier one
/// finishes.
pub trait LinkListener: Send + Sync {
    /// The gateway confirmed its session (`Open` frame received).
    fn on_open(&self, _info: &ConnectionInfo) {}

    /// The upstream IRC connection is up; `info.connection_id` is set.
    fn on_connect(&self, _info: &ConnectionInfo) {}

    /// The connection ended. Emitted exactly once per connection.
    fn on_disconnect(&self, _notice: &Disconnect) {}

    /// A relayed IRC event: lower-cased command plus its data payload.
    fn on_irc(&self, _command: &str, _data: &Value) {}
}
