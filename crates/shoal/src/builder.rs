//! `ClientBuilder`: ties the layers together.
//!
//! transport → link → chat. The builder spawns the link actor and
//! attaches a [`ChatClient`] to it, so it must run inside a Tokio
//! runtime.

use std::sync::Arc;

use shoal_chat::{ChatClient, ChatConfig};
use shoal_link::{spawn_link, LinkConfig};
use shoal_transport::{Transport, WebSocketTransport};

use crate::ShoalError;

/// Builder for a connected-ready [`ChatClient`].
///
/// # Example
///
/// ```rust,no_run
/// use shoal::ClientBuilder;
///
/// # async fn run() -> Result<(), shoal::ShoalError> {
/// let client =
///     ClientBuilder::new("wss://gateway.example/chat", "irc.example.net")
///         .port(6667)
///         .ssl(false)
///         .build()?;
/// client.connect("caffe", "", "#reef").await?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    link: LinkConfig,
    chat: ChatConfig,
}

impl ClientBuilder {
    /// A builder for the given gateway URL and upstream IRC server.
    /// Defaults: port 6697, TLS on, concurrent sessions enabled.
    pub fn new(url: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            link: LinkConfig::new(url),
            chat: ChatConfig::new(hostname),
        }
    }

    /// Upstream IRC server port.
    pub fn port(mut self, port: u16) -> Self {
        self.chat.port = port;
        self
    }

    /// Whether the gateway should use TLS towards the IRC server.
    pub fn ssl(mut self, ssl: bool) -> Self {
        self.chat.ssl = ssl;
        self
    }

    /// Build identifier reported to the gateway.
    pub fn client_info(mut self, info: impl Into<String>) -> Self {
        self.link.client_info = info.into();
        self
    }

    /// Enables or disables silent nickname-collision recovery.
    pub fn concurrent_sessions(mut self, enabled: bool) -> Self {
        self.chat.concurrent_sessions = enabled;
        self
    }

    /// Accepted for API parity; see [`ChatConfig::attempt_reconnect`].
    pub fn attempt_reconnect(mut self, enabled: bool) -> Self {
        self.chat.attempt_reconnect = enabled;
        self
    }

    /// Builds the client over the default WebSocket transport.
    pub fn build(self) -> Result<Arc<ChatClient>, ShoalError> {
        self.build_with(WebSocketTransport::new())
    }

    /// Builds the client over a custom transport (e.g. the in-memory
    /// loopback for tests).
    pub fn build_with<T: Transport>(
        self,
        transport: T,
    ) -> Result<Arc<ChatClient>, ShoalError> {
        let link = spawn_link(transport, self.link);
        Ok(ChatClient::attach(&link, self.chat)?)
    }
}
