//! Transport abstraction layer for Shoal.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! the channel carrying gateway frames. The protocol wrapper consumes raw
//! text frames and does not care whether they arrive over a WebSocket or
//! an in-memory loopback.
//!
//! The trait methods return `impl Future + Send` (rather than `async fn`)
//! because the link drives them from spawned tasks, which requires the
//! futures to be provably `Send` for any implementation.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — client WebSocket transport via `tokio-tungstenite`

use std::future::Future;

mod error;
pub mod memory;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use memory::{memory_pair, MemoryConnection, MemoryRemote, MemoryTransport};
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

/// Opens an outbound channel to a gateway.
pub trait Transport: Send + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Opens a connection to the given URL.
    fn open(
        &mut self,
        url: &str,
    ) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send;
}

/// An open connection carrying discrete text frames in both directions.
///
/// Connections are `Clone` so one half can sit in a reader task while the
/// other half sends. Clones share the underlying channel.
pub trait Connection: Clone + Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one text frame to the remote peer.
    fn send(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receives the next text frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send;

    /// Closes the connection.
    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
