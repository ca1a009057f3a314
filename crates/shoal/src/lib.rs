//! # Shoal
//!
//! A chat client stack for IRC networks reached through a proxying
//! gateway. Shoal owns the wire protocol (status-digit framing, the
//! connection state machine, keep-alive), and exposes chat semantics
//! (channels, user tables, roles, collision recovery) through a single
//! [`ChatClient`](shoal_chat::ChatClient).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shoal::prelude::*;
//!
//! # async fn run() -> Result<(), shoal::ShoalError> {
//! shoal::init_tracing();
//!
//! let client =
//!     ClientBuilder::new("wss://gateway.example/chat", "irc.example.net")
//!         .build()?;
//! client.connect("caffe", "", "#reef").await?;
//! # Ok(())
//! # }
//! ```
//!
//! Register a [`ChatListener`](shoal_chat::ChatListener) on the client
//! to receive events; all callbacks arrive in wire order.

mod builder;
mod error;

pub use builder::ClientBuilder;
pub use error::ShoalError;

/// Installs a process-wide `tracing` subscriber honoring `RUST_LOG`,
/// defaulting to `info`. Safe to call more than once; later calls are
/// no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub mod prelude {
    //! Everything an application needs to talk to a gateway.

    pub use crate::{ClientBuilder, ShoalError};
    pub use shoal_chat::{
        ChannelEvent, ChannelEventKind, ChannelMode, ChannelModeSet,
        ChatClient, ChatConfig, ChatListener, MessageEvent, MessageKind,
        ModeAction, ModeChange, ModeEvent, Role, RoleSet, StatusOptions,
        StatusSet, TopicEvent, UserRecord, UserStatus, UserlistEvent,
    };
    pub use shoal_link::{Disconnect, LinkConfig, LinkHandle};
    pub use shoal_protocol::ConnectionState;
}
