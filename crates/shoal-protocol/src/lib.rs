//! Wire protocol for the Shoal gateway link.
//!
//! This crate defines the "language" spoken between the chat client and
//! the proxying gateway:
//!
//! - **Types** ([`MethodCall`], [`OpenPayload`], [`AuthParams`],
//!   [`ConnectionState`], [`ConnectionInfo`]) — the structures that travel
//!   on the wire plus the connection bookkeeping shared by upper layers.
//! - **Framing** ([`Frame`], [`PacketStatus`]) — how a frame is laid out:
//!   one ASCII status digit immediately followed by an optional JSON
//!   document. No length prefix, no checksum.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while framing.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw text frames) and the
//! link (connection state machine). It doesn't know about sockets or
//! timers — it only knows how to shape and parse frames.
//!
//! ```text
//! Transport (text) → Protocol (Frame/MethodCall) → Link (state machine)
//! ```

mod error;
mod frame;
mod types;

pub use error::ProtocolError;
pub use frame::{Frame, PacketStatus};
pub use types::{
    AuthParams, ConnectionInfo, ConnectionState, MethodCall, OpenPayload,
    DEFAULT_PING_INTERVAL_MS, DEFAULT_PING_TIMEOUT_MS,
};
