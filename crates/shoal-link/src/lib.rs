//! Gateway link for Shoal: the protocol wrapper between a raw transport
//! and chat semantics.
//!
//! The link owns three things the rest of the stack must never touch
//! directly:
//!
//! 1. **The connection state machine** — `Closed → Opening → SocketOpened
//!    → ProxyOpened → ProxyConnected → Opened`, with `Closing` on the way
//!    back down. Only the link's own event handling mutates the state.
//! 2. **Keep-alive** — a ping timer and a heartbeat timer, armed once per
//!    `ProxyConnected` entry and cancelled on any transition out of the
//!    active states. Both are self-rescheduling: fire, send, reschedule
//!    from now.
//! 3. **The handshake wait** — a 500 ms cooperative poll bridging the gap
//!    between the socket opening and the gateway finishing its own
//!    negotiation with the upstream IRC server. Credentials sent before
//!    that point are silently lost by the gateway, so the wait is
//!    mandatory, not an optimization.
//!
//! # Concurrency
//!
//! The link runs as a single actor task; every mutation happens inside
//! its `select!` loop, so no lock guards the state machine. Callers talk
//! to it through a cheap [`LinkHandle`] and hear back through
//! [`LinkListener`] callbacks invoked from the actor task.

mod actor;
mod error;
mod listener;

pub use actor::{spawn_link, LinkConfig, LinkHandle};
pub use error::LinkError;
pub use listener::{Disconnect, LinkListener};
