//! The link actor: an isolated task that owns the connection.
//!
//! The actor communicates with the outside world through an mpsc command
//! channel (from [`LinkHandle`]) and a signal channel fed by a per-
//! connection reader task. Timers are plain deadline fields; the select
//! loop sleeps until the earliest one.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use shoal_events::Dispatcher;
use shoal_protocol::{
    AuthParams, ConnectionInfo, ConnectionState, Frame, MethodCall,
    OpenPayload, PacketStatus,
};
use shoal_transport::{Connection, Transport};

use crate::{Disconnect, LinkError, LinkListener};

/// Events the link's dispatcher will deliver.
const LINK_EVENTS: &[&str] = &["open", "connect", "disconnect", "irc"];

/// How often the handshake wait re-checks the connection state.
const HANDSHAKE_POLL: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Link configuration.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Gateway URL handed to the transport's `open`.
    pub url: String,
    /// Build identifier reported in the `kiwi.client_info` call.
    pub client_info: String,
    /// Handshake-wait poll period. Default 500 ms.
    pub poll_interval: Duration,
}

impl LinkConfig {
    /// Creates a config for the given gateway URL with defaults.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client_info: concat!("shoal ", env!("CARGO_PKG_VERSION")).into(),
            poll_interval: HANDSHAKE_POLL,
        }
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

pub(crate) enum LinkCommand {
    Register(Arc<dyn LinkListener>),
    Open {
        auth: AuthParams,
        reply: oneshot::Sender<Result<ConnectionState, LinkError>>,
    },
    Irc {
        command: String,
        data: Value,
    },
    Close {
        message: Option<String>,
    },
    State {
        reply: oneshot::Sender<ConnectionState>,
    },
    Info {
        reply: oneshot::Sender<ConnectionInfo>,
    },
}

/// Handle to a running link actor. Cheap to clone.
///
/// The command channel is unbounded so listener callbacks (which run
/// inside other actors' dispatch paths) can issue commands without
/// awaiting.
#[derive(Clone)]
pub struct LinkHandle {
    tx: mpsc::UnboundedSender<LinkCommand>,
}

impl LinkHandle {
    /// Registers a listener for link events.
    pub fn register(
        &self,
        listener: Arc<dyn LinkListener>,
    ) -> Result<(), LinkError> {
        self.tx
            .send(LinkCommand::Register(listener))
            .map_err(|_| LinkError::LinkDown)
    }

    /// Opens a connection with the given credentials.
    ///
    /// Replies as soon as the state machine leaves `Closed`, so the
    /// returned state is normally `Opening`; the rest of the handshake
    /// is reported through listener events.
    pub async fn open(
        &self,
        auth: AuthParams,
    ) -> Result<ConnectionState, LinkError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(LinkCommand::Open { auth, reply })
            .map_err(|_| LinkError::LinkDown)?;
        rx.await.map_err(|_| LinkError::LinkDown)?
    }

    /// Sends a relayed IRC command (`irc.<command>`) upstream.
    pub fn irc(&self, command: &str, data: Value) -> Result<(), LinkError> {
        self.tx
            .send(LinkCommand::Irc {
                command: command.to_string(),
                data,
            })
            .map_err(|_| LinkError::LinkDown)
    }

    /// Closes the connection. Idempotent: repeat calls are no-ops once
    /// the link is closing or closed.
    pub fn close(&self, message: Option<String>) -> Result<(), LinkError> {
        self.tx
            .send(LinkCommand::Close { message })
            .map_err(|_| LinkError::LinkDown)
    }

    /// Current connection state.
    pub async fn state(&self) -> Result<ConnectionState, LinkError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(LinkCommand::State { reply })
            .map_err(|_| LinkError::LinkDown)?;
        rx.await.map_err(|_| LinkError::LinkDown)
    }

    /// Snapshot of the handshake-captured connection info.
    pub async fn info(&self) -> Result<ConnectionInfo, LinkError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(LinkCommand::Info { reply })
            .map_err(|_| LinkError::LinkDown)?;
        rx.await.map_err(|_| LinkError::LinkDown)
    }
}

/// Spawns the link actor task over the given transport.
pub fn spawn_link<T: Transport>(transport: T, config: LinkConfig) -> LinkHandle {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (signal_tx, signal_rx) = mpsc::unbounded_channel();

    let actor = LinkActor {
        transport,
        config,
        state: ConnectionState::Closed,
        info: ConnectionInfo::default(),
        pending_auth: None,
        conn: None,
        had_opened: false,
        generation: 0,
        listeners: Dispatcher::new(LINK_EVENTS),
        cmd_rx,
        signal_tx,
        signal_rx,
        heartbeat_at: None,
        ping_at: None,
        poll_at: None,
    };

    tokio::spawn(actor.run());

    LinkHandle { tx: cmd_tx }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// What the per-connection reader task reports back.
enum TransportSignal {
    Frame(String),
    Closed,
    Error(String),
}

enum Event {
    Cmd(LinkCommand),
    Signal(u64, TransportSignal),
    HeartbeatDue,
    PingDue,
    PollDue,
    Shutdown,
}

struct LinkActor<T: Transport> {
    transport: T,
    config: LinkConfig,
    state: ConnectionState,
    info: ConnectionInfo,
    /// Credentials held only between `open()` and the `connect_irc`
    /// send; never retained past the handshake.
    pending_auth: Option<AuthParams>,
    conn: Option<T::Connection>,
    /// Whether this connection ever reached `Opened`. Feeds the
    /// `existing_connection` flag of the disconnect notice.
    had_opened: bool,
    /// Bumped per `open()`; signals from stale reader tasks are dropped.
    generation: u64,
    listeners: Dispatcher<dyn LinkListener>,
    cmd_rx: mpsc::UnboundedReceiver<LinkCommand>,
    signal_tx: mpsc::UnboundedSender<(u64, TransportSignal)>,
    signal_rx: mpsc::UnboundedReceiver<(u64, TransportSignal)>,
    heartbeat_at: Option<Instant>,
    ping_at: Option<Instant>,
    poll_at: Option<Instant>,
}

/// Sleeps until the deadline, or forever when there is none. The
/// pending arm lets `select!` treat unarmed timers as absent branches.
async fn sleep_opt(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

impl<T: Transport> LinkActor<T> {
    async fn run(mut self) {
        tracing::debug!(url = %self.config.url, "link actor started");

        loop {
            let event = tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(cmd) => Event::Cmd(cmd),
                    None => Event::Shutdown,
                },
                signal = self.signal_rx.recv() => match signal {
                    // The actor holds a sender clone, so recv never
                    // yields None while the actor lives.
                    Some((generation, signal)) => Event::Signal(generation, signal),
                    None => continue,
                },
                _ = sleep_opt(self.heartbeat_at) => Event::HeartbeatDue,
                _ = sleep_opt(self.ping_at) => Event::PingDue,
                _ = sleep_opt(self.poll_at) => Event::PollDue,
            };

            match event {
                Event::Cmd(cmd) => self.handle_command(cmd).await,
                Event::Signal(generation, signal) => {
                    if generation == self.generation {
                        self.handle_signal(signal).await;
                    }
                }
                Event::HeartbeatDue => self.on_heartbeat_due().await,
                Event::PingDue => self.on_ping_due().await,
                Event::PollDue => self.on_poll_due().await,
                Event::Shutdown => break,
            }
        }

        // All handles dropped: tear the connection down quietly.
        if let Some(conn) = self.conn.take() {
            let _ = conn.close().await;
        }
        tracing::debug!("link actor stopped");
    }

    // -- commands ----------------------------------------------------------

    async fn handle_command(&mut self, cmd: LinkCommand) {
        match cmd {
            LinkCommand::Register(listener) => {
                self.listeners.register(listener);
            }
            LinkCommand::Open { auth, reply } => {
                self.handle_open(auth, reply).await;
            }
            LinkCommand::Irc { command, data } => {
                let call =
                    MethodCall::irc(self.info.connection_id, &command, data);
                self.send_message(&call).await;
            }
            LinkCommand::Close { message } => {
                self.handle_close(message).await;
            }
            LinkCommand::State { reply } => {
                let _ = reply.send(self.state);
            }
            LinkCommand::Info { reply } => {
                let _ = reply.send(self.info.clone());
            }
        }
    }

    async fn handle_open(
        &mut self,
        auth: AuthParams,
        reply: oneshot::Sender<Result<ConnectionState, LinkError>>,
    ) {
        if self.state != ConnectionState::Closed {
            let _ = reply.send(Err(LinkError::AlreadyOpen(self.state)));
            return;
        }

        self.state = ConnectionState::Opening;
        self.info = ConnectionInfo::default();
        self.pending_auth = Some(auth);
        self.had_opened = false;
        self.generation += 1;

        // Reply before the socket is up: callers only need to know the
        // state machine accepted the open.
        let _ = reply.send(Ok(self.state));

        match self.transport.open(&self.config.url).await {
            Ok(conn) => {
                self.spawn_reader(conn.clone());
                self.conn = Some(conn);
                self.on_socket_open().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "transport open failed");
                self.pending_auth = None;
                self.finish_close(e.to_string());
            }
        }
    }

    /// Socket is up: request the protocol upgrade and start the
    /// handshake wait.
    async fn on_socket_open(&mut self) {
        self.state = ConnectionState::SocketOpened;
        tracing::debug!(state = %self.state, "socket opened");
        self.send_frame(Frame::bare(PacketStatus::Upgrade)).await;
        self.poll_at = Some(Instant::now() + self.config.poll_interval);
    }

    async fn handle_close(&mut self, message: Option<String>) {
        if matches!(
            self.state,
            ConnectionState::Closed | ConnectionState::Closing
        ) {
            return;
        }

        let quit = MethodCall::irc(
            self.info.connection_id,
            "quit",
            json!({ "message": message.unwrap_or_default() }),
        );
        self.send_message(&quit).await;

        self.state = ConnectionState::Closing;
        self.cancel_timers();
        self.pending_auth = None;

        if let Some(conn) = &self.conn {
            if let Err(e) = conn.close().await {
                tracing::debug!(error = %e, "transport close failed");
            }
        }
        // The disconnect notice is emitted when the reader observes the
        // close, so repeated close() calls cannot double-notify.
    }

    // -- transport signals -------------------------------------------------

    async fn handle_signal(&mut self, signal: TransportSignal) {
        match signal {
            TransportSignal::Frame(text) => self.handle_frame(&text).await,
            TransportSignal::Closed => {
                if self.state != ConnectionState::Closed {
                    self.finish_close("connection closed".into());
                }
            }
            TransportSignal::Error(reason) => {
                tracing::warn!(%reason, "transport error");
                if self.state != ConnectionState::Closed {
                    self.finish_close(reason);
                }
            }
        }
    }

    /// Final transition to `Closed`: cancel timers, classify the close,
    /// and notify listeners exactly once.
    fn finish_close(&mut self, reason: String) {
        let closed_by_server = self.state != ConnectionState::Closing;
        let existing_connection =
            self.state == ConnectionState::Opened || self.had_opened;

        self.cancel_timers();
        self.conn = None;
        self.pending_auth = None;
        self.state = ConnectionState::Closed;
        self.info = ConnectionInfo::default();

        let notice = Disconnect {
            reason,
            closed_by_server,
            existing_connection,
        };
        tracing::info!(
            reason = %notice.reason,
            closed_by_server,
            existing_connection,
            "disconnected"
        );
        self.listeners
            .dispatch("disconnect", |l| l.on_disconnect(&notice));
    }

    // -- inbound frames ----------------------------------------------------

    async fn handle_frame(&mut self, text: &str) {
        let frame = match Frame::decode(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!(error = %e, "dropping unparsable frame");
                return;
            }
        };

        match frame.status {
            PacketStatus::Open => self.on_gateway_open(frame.payload),
            PacketStatus::Message => self.on_message(frame.payload).await,
            PacketStatus::Ping => {
                self.send_frame(Frame::bare(PacketStatus::Pong)).await;
            }
            PacketStatus::Pong => {
                tracing::debug!("pong received");
            }
            status => {
                tracing::debug!(%status, "unhandled packet status");
            }
        }
    }

    /// Gateway `Open` frame: capture the session parameters.
    fn on_gateway_open(&mut self, payload: Value) {
        let open: OpenPayload = match serde_json::from_value(payload) {
            Ok(open) => open,
            Err(e) => {
                tracing::debug!(error = %e, "dropping bad open payload");
                return;
            }
        };

        self.info.session_id = open.sid;
        self.info.ping_interval_ms = open.ping_interval;
        self.info.ping_timeout_ms = open.ping_timeout;
        self.state = ConnectionState::ProxyOpened;
        tracing::debug!(
            session = %self.info.session_id,
            ping_interval_ms = self.info.ping_interval_ms,
            ping_timeout_ms = self.info.ping_timeout_ms,
            "gateway session opened"
        );

        let info = self.info.clone();
        self.listeners.dispatch("open", |l| l.on_open(&info));
    }

    async fn on_message(&mut self, payload: Value) {
        let call: MethodCall = match serde_json::from_value(payload) {
            Ok(call) => call,
            Err(e) => {
                tracing::debug!(error = %e, "dropping bad method envelope");
                return;
            }
        };

        match call.prefix() {
            Some("kiwi") => self.on_kiwi(&call),
            Some("irc") => self.on_irc(&call).await,
            _ => {
                tracing::debug!(method = %call.method, "unknown method prefix");
            }
        }
    }

    /// Any gateway-level method call proves the proxy is ready for
    /// credentials; that is the `ProxyConnected` trigger.
    fn on_kiwi(&mut self, call: &MethodCall) {
        tracing::trace!(method = %call.method, "gateway method call");
        if !matches!(
            self.state,
            ConnectionState::ProxyConnected | ConnectionState::Opened
        ) {
            self.state = ConnectionState::ProxyConnected;
            tracing::debug!(state = %self.state, "proxy connected");
        }
        self.arm_timers();
    }

    async fn on_irc(&mut self, call: &MethodCall) {
        let command = match call.command() {
            Some(command) => command.to_ascii_lowercase(),
            None => {
                tracing::debug!(method = %call.method, "irc call without command");
                return;
            }
        };

        match command.as_str() {
            "connect" => {
                if let Some(id) = call.connection_id() {
                    self.info.connection_id = id;
                }
                self.state = ConnectionState::Opened;
                self.had_opened = true;
                tracing::info!(
                    connection_id = self.info.connection_id,
                    "irc connection opened"
                );
                let info = self.info.clone();
                self.listeners.dispatch("connect", |l| l.on_connect(&info));
            }
            "disconnect" => {
                // Short-circuit: not forwarded as an irc event.
                let reason = call.data()["reason"]
                    .as_str()
                    .unwrap_or("disconnected by server")
                    .to_string();
                if let Some(conn) = self.conn.take() {
                    let _ = conn.close().await;
                }
                self.finish_close(reason);
                return;
            }
            _ => {}
        }

        if command != "disconnect" {
            let data = call.data().clone();
            self.listeners
                .dispatch("irc", |l| l.on_irc(&command, &data));
        }
    }

    // -- timers ------------------------------------------------------------

    /// Arms both keep-alive timers. Idempotent: re-entering
    /// `ProxyConnected` on duplicate gateway frames never doubles them.
    fn arm_timers(&mut self) {
        let now = Instant::now();
        if self.heartbeat_at.is_none() {
            self.heartbeat_at =
                Some(now + Duration::from_millis(self.info.ping_timeout_ms));
        }
        if self.ping_at.is_none() {
            self.ping_at =
                Some(now + Duration::from_millis(self.info.ping_interval_ms));
        }
    }

    fn cancel_timers(&mut self) {
        self.heartbeat_at = None;
        self.ping_at = None;
        self.poll_at = None;
    }

    async fn on_heartbeat_due(&mut self) {
        self.send_message(&MethodCall::kiwi("heartbeat", vec![])).await;
        self.heartbeat_at = Some(
            Instant::now() + Duration::from_millis(self.info.ping_timeout_ms),
        );
    }

    async fn on_ping_due(&mut self) {
        self.send_frame(Frame::bare(PacketStatus::Ping)).await;
        self.ping_at = Some(
            Instant::now() + Duration::from_millis(self.info.ping_interval_ms),
        );
    }

    /// One tick of the handshake wait.
    async fn on_poll_due(&mut self) {
        match self.state {
            ConnectionState::ProxyConnected => {
                self.poll_at = None;
                let Some(auth) = self.pending_auth.take() else {
                    return;
                };
                let client_info = MethodCall::kiwi(
                    "client_info",
                    vec![json!({ "build_version": self.config.client_info })],
                );
                self.send_message(&client_info).await;

                match serde_json::to_value(&auth) {
                    Ok(params) => {
                        let connect = MethodCall::kiwi(
                            "connect_irc",
                            vec![params],
                        );
                        self.send_message(&connect).await;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "auth params not serializable");
                    }
                }
                // `auth` drops here; credentials are not retained.
            }
            ConnectionState::Closed => {
                // Handshake aborted underneath the wait.
                self.poll_at = None;
            }
            _ => {
                self.poll_at =
                    Some(Instant::now() + self.config.poll_interval);
            }
        }
    }

    // -- outbound ----------------------------------------------------------

    async fn send_message(&mut self, call: &MethodCall) {
        match Frame::message(call) {
            Ok(frame) => self.send_frame(frame).await,
            Err(e) => {
                tracing::error!(error = %e, method = %call.method, "encode failed");
            }
        }
    }

    /// Sends one frame. Dropped (with a trace) when no connection is up —
    /// a frame sent while `Closed` must never reach the transport.
    async fn send_frame(&mut self, frame: Frame) {
        if self.state == ConnectionState::Closed {
            tracing::trace!("dropping frame sent while closed");
            return;
        }
        let Some(conn) = &self.conn else {
            tracing::trace!("dropping frame: no connection");
            return;
        };
        let text = frame.encode();
        if let Err(e) = conn.send(&text).await {
            // No retry; the reader will surface the broken connection.
            tracing::debug!(error = %e, "send failed");
        }
    }

    /// Spawns the reader task feeding this connection's frames into the
    /// signal channel, tagged with the current generation.
    fn spawn_reader(&self, conn: T::Connection) {
        let tx = self.signal_tx.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            loop {
                match conn.recv().await {
                    Ok(Some(text)) => {
                        if tx
                            .send((generation, TransportSignal::Frame(text)))
                            .is_err()
                        {
                            break;
                        }
                    }
                    Ok(None) => {
                        let _ = tx.send((generation, TransportSignal::Closed));
                        break;
                    }
                    Err(e) => {
                        let _ = tx.send((
                            generation,
                            TransportSignal::Error(e.to_string()),
                        ));
                        break;
                    }
                }
            }
        });
    }
}
