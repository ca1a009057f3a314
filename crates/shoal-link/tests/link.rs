//! End-to-end link tests over the in-memory loopback transport.
//!
//! Every test runs with paused time, so handshake waits and keep-alive
//! periods elapse instantly and deterministically.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::{json, Value};

use shoal_link::{spawn_link, Disconnect, LinkConfig, LinkError, LinkHandle, LinkListener};
use shoal_protocol::{AuthParams, ConnectionInfo, ConnectionState, MethodCall};
use shoal_transport::{memory_pair, MemoryRemote};

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

fn auth() -> AuthParams {
    AuthParams {
        nickname: "caffe".into(),
        hostname: "irc.example.net".into(),
        port: 6697,
        ssl: true,
        password: String::new(),
        channel: Some("#reef".into()),
    }
}

fn spawn() -> (LinkHandle, MemoryRemote) {
    let (transport, remote) = memory_pair();
    let handle = spawn_link(transport, LinkConfig::new("mem://gateway"));
    (handle, remote)
}

/// Lets every runnable task (reader, actor) quiesce before asserting.
/// Under paused time the sleep only fires once nothing else can run.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

fn method(frame: &str) -> MethodCall {
    assert_eq!(&frame[..1], "4", "expected a Message frame, got {frame:?}");
    serde_json::from_str(&frame[1..]).unwrap()
}

/// Drives the handshake to `Opened`: upgrade, gateway open, gateway
/// method call, credential exchange, relayed `irc.connect`.
async fn open_to_ready(handle: &LinkHandle, remote: &mut MemoryRemote) {
    let state = handle.open(auth()).await.unwrap();
    assert_eq!(state, ConnectionState::Opening);

    assert_eq!(remote.recv().await.as_deref(), Some("5"));
    remote.send(r#"0{"sid":"abc123","pingInterval":5000,"pingTimeout":20000}"#);
    remote.send(r#"4{"method":"kiwi.connected","params":[]}"#);

    // The handshake wait's next tick pushes client info and credentials.
    let client_info = method(&remote.recv().await.unwrap());
    assert_eq!(client_info.method, "kiwi.client_info");
    let connect = method(&remote.recv().await.unwrap());
    assert_eq!(connect.method, "kiwi.connect_irc");

    remote.send(r#"4{"method":"irc.connect","params":[7,{},null]}"#);
    settle().await;
    assert_eq!(handle.state().await.unwrap(), ConnectionState::Opened);
}

#[derive(Default)]
struct Recorder {
    opens: Mutex<Vec<ConnectionInfo>>,
    connects: Mutex<Vec<ConnectionInfo>>,
    disconnects: Mutex<Vec<Disconnect>>,
    irc: Mutex<Vec<(String, Value)>>,
}

impl LinkListener for Recorder {
    fn on_open(&self, info: &ConnectionInfo) {
        self.opens.lock().unwrap().push(info.clone());
    }

    fn on_connect(&self, info: &ConnectionInfo) {
        self.connects.lock().unwrap().push(info.clone());
    }

    fn on_disconnect(&self, notice: &Disconnect) {
        self.disconnects.lock().unwrap().push(notice.clone());
    }

    fn on_irc(&self, command: &str, data: &Value) {
        self.irc
            .lock()
            .unwrap()
            .push((command.to_string(), data.clone()));
    }
}

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_open_requests_upgrade_first() {
    let (handle, mut remote) = spawn();
    handle.open(auth()).await.unwrap();
    assert_eq!(remote.recv().await.as_deref(), Some("5"));
}

#[tokio::test(start_paused = true)]
async fn test_handshake_reaches_opened() {
    let (handle, mut remote) = spawn();
    let recorder = Arc::new(Recorder::default());
    handle.register(recorder.clone()).unwrap();

    let state = handle.open(auth()).await.unwrap();
    assert_eq!(state, ConnectionState::Opening);
    assert_eq!(remote.recv().await.as_deref(), Some("5"));

    remote.send(r#"0{"sid":"abc123","pingInterval":5000,"pingTimeout":20000}"#);
    settle().await;
    assert_eq!(handle.state().await.unwrap(), ConnectionState::ProxyOpened);

    remote.send(r#"4{"method":"kiwi.connected","params":[]}"#);
    settle().await;
    assert_eq!(
        handle.state().await.unwrap(),
        ConnectionState::ProxyConnected
    );

    // Credentials go out on the next handshake-wait tick, in order.
    let client_info = method(&remote.recv().await.unwrap());
    assert_eq!(client_info.method, "kiwi.client_info");
    assert!(client_info.params[0]["build_version"].is_string());

    let connect = method(&remote.recv().await.unwrap());
    assert_eq!(connect.method, "kiwi.connect_irc");
    assert_eq!(connect.params[0]["nick"], "caffe");
    assert_eq!(connect.params[0]["hostname"], "irc.example.net");
    assert_eq!(connect.params[0]["port"], 6697);
    assert_eq!(connect.params[0]["ssl"], true);
    assert_eq!(connect.params[0]["channel"], "#reef");

    remote.send(r#"4{"method":"irc.connect","params":[7,{},null]}"#);
    settle().await;
    assert_eq!(handle.state().await.unwrap(), ConnectionState::Opened);

    let info = handle.info().await.unwrap();
    assert_eq!(info.session_id, "abc123");
    assert_eq!(info.ping_interval_ms, 5000);
    assert_eq!(info.ping_timeout_ms, 20000);
    assert_eq!(info.connection_id, 7);

    assert_eq!(recorder.opens.lock().unwrap().len(), 1);
    assert_eq!(recorder.connects.lock().unwrap().len(), 1);
    assert!(recorder.disconnects.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_open_while_active_is_rejected() {
    let (handle, mut remote) = spawn();
    open_to_ready(&handle, &mut remote).await;

    let err = handle.open(auth()).await.unwrap_err();
    assert!(matches!(
        err,
        LinkError::AlreadyOpen(ConnectionState::Opened)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_open_failure_reports_disconnect() {
    let (transport, remote) = memory_pair();
    let handle = spawn_link(transport, LinkConfig::new("mem://gateway"));
    let recorder = Arc::new(Recorder::default());
    handle.register(recorder.clone()).unwrap();

    // A second open on the same loopback transport has no connection
    // left to yield, so the transport-level open fails.
    handle.open(auth()).await.unwrap();
    settle().await;
    drop(remote);
    settle().await;
    handle.close(None).unwrap();
    settle().await;

    // The state machine accepts the open, then the transport fails it.
    let accepted = handle.open(auth()).await.unwrap();
    assert_eq!(accepted, ConnectionState::Opening);
    settle().await;

    assert_eq!(handle.state().await.unwrap(), ConnectionState::Closed);
    let disconnects = recorder.disconnects.lock().unwrap();
    let last = disconnects.last().unwrap();
    assert!(!last.existing_connection);
}

// ---------------------------------------------------------------------------
// Keep-alive
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_inbound_ping_answered_with_pong() {
    let (handle, mut remote) = spawn();
    open_to_ready(&handle, &mut remote).await;

    remote.send("2");
    assert_eq!(remote.recv().await.as_deref(), Some("3"));
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_gateway_calls_arm_timers_once() {
    let (handle, mut remote) = spawn();
    open_to_ready(&handle, &mut remote).await;

    // A duplicate gateway-level call re-enters ProxyConnected; the
    // keep-alive timers must not double up.
    remote.send(r#"4{"method":"kiwi.connected","params":[]}"#);
    settle().await;
    while remote.try_recv().is_some() {}

    // Two ping periods (5 s each) fit in this window; a doubled timer
    // would produce four pings, a heartbeat (20 s) none at all.
    tokio::time::sleep(Duration::from_millis(10_500)).await;

    let mut pings = 0;
    while let Some(frame) = remote.try_recv() {
        match &frame[..1] {
            "2" => pings += 1,
            other => panic!("unexpected frame kind {other:?}"),
        }
    }
    assert_eq!(pings, 2);
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_sent_each_timeout_period() {
    let (handle, mut remote) = spawn();
    open_to_ready(&handle, &mut remote).await;
    while remote.try_recv().is_some() {}

    // One heartbeat period (20 s) plus margin; drain the interleaved
    // pings and keep the method calls.
    tokio::time::sleep(Duration::from_millis(20_500)).await;

    let mut heartbeats = 0;
    while let Some(frame) = remote.try_recv() {
        if frame.starts_with('4') {
            assert_eq!(method(&frame).method, "kiwi.heartbeat");
            heartbeats += 1;
        }
    }
    assert_eq!(heartbeats, 1);
}

// ---------------------------------------------------------------------------
// Outbound guard rails
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_commands_while_closed_never_reach_transport() {
    let (handle, mut remote) = spawn();

    // No connection yet: the frame must be dropped, not queued.
    handle
        .irc("privmsg", json!({"target": "#reef", "msg": "early"}))
        .unwrap();
    settle().await;
    assert_eq!(handle.state().await.unwrap(), ConnectionState::Closed);

    handle.open(auth()).await.unwrap();
    // The first thing on the wire is the upgrade, not the stale message.
    assert_eq!(remote.recv().await.as_deref(), Some("5"));
}

#[tokio::test(start_paused = true)]
async fn test_irc_commands_carry_connection_id() {
    let (handle, mut remote) = spawn();
    open_to_ready(&handle, &mut remote).await;

    handle
        .irc("privmsg", json!({"target": "#reef", "msg": "hello"}))
        .unwrap();
    let call = method(&remote.recv().await.unwrap());
    assert_eq!(call.method, "irc.privmsg");
    assert_eq!(call.connection_id(), Some(7));
    assert_eq!(call.data()["msg"], "hello");
    assert!(call.params[2].is_null());
}

// ---------------------------------------------------------------------------
// Teardown
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_close_sends_quit_and_notifies_once() {
    let (handle, mut remote) = spawn();
    let recorder = Arc::new(Recorder::default());
    handle.register(recorder.clone()).unwrap();
    open_to_ready(&handle, &mut remote).await;

    handle.close(Some("bye".into())).unwrap();
    handle.close(None).unwrap(); // repeat close is a no-op
    settle().await;

    let quit = method(&remote.recv().await.unwrap());
    assert_eq!(quit.method, "irc.quit");
    assert_eq!(quit.data()["message"], "bye");
    assert_eq!(remote.recv().await, None);

    assert_eq!(handle.state().await.unwrap(), ConnectionState::Closed);
    let disconnects = recorder.disconnects.lock().unwrap();
    assert_eq!(disconnects.len(), 1);
    assert!(!disconnects[0].closed_by_server);
    assert!(disconnects[0].existing_connection);
}

#[tokio::test(start_paused = true)]
async fn test_remote_close_is_attributed_to_server() {
    let (handle, mut remote) = spawn();
    let recorder = Arc::new(Recorder::default());
    handle.register(recorder.clone()).unwrap();
    open_to_ready(&handle, &mut remote).await;

    remote.close();
    settle().await;

    assert_eq!(handle.state().await.unwrap(), ConnectionState::Closed);
    let disconnects = recorder.disconnects.lock().unwrap();
    assert_eq!(disconnects.len(), 1);
    assert!(disconnects[0].closed_by_server);
    assert!(disconnects[0].existing_connection);
}

#[tokio::test(start_paused = true)]
async fn test_relayed_disconnect_short_circuits() {
    let (handle, mut remote) = spawn();
    let recorder = Arc::new(Recorder::default());
    handle.register(recorder.clone()).unwrap();
    open_to_ready(&handle, &mut remote).await;

    remote.send(
        r#"4{"method":"irc.disconnect","params":[7,{"reason":"server shutting down"},null]}"#,
    );
    settle().await;

    assert_eq!(handle.state().await.unwrap(), ConnectionState::Closed);

    let disconnects = recorder.disconnects.lock().unwrap();
    assert_eq!(disconnects.len(), 1);
    assert_eq!(disconnects[0].reason, "server shutting down");
    assert!(disconnects[0].closed_by_server);

    // The disconnect is consumed, never forwarded as a relayed event.
    let irc = recorder.irc.lock().unwrap();
    assert!(irc.iter().all(|(command, _)| command != "disconnect"));
}

#[tokio::test(start_paused = true)]
async fn test_relayed_events_forwarded_lowercased() {
    let (handle, mut remote) = spawn();
    let recorder = Arc::new(Recorder::default());
    handle.register(recorder.clone()).unwrap();
    open_to_ready(&handle, &mut remote).await;

    remote.send(
        r##"4{"method":"irc.TOPIC","params":[7,{"channel":"#reef","topic":"hi"},null]}"##,
    );
    settle().await;

    let irc = recorder.irc.lock().unwrap();
    let (command, data) = irc
        .iter()
        .find(|(command, _)| command == "topic")
        .expect("topic event");
    assert_eq!(command, "topic");
    assert_eq!(data["channel"], "#reef");
}
