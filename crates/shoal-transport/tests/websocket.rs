//! Integration tests for the client WebSocket transport.
//!
//! Each test spins up a minimal tokio-tungstenite server on a loopback
//! port and dials it with [`WebSocketTransport`], verifying that text
//! frames actually flow in both directions.

#[cfg(feature = "websocket")]
mod websocket {
    use shoal_transport::{Connection, Transport, WebSocketTransport};

    use futures_util::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message;

    /// Binds a one-shot WebSocket server and returns its URL plus a task
    /// that resolves to the accepted server-side stream.
    async fn spawn_server() -> (
        String,
        tokio::task::JoinHandle<
            tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>,
        >,
    ) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = listener.local_addr().expect("should have local addr");

        let handle = tokio::spawn(async move {
            let (stream, _) =
                listener.accept().await.expect("should accept");
            tokio_tungstenite::accept_async(stream)
                .await
                .expect("should upgrade")
        });

        (format!("ws://{addr}"), handle)
    }

    #[tokio::test]
    async fn test_open_and_send_receive() {
        let (url, server) = spawn_server().await;

        let mut transport = WebSocketTransport::new();
        let conn = transport.open(&url).await.expect("should connect");
        let mut server_ws = server.await.expect("server task");

        // --- Client sends, server receives ---
        conn.send("2probe").await.expect("send should succeed");
        let msg = server_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_text().unwrap().as_str(), "2probe");

        // --- Server sends, client receives ---
        server_ws
            .send(Message::Text("3probe".to_string().into()))
            .await
            .unwrap();
        let received = conn.recv().await.expect("recv should succeed");
        assert_eq!(received.as_deref(), Some("3probe"));

        conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_recv_returns_none_on_server_close() {
        let (url, server) = spawn_server().await;

        let mut transport = WebSocketTransport::new();
        let conn = transport.open(&url).await.expect("should connect");
        let mut server_ws = server.await.expect("server task");

        server_ws.send(Message::Close(None)).await.unwrap();

        let result = conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on server close");
    }

    #[tokio::test]
    async fn test_binary_frames_delivered_as_text() {
        let (url, server) = spawn_server().await;

        let mut transport = WebSocketTransport::new();
        let conn = transport.open(&url).await.expect("should connect");
        let mut server_ws = server.await.expect("server task");

        server_ws
            .send(Message::Binary(b"4{\"method\":\"kiwi.x\"}".to_vec().into()))
            .await
            .unwrap();

        let received = conn.recv().await.expect("recv should succeed");
        assert_eq!(received.as_deref(), Some("4{\"method\":\"kiwi.x\"}"));
    }

    #[tokio::test]
    async fn test_close_unblocks_a_waiting_reader() {
        let (url, server) = spawn_server().await;

        let mut transport = WebSocketTransport::new();
        let conn = transport.open(&url).await.expect("should connect");
        let mut server_ws = server.await.expect("server task");

        // Park a clone in recv() like the link's reader task does.
        let reader = conn.clone();
        let task = tokio::spawn(async move { reader.recv().await });
        tokio::task::yield_now().await;

        conn.close().await.expect("close should succeed");
        // Drive the server until the close handshake completes.
        while server_ws.next().await.is_some() {}

        let received = task.await.unwrap().expect("recv should not error");
        assert!(received.is_none());
    }

    #[tokio::test]
    async fn test_open_fails_when_nothing_listens() {
        let mut transport = WebSocketTransport::new();
        let result = transport.open("ws://127.0.0.1:1").await;
        assert!(result.is_err());
    }
}
