//! In-memory loopback transport.
//!
//! [`memory_pair`] returns a client-side [`MemoryTransport`] and a
//! [`MemoryRemote`] standing in for the gateway. Tests (and embedded
//! setups) drive the remote half by hand: inject inbound frames, read
//! what the client sent, and close the channel to simulate a
//! server-initiated disconnect.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::{Connection, Transport, TransportError};

enum MemoryFrame {
    Text(String),
    Close,
}

/// Creates a connected loopback pair.
pub fn memory_pair() -> (MemoryTransport, MemoryRemote) {
    let (client_tx, client_rx) = mpsc::unbounded_channel();
    let (remote_tx, remote_rx) = mpsc::unbounded_channel();

    let conn = MemoryConnection {
        tx: client_tx,
        rx: Arc::new(Mutex::new(remote_rx)),
        // Used by close() to wake a reader blocked on our own rx.
        loopback_tx: remote_tx.clone(),
        closed: Arc::new(AtomicBool::new(false)),
    };

    (
        MemoryTransport { conn: Some(conn) },
        MemoryRemote {
            tx: remote_tx,
            rx: client_rx,
        },
    )
}

/// The client half of a loopback pair. Yields its connection on `open`.
pub struct MemoryTransport {
    conn: Option<MemoryConnection>,
}

impl Transport for MemoryTransport {
    type Connection = MemoryConnection;
    type Error = TransportError;

    async fn open(&mut self, _url: &str) -> Result<Self::Connection, Self::Error> {
        self.conn.take().ok_or_else(|| {
            TransportError::ConnectionClosed(
                "memory transport already opened".into(),
            )
        })
    }
}

/// A loopback [`Connection`]. Clones share the same channel.
#[derive(Clone)]
pub struct MemoryConnection {
    tx: mpsc::UnboundedSender<MemoryFrame>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<MemoryFrame>>>,
    loopback_tx: mpsc::UnboundedSender<MemoryFrame>,
    closed: Arc<AtomicBool>,
}

impl Connection for MemoryConnection {
    type Error = TransportError;

    async fn send(&self, text: &str) -> Result<(), Self::Error> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionClosed(
                "send on closed connection".into(),
            ));
        }
        self.tx
            .send(MemoryFrame::Text(text.to_string()))
            .map_err(|_| {
                TransportError::ConnectionClosed("peer gone".into())
            })
    }

    async fn recv(&self) -> Result<Option<String>, Self::Error> {
        if self.closed.load(Ordering::SeqCst) {
            return Ok(None);
        }
        match self.rx.lock().await.recv().await {
            Some(MemoryFrame::Text(text)) => Ok(Some(text)),
            Some(MemoryFrame::Close) | None => {
                self.closed.store(true, Ordering::SeqCst);
                Ok(None)
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            // Tell the peer; ignore failure if it is already gone.
            let _ = self.tx.send(MemoryFrame::Close);
            // Wake any clone blocked in recv() so it observes the close,
            // mirroring a WebSocket close handshake.
            let _ = self.loopback_tx.send(MemoryFrame::Close);
        }
        Ok(())
    }
}

/// The gateway half of a loopback pair.
pub struct MemoryRemote {
    tx: mpsc::UnboundedSender<MemoryFrame>,
    rx: mpsc::UnboundedReceiver<MemoryFrame>,
}

impl MemoryRemote {
    /// Injects an inbound frame. Returns `false` if the client is gone.
    pub fn send(&self, text: impl Into<String>) -> bool {
        self.tx.send(MemoryFrame::Text(text.into())).is_ok()
    }

    /// Reads the next frame the client sent. `None` once the client closes.
    pub async fn recv(&mut self) -> Option<String> {
        match self.rx.recv().await {
            Some(MemoryFrame::Text(text)) => Some(text),
            Some(MemoryFrame::Close) | None => None,
        }
    }

    /// Reads the next frame without waiting. `None` if nothing is queued.
    pub fn try_recv(&mut self) -> Option<String> {
        match self.rx.try_recv() {
            Ok(MemoryFrame::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// Closes the connection from the gateway side.
    pub fn close(&self) {
        let _ = self.tx.send(MemoryFrame::Close);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip() {
        let (mut transport, mut remote) = memory_pair();
        let conn = transport.open("mem://test").await.unwrap();

        conn.send("hello").await.unwrap();
        assert_eq!(remote.recv().await.as_deref(), Some("hello"));

        assert!(remote.send("world"));
        assert_eq!(conn.recv().await.unwrap().as_deref(), Some("world"));
    }

    #[tokio::test]
    async fn test_open_twice_fails() {
        let (mut transport, _remote) = memory_pair();
        transport.open("mem://test").await.unwrap();
        assert!(transport.open("mem://test").await.is_err());
    }

    #[tokio::test]
    async fn test_remote_close_ends_recv() {
        let (mut transport, remote) = memory_pair();
        let conn = transport.open("mem://test").await.unwrap();

        remote.close();
        assert_eq!(conn.recv().await.unwrap(), None);
        // Closed connections refuse further sends.
        assert!(conn.send("late").await.is_err());
    }

    #[tokio::test]
    async fn test_client_close_reaches_remote() {
        let (mut transport, mut remote) = memory_pair();
        let conn = transport.open("mem://test").await.unwrap();

        conn.close().await.unwrap();
        assert_eq!(remote.recv().await, None);
    }

    #[tokio::test]
    async fn test_close_unblocks_local_reader() {
        let (mut transport, _remote) = memory_pair();
        let conn = transport.open("mem://test").await.unwrap();

        let reader = conn.clone();
        let task = tokio::spawn(async move { reader.recv().await });

        tokio::task::yield_now().await;
        conn.close().await.unwrap();

        assert_eq!(task.await.unwrap().unwrap(), None);
    }
}
