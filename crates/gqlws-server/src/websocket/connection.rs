//! WebSocket client connection handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use gqlws_core::{RequestContext, ServerMessage};
use gqlws_telemetry::metrics::OUTBOUND_DROPS_TOTAL;
use metrics::counter;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// A connected `graphql-ws` client as seen by the dispatcher and the
/// delivery pipeline.
pub struct ClientConnection {
    /// Server-assigned connection id.
    pub id: String,
    /// Queue feeding the socket writer task.
    tx: mpsc::Sender<ServerMessage>,
    /// Upgrade request, if captured.
    context: Option<Arc<RequestContext>>,
    open: AtomicBool,
    connected_at: Instant,
    dropped_messages: AtomicU64,
}

impl ClientConnection {
    /// Create an open connection without a request context.
    pub fn new(id: String, tx: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id,
            tx,
            context: None,
            open: AtomicBool::new(true),
            connected_at: Instant::now(),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Attach the upgrade request context.
    #[must_use]
    pub fn with_context(mut self, context: Arc<RequestContext>) -> Self {
        self.context = Some(context);
        self
    }

    /// The upgrade request context handed to the execution engine.
    pub fn request_context(&self) -> Option<Arc<RequestContext>> {
        self.context.clone()
    }

    /// Whether messages are still accepted.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire) && !self.tx.is_closed()
    }

    /// Stop accepting messages. Already queued messages are still written.
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }

    /// Queue a message for the client, waiting for room in the queue.
    ///
    /// Returns `false` and drops the message if the connection is closed.
    pub async fn send(&self, message: ServerMessage) -> bool {
        if !self.is_open() {
            self.record_drop();
            return false;
        }
        if self.tx.send(message).await.is_ok() {
            true
        } else {
            self.close();
            self.record_drop();
            false
        }
    }

    /// Messages dropped because the connection was closed.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Time since the connection was established.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }

    fn record_drop(&self) {
        let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
        counter!(OUTBOUND_DROPS_TOTAL).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_connection() -> (ClientConnection, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(32);
        let conn = ClientConnection::new("conn_1".into(), tx);
        (conn, rx)
    }

    #[test]
    fn new_connection_is_open_without_context() {
        let (conn, _rx) = make_connection();
        assert_eq!(conn.id, "conn_1");
        assert!(conn.is_open());
        assert!(conn.request_context().is_none());
        assert_eq!(conn.drop_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn age_tracks_time_since_creation() {
        let (conn, _rx) = make_connection();
        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(conn.age() >= Duration::from_secs(3));
    }

    #[test]
    fn context_is_shared() {
        let (tx, _rx) = mpsc::channel(1);
        let ctx = Arc::new(RequestContext::new("conn_1", "/graphql-ws"));
        let conn = ClientConnection::new("conn_1".into(), tx).with_context(ctx.clone());
        assert!(Arc::ptr_eq(&conn.request_context().unwrap(), &ctx));
    }

    #[tokio::test]
    async fn send_delivers_in_order() {
        let (conn, mut rx) = make_connection();
        assert!(conn.send(ServerMessage::ConnectionAck).await);
        assert!(conn.send(ServerMessage::KeepAlive).await);
        assert_eq!(rx.recv().await, Some(ServerMessage::ConnectionAck));
        assert_eq!(rx.recv().await, Some(ServerMessage::KeepAlive));
    }

    #[tokio::test]
    async fn send_after_close_is_dropped() {
        let (conn, mut rx) = make_connection();
        conn.close();
        assert!(!conn.is_open());
        assert!(!conn.send(ServerMessage::ConnectionAck).await);
        assert_eq!(conn.drop_count(), 1);
        drop(conn);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn send_to_dropped_receiver_closes() {
        let (conn, rx) = make_connection();
        drop(rx);
        assert!(!conn.is_open());
        assert!(!conn.send(ServerMessage::complete("op1")).await);
        assert_eq!(conn.drop_count(), 1);
    }

    #[tokio::test]
    async fn send_waits_for_room() {
        let (tx, mut rx) = mpsc::channel(1);
        let conn = Arc::new(ClientConnection::new("conn_2".into(), tx));
        assert!(conn.send(ServerMessage::ConnectionAck).await);

        let sender = {
            let conn = conn.clone();
            tokio::spawn(async move { conn.send(ServerMessage::KeepAlive).await })
        };
        tokio::task::yield_now().await;
        assert!(!sender.is_finished());

        assert_eq!(rx.recv().await, Some(ServerMessage::ConnectionAck));
        assert!(sender.await.unwrap());
        assert_eq!(rx.recv().await, Some(ServerMessage::KeepAlive));
    }
}
