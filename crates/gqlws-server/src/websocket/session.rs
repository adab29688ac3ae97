//! Per-client session loop, from upgrade through disconnect.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use gqlws_core::{ClientMessage, RequestContext, ServerMessage, codec};
use gqlws_telemetry::metrics::{
    PROTOCOL_ERRORS_TOTAL, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_DISCONNECTIONS_TOTAL,
    WS_SESSION_DURATION_SECONDS,
};
use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::connection::ClientConnection;
use crate::dispatcher::{MessageDispatcher, OutboundStream};

/// How long queued messages may take to flush after the session ends.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Run a `graphql-ws` session for an upgraded socket.
///
/// 1. Registers the connection's operation set
/// 2. Spawns the writer task that encodes queued messages onto the socket
/// 3. Decodes and dispatches inbound frames one at a time, in arrival order;
///    replies to `start` are forwarded by their own task
/// 4. On `connection_terminate`, close, socket error, or server shutdown,
///    tears the connection down and cancels its operations
#[instrument(skip_all, fields(connection_id = %context.connection_id))]
pub async fn run_ws_session(
    ws: WebSocket,
    context: RequestContext,
    dispatcher: Arc<MessageDispatcher>,
    outbound_buffer: usize,
    shutdown: CancellationToken,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let connection_id = context.connection_id.clone();

    let (send_tx, mut send_rx) = mpsc::channel::<ServerMessage>(outbound_buffer.max(1));
    let connection = Arc::new(
        ClientConnection::new(connection_id.clone(), send_tx).with_context(Arc::new(context)),
    );
    let registry = dispatcher.registry().clone();
    registry.init_operations(&connection_id);

    info!("client connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    // Exiting drops the receiver, which closes the connection for senders.
    let mut writer = tokio::spawn(async move {
        while let Some(message) = send_rx.recv().await {
            let text = match codec::encode(&message) {
                Ok(text) => text,
                Err(err) => {
                    error!(error = %err, kind = message.kind(), "failed to encode message");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                debug!("socket write failed");
                return;
            }
        }
        let _ = ws_tx.close().await;
    });

    loop {
        let frame = tokio::select! {
            () = shutdown.cancelled() => {
                info!("server shutting down, closing session");
                break;
            }
            frame = ws_rx.next() => frame,
        };

        let text = match frame {
            Some(Ok(Message::Text(text))) => text.to_string(),
            Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                Ok(text) => text.to_owned(),
                Err(_) => {
                    warn!(len = data.len(), "received non-UTF8 binary frame");
                    reject(&connection, "invalid_utf8", "message is not valid UTF-8").await;
                    continue;
                }
            },
            Some(Ok(Message::Close(_))) => {
                info!("client sent close frame");
                break;
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Err(err)) => {
                debug!(error = %err, "socket read failed");
                break;
            }
            None => break,
        };

        let message = match codec::decode(&text) {
            Ok(message) => message,
            Err(err) => {
                warn!(error = %err, "undecodable message");
                reject(&connection, "malformed", "invalid message").await;
                continue;
            }
        };

        let terminate = matches!(message, ClientMessage::ConnectionTerminate);
        let start = matches!(message, ClientMessage::Start { .. });
        match dispatcher.handle(message, &connection) {
            // An operation may run for a long time; its replies must not hold
            // up later frames such as its own `stop`.
            Ok(outbound) if start => {
                let connection = connection.clone();
                let _ = tokio::spawn(async move { forward(outbound, &connection).await });
            }
            Ok(outbound) => {
                let drained = tokio::select! {
                    () = shutdown.cancelled() => false,
                    () = forward(outbound, &connection) => true,
                };
                if !drained {
                    info!("server shutting down, closing session");
                    break;
                }
            }
            Err(err) => {
                error!(error = %err, "dispatch failed");
                counter!(PROTOCOL_ERRORS_TOTAL, "reason" => err.reason()).increment(1);
                let _ = connection.send(err.to_message()).await;
            }
        }
        if terminate {
            break;
        }
    }

    connection.close();
    registry.terminate_connection(&connection_id);
    let session_duration = connection.age();
    drop(connection);

    // The writer exits once every handle to the connection is gone and the
    // queue is drained.
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer)
        .await
        .is_err()
    {
        warn!("outbound queue did not drain, aborting writer");
        writer.abort();
    }

    info!("client disconnected");
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_SESSION_DURATION_SECONDS).record(session_duration.as_secs_f64());
}

async fn forward(mut outbound: OutboundStream, connection: &ClientConnection) {
    while let Some(reply) = outbound.next().await {
        let _ = connection.send(reply).await;
    }
}

async fn reject(connection: &ClientConnection, reason: &'static str, message: &str) {
    counter!(PROTOCOL_ERRORS_TOTAL, "reason" => reason).increment(1);
    let _ = connection
        .send(ServerMessage::connection_error(message))
        .await;
}

// Socket-level behavior is covered by tests/integration.rs.
