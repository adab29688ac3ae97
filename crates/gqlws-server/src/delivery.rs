//! Result delivery: execution outcomes to outbound messages.
//!
//! A single result becomes `data` (or `error` with the result as payload)
//! followed by `complete`. A result stream runs under the cancellation
//! handle reserved in the [`ConnectionRegistry`] when its `start` was
//! accepted, driven by a task that pulls one result, sends it, and only then
//! pulls the next.
//! The send waits for room in the connection's outbound queue, so a slow
//! client throttles its own subscriptions.

use std::sync::Arc;

use futures::StreamExt;
use gqlws_core::{ExecutionResponse, ResponseStream, ServerMessage};
use gqlws_telemetry::metrics::{DELIVERY_ERRORS_TOTAL, OPERATIONS_COMPLETED_TOTAL};
use metrics::counter;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::state::ConnectionRegistry;
use crate::websocket::connection::ClientConnection;

/// Translates execution outcomes into protocol messages.
#[derive(Clone, Debug)]
pub struct ResultPipeline {
    registry: Arc<ConnectionRegistry>,
}

impl ResultPipeline {
    /// Pipeline that registers subscriptions in `registry`.
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Messages for a one-shot result.
    pub fn single(operation_id: &str, response: ExecutionResponse) -> [ServerMessage; 2] {
        [
            ServerMessage::from_response(operation_id, response),
            ServerMessage::complete(operation_id),
        ]
    }

    /// Reserve `operation_id` on the connection and return its cancellation
    /// handle.
    ///
    /// Returns `None` when the connection was already torn down or the id is
    /// taken; nothing is stored then.
    pub fn register(&self, connection_id: &str, operation_id: &str) -> Option<CancellationToken> {
        let token = CancellationToken::new();
        let saved = self
            .registry
            .save_operation(connection_id, operation_id, |_| token.clone());
        saved.then_some(token)
    }

    /// Spawn the delivery task for a stream registered under `token`.
    ///
    /// Nothing is pulled from `stream` once `token` is cancelled, including
    /// when it already was before the task starts.
    pub fn subscribe(
        &self,
        connection: Arc<ClientConnection>,
        operation_id: String,
        stream: ResponseStream,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(deliver(
            self.registry.clone(),
            connection,
            operation_id,
            stream,
            token,
        ))
    }
}

#[instrument(skip_all, fields(connection_id = %connection.id, operation_id = %operation_id))]
async fn deliver(
    registry: Arc<ConnectionRegistry>,
    connection: Arc<ClientConnection>,
    operation_id: String,
    mut stream: ResponseStream,
    token: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            biased;
            () = token.cancelled() => {
                debug!("delivery cancelled");
                return;
            }
            next = stream.next() => next,
        };

        match next {
            Some(Ok(response)) => {
                // A result that raced a stop is dropped.
                if token.is_cancelled() {
                    debug!("delivery cancelled with a result in flight");
                    return;
                }
                let message = ServerMessage::from_response(&operation_id, response);
                let sent = tokio::select! {
                    biased;
                    () = token.cancelled() => return,
                    sent = connection.send(message) => sent,
                };
                if !sent {
                    debug!("connection closed, stopping delivery");
                    return;
                }
            }
            Some(Err(err)) => {
                warn!(error = %err, "result stream failed");
                counter!(DELIVERY_ERRORS_TOTAL).increment(1);
                if registry.remove_completed(&connection.id, &operation_id) {
                    let _ = connection.send(ServerMessage::error(&operation_id)).await;
                }
                return;
            }
            None => {
                if registry.remove_completed(&connection.id, &operation_id) {
                    info!("subscription complete");
                    counter!(OPERATIONS_COMPLETED_TOTAL).increment(1);
                    let _ = connection.send(ServerMessage::complete(&operation_id)).await;
                }
                return;
            }
        }
    }
}
