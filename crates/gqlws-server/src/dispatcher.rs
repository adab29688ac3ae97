//! Message dispatcher: routes decoded client messages.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use gqlws_core::{
    ClientMessage, ExecutionOutcome, ExecutionRequest, Executor, RequestContext, ServerMessage,
    StartPayload,
};
use gqlws_telemetry::metrics::{
    DELIVERY_ERRORS_TOTAL, MESSAGES_RECEIVED_TOTAL, OPERATIONS_STARTED_TOTAL,
    OPERATIONS_STOPPED_TOTAL,
};
use metrics::counter;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::delivery::ResultPipeline;
use crate::errors::DispatchError;
use crate::state::ConnectionRegistry;
use crate::websocket::connection::ClientConnection;

/// Outbound messages produced by one inbound message, in send order.
pub type OutboundStream = BoxStream<'static, ServerMessage>;

/// Routes client messages to handshake, start, stop, and teardown handling.
pub struct MessageDispatcher {
    registry: Arc<ConnectionRegistry>,
    executor: Arc<dyn Executor>,
    pipeline: ResultPipeline,
    keep_alive_enabled: bool,
}

impl MessageDispatcher {
    /// Create a dispatcher over `registry` that runs operations on `executor`.
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        executor: Arc<dyn Executor>,
        keep_alive_enabled: bool,
    ) -> Self {
        Self {
            pipeline: ResultPipeline::new(registry.clone()),
            registry,
            executor,
            keep_alive_enabled,
        }
    }

    /// The registry this dispatcher mutates.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Handle one inbound message.
    ///
    /// The returned stream is lazy: execution of a `start` begins when it is
    /// first polled, but its operation id is reserved right away. Streaming
    /// results are delivered by a spawned task straight to `connection`; the
    /// returned stream then ends empty.
    pub fn handle(
        &self,
        message: ClientMessage,
        connection: &Arc<ClientConnection>,
    ) -> Result<OutboundStream, DispatchError> {
        counter!(MESSAGES_RECEIVED_TOTAL, "type" => metric_kind(&message)).increment(1);
        debug!(connection_id = %connection.id, kind = message.kind(), "dispatching message");

        match message {
            ClientMessage::ConnectionInit { .. } => Ok(self.handle_init(connection)),
            ClientMessage::Start { id, payload } => self.handle_start(id, payload, connection),
            ClientMessage::Stop { id } => Ok(self.handle_stop(id, connection)),
            ClientMessage::ConnectionTerminate => {
                info!(connection_id = %connection.id, "client terminated connection");
                self.registry.terminate_connection(&connection.id);
                Ok(empty())
            }
            ClientMessage::Unrecognized { kind } => {
                Err(DispatchError::UnexpectedMessage { kind })
            }
        }
    }

    fn handle_init(&self, connection: &ClientConnection) -> OutboundStream {
        self.registry.activate(&connection.id);
        if self.keep_alive_enabled {
            messages(vec![ServerMessage::ConnectionAck, ServerMessage::KeepAlive])
        } else {
            messages(vec![ServerMessage::ConnectionAck])
        }
    }

    fn handle_start(
        &self,
        id: Option<String>,
        payload: Option<StartPayload>,
        connection: &Arc<ClientConnection>,
    ) -> Result<OutboundStream, DispatchError> {
        let Some(id) = id else {
            warn!(connection_id = %connection.id, "start without operation id");
            return Ok(messages(vec![ServerMessage::anonymous_error()]));
        };

        if self.registry.operation_exists(&connection.id, &id) {
            info!(connection_id = %connection.id, operation_id = %id, "operation already running, ignoring start");
            return Ok(empty());
        }

        let Some(request) = payload.as_ref().and_then(execution_request) else {
            info!(connection_id = %connection.id, operation_id = %id, "start without query");
            return Ok(messages(vec![ServerMessage::error(&id)]));
        };

        let context = connection
            .request_context()
            .ok_or_else(|| DispatchError::MissingContext {
                connection_id: connection.id.clone(),
                operation_id: id.clone(),
            })?;

        // Reserved before the engine runs, so a repeated `start` is refused
        // and a `stop` can reach the operation while it executes.
        let reservation = self.pipeline.register(&connection.id, &id);
        if reservation.is_none() {
            if self.registry.operation_exists(&connection.id, &id) {
                info!(connection_id = %connection.id, operation_id = %id, "operation already running, ignoring start");
                return Ok(empty());
            }
            debug!(connection_id = %connection.id, operation_id = %id, "connection not registered, running unregistered");
        }

        Ok(self.execute(id, request, context, connection.clone(), reservation))
    }

    fn execute(
        &self,
        id: String,
        request: ExecutionRequest,
        context: Arc<RequestContext>,
        connection: Arc<ClientConnection>,
        reservation: Option<CancellationToken>,
    ) -> OutboundStream {
        let executor = self.executor.clone();
        let pipeline = self.pipeline.clone();
        let registry = self.registry.clone();

        let outcome = async move {
            let token = reservation.clone().unwrap_or_else(CancellationToken::new);
            let outcome = tokio::select! {
                biased;
                () = token.cancelled() => {
                    debug!(operation_id = %id, "operation cancelled during execution");
                    return Vec::new();
                }
                outcome = executor.execute(request, context) => outcome,
            };

            let reserved = reservation.is_some();
            match outcome {
                Ok(ExecutionOutcome::Single(response)) => {
                    counter!(OPERATIONS_STARTED_TOTAL, "kind" => "single").increment(1);
                    if !owns_result(&registry, reserved, &connection.id, &id) {
                        return Vec::new();
                    }
                    debug!(operation_id = %id, "single result");
                    Vec::from(ResultPipeline::single(&id, response))
                }
                Ok(ExecutionOutcome::Stream(results)) => {
                    counter!(OPERATIONS_STARTED_TOTAL, "kind" => "stream").increment(1);
                    match reservation {
                        Some(token) => {
                            info!(connection_id = %connection.id, operation_id = %id, "subscription started");
                            let _ = pipeline.subscribe(connection, id, results, token);
                        }
                        None => {
                            debug!(operation_id = %id, "operation not registered, discarding result stream");
                        }
                    }
                    Vec::new()
                }
                Err(err) => {
                    warn!(operation_id = %id, error = %err, "execution failed");
                    counter!(DELIVERY_ERRORS_TOTAL).increment(1);
                    if owns_result(&registry, reserved, &connection.id, &id) {
                        vec![ServerMessage::error(&id)]
                    } else {
                        Vec::new()
                    }
                }
            }
        };

        stream::once(outcome).flat_map(stream::iter).boxed()
    }

    fn handle_stop(&self, id: Option<String>, connection: &ClientConnection) -> OutboundStream {
        let Some(id) = id else {
            return empty();
        };
        match self.registry.stop_operation(&connection.id, &id) {
            Some(complete) => {
                info!(connection_id = %connection.id, operation_id = %id, "operation stopped by client");
                counter!(OPERATIONS_STOPPED_TOTAL).increment(1);
                messages(vec![complete])
            }
            None => empty(),
        }
    }
}

/// A registered operation only answers if this call removes it; a concurrent
/// stop or teardown got there first otherwise.
fn owns_result(
    registry: &ConnectionRegistry,
    reserved: bool,
    connection_id: &str,
    operation_id: &str,
) -> bool {
    !reserved || registry.remove_completed(connection_id, operation_id)
}

fn execution_request(payload: &StartPayload) -> Option<ExecutionRequest> {
    let query = payload.non_empty_query()?;
    Some(ExecutionRequest {
        query: query.to_owned(),
        operation_name: payload.operation_name.clone(),
        variables: payload.variables.clone().unwrap_or_default(),
    })
}

fn metric_kind(message: &ClientMessage) -> &'static str {
    match message {
        ClientMessage::Unrecognized { .. } => "unrecognized",
        ClientMessage::ConnectionInit { .. } => "connection_init",
        ClientMessage::Start { .. } => "start",
        ClientMessage::Stop { .. } => "stop",
        ClientMessage::ConnectionTerminate => "connection_terminate",
    }
}

fn messages(messages: Vec<ServerMessage>) -> OutboundStream {
    stream::iter(messages).boxed()
}

fn empty() -> OutboundStream {
    stream::empty().boxed()
}
