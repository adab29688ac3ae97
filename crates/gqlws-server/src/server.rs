//! `GraphQlWsServer`: Axum HTTP server hosting the `graphql-ws` endpoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::{HeaderMap, Uri, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use gqlws_core::protocol::SUBPROTOCOL;
use gqlws_core::{ConnectionId, Executor, RequestContext};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::dispatcher::MessageDispatcher;
use crate::errors::ServerError;
use crate::health::{self, HealthResponse};
use crate::shutdown::ShutdownCoordinator;
use crate::state::ConnectionRegistry;
use crate::websocket::run_ws_session;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Routes protocol messages.
    pub dispatcher: Arc<MessageDispatcher>,
    /// Connection and operation registry.
    pub registry: Arc<ConnectionRegistry>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle for `/metrics`.
    pub metrics_handle: PrometheusHandle,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

/// The `graphql-ws` server.
pub struct GraphQlWsServer {
    config: Arc<ServerConfig>,
    registry: Arc<ConnectionRegistry>,
    dispatcher: Arc<MessageDispatcher>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    metrics_handle: PrometheusHandle,
}

impl GraphQlWsServer {
    /// Create a server that runs operations on `executor`.
    pub fn new(
        config: ServerConfig,
        executor: Arc<dyn Executor>,
        metrics_handle: PrometheusHandle,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let dispatcher = Arc::new(MessageDispatcher::new(
            registry.clone(),
            executor,
            config.keep_alive_enabled,
        ));
        Self {
            config: Arc::new(config),
            registry,
            dispatcher,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
            metrics_handle,
        }
    }

    /// Build the Axum router.
    ///
    /// The WebSocket route is only mounted when the endpoint is enabled.
    pub fn router(&self) -> Router {
        let state = AppState {
            dispatcher: self.dispatcher.clone(),
            registry: self.registry.clone(),
            shutdown: self.shutdown.clone(),
            start_time: self.start_time,
            metrics_handle: self.metrics_handle.clone(),
            config: self.config.clone(),
        };

        let mut router = Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler));
        if self.config.graphql_ws_enabled {
            router = router.route(&self.config.path, get(ws_handler));
        }
        router
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Bind the listener and serve until the shutdown token is cancelled.
    ///
    /// Returns the bound address (useful with port `0`) and the serve task.
    /// Hand the task to [`ShutdownCoordinator::track`] to have graceful
    /// shutdown wait for it.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        let app = self.router();
        let token = self.shutdown.token();
        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(err) = served {
                error!(error = %err, "server stopped with error");
            }
        });

        info!(
            addr = %local_addr,
            path = %self.config.path,
            enabled = self.config.graphql_ws_enabled,
            "graphql-ws server listening"
        );
        Ok((local_addr, handle))
    }

    /// Connection and operation registry.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(state.start_time, &state.registry))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> String {
    gqlws_telemetry::metrics::render(&state.metrics_handle)
}

/// GET <path>: upgrade to a `graphql-ws` session.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let connection_id = ConnectionId::new().into_inner();
    let context = request_context(connection_id, &uri, &headers);

    let dispatcher = state.dispatcher.clone();
    let outbound_buffer = state.config.outbound_buffer;
    let shutdown = state.shutdown.token();

    ws.protocols([SUBPROTOCOL])
        .max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| {
            run_ws_session(socket, context, dispatcher, outbound_buffer, shutdown)
        })
        .into_response()
}

/// Capture the upgrade request for the execution engine.
fn request_context(connection_id: String, uri: &Uri, headers: &HeaderMap) -> RequestContext {
    let subprotocol = headers
        .get_all(header::SEC_WEBSOCKET_PROTOCOL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .find(|offered| *offered == SUBPROTOCOL)
        .map(str::to_owned);

    let mut context =
        RequestContext::new(connection_id, uri.to_string()).with_subprotocol(subprotocol);
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            context = context.with_header(name.as_str(), value);
        }
    }
    context
}
