//! Prometheus metrics recorder and metric names.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus recorder as the global `metrics` recorder.
///
/// Returns the handle used to render `/metrics`. Fails if a global recorder
/// is already installed.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// A handle whose recorder is never installed. Renders empty output; used
/// by tests and by servers built without a global recorder.
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

/// Render Prometheus text format.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

/// WebSocket connections accepted (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "gqlws_connections_total";
/// WebSocket connections closed (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "gqlws_disconnections_total";
/// Open WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "gqlws_connections_active";
/// Connection lifetime in seconds (histogram).
pub const WS_SESSION_DURATION_SECONDS: &str = "gqlws_session_duration_seconds";
/// Inbound protocol messages (counter, labels: type).
pub const MESSAGES_RECEIVED_TOTAL: &str = "gqlws_messages_received_total";
/// Inbound frames that could not be decoded or dispatched (counter, labels: reason).
pub const PROTOCOL_ERRORS_TOTAL: &str = "gqlws_protocol_errors_total";
/// Operations handed to the execution engine (counter, labels: kind).
pub const OPERATIONS_STARTED_TOTAL: &str = "gqlws_operations_started_total";
/// Streaming operations that ran to natural completion (counter).
pub const OPERATIONS_COMPLETED_TOTAL: &str = "gqlws_operations_completed_total";
/// Streaming operations cancelled by `stop` (counter).
pub const OPERATIONS_STOPPED_TOTAL: &str = "gqlws_operations_stopped_total";
/// Execution or result-stream failures (counter).
pub const DELIVERY_ERRORS_TOTAL: &str = "gqlws_delivery_errors_total";
/// Outbound messages dropped because the connection was closed (counter).
pub const OUTBOUND_DROPS_TOTAL: &str = "gqlws_outbound_drops_total";
