//! `/health` endpoint.

use std::time::Instant;

use serde::Serialize;

use crate::state::ConnectionRegistry;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Open `graphql-ws` connections.
    pub connections: usize,
    /// Streaming operations currently registered.
    pub active_operations: usize,
}

/// Build a health response from the registry's live counts.
pub fn health_check(start_time: Instant, registry: &ConnectionRegistry) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections: registry.connection_count(),
        active_operations: registry.operation_count(),
    }
}
