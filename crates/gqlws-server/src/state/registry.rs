//! Connection registry: initialized connections and their operations.

use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use gqlws_core::ServerMessage;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::operations::OperationRegistry;

/// Tracks initialized connections and owns one [`OperationRegistry`] per
/// connection.
///
/// Connections are sharded independently, so unrelated connections never
/// contend on a shared lock.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    active: DashSet<String>,
    connections: DashMap<String, Arc<OperationRegistry>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a connection initialized. Idempotent.
    pub fn activate(&self, connection_id: &str) {
        let _ = self.active.insert(connection_id.to_owned());
    }

    /// Whether the connection completed the handshake.
    pub fn is_active(&self, connection_id: &str) -> bool {
        self.active.contains(connection_id)
    }

    /// Create the connection's operation set if absent. Never replaces an
    /// existing set.
    pub fn init_operations(&self, connection_id: &str) {
        let _ = self
            .connections
            .entry(connection_id.to_owned())
            .or_insert_with(|| Arc::new(OperationRegistry::new()));
    }

    /// Whether `operation_id` is active on the connection.
    pub fn operation_exists(&self, connection_id: &str, operation_id: &str) -> bool {
        self.connections
            .get(connection_id)
            .is_some_and(|ops| ops.contains(operation_id))
    }

    /// Store the cancellation handle built by `factory`.
    ///
    /// No-op returning `false` when the connection has no operation set (it
    /// was torn down) or the id is already taken; the caller must then
    /// discard its result stream.
    pub fn save_operation<F>(&self, connection_id: &str, operation_id: &str, factory: F) -> bool
    where
        F: FnOnce(&str) -> CancellationToken,
    {
        // The shard guard is held across the insert so a concurrent
        // `terminate_connection` cannot miss the new handle.
        match self.connections.get(connection_id) {
            Some(ops) => ops.insert_with(operation_id, factory),
            None => false,
        }
    }

    /// Cancel and remove an operation.
    ///
    /// Returns the `complete` message to send when this call removed the
    /// operation, `None` when it was unknown or already finished.
    pub fn stop_operation(&self, connection_id: &str, operation_id: &str) -> Option<ServerMessage> {
        let ops = self.connections.get(connection_id)?;
        if ops.cancel(operation_id) {
            debug!(connection_id, operation_id, "operation stopped");
            Some(ServerMessage::complete(operation_id))
        } else {
            None
        }
    }

    /// Remove a naturally finished operation without cancelling it.
    ///
    /// Returns `true` when this call removed it; only then may the caller
    /// emit a terminal message.
    pub fn remove_completed(&self, connection_id: &str, operation_id: &str) -> bool {
        self.connections
            .get(connection_id)
            .is_some_and(|ops| ops.remove(operation_id))
    }

    /// Drop the connection: remove its operation set, cancel every handle in
    /// it, and clear the initialized flag.
    pub fn terminate_connection(&self, connection_id: &str) {
        let _ = self.active.remove(connection_id);
        if let Some((_, ops)) = self.connections.remove(connection_id) {
            let cancelled = ops.cancel_all();
            debug!(connection_id, cancelled, "connection terminated");
        }
    }

    /// Connections with an operation set.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Connections that completed the handshake.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Active operations across all connections.
    pub fn operation_count(&self) -> usize {
        self.connections.iter().map(|entry| entry.value().len()).sum()
    }

    /// Active operation ids on one connection, sorted.
    pub fn operation_ids(&self, connection_id: &str) -> Vec<String> {
        self.connections
            .get(connection_id)
            .map(|ops| ops.ids())
            .unwrap_or_default()
    }
}
