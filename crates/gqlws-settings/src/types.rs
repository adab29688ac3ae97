//! Settings types.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GqlWsSettings {
    /// Network and transport settings.
    pub server: ServerSettings,
    /// Protocol endpoint settings.
    pub graphql_ws: GraphQlWsSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

impl GqlWsSettings {
    /// Check cross-field constraints the type system cannot express.
    pub fn validate(&self) -> Result<()> {
        if !self.graphql_ws.path.starts_with('/') {
            return Err(SettingsError::Invalid {
                field: "graphqlWs.path",
                reason: format!("must start with '/', got {:?}", self.graphql_ws.path),
            });
        }
        if self.server.outbound_buffer == 0 {
            return Err(SettingsError::Invalid {
                field: "server.outboundBuffer",
                reason: "must be at least 1".into(),
            });
        }
        if self.server.max_message_size < MIN_MESSAGE_SIZE {
            return Err(SettingsError::Invalid {
                field: "server.maxMessageSize",
                reason: format!("must be at least {MIN_MESSAGE_SIZE}"),
            });
        }
        Ok(())
    }
}

/// Smallest accepted inbound frame limit.
pub const MIN_MESSAGE_SIZE: usize = 1024;

/// Server network settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port (`0` picks a free port).
    pub port: u16,
    /// Largest inbound frame in bytes.
    pub max_message_size: usize,
    /// Per-connection outbound queue length. Result delivery waits for room
    /// in this queue before pulling the next result.
    pub outbound_buffer: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_message_size: 1024 * 1024,
            outbound_buffer: 64,
        }
    }
}

/// `graphql-ws` endpoint settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphQlWsSettings {
    /// Mount the WebSocket endpoint at all.
    pub enabled: bool,
    /// Route the endpoint is mounted on.
    pub path: String,
    /// Send one `ka` right after `connection_ack`.
    pub keep_alive_enabled: bool,
}

impl Default for GraphQlWsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/graphql-ws".to_string(),
            keep_alive_enabled: true,
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
