//! Server configuration.

use gqlws_settings::GqlWsSettings;
use serde::{Deserialize, Serialize};

/// Runtime configuration for [`GraphQlWsServer`](crate::GraphQlWsServer).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Max inbound WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Per-connection outbound queue length.
    pub outbound_buffer: usize,
    /// Mount the WebSocket endpoint.
    pub graphql_ws_enabled: bool,
    /// Route of the WebSocket endpoint.
    pub path: String,
    /// Follow `connection_ack` with one `ka`.
    pub keep_alive_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            max_message_size: 1024 * 1024,
            outbound_buffer: 64,
            graphql_ws_enabled: true,
            path: "/graphql-ws".into(),
            keep_alive_enabled: true,
        }
    }
}

impl From<&GqlWsSettings> for ServerConfig {
    fn from(settings: &GqlWsSettings) -> Self {
        Self {
            host: settings.server.host.clone(),
            port: settings.server.port,
            max_message_size: settings.server.max_message_size,
            outbound_buffer: settings.server.outbound_buffer.max(1),
            graphql_ws_enabled: settings.graphql_ws.enabled,
            path: settings.graphql_ws.path.clone(),
            keep_alive_enabled: settings.graphql_ws.keep_alive_enabled,
        }
    }
}

impl ServerConfig {
    /// `host:port` as passed to the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_port_is_zero() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.port, 0);
        assert_eq!(cfg.bind_addr(), "127.0.0.1:0");
    }

    #[test]
    fn defaults_match_protocol_settings() {
        let cfg = ServerConfig::default();
        let settings = GqlWsSettings::default();
        assert_eq!(cfg.path, settings.graphql_ws.path);
        assert_eq!(cfg.keep_alive_enabled, settings.graphql_ws.keep_alive_enabled);
        assert_eq!(cfg.outbound_buffer, settings.server.outbound_buffer);
    }

    #[test]
    fn from_settings() {
        let mut settings = GqlWsSettings::default();
        settings.server.port = 9090;
        settings.graphql_ws.path = "/subscriptions".into();
        settings.graphql_ws.keep_alive_enabled = false;
        settings.graphql_ws.enabled = false;

        let cfg = ServerConfig::from(&settings);
        assert_eq!(cfg.port, 9090);
        assert_eq!(cfg.path, "/subscriptions");
        assert!(!cfg.keep_alive_enabled);
        assert!(!cfg.graphql_ws_enabled);
    }

    #[test]
    fn serde_roundtrip() {
        let cfg = ServerConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ServerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
