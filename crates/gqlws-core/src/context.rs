//! Per-connection request context.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// The upgrade request a connection was opened with.
///
/// Captured once by the transport and handed to the execution engine on
/// every `start`, so resolvers can read headers (auth tokens, tenant ids)
/// from the HTTP upgrade request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestContext {
    /// Connection this request opened.
    pub connection_id: String,
    /// Request URI (path and query).
    pub uri: String,
    /// Request headers, names lowercased.
    pub headers: BTreeMap<String, String>,
    /// Negotiated WebSocket subprotocol.
    pub subprotocol: Option<String>,
    /// When the connection was accepted.
    pub connected_at: DateTime<Utc>,
}

impl RequestContext {
    /// Context with no headers.
    pub fn new(connection_id: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            uri: uri.into(),
            headers: BTreeMap::new(),
            subprotocol: None,
            connected_at: Utc::now(),
        }
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let _ = self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Set the negotiated subprotocol.
    #[must_use]
    pub fn with_subprotocol(mut self, subprotocol: Option<String>) -> Self {
        self.subprotocol = subprotocol;
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}
