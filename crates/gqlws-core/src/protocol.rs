//! Logical message shapes of the `graphql-ws` protocol.
//!
//! Inbound frames decode into [`ClientMessage`]; every frame the server emits
//! is a [`ServerMessage`]. Byte-level encoding lives in [`crate::codec`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::execution::ExecutionResponse;

/// WebSocket subprotocol negotiated on upgrade.
pub const SUBPROTOCOL: &str = "graphql-ws";

// ── Inbound `type` values ───────────────────────────────────────────

/// Client asks to initialize the connection.
pub const GQL_CONNECTION_INIT: &str = "connection_init";
/// Client starts an operation.
pub const GQL_START: &str = "start";
/// Client stops a running operation.
pub const GQL_STOP: &str = "stop";
/// Client ends the connection.
pub const GQL_CONNECTION_TERMINATE: &str = "connection_terminate";

// ── Outbound `type` values ──────────────────────────────────────────

/// Server accepted `connection_init`.
pub const GQL_CONNECTION_ACK: &str = "connection_ack";
/// Connection-wide failure.
pub const GQL_CONNECTION_ERROR: &str = "connection_error";
/// Result for an operation.
pub const GQL_DATA: &str = "data";
/// Operation-level failure.
pub const GQL_ERROR: &str = "error";
/// Operation finished.
pub const GQL_COMPLETE: &str = "complete";
/// Keep-alive signal.
pub const GQL_CONNECTION_KEEP_ALIVE: &str = "ka";

/// Payload of a `start` message.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPayload {
    /// Query document text.
    #[serde(default)]
    pub query: Option<String>,
    /// Operation to run when the document holds several.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    /// Variable values keyed by name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Map<String, Value>>,
}

impl StartPayload {
    /// Payload with just a query document.
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    /// The query text, if present and non-empty.
    pub fn non_empty_query(&self) -> Option<&str> {
        self.query.as_deref().filter(|q| !q.is_empty())
    }
}

/// A decoded inbound message.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientMessage {
    /// `connection_init`, with the optional connection parameters.
    ConnectionInit {
        /// Client-supplied connection parameters.
        payload: Option<Value>,
    },
    /// `start`. `payload` is `None` when absent or not shaped like a
    /// [`StartPayload`].
    Start {
        /// Client-chosen operation id.
        id: Option<String>,
        /// Query, operation name, and variables.
        payload: Option<StartPayload>,
    },
    /// `stop`.
    Stop {
        /// Operation to stop.
        id: Option<String>,
    },
    /// `connection_terminate`.
    ConnectionTerminate,
    /// Any `type` this server does not speak.
    Unrecognized {
        /// The raw `type` value.
        kind: String,
    },
}

impl ClientMessage {
    /// Wire `type` of this message.
    pub fn kind(&self) -> &str {
        match self {
            Self::ConnectionInit { .. } => GQL_CONNECTION_INIT,
            Self::Start { .. } => GQL_START,
            Self::Stop { .. } => GQL_STOP,
            Self::ConnectionTerminate => GQL_CONNECTION_TERMINATE,
            Self::Unrecognized { kind } => kind,
        }
    }
}

/// An outbound message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Handshake accepted.
    ConnectionAck,
    /// Connection-wide failure (handshake, undecodable frame).
    ConnectionError {
        /// Generic description.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    /// One-time keep-alive after the ack.
    #[serde(rename = "ka")]
    KeepAlive,
    /// A successful result.
    Data {
        /// Operation id.
        id: String,
        /// Execution result body.
        payload: ExecutionResponse,
    },
    /// A failed operation. `payload` is only set when the failure came from
    /// an execution result.
    Error {
        /// Operation id, absent when the client never sent one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        /// Execution result body carrying the errors.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<ExecutionResponse>,
    },
    /// No more messages for this operation.
    Complete {
        /// Operation id.
        id: String,
    },
}

impl ServerMessage {
    /// Map an execution result to `data`, or to `error` when it carries errors.
    pub fn from_response(id: &str, response: ExecutionResponse) -> Self {
        if response.has_errors() {
            Self::Error {
                id: Some(id.to_owned()),
                payload: Some(response),
            }
        } else {
            Self::Data {
                id: id.to_owned(),
                payload: response,
            }
        }
    }

    /// `error` without payload for the given operation.
    pub fn error(id: &str) -> Self {
        Self::Error {
            id: Some(id.to_owned()),
            payload: None,
        }
    }

    /// `error` with neither id nor payload.
    pub fn anonymous_error() -> Self {
        Self::Error {
            id: None,
            payload: None,
        }
    }

    /// `complete` for the given operation.
    pub fn complete(id: &str) -> Self {
        Self::Complete { id: id.to_owned() }
    }

    /// `connection_error` with a generic message.
    pub fn connection_error(message: &str) -> Self {
        Self::ConnectionError {
            payload: Some(serde_json::json!({ "message": message })),
        }
    }

    /// Wire `type` of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConnectionAck => GQL_CONNECTION_ACK,
            Self::ConnectionError { .. } => GQL_CONNECTION_ERROR,
            Self::KeepAlive => GQL_CONNECTION_KEEP_ALIVE,
            Self::Data { .. } => GQL_DATA,
            Self::Error { .. } => GQL_ERROR,
            Self::Complete { .. } => GQL_COMPLETE,
        }
    }

    /// Operation id this message correlates to.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Data { id, .. } | Self::Complete { id } => Some(id),
            Self::Error { id, .. } => id.as_deref(),
            Self::ConnectionAck | Self::ConnectionError { .. } | Self::KeepAlive => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_without_errors_maps_to_data() {
        let msg = ServerMessage::from_response("op1", ExecutionResponse::data(json!({"x": 1})));
        assert_eq!(msg.kind(), GQL_DATA);
        assert_eq!(msg.id(), Some("op1"));
    }

    #[test]
    fn response_with_errors_maps_to_error_with_payload() {
        let msg = ServerMessage::from_response("op1", ExecutionResponse::error("boom"));
        match msg {
            ServerMessage::Error { id, payload } => {
                assert_eq!(id.as_deref(), Some("op1"));
                assert!(payload.unwrap().has_errors());
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn empty_errors_collection_is_data() {
        let response = ExecutionResponse {
            data: Some(json!(1)),
            errors: Some(Vec::new()),
            extensions: None,
        };
        let msg = ServerMessage::from_response("op1", response);
        assert_eq!(msg.kind(), GQL_DATA);
    }

    #[test]
    fn connection_level_messages_have_no_id() {
        assert!(ServerMessage::ConnectionAck.id().is_none());
        assert!(ServerMessage::KeepAlive.id().is_none());
        assert!(ServerMessage::connection_error("bad").id().is_none());
        assert!(ServerMessage::anonymous_error().id().is_none());
    }

    #[test]
    fn client_message_kinds() {
        assert_eq!(ClientMessage::ConnectionTerminate.kind(), "connection_terminate");
        assert_eq!(ClientMessage::Stop { id: None }.kind(), "stop");
        let unknown = ClientMessage::Unrecognized {
            kind: "subscribe".into(),
        };
        assert_eq!(unknown.kind(), "subscribe");
    }

    #[test]
    fn non_empty_query() {
        assert_eq!(StartPayload::query("{ a }").non_empty_query(), Some("{ a }"));
        assert!(StartPayload::query("").non_empty_query().is_none());
        assert!(StartPayload::default().non_empty_query().is_none());
    }
}
