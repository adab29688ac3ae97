//! Server error types.

use gqlws_core::ServerMessage;

/// A client message the dispatcher refuses to handle.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The `type` is not part of the protocol.
    #[error("unexpected message type: {kind}")]
    UnexpectedMessage {
        /// Raw `type` value.
        kind: String,
    },
    /// The connection has no request context to execute against.
    #[error("no request context on connection {connection_id} for operation {operation_id}")]
    MissingContext {
        /// Connection the start arrived on.
        connection_id: String,
        /// Operation that could not start.
        operation_id: String,
    },
}

impl DispatchError {
    /// Short machine-readable label, used as a metric label.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::UnexpectedMessage { .. } => "unexpected_message",
            Self::MissingContext { .. } => "missing_context",
        }
    }

    /// The generic message sent to the client in reply.
    pub fn to_message(&self) -> ServerMessage {
        match self {
            Self::UnexpectedMessage { .. } => ServerMessage::connection_error("unexpected message type"),
            Self::MissingContext { operation_id, .. } => ServerMessage::error(operation_id),
        }
    }
}

/// Failure to start or run the HTTP server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Could not bind the listener.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Other I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn unexpected_message_answers_with_connection_error() {
        let err = DispatchError::UnexpectedMessage {
            kind: "subscribe".into(),
        };
        assert_eq!(err.reason(), "unexpected_message");
        assert_eq!(err.to_string(), "unexpected message type: subscribe");
        assert_matches!(err.to_message(), ServerMessage::ConnectionError { payload: Some(_) });
    }

    #[test]
    fn missing_context_answers_with_operation_error() {
        let err = DispatchError::MissingContext {
            connection_id: "conn_1".into(),
            operation_id: "op1".into(),
        };
        assert_eq!(err.reason(), "missing_context");
        assert_eq!(err.to_message(), ServerMessage::error("op1"));
    }

    #[test]
    fn bind_error_display() {
        let err = ServerError::Bind {
            addr: "127.0.0.1:1".into(),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        };
        assert_eq!(err.to_string(), "failed to bind 127.0.0.1:1: in use");
    }
}
