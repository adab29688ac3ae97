//! JSON text-frame codec.
//!
//! Frames are objects with a `type`, an optional `id`, and an optional
//! `payload`. Decoding never fails on an unknown `type`: it yields
//! [`ClientMessage::Unrecognized`] so the dispatcher decides what that means.

use serde::Deserialize;
use serde_json::Value;

use crate::protocol::{
    ClientMessage, GQL_CONNECTION_INIT, GQL_CONNECTION_TERMINATE, GQL_START, GQL_STOP,
    ServerMessage, StartPayload,
};

/// Frame could not be turned into a protocol message.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Not JSON, or not an object of the expected shape.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    /// JSON object without a `type`.
    #[error("message is missing the `type` field")]
    MissingType,
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    payload: Option<Value>,
}

/// Decode one inbound text frame.
pub fn decode(text: &str) -> Result<ClientMessage, CodecError> {
    let frame: RawFrame = serde_json::from_str(text)?;
    let kind = frame.kind.ok_or(CodecError::MissingType)?;
    let id = frame.id.and_then(operation_id);

    let message = match kind.as_str() {
        GQL_CONNECTION_INIT => ClientMessage::ConnectionInit {
            payload: frame.payload,
        },
        GQL_START => ClientMessage::Start {
            id,
            payload: frame
                .payload
                .and_then(|p| serde_json::from_value::<StartPayload>(p).ok()),
        },
        GQL_STOP => ClientMessage::Stop { id },
        GQL_CONNECTION_TERMINATE => ClientMessage::ConnectionTerminate,
        _ => ClientMessage::Unrecognized { kind },
    };
    Ok(message)
}

/// Encode one outbound message as a text frame.
pub fn encode(message: &ServerMessage) -> Result<String, CodecError> {
    Ok(serde_json::to_string(message)?)
}

/// Operation ids are strings on the wire; numeric ids are accepted as their
/// decimal text.
fn operation_id(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
