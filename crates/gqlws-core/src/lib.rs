//! # gqlws-core
//!
//! Shared vocabulary for the gqlws crates:
//!
//! - **Protocol**: [`ClientMessage`] / [`ServerMessage`] logical message shapes
//! - **Codec**: JSON text frames to and from protocol messages
//! - **Execution**: the [`Executor`] contract the server drives, with single
//!   and streaming outcomes
//! - **Context**: per-connection [`RequestContext`] captured at upgrade time
//! - **IDs**: connection id generation

#![deny(unsafe_code)]

pub mod codec;
pub mod context;
pub mod execution;
pub mod ids;
pub mod protocol;

pub use codec::CodecError;
pub use context::RequestContext;
pub use execution::{
    ExecutionError, ExecutionOutcome, ExecutionRequest, ExecutionResponse, Executor,
    ResponseStream,
};
pub use ids::ConnectionId;
pub use protocol::{ClientMessage, ServerMessage, StartPayload};
