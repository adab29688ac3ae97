//! # gqlws-server
//!
//! The `graphql-ws` protocol engine and its Axum transport.
//!
//! - **State**: per-connection operation registries with cancellation handles
//! - **Dispatcher**: routes decoded client messages to handshake, start, stop,
//!   and teardown handling
//! - **Delivery**: turns execution outcomes into outbound messages, one
//!   streamed result in flight at a time
//! - **WebSocket**: connection handle and per-client session loop
//! - **Server**: router with `/health`, `/metrics`, and the upgrade endpoint

#![deny(unsafe_code)]

pub mod config;
pub mod delivery;
pub mod dispatcher;
pub mod errors;
pub mod health;
pub mod server;
pub mod shutdown;
pub mod state;
pub mod websocket;

pub use config::ServerConfig;
pub use dispatcher::{MessageDispatcher, OutboundStream};
pub use errors::{DispatchError, ServerError};
pub use server::GraphQlWsServer;
pub use state::ConnectionRegistry;
