//! WebSocket transport for the `graphql-ws` protocol.

pub mod connection;
pub mod session;

pub use connection::ClientConnection;
pub use session::run_ws_session;
