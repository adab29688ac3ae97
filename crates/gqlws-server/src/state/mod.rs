//! Connection and operation state.

pub mod operations;
pub mod registry;

pub use operations::OperationRegistry;
pub use registry::ConnectionRegistry;
