//! Execution engine contract.
//!
//! The server never interprets query documents. It hands an
//! [`ExecutionRequest`] to an [`Executor`] and gets back either one
//! [`ExecutionResponse`] (queries, mutations) or a stream of them
//! (subscriptions).

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::context::RequestContext;

/// What to execute.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExecutionRequest {
    /// Query document text (never empty).
    pub query: String,
    /// Operation to run when the document holds several.
    pub operation_name: Option<String>,
    /// Variable values.
    pub variables: Map<String, Value>,
}

/// A structured execution result.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResponse {
    /// Result data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Errors raised while executing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<Value>>,
    /// Implementation-specific extras.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

impl ExecutionResponse {
    /// Successful result with the given data.
    pub fn data(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }

    /// Failed result with one error message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            data: None,
            errors: Some(vec![serde_json::json!({ "message": message.into() })]),
            extensions: None,
        }
    }

    /// Whether the result carries a non-empty `errors` collection.
    pub fn has_errors(&self) -> bool {
        self.errors.as_ref().is_some_and(|errors| !errors.is_empty())
    }
}

/// Stream of subscription results.
pub type ResponseStream = BoxStream<'static, Result<ExecutionResponse, ExecutionError>>;

/// Result of invoking the engine.
pub enum ExecutionOutcome {
    /// One result (query or mutation).
    Single(ExecutionResponse),
    /// Unbounded result stream (subscription).
    Stream(ResponseStream),
}

impl fmt::Debug for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(response) => f.debug_tuple("Single").field(response).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Engine or stream failure. Never shown to clients beyond a bare `error`.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    /// The engine could not run the request.
    #[error("execution failed: {message}")]
    Failed {
        /// Description.
        message: String,
    },
    /// A result stream broke after it started.
    #[error("result stream failed: {message}")]
    Stream {
        /// Description.
        message: String,
    },
}

/// The query-execution engine.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute a request in the context of the connection that sent it.
    async fn execute(
        &self,
        request: ExecutionRequest,
        context: Arc<RequestContext>,
    ) -> Result<ExecutionOutcome, ExecutionError>;
}
