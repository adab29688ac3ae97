//! Demo execution engine.
//!
//! Stands in for a real GraphQL engine so the server can be exercised with
//! any `graphql-ws` client. It does not parse documents; it looks for a
//! known root field name in the query text:
//!
//! - `echo`: query answering with its variables and the connection id
//! - `ticks`: subscription emitting `{"ticks": n}` every `intervalMs`
//!   (default 1000, at least 1), stopping after `count` results when given

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use gqlws_core::{
    ExecutionError, ExecutionOutcome, ExecutionRequest, ExecutionResponse, Executor,
    RequestContext,
};
use serde_json::{Value, json};
use tracing::debug;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// The demo engine.
pub struct DemoExecutor;

#[async_trait]
impl Executor for DemoExecutor {
    async fn execute(
        &self,
        request: ExecutionRequest,
        context: Arc<RequestContext>,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        debug!(
            connection_id = %context.connection_id,
            operation_name = request.operation_name.as_deref(),
            "executing demo request"
        );

        if request.query.contains("ticks") {
            return Ok(ExecutionOutcome::Stream(ticks(&request)));
        }
        if request.query.contains("echo") {
            return Ok(ExecutionOutcome::Single(ExecutionResponse::data(json!({
                "echo": {
                    "variables": request.variables,
                    "connectionId": context.connection_id,
                }
            }))));
        }
        Ok(ExecutionOutcome::Single(ExecutionResponse::error(
            "unknown root field (expected `echo` or `ticks`)",
        )))
    }
}

fn ticks(request: &ExecutionRequest) -> gqlws_core::ResponseStream {
    let count = request.variables.get("count").and_then(Value::as_u64);
    let interval = request
        .variables
        .get("intervalMs")
        .and_then(Value::as_u64)
        .map_or(DEFAULT_INTERVAL, |ms| Duration::from_millis(ms.max(1)));

    async_stream::stream! {
        let mut timer = tokio::time::interval(interval);
        let mut n: u64 = 0;
        while count.is_none_or(|count| n < count) {
            let _ = timer.tick().await;
            yield Ok::<_, ExecutionError>(ExecutionResponse::data(json!({ "ticks": n })));
            n += 1;
        }
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn ctx() -> Arc<RequestContext> {
        Arc::new(RequestContext::new("conn_demo", "/graphql-ws"))
    }

    fn request(query: &str, variables: Value) -> ExecutionRequest {
        ExecutionRequest {
            query: query.into(),
            operation_name: None,
            variables: variables.as_object().cloned().unwrap_or_default(),
        }
    }

    #[tokio::test]
    async fn echo_returns_variables() {
        let outcome = DemoExecutor
            .execute(request("{ echo }", json!({"a": 1})), ctx())
            .await
            .unwrap();
        assert_matches!(
            outcome,
            ExecutionOutcome::Single(r) if r.data == Some(json!({
                "echo": {"variables": {"a": 1}, "connectionId": "conn_demo"}
            }))
        );
    }

    #[tokio::test]
    async fn ticks_stream_counts() {
        let outcome = DemoExecutor
            .execute(
                request("subscription { ticks }", json!({"count": 3, "intervalMs": 1})),
                ctx(),
            )
            .await
            .unwrap();
        let ExecutionOutcome::Stream(stream) = outcome else {
            panic!("expected stream");
        };
        let results: Vec<_> = stream.collect().await;
        assert_eq!(results.len(), 3);
        assert_eq!(
            results[2],
            Ok(ExecutionResponse::data(json!({"ticks": 2})))
        );
    }

    #[tokio::test]
    async fn zero_interval_is_clamped() {
        let outcome = DemoExecutor
            .execute(
                request("subscription { ticks }", json!({"count": 2, "intervalMs": 0})),
                ctx(),
            )
            .await
            .unwrap();
        let ExecutionOutcome::Stream(stream) = outcome else {
            panic!("expected stream");
        };
        let results = tokio::spawn(stream.collect::<Vec<_>>()).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn unknown_field_is_error_result() {
        let outcome = DemoExecutor
            .execute(request("{ other }", json!({})), ctx())
            .await
            .unwrap();
        assert_matches!(outcome, ExecutionOutcome::Single(r) if r.has_errors());
    }
}
