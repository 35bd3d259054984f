//! Bounded-concurrency execution of one round's tool calls

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::Semaphore;

use super::catalog::ToolCatalog;
use super::counters::RunCounters;
use crate::logging::SharedLogger;
use crate::mcp::ToolClient;
use crate::retry::{RetryContext, RetryPolicy};
use crate::types::{CallLimit, CancellationToken, ToolCallRequest, ToolCallResult};

/// Default number of tool calls allowed in flight at once
pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

/// Checks applied to every call before it reaches a server
///
/// Gating runs in request order and counts each admitted call, so repeated
/// calls of one tool within a round are limited individually.
pub struct CallGates<'a> {
    pub catalog: &'a ToolCatalog,
    pub counters: &'a mut RunCounters,
    pub consecutive_limit: CallLimit,
}

impl CallGates<'_> {
    /// Count the call and return its client, or the synthetic failure text
    fn admit(&mut self, tool: &str) -> Result<Arc<dyn ToolClient>, String> {
        if self.catalog.is_disabled(tool) {
            return Err(format!("Error: Tool '{}' is disabled by user configuration.", tool));
        }
        let count = self.counters.record_call(tool);
        if let CallLimit::Limited(limit) = self.consecutive_limit {
            if count > limit {
                return Err(format!(
                    "Error: Tool '{}' has been called consecutively {} times.",
                    tool, limit
                ));
            }
        }
        self.catalog
            .client_for(tool)
            .ok_or_else(|| format!("Error: Could not find server client for tool '{}'.", tool))
    }
}

/// Runs a round's tool calls in parallel, at most `max_concurrency` at a time
///
/// Every request yields exactly one result; results come back in request
/// order regardless of completion order.
pub struct ConcurrentExecutor {
    semaphore: Arc<Semaphore>,
    max_concurrency: usize,
    policy: RetryPolicy,
    logger: SharedLogger,
}

impl ConcurrentExecutor {
    pub fn new(max_concurrency: usize, logger: SharedLogger) -> Self {
        let policy = RetryPolicy::tool_call().with_logger(logger.clone());
        Self::with_policy(max_concurrency, policy, logger)
    }

    pub fn with_policy(max_concurrency: usize, policy: RetryPolicy, logger: SharedLogger) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
            policy,
            logger,
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub async fn execute_all(
        &self,
        requests: Vec<ToolCallRequest>,
        gates: &mut CallGates<'_>,
        cancel: &CancellationToken,
    ) -> Vec<ToolCallResult> {
        self.logger.info(&format!(
            "[ToolExecutor] Executing {} tool calls (max {} concurrent)",
            requests.len(),
            self.max_concurrency
        ));

        let mut results = Vec::with_capacity(requests.len());
        let mut admitted = Vec::new();
        for request in &requests {
            match gates.admit(&request.tool_name) {
                Ok(client) => admitted.push((request, client)),
                Err(rejection) => {
                    self.logger.warn(&format!("[ToolExecutor] {}", rejection));
                    results.push(ToolCallResult::failure(request, rejection, Duration::ZERO));
                }
            }
        }

        let calls = admitted
            .into_iter()
            .map(|(request, client)| self.execute_one(request, client, cancel));
        results.extend(join_all(calls).await);
        results.sort_by_key(|r| r.ordinal);
        results
    }

    async fn execute_one(
        &self,
        request: &ToolCallRequest,
        client: Arc<dyn ToolClient>,
        cancel: &CancellationToken,
    ) -> ToolCallResult {
        let started = Instant::now();

        let _permit = tokio::select! {
            _ = cancel.cancelled() => {
                return ToolCallResult::failure(request, "Error: Cancelled before start", started.elapsed());
            }
            permit = self.semaphore.acquire() => match permit {
                Ok(permit) => permit,
                Err(_) => return ToolCallResult::failure(request, "Error: Executor is shut down", started.elapsed()),
            },
        };

        let context = RetryContext::tool(client.server().name.clone(), request.tool_name.clone());
        self.logger.debug(&format!(
            "[ToolExecutor] -> {}{} args {}",
            request.tool_name, context, request.arguments
        ));

        let outcome = self
            .policy
            .execute("tools/call", &context, cancel, |_| {
                client.call_tool(&request.tool_name, request.arguments.clone(), cancel)
            })
            .await;

        let elapsed = started.elapsed();
        match outcome {
            Ok(output) => {
                self.logger.info(&format!(
                    "[ToolExecutor] {} succeeded in {:?} ({} chars)",
                    request.tool_name,
                    elapsed,
                    output.chars().count()
                ));
                ToolCallResult::success(request, output, elapsed)
            }
            Err(e) => {
                self.logger.warn(&format!("[ToolExecutor] {} failed in {:?}: {}", request.tool_name, elapsed, e));
                ToolCallResult::failure(request, format!("Error: {}", e), elapsed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::mcp::{MockToolClient, MockToolResponse};
    use crate::types::{PendingToolCall, ServerDescriptor, ToolDescriptor};
    use serde_json::json;

    fn quick_policy() -> RetryPolicy {
        RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(5), Duration::from_secs(5))
    }

    async fn connected(mock: MockToolClient) -> Arc<MockToolClient> {
        let mock = Arc::new(mock);
        mock.connect(&CancellationToken::new()).await.unwrap();
        mock
    }

    fn request(name: &str, ordinal: usize) -> ToolCallRequest {
        ToolCallRequest::from_pending(&PendingToolCall::new(format!("call_{}", ordinal), name, r#"{"n":1}"#), ordinal)
    }

    fn catalog_with(client: Arc<MockToolClient>, names: &[&str]) -> ToolCatalog {
        let mut catalog = ToolCatalog::new(NoOpLogger::shared());
        let tools = names.iter().map(|n| ToolDescriptor::new(*n, "")).collect();
        catalog.add_server(client, tools);
        catalog
    }

    #[tokio::test]
    async fn test_results_in_request_order_with_bounded_concurrency() {
        let mock = connected(
            MockToolClient::new(ServerDescriptor::new("s", "mock://s"))
                .with_tool("slow", MockToolResponse::Echo)
                .with_call_delay(Duration::from_millis(30)),
        )
        .await;
        let catalog = catalog_with(mock.clone(), &["slow"]);
        let mut counters = RunCounters::new();
        let mut gates = CallGates {
            catalog: &catalog,
            counters: &mut counters,
            consecutive_limit: CallLimit::Unlimited,
        };

        let executor = ConcurrentExecutor::with_policy(2, quick_policy(), NoOpLogger::shared());
        let requests: Vec<_> = (0..6).rev().map(|i| request("slow", i)).collect();
        let results = executor.execute_all(requests, &mut gates, &CancellationToken::new()).await;

        let ordinals: Vec<usize> = results.iter().map(|r| r.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2, 3, 4, 5]);
        assert!(results.iter().all(|r| r.success));
        assert_eq!(mock.max_in_flight(), 2);
    }

    #[tokio::test]
    async fn test_gates_produce_synthetic_failures() {
        let server = ServerDescriptor::new("s", "mock://s").with_tool_toggle("off", false);
        let mock = connected(
            MockToolClient::new(server)
                .with_tool("ok", MockToolResponse::Text("fine".to_string()))
                .with_tool("off", MockToolResponse::Echo)
                .with_tool("busy", MockToolResponse::Echo),
        )
        .await;
        let catalog = catalog_with(mock.clone(), &["ok", "off", "busy"]);
        let mut counters = RunCounters::new();
        for _ in 0..3 {
            counters.record_call("busy");
        }
        let mut gates = CallGates {
            catalog: &catalog,
            counters: &mut counters,
            consecutive_limit: CallLimit::Limited(2),
        };

        let executor = ConcurrentExecutor::with_policy(5, quick_policy(), NoOpLogger::shared());
        let results = executor
            .execute_all(
                vec![request("ok", 0), request("off", 1), request("busy", 2), request("ghost", 3)],
                &mut gates,
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(results[0].output, "fine");
        assert!(results[0].success);
        assert_eq!(results[1].output, "Error: Tool 'off' is disabled by user configuration.");
        assert_eq!(results[2].output, "Error: Tool 'busy' has been called consecutively 2 times.");
        assert_eq!(results[3].output, "Error: Could not find server client for tool 'ghost'.");
        assert!(results[1..].iter().all(|r| !r.success));

        // Only the allowed call reached the server
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_calls_in_one_round_count_individually() {
        let mock = connected(
            MockToolClient::new(ServerDescriptor::new("s", "mock://s")).with_tool("lookup", MockToolResponse::Echo),
        )
        .await;
        let catalog = catalog_with(mock.clone(), &["lookup"]);
        let mut counters = RunCounters::new();
        let mut gates = CallGates {
            catalog: &catalog,
            counters: &mut counters,
            consecutive_limit: CallLimit::Limited(1),
        };

        let executor = ConcurrentExecutor::with_policy(5, quick_policy(), NoOpLogger::shared());
        let results = executor
            .execute_all(vec![request("lookup", 0), request("lookup", 1)], &mut gates, &CancellationToken::new())
            .await;

        assert!(results[0].success);
        assert!(!results[1].success);
        assert_eq!(counters.consecutive("lookup"), 2);
    }

    #[tokio::test]
    async fn test_tool_errors_become_failed_results() {
        let mock = connected(
            MockToolClient::new(ServerDescriptor::new("s", "mock://s"))
                .with_tool("broken", MockToolResponse::ToolError("disk full".to_string()))
                .with_tool("flaky", MockToolResponse::ServerError("503".to_string())),
        )
        .await;
        let catalog = catalog_with(mock.clone(), &["broken", "flaky"]);
        let mut counters = RunCounters::new();
        let mut gates = CallGates {
            catalog: &catalog,
            counters: &mut counters,
            consecutive_limit: CallLimit::Limited(5),
        };

        let executor = ConcurrentExecutor::with_policy(5, quick_policy(), NoOpLogger::shared());
        let results = executor
            .execute_all(vec![request("broken", 0), request("flaky", 1)], &mut gates, &CancellationToken::new())
            .await;

        assert!(!results[0].success);
        assert!(results[0].output.starts_with("Error: "));
        assert!(results[0].output.contains("disk full"));
        assert!(results[1].output.contains("after 3 attempts"));

        // Tool-level error is not retried, server error is
        let calls = mock.calls();
        assert_eq!(calls.iter().filter(|(n, _)| n == "broken").count(), 1);
        assert_eq!(calls.iter().filter(|(n, _)| n == "flaky").count(), 3);
        assert_eq!(calls[0].1, json!({ "n": 1 }));
    }

    #[tokio::test]
    async fn test_concurrency_floor_is_one() {
        let executor = ConcurrentExecutor::new(0, NoOpLogger::shared());
        assert_eq!(executor.max_concurrency(), 1);
    }
}
