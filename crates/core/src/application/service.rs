// Agent Service Facade
//
// One explicit instance is built at application startup and handed by
// reference to every caller; there is no hidden global. Config is frozen
// at construction.

use crate::application::queue::{RequestQueue, ResponseHandle};
use crate::application::retry::{RetryPolicy, RetryingExecutor};
use crate::domain::{AgentRequest, AgentResponse, QueueStatus, ServiceConfig};
use crate::port::{AgentExecutor, TimeProvider};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Per-call routing knobs for `query_json`
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub working_dir: Option<PathBuf>,
    pub timeout_ms: Option<i64>,
    pub priority: i32,
}

/// Public surface over the queue, retry layer, and executor
pub struct AgentService {
    queue: RequestQueue,
    config: ServiceConfig,
}

impl AgentService {
    /// Wire the service: the supplied executor is wrapped with the retry
    /// decorator and placed behind the concurrency-gated queue.
    pub fn new(
        config: ServiceConfig,
        executor: Arc<dyn AgentExecutor>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        let policy = RetryPolicy {
            retry_on_error: config.retry_on_error,
            max_retries: config.max_retries,
            base_delay_ms: config.retry_delay_ms,
        };
        let retrying: Arc<dyn AgentExecutor> = Arc::new(RetryingExecutor::new(executor, policy));
        let queue = RequestQueue::new(config.max_concurrent, retrying, time_provider);

        info!(
            max_concurrent = config.max_concurrent,
            retry_on_error = config.retry_on_error,
            max_retries = config.max_retries,
            "Agent service ready"
        );

        Self { queue, config }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Enqueue without awaiting, for callers that fan out
    pub fn enqueue(&self, request: AgentRequest) -> ResponseHandle {
        self.queue.enqueue(request)
    }

    /// Enqueue and await the terminal response
    pub async fn query(&self, request: AgentRequest) -> AgentResponse {
        self.queue.enqueue(request).wait().await
    }

    /// Ask for structured output: wraps the prompt in an instruction
    /// block demanding a single bare JSON object and marks the request
    /// so the executor runs structured extraction on the reply.
    pub async fn query_json(
        &self,
        prompt: &str,
        schema_description: &str,
        options: QueryOptions,
    ) -> AgentResponse {
        let mut request = AgentRequest::new(json_prompt(prompt, schema_description));
        request.json_schema = Some(schema_description.to_string());
        request.working_dir = options.working_dir;
        request.timeout_ms = options.timeout_ms;
        request.priority = options.priority;

        self.query(request).await
    }

    pub fn status(&self) -> QueueStatus {
        self.queue.status()
    }

    /// Discard all pending requests; returns how many were cleared
    pub fn clear_queue(&self) -> usize {
        self.queue.clear()
    }

    /// Explicit teardown: pending requests resolve as cleared, in-flight
    /// attempts run to completion. Dropping the instance afterwards
    /// releases everything else.
    pub fn reset(&self) -> usize {
        self.queue.clear()
    }
}

/// Instruction block wrapped around JSON queries. The shape hint is
/// advisory text for the model, not an enforced schema.
fn json_prompt(prompt: &str, schema_description: &str) -> String {
    format!(
        "{prompt}\n\n\
         Respond with a single valid JSON object and nothing else: \
         no commentary, no markdown code fences, no text before or after \
         the JSON. The object must have this shape:\n{schema_description}\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::agent_executor::mocks::{MockAgentExecutor, MockBehavior};
    use crate::port::time_provider::SystemTimeProvider;

    fn service(mock: Arc<MockAgentExecutor>) -> AgentService {
        AgentService::new(
            ServiceConfig::default(),
            mock,
            Arc::new(SystemTimeProvider),
        )
    }

    #[tokio::test]
    async fn query_resolves_through_queue_and_retry() {
        let mock = MockAgentExecutor::new(MockBehavior::Success);
        let svc = service(mock);

        let response = svc.query(AgentRequest::new("ping")).await;
        assert!(response.success);
        assert_eq!(response.raw_output, "ping");
    }

    #[tokio::test]
    async fn query_json_wraps_prompt_and_sets_schema() {
        let mock = MockAgentExecutor::new(MockBehavior::Success);
        let svc = service(mock.clone());

        let response = svc
            .query_json("List repos", "{ repos: string[] }", QueryOptions::default())
            .await;
        assert!(response.success);

        let prompts = mock.executed_prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].starts_with("List repos"));
        assert!(prompts[0].contains("single valid JSON object"));
        assert!(prompts[0].contains("{ repos: string[] }"));
    }

    #[tokio::test]
    async fn status_and_reset_pass_through() {
        let mock = MockAgentExecutor::new(MockBehavior::Success);
        let svc = service(mock);

        let status = svc.status();
        assert_eq!(status.queue_length, 0);
        assert_eq!(status.active_requests, 0);
        assert_eq!(svc.reset(), 0);
    }
}
