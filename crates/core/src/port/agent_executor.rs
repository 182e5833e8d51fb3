// Agent Executor Port
// Abstraction over "run one attempt of one request to completion"

use crate::domain::{AgentRequest, AgentResponse};
use async_trait::async_trait;

/// Executes a single attempt of a request and reports the outcome as a
/// terminal AgentResponse. Implementations must not panic on ordinary
/// process failures; those are failure responses.
///
/// Implementations:
/// - ProcessExecutor (infra-process): spawns the external CLI
/// - RetryingExecutor (application): decorator adding bounded retries
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    async fn execute(&self, request: &AgentRequest) -> AgentResponse;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::FailureReason;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Scripted mock behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Always succeed, echoing the prompt back as raw output
        Success,
        /// Always fail with a spawn-style error
        Fail(String),
        /// Fail the first N attempts, then succeed
        FailTimes(usize),
        /// Succeed after sleeping (for concurrency-gate tests)
        Slow(Duration),
        /// Panic with message (for panic isolation testing)
        Panic(String),
    }

    /// Mock executor with call counting and recorded prompt order
    pub struct MockAgentExecutor {
        behavior: MockBehavior,
        call_count: AtomicUsize,
        executed_prompts: Mutex<Vec<String>>,
    }

    impl MockAgentExecutor {
        pub fn new(behavior: MockBehavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                call_count: AtomicUsize::new(0),
                executed_prompts: Mutex::new(Vec::new()),
            })
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// Prompts in the order attempts began
        pub fn executed_prompts(&self) -> Vec<String> {
            self.executed_prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AgentExecutor for MockAgentExecutor {
        async fn execute(&self, request: &AgentRequest) -> AgentResponse {
            let attempt = self.call_count.fetch_add(1, Ordering::SeqCst);
            self.executed_prompts
                .lock()
                .unwrap()
                .push(request.prompt.clone());

            match &self.behavior {
                MockBehavior::Success => AgentResponse::ok(
                    serde_json::Value::String(request.prompt.clone()),
                    request.prompt.clone(),
                    1,
                ),
                MockBehavior::Fail(msg) => {
                    AgentResponse::failure(&FailureReason::Spawn(msg.clone()), String::new(), 1)
                }
                MockBehavior::FailTimes(n) => {
                    if attempt < *n {
                        AgentResponse::failure(
                            &FailureReason::NonZeroExit {
                                code: 1,
                                message: format!("scripted failure {}", attempt),
                            },
                            String::new(),
                            1,
                        )
                    } else {
                        AgentResponse::ok(
                            serde_json::Value::String("recovered".to_string()),
                            "recovered".to_string(),
                            1,
                        )
                    }
                }
                MockBehavior::Slow(delay) => {
                    tokio::time::sleep(*delay).await;
                    AgentResponse::ok(
                        serde_json::Value::String(request.prompt.clone()),
                        request.prompt.clone(),
                        delay.as_millis() as i64,
                    )
                }
                MockBehavior::Panic(msg) => {
                    panic!("{}", msg); // Actually panic for isolation testing
                }
            }
        }
    }
}
