// Retry Layer
// Bounds the number of executor attempts per request with exponential
// backoff between failures.

use crate::domain::{AgentRequest, AgentResponse};
use crate::port::AgentExecutor;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Backoff policy: attempt n (0-based) sleeps `base_delay_ms * 2^n`
/// before the next try.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub retry_on_error: bool,
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl RetryPolicy {
    /// Total attempts this policy allows for one logical request
    pub fn max_attempts(&self) -> u32 {
        if self.retry_on_error {
            self.max_retries + 1
        } else {
            1
        }
    }

    /// Delay inserted after a failed attempt (0-based)
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms.saturating_mul(1u64 << attempt.min(32)))
    }
}

/// Decorator over an executor: runs attempts until the first success,
/// returning the last failure once the policy is exhausted. Every
/// failure category is retried uniformly; queue-level failures never
/// reach this layer.
pub struct RetryingExecutor {
    inner: Arc<dyn AgentExecutor>,
    policy: RetryPolicy,
}

impl RetryingExecutor {
    pub fn new(inner: Arc<dyn AgentExecutor>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl AgentExecutor for RetryingExecutor {
    async fn execute(&self, request: &AgentRequest) -> AgentResponse {
        let max_attempts = self.policy.max_attempts();

        for attempt in 0..max_attempts {
            let response = self.inner.execute(request).await;

            if response.success {
                if attempt > 0 {
                    info!(attempt = attempt, "Request succeeded after retry");
                }
                return response;
            }

            if attempt + 1 >= max_attempts {
                warn!(
                    attempts = max_attempts,
                    error = ?response.error,
                    "Request failed, retry budget exhausted"
                );
                return response;
            }

            let delay = self.policy.backoff_delay(attempt);
            warn!(
                attempt = attempt,
                delay_ms = delay.as_millis() as u64,
                error = ?response.error,
                "Attempt failed, retrying after backoff"
            );
            sleep(delay).await;
        }

        // max_attempts is always >= 1, so the loop returns before this
        unreachable!("retry loop returns on last attempt")
    }
}
