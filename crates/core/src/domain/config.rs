// Service Configuration

use serde::{Deserialize, Serialize};

/// Simultaneous agent processes when unconfigured
pub const DEFAULT_MAX_CONCURRENT: usize = 1;

/// Per-attempt timeout when the request carries none (2 minutes)
pub const DEFAULT_TIMEOUT_MS: i64 = 120_000;

/// Additional attempts after the first failure
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Base backoff delay between retry attempts (1s)
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Service-wide configuration, taken by value at construction and frozen
/// afterwards. Later mutation of a copy has no effect on a running service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Cap on simultaneously running agent processes
    pub max_concurrent: usize,

    /// Per-attempt timeout applied when a request carries none
    pub default_timeout_ms: i64,

    pub retry_on_error: bool,

    /// Additional attempts after the first (attempts = max_retries + 1)
    pub max_retries: u32,

    /// Base backoff delay; attempt n sleeps `retry_delay_ms * 2^n`
    pub retry_delay_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            retry_on_error: true,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

/// Point-in-time queue snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    /// Pending (not yet dispatched) requests
    pub queue_length: usize,
    /// Dispatched but not yet completed requests
    pub active_requests: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ServiceConfig::default();
        assert_eq!(config.max_concurrent, 1);
        assert_eq!(config.default_timeout_ms, 120_000);
        assert!(config.retry_on_error);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.retry_delay_ms, 1000);
    }
}
