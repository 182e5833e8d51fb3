// Response Domain Model

use serde::{Deserialize, Serialize};

use super::error::FailureReason;

/// Terminal result of one logical request.
///
/// Callers always receive one of these; failures are values here, never
/// errors propagated across the public boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub success: bool,

    /// Parsed payload on success; the trimmed raw text when structured
    /// extraction failed; Null for process-level failures
    pub data: serde_json::Value,

    /// Full captured stdout of the attempt
    pub raw_output: String,

    pub error: Option<String>,

    /// Wall-clock time of the attempt that produced this response
    pub duration_ms: i64,
}

impl AgentResponse {
    pub fn ok(data: serde_json::Value, raw_output: String, duration_ms: i64) -> Self {
        Self {
            success: true,
            data,
            raw_output,
            error: None,
            duration_ms,
        }
    }

    pub fn failure(reason: &FailureReason, raw_output: String, duration_ms: i64) -> Self {
        Self {
            success: false,
            data: serde_json::Value::Null,
            raw_output,
            error: Some(reason.to_string()),
            duration_ms,
        }
    }

    /// Parse failures keep the trimmed raw text in `data` so callers can
    /// still inspect what the agent said
    pub fn parse_failure(reason: &FailureReason, raw_output: String, duration_ms: i64) -> Self {
        Self {
            success: false,
            data: serde_json::Value::String(raw_output.trim().to_string()),
            raw_output,
            error: Some(reason.to_string()),
            duration_ms,
        }
    }
}
