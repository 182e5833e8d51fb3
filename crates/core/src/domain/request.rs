// Request Domain Model

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Priority (higher number = dispatched sooner)
pub type Priority = i32;

/// Monotonic enqueue sequence number (unique per queue instance)
pub type Sequence = u64;

/// One logical request against the external agent CLI.
///
/// `json_schema` is advisory: its presence asks the executor to run
/// structured extraction on the output, and its text is embedded into the
/// prompt as a human-readable shape hint. It is never mechanically
/// enforced beyond the parser's best effort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRequest {
    pub prompt: String,

    #[serde(default)]
    pub json_schema: Option<String>,

    /// Working directory for the spawned process (caller's default if None)
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Per-attempt timeout; falls back to the configured default
    #[serde(default)]
    pub timeout_ms: Option<i64>,

    #[serde(default)]
    pub priority: Priority,
}

impl AgentRequest {
    /// Create a request with default routing fields; callers set
    /// `priority`, `working_dir` etc. directly as needed.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            json_schema: None,
            working_dir: None,
            timeout_ms: None,
            priority: 0,
        }
    }

    /// Whether the caller asked for structured (JSON) output
    pub fn expects_json(&self) -> bool {
        self.json_schema.is_some()
    }
}
