// Failure Taxonomy
//
// Every failure is surfaced to callers inside an AgentResponse; none of
// these variants ever crosses the public boundary as an Err.

use thiserror::Error;

/// Why an attempt (or a whole request) failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Process could not be created (missing binary, OS failure)
    #[error("failed to spawn agent process: {0}")]
    Spawn(String),

    /// Attempt exceeded its allotted time; process was terminated.
    /// Partial output captured before the kill is retained.
    #[error("agent process timed out after {0}ms")]
    Timeout(i64),

    /// Process exited with a non-success code. `message` carries trimmed
    /// stderr when present, otherwise a generic exit-code description.
    #[error("{message}")]
    NonZeroExit { code: i32, message: String },

    /// Process succeeded but no extraction strategy yielded valid JSON
    /// when structured output was requested
    #[error("no valid JSON found in agent output: {0}")]
    Parse(String),

    /// Pending request discarded by an explicit queue clear before it
    /// was ever dispatched
    #[error("request cleared from queue before dispatch")]
    QueueCleared,

    /// Attempt task panicked or the result channel was lost; surfaced as
    /// a terminal failure instead of a crash
    #[error("internal execution error: {0}")]
    Internal(String),
}
