// Shared process-control constants (no magic values in call sites)

/// Grace window between SIGTERM and SIGKILL when a timed-out process
/// ignores the polite signal (5 seconds)
pub const GRACEFUL_KILL_TIMEOUT_MS: i64 = 5000;
