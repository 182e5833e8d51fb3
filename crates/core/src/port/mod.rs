// Port Layer - Interfaces for external dependencies

pub mod agent_executor;
pub mod time_provider; // For deterministic testing

// Re-exports
pub use agent_executor::AgentExecutor;
pub use time_provider::TimeProvider;
