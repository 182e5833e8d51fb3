// Domain Layer - Pure contract types, no I/O

pub mod config;
pub mod error;
pub mod request;
pub mod response;

// Re-exports
pub use config::{QueueStatus, ServiceConfig};
pub use error::FailureReason;
pub use request::{AgentRequest, Priority, Sequence};
pub use response::AgentResponse;
