// Promptgate Core - Domain Logic & Ports
// NO infrastructure dependencies (hexagonal architecture)

pub mod application;
pub mod domain;
pub mod port;

pub use application::AgentService;
pub use domain::{AgentRequest, AgentResponse, FailureReason, ServiceConfig};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
