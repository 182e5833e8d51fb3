// Promptgate Infrastructure - Process Adapter
// The only crate that touches the OS process table.

pub mod process_executor;

pub use process_executor::{ExecutorConfig, ProcessExecutor};
