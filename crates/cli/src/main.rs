//! Promptgate CLI - smoke harness for the agent service
//!
//! Sends one prompt through the full queue/retry/executor stack and
//! prints the terminal response as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use promptgate_core::application::QueryOptions;
use promptgate_core::domain::{AgentRequest, ServiceConfig};
use promptgate_core::port::time_provider::SystemTimeProvider;
use promptgate_core::AgentService;
use promptgate_infra_process::{ExecutorConfig, ProcessExecutor};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "promptgate")]
#[command(about = "Run one prompt through the agent service", long_about = None)]
#[command(version)]
struct Cli {
    /// Prompt text; reads stdin when omitted
    prompt: Option<String>,

    /// Ask for structured output matching this human-readable shape hint
    #[arg(long)]
    json: Option<String>,

    /// Working directory for the agent process
    #[arg(long)]
    cwd: Option<PathBuf>,

    /// Per-attempt timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<i64>,

    #[arg(long, default_value = "0")]
    priority: i32,

    /// Agent binary to invoke
    #[arg(long, env = "PROMPTGATE_COMMAND", default_value = "claude")]
    command: String,

    /// Flag selecting the agent's non-interactive print mode
    #[arg(long, env = "PROMPTGATE_PRINT_FLAG", default_value = "--print")]
    print_flag: String,
}

/// Env overrides on top of documented defaults; unparseable values fall
/// back silently
fn config_from_env() -> ServiceConfig {
    let defaults = ServiceConfig::default();
    let get = |name: &str| std::env::var(name).ok();

    ServiceConfig {
        max_concurrent: get("PROMPTGATE_MAX_CONCURRENT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_concurrent),
        default_timeout_ms: get("PROMPTGATE_DEFAULT_TIMEOUT_MS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.default_timeout_ms),
        retry_on_error: get("PROMPTGATE_RETRY_ON_ERROR")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.retry_on_error),
        max_retries: get("PROMPTGATE_MAX_RETRIES")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_retries),
        retry_delay_ms: get("PROMPTGATE_RETRY_DELAY_MS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.retry_delay_ms),
    }
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("promptgate=info"))
        .expect("Failed to create env filter");

    let log_format = std::env::var("PROMPTGATE_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = config_from_env();

    let prompt = match cli.prompt {
        Some(prompt) => prompt,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read prompt from stdin")?;
            buf
        }
    };

    let executor = Arc::new(ProcessExecutor::new(
        ExecutorConfig {
            command: cli.command,
            print_args: vec![cli.print_flag],
            default_timeout_ms: config.default_timeout_ms,
        },
        Arc::new(SystemTimeProvider),
    ));
    let service = AgentService::new(config, executor, Arc::new(SystemTimeProvider));

    info!(priority = cli.priority, "Dispatching prompt");

    let response = match cli.json {
        Some(schema) => {
            let options = QueryOptions {
                working_dir: cli.cwd,
                timeout_ms: cli.timeout_ms,
                priority: cli.priority,
            };
            service.query_json(&prompt, &schema, options).await
        }
        None => {
            let mut request = AgentRequest::new(prompt);
            request.working_dir = cli.cwd;
            request.timeout_ms = cli.timeout_ms;
            request.priority = cli.priority;
            service.query(request).await
        }
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&response).context("Failed to serialize response")?
    );

    if response.success {
        Ok(())
    } else {
        std::process::exit(1);
    }
}
