// Process executor: one attempt = one isolated child process
use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{info, warn};

/// How long to wait for stream EOF after the child is gone. Orphaned
/// descendants of a killed child can hold the pipe open; this bounds the
/// attempt instead of waiting them out.
const READER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

use promptgate_core::application::constants::GRACEFUL_KILL_TIMEOUT_MS;
use promptgate_core::application::parser;
use promptgate_core::domain::config::DEFAULT_TIMEOUT_MS;
use promptgate_core::domain::{AgentRequest, AgentResponse, FailureReason};
use promptgate_core::port::{AgentExecutor, TimeProvider};

/// How to invoke the external agent CLI
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Binary name or path of the agent CLI
    pub command: String,
    /// Flags selecting the non-interactive print-and-exit mode
    pub print_args: Vec<String>,
    /// Per-attempt timeout applied when a request carries none
    pub default_timeout_ms: i64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            command: "claude".to_string(),
            print_args: vec!["--print".to_string()],
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

enum WaitOutcome {
    Exited(ExitStatus),
    TimedOut,
    WaitFailed(String),
}

/// Spawns the agent CLI once per attempt: prompt over stdin (then
/// closed), stdout/stderr accumulated for the life of the process,
/// timeout enforced with a graceful-then-forced kill.
pub struct ProcessExecutor {
    config: ExecutorConfig,
    time_provider: Arc<dyn TimeProvider>,
}

impl ProcessExecutor {
    pub fn new(config: ExecutorConfig, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            config,
            time_provider,
        }
    }

    async fn run_attempt(&self, request: &AgentRequest) -> AgentResponse {
        let start = self.time_provider.now_millis();
        let timeout_ms = request
            .timeout_ms
            .unwrap_or(self.config.default_timeout_ms)
            .max(1);

        info!(
            command = %self.config.command,
            timeout_ms = timeout_ms,
            working_dir = ?request.working_dir,
            prompt_bytes = request.prompt.len(),
            "Spawning agent process"
        );

        let mut cmd = Command::new(&self.config.command);
        cmd.args(&self.config.print_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &request.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(command = %self.config.command, error = %e, "Agent process spawn failed");
                return AgentResponse::failure(
                    &FailureReason::Spawn(e.to_string()),
                    String::new(),
                    self.time_provider.now_millis() - start,
                );
            }
        };

        // Background readers accumulate both streams for the life of the
        // process, so partial output survives a timeout kill
        let stdout_capture = StreamCapture::start(child.stdout.take());
        let stderr_capture = StreamCapture::start(child.stderr.take());

        // Prompt delivery runs concurrently with the wait below; a child
        // that never drains stdin cannot stall the attempt past its
        // timeout. Dropping the handle after the write closes the stream.
        let stdin_writer = child.stdin.take().map(|mut stdin| {
            let prompt = request.prompt.clone();
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
                    warn!(error = %e, "Failed to write prompt to agent stdin");
                }
            })
        });

        let outcome = match timeout(Duration::from_millis(timeout_ms as u64), child.wait()).await {
            Ok(Ok(status)) => WaitOutcome::Exited(status),
            Ok(Err(e)) => WaitOutcome::WaitFailed(e.to_string()),
            Err(_) => {
                self.kill_graceful(&mut child).await;
                let _ = child.wait().await;
                WaitOutcome::TimedOut
            }
        };

        // The child is gone; an unfinished write has nowhere to go
        if let Some(writer) = stdin_writer {
            writer.abort();
        }

        let raw_output = String::from_utf8_lossy(&stdout_capture.finish().await).to_string();
        let stderr_text = String::from_utf8_lossy(&stderr_capture.finish().await).to_string();
        let duration_ms = self.time_provider.now_millis() - start;

        match outcome {
            WaitOutcome::TimedOut => {
                warn!(timeout_ms = timeout_ms, "Agent process timed out, killed");
                AgentResponse::failure(&FailureReason::Timeout(timeout_ms), raw_output, duration_ms)
            }
            WaitOutcome::WaitFailed(msg) => {
                warn!(error = %msg, "Failed waiting on agent process");
                AgentResponse::failure(&FailureReason::Internal(msg), raw_output, duration_ms)
            }
            WaitOutcome::Exited(status) if !status.success() => {
                let code = status.code().unwrap_or(-1);
                let message = if stderr_text.trim().is_empty() {
                    format!("process exited with code {}", code)
                } else {
                    stderr_text.trim().to_string()
                };
                warn!(code = code, "Agent process exited with failure");
                AgentResponse::failure(
                    &FailureReason::NonZeroExit { code, message },
                    raw_output,
                    duration_ms,
                )
            }
            WaitOutcome::Exited(_) => {
                let parsed = parser::parse(&raw_output, request.expects_json());
                if parsed.success {
                    info!(
                        duration_ms = duration_ms,
                        output_bytes = raw_output.len(),
                        "Agent process completed"
                    );
                    AgentResponse::ok(parsed.data, raw_output, duration_ms)
                } else {
                    let reason = FailureReason::Parse(
                        parsed
                            .error
                            .unwrap_or_else(|| "extraction failed".to_string()),
                    );
                    warn!("Agent output did not contain extractable JSON");
                    AgentResponse::parse_failure(&reason, raw_output, duration_ms)
                }
            }
        }
    }

    /// SIGTERM first; escalate to SIGKILL if the process is still around
    /// after the grace window
    #[cfg(unix)]
    async fn kill_graceful(&self, child: &mut Child) {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let Some(raw_pid) = child.id() else {
            return; // already reaped
        };
        let pid = Pid::from_raw(raw_pid as i32);

        info!(pid = %pid, "Sending SIGTERM to timed-out agent process");
        if kill(pid, Signal::SIGTERM).is_err() {
            return; // already gone
        }

        let grace = Duration::from_millis(GRACEFUL_KILL_TIMEOUT_MS as u64);
        match timeout(grace, child.wait()).await {
            Ok(_) => info!(pid = %pid, "Agent process exited after SIGTERM"),
            Err(_) => {
                warn!(pid = %pid, "Agent process ignored SIGTERM, sending SIGKILL");
                let _ = kill(pid, Signal::SIGKILL);
            }
        }
    }

    #[cfg(not(unix))]
    async fn kill_graceful(&self, child: &mut Child) {
        let _ = child.start_kill();
    }
}

#[async_trait]
impl AgentExecutor for ProcessExecutor {
    async fn execute(&self, request: &AgentRequest) -> AgentResponse {
        self.run_attempt(request).await
    }
}

/// Accumulates a child stream into a shared buffer so the bytes read so
/// far are available even if EOF never arrives
struct StreamCapture {
    buf: Arc<Mutex<Vec<u8>>>,
    reader: Option<JoinHandle<()>>,
}

impl StreamCapture {
    fn start(stream: Option<impl AsyncRead + Unpin + Send + 'static>) -> Self {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let reader = stream.map(|mut stream| {
            let buf = Arc::clone(&buf);
            tokio::spawn(async move {
                let mut chunk = [0u8; 8192];
                loop {
                    match stream.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf
                            .lock()
                            .unwrap_or_else(|poisoned| poisoned.into_inner())
                            .extend_from_slice(&chunk[..n]),
                    }
                }
            })
        });
        Self { buf, reader }
    }

    /// Wait briefly for EOF, then take whatever was captured
    async fn finish(self) -> Vec<u8> {
        if let Some(reader) = self.reader {
            let abort = reader.abort_handle();
            if timeout(READER_DRAIN_TIMEOUT, reader).await.is_err() {
                abort.abort();
            }
        }
        let data = self
            .buf
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        data.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptgate_core::port::time_provider::SystemTimeProvider;
    use serde_json::json;

    fn executor(command: &str, print_args: &[&str], default_timeout_ms: i64) -> ProcessExecutor {
        ProcessExecutor::new(
            ExecutorConfig {
                command: command.to_string(),
                print_args: print_args.iter().map(|s| s.to_string()).collect(),
                default_timeout_ms,
            },
            Arc::new(SystemTimeProvider),
        )
    }

    #[tokio::test]
    async fn echoing_process_returns_prompt_as_text() {
        let exec = executor("cat", &[], 5000);
        let response = exec.execute(&AgentRequest::new("hello agent")).await;

        assert!(response.success);
        assert_eq!(response.data, json!("hello agent"));
        assert_eq!(response.raw_output, "hello agent");
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn structured_request_parses_echoed_json() {
        let exec = executor("cat", &[], 5000);
        let mut request = AgentRequest::new(r#"{"answer": 42}"#);
        request.json_schema = Some("{ answer: number }".to_string());

        let response = exec.execute(&request).await;
        assert!(response.success);
        assert_eq!(response.data, json!({"answer": 42}));
    }

    #[tokio::test]
    async fn structured_request_without_json_is_parse_failure() {
        let exec = executor("cat", &[], 5000);
        let mut request = AgentRequest::new("sorry, nothing structured");
        request.json_schema = Some("{ x: number }".to_string());

        let response = exec.execute(&request).await;
        assert!(!response.success);
        assert_eq!(response.data, json!("sorry, nothing structured"));
        assert!(response.error.unwrap().contains("JSON"));
    }

    #[tokio::test]
    async fn slow_process_times_out_with_partial_output() {
        let exec = executor("sh", &["-c", "echo partial; sleep 10"], 5000);
        let mut request = AgentRequest::new("ignored");
        request.timeout_ms = Some(200);

        let started = std::time::Instant::now();
        let response = exec.execute(&request).await;

        assert!(!response.success);
        assert!(response.error.unwrap().contains("200ms"));
        assert_eq!(response.raw_output, "partial\n");
        // SIGTERM path, not the 10s sleep and not the SIGKILL grace window
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn nonzero_exit_reports_stderr() {
        let exec = executor("sh", &["-c", "echo oops >&2; exit 3"], 5000);
        let response = exec.execute(&AgentRequest::new("ignored")).await;

        assert!(!response.success);
        assert_eq!(response.error.unwrap(), "oops");
    }

    #[tokio::test]
    async fn nonzero_exit_without_stderr_gets_generic_message() {
        let exec = executor("sh", &["-c", "exit 7"], 5000);
        let response = exec.execute(&AgentRequest::new("ignored")).await;

        assert!(!response.success);
        assert!(response.error.unwrap().contains("exited with code 7"));
    }

    #[tokio::test]
    async fn missing_binary_is_spawn_failure() {
        let exec = executor("promptgate-test-no-such-binary", &[], 5000);
        let response = exec.execute(&AgentRequest::new("ignored")).await;

        assert!(!response.success);
        assert!(response.raw_output.is_empty());
        assert!(response.error.unwrap().contains("spawn"));
    }

    #[tokio::test]
    async fn working_dir_sets_process_cwd() {
        let exec = executor("pwd", &[], 5000);
        let mut request = AgentRequest::new("");
        request.working_dir = Some(std::path::PathBuf::from("/tmp"));

        let response = exec.execute(&request).await;
        assert!(response.success);
        assert_eq!(response.raw_output.trim(), "/tmp");
    }
}
