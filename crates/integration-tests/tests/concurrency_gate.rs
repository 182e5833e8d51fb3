//! Gate, ordering, and retry behavior over real processes.

use futures::future::join_all;
use promptgate_core::domain::{AgentRequest, ServiceConfig};
use promptgate_core::port::time_provider::SystemTimeProvider;
use promptgate_core::AgentService;
use promptgate_infra_process::{ExecutorConfig, ProcessExecutor};
use std::sync::Arc;
use std::time::Duration;

fn service_over(command: &str, print_args: &[&str], config: ServiceConfig) -> AgentService {
    let executor = Arc::new(ProcessExecutor::new(
        ExecutorConfig {
            command: command.to_string(),
            print_args: print_args.iter().map(|s| s.to_string()).collect(),
            default_timeout_ms: config.default_timeout_ms,
        },
        Arc::new(SystemTimeProvider),
    ));
    AgentService::new(config, executor, Arc::new(SystemTimeProvider))
}

fn scratch_dir(label: &str) -> std::path::PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("promptgate-{}-{}", label, nanos));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[tokio::test]
async fn single_slot_gate_reports_one_active_and_rest_pending() {
    let config = ServiceConfig {
        max_concurrent: 1,
        default_timeout_ms: 5000,
        ..ServiceConfig::default()
    };
    let svc = service_over("sh", &["-c", "cat >/dev/null; sleep 0.3; echo done"], config);

    let handles: Vec<_> = (0..4)
        .map(|i| svc.enqueue(AgentRequest::new(format!("r{}", i))))
        .collect();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let status = svc.status();
    assert_eq!(status.active_requests, 1);
    assert_eq!(status.queue_length, 3);

    let responses = join_all(handles.into_iter().map(|h| h.wait())).await;
    assert!(responses.iter().all(|r| r.success));

    let status = svc.status();
    assert_eq!(status.active_requests, 0);
    assert_eq!(status.queue_length, 0);
}

#[tokio::test]
async fn wider_gate_runs_attempts_in_parallel() {
    let config = ServiceConfig {
        max_concurrent: 3,
        default_timeout_ms: 5000,
        ..ServiceConfig::default()
    };
    let svc = service_over("sh", &["-c", "cat >/dev/null; sleep 0.3; echo done"], config);

    let started = std::time::Instant::now();
    let handles: Vec<_> = (0..3)
        .map(|i| svc.enqueue(AgentRequest::new(format!("r{}", i))))
        .collect();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(svc.status().active_requests, 3);

    let responses = join_all(handles.into_iter().map(|h| h.wait())).await;
    assert!(responses.iter().all(|r| r.success));
    // Three 300ms processes sharing three slots finish well under 900ms
    assert!(started.elapsed() < Duration::from_millis(800));
}

#[tokio::test]
async fn clear_queue_counts_pending_only() {
    let config = ServiceConfig {
        max_concurrent: 1,
        default_timeout_ms: 5000,
        ..ServiceConfig::default()
    };
    let svc = service_over("sh", &["-c", "cat >/dev/null; sleep 0.3; echo done"], config);

    let running = svc.enqueue(AgentRequest::new("running"));
    tokio::time::sleep(Duration::from_millis(100)).await;
    let doomed_one = svc.enqueue(AgentRequest::new("doomed-1"));
    let doomed_two = svc.enqueue(AgentRequest::new("doomed-2"));

    assert_eq!(svc.clear_queue(), 2);

    let cleared = doomed_one.wait().await;
    assert!(!cleared.success);
    assert!(cleared.error.unwrap().contains("cleared"));
    assert!(!doomed_two.wait().await.success);

    // The dispatched request is unaffected by the clear
    assert!(running.wait().await.success);
}

#[tokio::test]
async fn failing_agent_is_attempted_exactly_max_retries_plus_one_times() {
    let dir = scratch_dir("retries");
    let config = ServiceConfig {
        max_concurrent: 1,
        default_timeout_ms: 5000,
        retry_on_error: true,
        max_retries: 2,
        retry_delay_ms: 10,
    };
    // Each attempt appends a line in the request's working directory
    let svc = service_over(
        "sh",
        &["-c", "cat >/dev/null; echo attempt >> attempts.log; exit 1"],
        config,
    );

    let mut request = AgentRequest::new("ignored");
    request.working_dir = Some(dir.clone());
    let response = svc.query(request).await;

    assert!(!response.success);
    let log = std::fs::read_to_string(dir.join("attempts.log")).unwrap();
    assert_eq!(log.lines().count(), 3);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn retry_disabled_attempts_once() {
    let dir = scratch_dir("no-retries");
    let config = ServiceConfig {
        max_concurrent: 1,
        default_timeout_ms: 5000,
        retry_on_error: false,
        max_retries: 2,
        retry_delay_ms: 10,
    };
    let svc = service_over(
        "sh",
        &["-c", "cat >/dev/null; echo attempt >> attempts.log; exit 1"],
        config,
    );

    let mut request = AgentRequest::new("ignored");
    request.working_dir = Some(dir.clone());
    let response = svc.query(request).await;

    assert!(!response.success);
    let log = std::fs::read_to_string(dir.join("attempts.log")).unwrap();
    assert_eq!(log.lines().count(), 1);

    std::fs::remove_dir_all(&dir).ok();
}
