// Request Queue & Concurrency Gate
//
// Pending requests wait in a binary heap keyed (priority desc, sequence
// asc), so equal priorities dispatch in insertion order. Up to
// `max_concurrent` attempts run at once; each resolves its caller's
// one-shot channel exactly once.

use crate::domain::{AgentRequest, AgentResponse, FailureReason, Priority, QueueStatus, Sequence};
use crate::port::{AgentExecutor, TimeProvider};
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// Awaitable result of an enqueued request. The underlying one-shot
/// channel makes exactly-once resolution structural.
pub struct ResponseHandle {
    rx: oneshot::Receiver<AgentResponse>,
}

impl ResponseHandle {
    /// Wait for the terminal response. A lost sender (attempt task torn
    /// down without resolving) surfaces as an Internal failure, never as
    /// a channel error.
    pub async fn wait(self) -> AgentResponse {
        self.rx.await.unwrap_or_else(|_| {
            AgentResponse::failure(
                &FailureReason::Internal("response channel closed before resolution".to_string()),
                String::new(),
                0,
            )
        })
    }
}

struct PendingItem {
    seq: Sequence,
    priority: Priority,
    enqueued_at: i64,
    request: AgentRequest,
    reply: oneshot::Sender<AgentResponse>,
}

impl PartialEq for PendingItem {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for PendingItem {}

impl PartialOrd for PendingItem {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingItem {
    // Max-heap: higher priority first, then lower sequence (FIFO ties)
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct QueueState {
    pending: BinaryHeap<PendingItem>,
    active: usize,
}

struct QueueInner {
    executor: Arc<dyn AgentExecutor>,
    time_provider: Arc<dyn TimeProvider>,
    max_concurrent: usize,
    next_seq: AtomicU64,
    state: Mutex<QueueState>,
}

impl QueueInner {
    // Lock is held only for non-awaiting bookkeeping; recover from
    // poisoning rather than propagating a panic to callers
    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fill free slots with the highest-priority pending items. Runs
    /// after every enqueue and every completion.
    fn pump(inner: Arc<QueueInner>) {
        loop {
            let item = {
                let mut state = inner.lock_state();
                if state.active >= inner.max_concurrent {
                    return;
                }
                let Some(item) = state.pending.pop() else {
                    return;
                };
                state.active += 1;
                item
            };

            let task_inner = Arc::clone(&inner);
            tokio::spawn(async move {
                QueueInner::run_item(task_inner, item).await;
            });
        }
    }

    async fn run_item(inner: Arc<QueueInner>, item: PendingItem) {
        let PendingItem {
            seq,
            priority,
            enqueued_at,
            request,
            reply,
        } = item;

        let waited_ms = inner.time_provider.now_millis() - enqueued_at;
        debug!(seq, priority, waited_ms, "Dispatching request");

        // Panic isolation: a panicking executor becomes a failure
        // response, never a leaked slot or an unresolved caller
        let executor = Arc::clone(&inner.executor);
        let joined = tokio::spawn(async move { executor.execute(&request).await }).await;

        let response = match joined {
            Ok(response) => response,
            Err(join_err) => {
                if join_err.is_panic() {
                    error!(seq, "Attempt task panicked");
                } else {
                    error!(seq, "Attempt task cancelled");
                }
                AgentResponse::failure(
                    &FailureReason::Internal(join_err.to_string()),
                    String::new(),
                    0,
                )
            }
        };

        // Free the slot before resolving the caller, so a status check
        // taken right after the response arrives sees the settled count
        {
            let mut state = inner.lock_state();
            state.active -= 1;
        }

        if reply.send(response).is_err() {
            warn!(seq, "Caller dropped response handle before resolution");
        }
        QueueInner::pump(inner);
    }
}

/// Priority queue of agent requests behind a concurrency gate
pub struct RequestQueue {
    inner: Arc<QueueInner>,
}

impl RequestQueue {
    pub fn new(
        max_concurrent: usize,
        executor: Arc<dyn AgentExecutor>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                executor,
                time_provider,
                // A gate of zero would never dispatch anything
                max_concurrent: max_concurrent.max(1),
                next_seq: AtomicU64::new(0),
                state: Mutex::new(QueueState {
                    pending: BinaryHeap::new(),
                    active: 0,
                }),
            }),
        }
    }

    /// Append a request and trigger dispatch. Never blocks the caller.
    pub fn enqueue(&self, request: AgentRequest) -> ResponseHandle {
        let seq = self.inner.next_seq.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        let item = PendingItem {
            seq,
            priority: request.priority,
            enqueued_at: self.inner.time_provider.now_millis(),
            request,
            reply: tx,
        };

        debug!(seq, priority = item.priority, "Request enqueued");
        self.inner.lock_state().pending.push(item);
        QueueInner::pump(Arc::clone(&self.inner));

        ResponseHandle { rx }
    }

    /// Atomically discard every pending (undispatched) request, resolving
    /// each with a QueueCleared failure. Dispatched attempts run on.
    pub fn clear(&self) -> usize {
        let drained: Vec<PendingItem> = {
            let mut state = self.inner.lock_state();
            let mut items = Vec::with_capacity(state.pending.len());
            while let Some(item) = state.pending.pop() {
                items.push(item);
            }
            items
        };

        let count = drained.len();
        for item in drained {
            let _ = item.reply.send(AgentResponse::failure(
                &FailureReason::QueueCleared,
                String::new(),
                0,
            ));
        }
        if count > 0 {
            info!(cleared = count, "Pending queue cleared");
        }
        count
    }

    pub fn status(&self) -> QueueStatus {
        let state = self.inner.lock_state();
        QueueStatus {
            queue_length: state.pending.len(),
            active_requests: state.active,
        }
    }
}
