// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue front: worker spawning, status snapshots, clearing.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};
use uuid::Uuid;

use wagate_config::QueueConfig;
use wagate_core::{EventSink, Payload, QueueStatus, SessionId, Target, TaskId, TaskOutcome, WagateError};
use wagate_session::{QueuePurge, SessionRegistry};

use crate::worker::{self, WorkerContext};

/// Delivery counters shared between the front and the worker.
#[derive(Default)]
pub(crate) struct QueueStats {
    pub(crate) pending: AtomicUsize,
    pub(crate) in_flight: AtomicBool,
    pub(crate) last_failure_at: Mutex<Option<DateTime<Utc>>>,
}

impl QueueStats {
    pub(crate) fn record_failure(&self) {
        *self
            .last_failure_at
            .lock()
            .expect("failure timestamp lock poisoned") = Some(Utc::now());
    }

    fn snapshot(&self) -> QueueStatus {
        QueueStatus {
            pending: self.pending.load(Ordering::SeqCst),
            in_flight: self.in_flight.load(Ordering::SeqCst),
            last_failure_at: *self
                .last_failure_at
                .lock()
                .expect("failure timestamp lock poisoned"),
        }
    }
}

/// One accepted delivery.
pub(crate) struct QueueTask {
    pub(crate) task_id: TaskId,
    pub(crate) target: Target,
    pub(crate) payload: Payload,
    pub(crate) enqueued_at: DateTime<Utc>,
    pub(crate) outcome: oneshot::Sender<TaskOutcome>,
}

struct Worker {
    tx: mpsc::UnboundedSender<QueueTask>,
    cancel: CancellationToken,
    stats: Arc<QueueStats>,
}

/// The outbound delivery queue: one sequential worker per session.
pub struct OutboundQueue {
    registry: Arc<SessionRegistry>,
    events: Arc<dyn EventSink>,
    config: QueueConfig,
    workers: DashMap<String, Worker>,
    transmit_permits: Arc<Semaphore>,
    tracker: TaskTracker,
}

impl OutboundQueue {
    pub fn new(
        config: QueueConfig,
        registry: Arc<SessionRegistry>,
        events: Arc<dyn EventSink>,
    ) -> Arc<Self> {
        let transmit_permits = Arc::new(Semaphore::new(config.concurrency_limit.max(1)));
        Arc::new(OutboundQueue {
            registry,
            events,
            config,
            workers: DashMap::new(),
            transmit_permits,
            tracker: TaskTracker::new(),
        })
    }

    /// Accepts a delivery for a registered session.
    ///
    /// Returns the task id and a receiver resolving to the task's single
    /// terminal outcome. A discarded task (queue cleared, session closed)
    /// drops the sender instead of resolving.
    pub fn enqueue(
        self: &Arc<Self>,
        session_id: &SessionId,
        target: Target,
        payload: Payload,
    ) -> Result<(TaskId, oneshot::Receiver<TaskOutcome>), WagateError> {
        // Fail fast instead of queueing into the void.
        self.registry.get(session_id)?;

        let task_id = TaskId(Uuid::new_v4().to_string());
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let mut task = QueueTask {
            task_id: task_id.clone(),
            target,
            payload,
            enqueued_at: Utc::now(),
            outcome: outcome_tx,
        };

        // Two rounds: the first send can race a concurrent clear that shuts
        // the worker down after we fetched it.
        for _ in 0..2 {
            let worker = self
                .workers
                .entry(session_id.as_str().to_string())
                .or_insert_with(|| self.spawn_worker(session_id));
            worker.stats.pending.fetch_add(1, Ordering::SeqCst);
            match worker.tx.send(task) {
                Ok(()) => {
                    debug!(session_id = %session_id, task_id = %task_id, "task enqueued");
                    return Ok((task_id, outcome_rx));
                }
                Err(mpsc::error::SendError(t)) => {
                    worker.stats.pending.fetch_sub(1, Ordering::SeqCst);
                    let key = session_id.as_str().to_string();
                    drop(worker);
                    self.workers.remove_if(&key, |_, w| w.tx.is_closed());
                    task = t;
                }
            }
        }
        Err(WagateError::Internal(format!(
            "delivery worker for {session_id} unavailable"
        )))
    }

    /// Queue snapshot for a session; a session without a worker reports an
    /// empty queue.
    pub fn status(&self, session_id: &SessionId) -> QueueStatus {
        self.workers
            .get(session_id.as_str())
            .map(|w| w.stats.snapshot())
            .unwrap_or_default()
    }

    /// Discards every pending task for the session without failing them;
    /// their outcome senders are simply dropped. Returns the number of tasks
    /// that were still pending.
    pub fn clear(&self, session_id: &SessionId) -> usize {
        match self.workers.remove(session_id.as_str()) {
            Some((_, worker)) => {
                let dropped = worker.stats.pending.load(Ordering::SeqCst);
                worker.cancel.cancel();
                info!(session_id = %session_id, dropped, "queue cleared");
                dropped
            }
            None => 0,
        }
    }

    /// Cancels every worker and waits for them to exit.
    pub async fn shutdown(&self) {
        for worker in self.workers.iter() {
            worker.value().cancel.cancel();
        }
        self.workers.clear();
        self.tracker.close();
        self.tracker.wait().await;
        info!("outbound queue shut down");
    }

    fn spawn_worker(self: &Arc<Self>, session_id: &SessionId) -> Worker {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let stats = Arc::new(QueueStats::default());

        let ctx = WorkerContext {
            session_id: session_id.clone(),
            registry: Arc::clone(&self.registry),
            events: Arc::clone(&self.events),
            config: self.config.clone(),
            stats: Arc::clone(&stats),
            transmit_permits: Arc::clone(&self.transmit_permits),
            cancel: cancel.clone(),
        };
        self.tracker.spawn(worker::run(ctx, rx));
        debug!(session_id = %session_id, "delivery worker started");

        Worker { tx, cancel, stats }
    }
}

// Lets the session layer drop a closed session's deliveries. Must stay free
// of registry calls; it runs under registry locks.
impl QueuePurge for OutboundQueue {
    fn purge(&self, session_id: &SessionId) {
        self.clear(session_id);
    }
}
