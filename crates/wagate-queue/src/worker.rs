// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-session delivery worker.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use wagate_config::QueueConfig;
use wagate_core::{
    EventSink, Presence, SessionEvent, SessionId, TaskOutcome, WagateError, WireHandle,
};
use wagate_session::SessionRegistry;

use crate::queue::{QueueStats, QueueTask};

pub(crate) struct WorkerContext {
    pub(crate) session_id: SessionId,
    pub(crate) registry: Arc<SessionRegistry>,
    pub(crate) events: Arc<dyn EventSink>,
    pub(crate) config: QueueConfig,
    pub(crate) stats: Arc<QueueStats>,
    pub(crate) transmit_permits: Arc<Semaphore>,
    pub(crate) cancel: CancellationToken,
}

/// Drains the session's task channel one task at a time.
///
/// Cancellation discards the current and all remaining tasks; their outcome
/// senders drop unresolved.
pub(crate) async fn run(ctx: WorkerContext, mut rx: mpsc::UnboundedReceiver<QueueTask>) {
    loop {
        let task = tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            task = rx.recv() => match task {
                Some(task) => task,
                None => break,
            },
        };

        ctx.stats.pending.fetch_sub(1, Ordering::SeqCst);
        ctx.stats.in_flight.store(true, Ordering::SeqCst);
        debug!(
            session_id = %ctx.session_id,
            task_id = %task.task_id,
            queued_ms = (chrono::Utc::now() - task.enqueued_at).num_milliseconds(),
            "task picked up"
        );

        tokio::select! {
            _ = ctx.cancel.cancelled() => {
                ctx.stats.in_flight.store(false, Ordering::SeqCst);
                break;
            }
            outcome = deliver(&ctx, &task) => {
                ctx.stats.in_flight.store(false, Ordering::SeqCst);
                match &outcome {
                    TaskOutcome::Delivered { message_id } => {
                        info!(
                            session_id = %ctx.session_id,
                            task_id = %task.task_id,
                            message_id = %message_id,
                            "task delivered"
                        );
                        ctx.events.publish(SessionEvent::TaskDelivered {
                            session_id: ctx.session_id.clone(),
                            task_id: task.task_id.clone(),
                            message_id: message_id.clone(),
                        });
                    }
                    TaskOutcome::Failed { error } => {
                        warn!(
                            session_id = %ctx.session_id,
                            task_id = %task.task_id,
                            error = %error,
                            "task failed"
                        );
                        ctx.events.publish(SessionEvent::TaskFailed {
                            session_id: ctx.session_id.clone(),
                            task_id: task.task_id.clone(),
                            error: error.clone(),
                        });
                    }
                }
                // The caller may have stopped waiting for the outcome.
                let _ = task.outcome.send(outcome);
            }
        }
    }
    debug!(session_id = %ctx.session_id, "delivery worker stopped");
}

/// Runs the attempt loop for one task.
///
/// Every attempt resolves the live handle afresh, so a reconnect between
/// attempts picks up the new connection transparently. A session that left
/// the registry fails the task immediately; retrying is pointless.
async fn deliver(ctx: &WorkerContext, task: &QueueTask) -> TaskOutcome {
    let max_attempts = ctx.config.max_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 0..max_attempts {
        if attempt > 0 {
            let delay = backoff_delay(&ctx.config, attempt);
            debug!(
                session_id = %ctx.session_id,
                task_id = %task.task_id,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "retrying after backoff"
            );
            tokio::time::sleep(delay).await;
        }

        let entry = match ctx.registry.get(&ctx.session_id) {
            Ok(entry) => entry,
            Err(e) => {
                return TaskOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };
        let Some(handle) = entry.live_handle() else {
            last_error = format!("session {} is not connected", ctx.session_id);
            ctx.stats.record_failure();
            continue;
        };

        let permit = match ctx.transmit_permits.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                return TaskOutcome::Failed {
                    error: "queue shutting down".into(),
                }
            }
        };

        if ctx.config.typing_simulation {
            simulate_typing(ctx, &handle, task).await;
        }

        let result = handle.transmit(&task.target, &task.payload).await;
        drop(permit);

        match result {
            Ok(message_id) => return TaskOutcome::Delivered { message_id },
            Err(e) => {
                warn!(
                    session_id = %ctx.session_id,
                    task_id = %task.task_id,
                    attempt,
                    error = %e,
                    "transmit attempt failed"
                );
                last_error = e.to_string();
                ctx.stats.record_failure();
            }
        }
    }

    TaskOutcome::Failed { error: last_error }
}

/// Exponential backoff: base, 2x base, 4x base, ...
fn backoff_delay(config: &QueueConfig, attempt: u32) -> Duration {
    let factor = 1u64 << (attempt.saturating_sub(1)).min(16);
    Duration::from_millis(config.backoff_base_ms.saturating_mul(factor))
}

/// Signals a composing presence scaled to the visible text length, clamped
/// to the configured bounds. Presence is cosmetic; failures only get a debug
/// line and never count against the task.
async fn simulate_typing(ctx: &WorkerContext, handle: &Arc<dyn WireHandle>, task: &QueueTask) {
    let chars = task.payload.visible_text().chars().count() as u64;
    let hold = (chars * ctx.config.typing_ms_per_char)
        .clamp(ctx.config.typing_min_ms, ctx.config.typing_max_ms);

    if let Err(e) = presence(handle, task, Presence::Composing).await {
        debug!(session_id = %ctx.session_id, error = %e, "composing presence failed");
        return;
    }
    tokio::time::sleep(Duration::from_millis(hold)).await;
    if let Err(e) = presence(handle, task, Presence::Paused).await {
        debug!(session_id = %ctx.session_id, error = %e, "paused presence failed");
    }
}

async fn presence(
    handle: &Arc<dyn WireHandle>,
    task: &QueueTask,
    state: Presence,
) -> Result<(), WagateError> {
    handle.set_presence(&task.target, state).await
}
