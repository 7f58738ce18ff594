// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-session connection lifecycle task.
//!
//! One task per session drives the whole state machine:
//!
//! ```text
//! AwaitingHandshake --auth success--> Connected
//!        |  \--timeout--> Failed
//!        |
//! Connected --transient drop--> Reconnecting --delay--> AwaitingHandshake
//!                 \--terminal drop--> Closed (credentials erased, queue purged)
//! Reconnecting --cap exceeded--> Failed
//! ```
//!
//! The retry counter resets to zero only on a successful transition into
//! `Connected`, so a flapping connection that authenticates and drops
//! repeatedly still makes progress instead of accumulating attempts.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use wagate_config::SessionConfig;
use wagate_core::{
    classify, CauseClass, CreateOutcome, Credentials, DisconnectCause, SessionEvent, SessionState,
    WagateError, WireConnection, WireEvent,
};

use crate::challenge;
use crate::registry::{SessionEntry, SessionRegistry};

type CreateReply = oneshot::Sender<Result<CreateOutcome, WagateError>>;

/// How one connection attempt ended.
enum ConnectionEnd {
    /// The wire reported a disconnect with a cause code.
    Dropped(DisconnectCause),
    /// The event stream ended without a disconnect event.
    StreamEnded,
    /// No challenge or auth success arrived within the handshake bound.
    Timeout,
    /// The session was deleted or replaced.
    Cancelled,
}

enum RetryDecision {
    Retry,
    Exhausted,
    Cancelled,
}

pub(crate) struct ConnectionLifecycle {
    registry: Arc<SessionRegistry>,
    entry: Arc<SessionEntry>,
}

impl ConnectionLifecycle {
    pub(crate) fn new(registry: Arc<SessionRegistry>, entry: Arc<SessionEntry>) -> Self {
        ConnectionLifecycle { registry, entry }
    }

    pub(crate) async fn run(self, reply: CreateReply) {
        let id = self.entry.id().clone();
        let cancel = self.entry.cancel_token();
        let config = self.registry.session_config().clone();
        let mut reply = Some(reply);
        let mut retry_count: u32 = 0;

        loop {
            self.transition(SessionState::AwaitingHandshake, retry_count);

            let credentials = match self.registry.credentials().load(&id).await {
                Ok(c) => c,
                Err(e) => {
                    error!(session_id = %id, error = %e, "credential load failed");
                    self.finish(SessionState::Failed, 0);
                    send_reply(&mut reply, Err(e));
                    return;
                }
            };

            let conn = match self.registry.connector().connect(&id, credentials).await {
                Ok(c) => c,
                Err(e) => {
                    warn!(session_id = %id, error = %e, "connect attempt failed");
                    match self.reconnect_delay(&mut retry_count, &config, &cancel).await {
                        RetryDecision::Retry => continue,
                        RetryDecision::Exhausted => {
                            self.exhaust(&mut reply, &config);
                            return;
                        }
                        RetryDecision::Cancelled => {
                            self.finish(SessionState::Closed, retry_count);
                            return;
                        }
                    }
                }
            };

            let end = self
                .drive(conn, &mut retry_count, &mut reply, &config, &cancel)
                .await;
            self.entry.take_handle();

            match end {
                ConnectionEnd::Cancelled => {
                    self.finish(SessionState::Closed, retry_count);
                    return;
                }
                ConnectionEnd::Timeout => {
                    warn!(
                        session_id = %id,
                        timeout_secs = config.handshake_timeout_secs,
                        "handshake timed out"
                    );
                    self.finish(SessionState::Failed, retry_count);
                    send_reply(
                        &mut reply,
                        Err(WagateError::HandshakeTimeout {
                            duration: Duration::from_secs(config.handshake_timeout_secs),
                        }),
                    );
                    return;
                }
                ConnectionEnd::Dropped(cause) => {
                    self.registry.events().publish(SessionEvent::Disconnected {
                        session_id: id.clone(),
                        cause,
                    });
                    match classify(cause) {
                        CauseClass::Terminal => {
                            self.close_terminally(cause).await;
                            send_reply(&mut reply, Err(WagateError::TerminalDisconnect { cause }));
                            return;
                        }
                        CauseClass::Transient => {
                            info!(session_id = %id, %cause, "transient disconnect");
                        }
                    }
                }
                ConnectionEnd::StreamEnded => {
                    info!(session_id = %id, "event stream ended without a cause");
                }
            }

            // Transient drop or silent stream end: bounded reconnection.
            match self.reconnect_delay(&mut retry_count, &config, &cancel).await {
                RetryDecision::Retry => continue,
                RetryDecision::Exhausted => {
                    self.exhaust(&mut reply, &config);
                    return;
                }
                RetryDecision::Cancelled => {
                    self.finish(SessionState::Closed, retry_count);
                    return;
                }
            }
        }
    }

    /// Processes events for one connection until it ends one way or another.
    ///
    /// The handshake deadline resets on every challenge, since each fresh
    /// challenge restarts the user's pairing window. Once authenticated the
    /// deadline is disarmed.
    async fn drive(
        &self,
        mut conn: WireConnection,
        retry_count: &mut u32,
        reply: &mut Option<CreateReply>,
        config: &SessionConfig,
        cancel: &CancellationToken,
    ) -> ConnectionEnd {
        let id = self.entry.id();
        let handshake_timeout = Duration::from_secs(config.handshake_timeout_secs);
        let deadline = tokio::time::sleep(handshake_timeout);
        tokio::pin!(deadline);
        let mut authenticated = false;

        let end = loop {
            tokio::select! {
                _ = cancel.cancelled() => break ConnectionEnd::Cancelled,
                _ = &mut deadline, if !authenticated => break ConnectionEnd::Timeout,
                event = conn.events.recv() => match event {
                    None => break ConnectionEnd::StreamEnded,
                    Some(WireEvent::HandshakeChallenge { code }) => {
                        deadline.as_mut().reset(Instant::now() + handshake_timeout);
                        info!(session_id = %id, "pairing challenge issued");
                        self.registry.events().publish(SessionEvent::HandshakeChallenge {
                            session_id: id.clone(),
                            code: code.clone(),
                        });
                        // The creation caller sees only the first challenge;
                        // later ones flow through the event sink.
                        if let Some(tx) = reply.take() {
                            let outcome = challenge::render_qr(&code)
                                .map(|qr| CreateOutcome::Challenge { code, qr });
                            let _ = tx.send(outcome);
                        }
                    }
                    Some(WireEvent::AuthSuccess { credentials }) => {
                        authenticated = true;
                        *retry_count = 0;
                        // The transmit handle becomes visible to the queue
                        // only now; an unfinished handshake cannot transmit.
                        self.entry.install_handle(Arc::clone(&conn.handle));
                        self.persist_credentials(&credentials).await;
                        self.transition(SessionState::Connected, 0);
                        self.registry.events().publish(SessionEvent::Connected {
                            session_id: id.clone(),
                        });
                        send_reply(reply, Ok(CreateOutcome::Connected));
                        info!(session_id = %id, "authenticated");
                    }
                    Some(WireEvent::CredentialsRotated { credentials }) => {
                        debug!(session_id = %id, "credentials rotated");
                        self.persist_credentials(&credentials).await;
                    }
                    Some(WireEvent::Disconnected { cause }) => {
                        break ConnectionEnd::Dropped(cause);
                    }
                    Some(WireEvent::Inbound { from, body }) => {
                        self.registry.events().publish(SessionEvent::Inbound {
                            session_id: id.clone(),
                            from,
                            body,
                        });
                    }
                }
            }
        };

        // Detach subscriptions before closing the transport so stale
        // callbacks cannot fire into a dead session.
        let WireConnection { handle, events } = conn;
        drop(events);
        handle.close().await;
        end
    }

    /// Counts the drop against the cap and waits out the reconnect delay.
    async fn reconnect_delay(
        &self,
        retry_count: &mut u32,
        config: &SessionConfig,
        cancel: &CancellationToken,
    ) -> RetryDecision {
        *retry_count += 1;
        if *retry_count > config.reconnect_max_attempts {
            return RetryDecision::Exhausted;
        }

        self.transition(SessionState::Reconnecting, *retry_count);
        info!(
            session_id = %self.entry.id(),
            attempt = *retry_count,
            max_attempts = config.reconnect_max_attempts,
            "reconnecting after delay"
        );

        tokio::select! {
            _ = cancel.cancelled() => RetryDecision::Cancelled,
            _ = tokio::time::sleep(Duration::from_secs(config.reconnect_delay_secs)) => {
                RetryDecision::Retry
            }
        }
    }

    /// Terminal disconnect: wipe credentials, purge pending deliveries, and
    /// close for good. The next create starts from a fresh pairing.
    async fn close_terminally(&self, cause: DisconnectCause) {
        let id = self.entry.id();
        warn!(session_id = %id, %cause, "terminal disconnect, erasing credentials");

        if let Err(e) = self.registry.credentials().erase(id).await {
            error!(session_id = %id, error = %e, "credential erase failed");
        }
        self.registry.purge_queue(id);
        self.finish(SessionState::Closed, 0);
    }

    fn exhaust(&self, reply: &mut Option<CreateReply>, config: &SessionConfig) {
        let attempts = config.reconnect_max_attempts;
        warn!(
            session_id = %self.entry.id(),
            attempts,
            "reconnection exhausted"
        );
        self.registry
            .events()
            .publish(SessionEvent::ReconnectExhausted {
                session_id: self.entry.id().clone(),
                attempts,
            });
        self.finish(SessionState::Failed, attempts);
        send_reply(reply, Err(WagateError::ReconnectExhausted { attempts }));
    }

    /// Final transition plus removal of this lifecycle's own registry entry.
    fn finish(&self, state: SessionState, retry_count: u32) {
        self.transition(state, retry_count);
        self.registry.deregister(&self.entry);
    }

    fn transition(&self, state: SessionState, retry_count: u32) {
        self.entry.set_state(state, retry_count);
        debug!(session_id = %self.entry.id(), %state, retry_count, "state changed");
        self.registry.events().publish(SessionEvent::StateChanged {
            session_id: self.entry.id().clone(),
            state,
        });
    }

    async fn persist_credentials(&self, credentials: &Credentials) {
        let id = self.entry.id();
        if let Err(e) = self.registry.credentials().save(id, credentials).await {
            // Losing a save means the next restart re-pairs; the live
            // connection is unaffected.
            error!(session_id = %id, error = %e, "credential persist failed");
        }
    }
}

fn send_reply(reply: &mut Option<CreateReply>, outcome: Result<CreateOutcome, WagateError>) {
    if let Some(tx) = reply.take() {
        // The caller may have stopped waiting; that is their prerogative.
        let _ = tx.send(outcome);
    }
}
