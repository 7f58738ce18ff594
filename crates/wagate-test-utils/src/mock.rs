// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scriptable wire connector.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use wagate_core::{
    Credentials, DisconnectCause, MessageId, Payload, Presence, SessionId, Target, WagateError,
    WireConnection, WireConnector, WireEvent, WireHandle,
};

/// One step replayed on the event stream after a scripted connect.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Emit a pairing challenge with the given raw code.
    Challenge { code: String },
    /// Emit an authentication success with synthesized credentials.
    AuthSuccess,
    /// Emit a mid-connection credential rotation.
    RotateCredentials,
    /// Emit a disconnect with the given cause.
    Disconnect { cause: DisconnectCause },
    /// Emit an inbound message.
    Inbound { from: Target, body: String },
    /// Pause the replay. Honors `tokio::time::pause`.
    Wait(Duration),
}

/// Events replayed for one connect call.
///
/// After the last step the connection stays open; use
/// [`MockWire::disconnect`] or [`MockWire::end_stream`] to take it down.
#[derive(Debug, Clone, Default)]
pub struct ConnectScript {
    steps: Vec<ScriptStep>,
}

impl ConnectScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Immediate authentication success, the resumed-session happy path.
    pub fn auth_success() -> Self {
        Self::new().step(ScriptStep::AuthSuccess)
    }

    /// Pairing challenge followed by authentication success.
    pub fn challenge_then_auth(code: &str) -> Self {
        Self::new()
            .step(ScriptStep::Challenge { code: code.into() })
            .step(ScriptStep::AuthSuccess)
    }

    /// Immediate disconnect without ever authenticating.
    pub fn disconnect(cause: DisconnectCause) -> Self {
        Self::new().step(ScriptStep::Disconnect { cause })
    }

    pub fn step(mut self, step: ScriptStep) -> Self {
        self.steps.push(step);
        self
    }
}

/// A transmit attempt observed by the mock, failed attempts included.
#[derive(Debug, Clone)]
pub struct TransmitRecord {
    pub session_id: SessionId,
    pub target: Target,
    pub payload: Payload,
}

struct LiveConnection {
    generation: u64,
    events: mpsc::Sender<WireEvent>,
}

#[derive(Default)]
struct MockWireState {
    scripts: Mutex<VecDeque<ConnectScript>>,
    live: Mutex<HashMap<String, LiveConnection>>,
    transmissions: Mutex<Vec<TransmitRecord>>,
    presences: Mutex<Vec<(Target, Presence)>>,
    connects: AtomicUsize,
    connect_failures: AtomicUsize,
    transmit_failures: AtomicUsize,
    logouts: AtomicUsize,
    closes: AtomicUsize,
    generation: AtomicU64,
    creds_seq: AtomicUsize,
    msg_seq: AtomicUsize,
}

/// Scriptable [`WireConnector`] for tests.
///
/// Every connect pops the next queued [`ConnectScript`]; with the queue empty
/// it falls back to [`ConnectScript::auth_success`]. The mock records every
/// transmit and presence call and can inject events into live connections.
#[derive(Clone, Default)]
pub struct MockWire {
    state: Arc<MockWireState>,
}

impl MockWire {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the script for the next connect call.
    pub fn script_next(&self, script: ConnectScript) {
        self.state.scripts.lock().unwrap().push_back(script);
    }

    /// Makes the next `n` connect calls fail before any event is emitted.
    pub fn fail_next_connects(&self, n: usize) {
        self.state.connect_failures.store(n, Ordering::SeqCst);
    }

    /// Makes the next `n` transmit attempts fail.
    pub fn fail_next_transmits(&self, n: usize) {
        self.state.transmit_failures.store(n, Ordering::SeqCst);
    }

    /// Injects an event into the session's live event stream.
    ///
    /// Returns `false` when no live connection exists for the session or the
    /// receiver was already dropped.
    pub async fn push_event(&self, session_id: &SessionId, event: WireEvent) -> bool {
        let sender = {
            let live = self.state.live.lock().unwrap();
            live.get(session_id.as_str()).map(|c| c.events.clone())
        };
        match sender {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }

    /// Drops the session's live connection with the given cause.
    pub async fn disconnect(&self, session_id: &SessionId, cause: DisconnectCause) -> bool {
        self.push_event(session_id, WireEvent::Disconnected { cause })
            .await
    }

    /// Ends the session's event stream without a disconnect event, as if the
    /// transport vanished silently.
    pub fn end_stream(&self, session_id: &SessionId) {
        self.state.live.lock().unwrap().remove(session_id.as_str());
    }

    pub fn connect_count(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn transmissions(&self) -> Vec<TransmitRecord> {
        self.state.transmissions.lock().unwrap().clone()
    }

    pub fn presences(&self) -> Vec<(Target, Presence)> {
        self.state.presences.lock().unwrap().clone()
    }

    pub fn logout_count(&self) -> usize {
        self.state.logouts.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    fn synthesize_credentials(&self, session_id: &SessionId) -> Credentials {
        let seq = self.state.creds_seq.fetch_add(1, Ordering::SeqCst);
        Credentials(serde_json::json!({
            "session": session_id.as_str(),
            "seq": seq,
        }))
    }
}

fn consume_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl WireConnector for MockWire {
    async fn connect(
        &self,
        session_id: &SessionId,
        _credentials: Option<Credentials>,
    ) -> Result<WireConnection, WagateError> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);

        if consume_failure(&self.state.connect_failures) {
            return Err(WagateError::Transmission {
                message: "scripted connect failure".into(),
            });
        }

        let script = self
            .state
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(ConnectScript::auth_success);

        let generation = self.state.generation.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(64);
        self.state.live.lock().unwrap().insert(
            session_id.as_str().to_string(),
            LiveConnection {
                generation,
                events: tx.clone(),
            },
        );

        let mock = self.clone();
        let id = session_id.clone();
        tokio::spawn(async move {
            for step in script.steps {
                let event = match step {
                    ScriptStep::Wait(d) => {
                        tokio::time::sleep(d).await;
                        continue;
                    }
                    ScriptStep::Challenge { code } => WireEvent::HandshakeChallenge { code },
                    ScriptStep::AuthSuccess => WireEvent::AuthSuccess {
                        credentials: mock.synthesize_credentials(&id),
                    },
                    ScriptStep::RotateCredentials => WireEvent::CredentialsRotated {
                        credentials: mock.synthesize_credentials(&id),
                    },
                    ScriptStep::Disconnect { cause } => WireEvent::Disconnected { cause },
                    ScriptStep::Inbound { from, body } => WireEvent::Inbound { from, body },
                };
                if tx.send(event).await.is_err() {
                    return;
                }
            }
        });

        let handle = Arc::new(MockHandle {
            session_id: session_id.clone(),
            generation,
            state: Arc::clone(&self.state),
        });
        Ok(WireConnection { handle, events: rx })
    }
}

struct MockHandle {
    session_id: SessionId,
    generation: u64,
    state: Arc<MockWireState>,
}

#[async_trait]
impl WireHandle for MockHandle {
    async fn transmit(
        &self,
        target: &Target,
        payload: &Payload,
    ) -> Result<MessageId, WagateError> {
        self.state
            .transmissions
            .lock()
            .unwrap()
            .push(TransmitRecord {
                session_id: self.session_id.clone(),
                target: target.clone(),
                payload: payload.clone(),
            });

        if consume_failure(&self.state.transmit_failures) {
            return Err(WagateError::Transmission {
                message: "scripted transmit failure".into(),
            });
        }

        let seq = self.state.msg_seq.fetch_add(1, Ordering::SeqCst);
        Ok(MessageId(format!("mock-msg-{seq}")))
    }

    async fn set_presence(
        &self,
        target: &Target,
        presence: Presence,
    ) -> Result<(), WagateError> {
        self.state
            .presences
            .lock()
            .unwrap()
            .push((target.clone(), presence));
        Ok(())
    }

    async fn logout(&self) -> Result<(), WagateError> {
        self.state.logouts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        // Only tear down our own stream; a reconnect may already have
        // installed a newer one under the same id.
        let mut live = self.state.live.lock().unwrap();
        if let Some(conn) = live.get(self.session_id.as_str()) {
            if conn.generation == self.generation {
                live.remove(self.session_id.as_str());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_script_is_auth_success() {
        let mock = MockWire::new();
        let mut conn = mock
            .connect(&SessionId("s1".into()), None)
            .await
            .unwrap();
        match conn.events.recv().await {
            Some(WireEvent::AuthSuccess { .. }) => {}
            other => panic!("expected auth success, got {other:?}"),
        }
        assert_eq!(mock.connect_count(), 1);
    }

    #[tokio::test]
    async fn scripted_challenge_then_auth() {
        let mock = MockWire::new();
        mock.script_next(ConnectScript::challenge_then_auth("pair-me"));
        let mut conn = mock
            .connect(&SessionId("s1".into()), None)
            .await
            .unwrap();

        match conn.events.recv().await {
            Some(WireEvent::HandshakeChallenge { code }) => assert_eq!(code, "pair-me"),
            other => panic!("expected challenge, got {other:?}"),
        }
        match conn.events.recv().await {
            Some(WireEvent::AuthSuccess { .. }) => {}
            other => panic!("expected auth success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn injected_disconnect_reaches_the_stream() {
        let mock = MockWire::new();
        let id = SessionId("s1".into());
        let mut conn = mock.connect(&id, None).await.unwrap();
        let _ = conn.events.recv().await; // auth success

        assert!(mock.disconnect(&id, DisconnectCause::RESTART_REQUIRED).await);
        match conn.events.recv().await {
            Some(WireEvent::Disconnected { cause }) => {
                assert_eq!(cause, DisconnectCause::RESTART_REQUIRED);
            }
            other => panic!("expected disconnect, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn end_stream_closes_the_channel() {
        let mock = MockWire::new();
        let id = SessionId("s1".into());
        let mut conn = mock.connect(&id, None).await.unwrap();
        let _ = conn.events.recv().await;

        mock.end_stream(&id);
        assert!(conn.events.recv().await.is_none());
    }

    #[tokio::test]
    async fn transmit_failures_are_consumed_in_order() {
        let mock = MockWire::new();
        let id = SessionId("s1".into());
        let conn = mock.connect(&id, None).await.unwrap();
        mock.fail_next_transmits(1);

        let target = Target::from_phone("08123");
        let payload = Payload::Text { body: "hi".into() };
        assert!(conn.handle.transmit(&target, &payload).await.is_err());
        assert!(conn.handle.transmit(&target, &payload).await.is_ok());
        // Both attempts were recorded.
        assert_eq!(mock.transmissions().len(), 2);
    }

    #[tokio::test]
    async fn stale_handle_close_keeps_newer_stream() {
        let mock = MockWire::new();
        let id = SessionId("s1".into());
        let old = mock.connect(&id, None).await.unwrap();
        let mut new = mock.connect(&id, None).await.unwrap();
        let _ = new.events.recv().await;

        old.handle.close().await;
        // The newer connection's stream is still live.
        assert!(mock.disconnect(&id, DisconnectCause::TIMED_OUT).await);
        match new.events.recv().await {
            Some(WireEvent::Disconnected { .. }) => {}
            other => panic!("expected disconnect, got {other:?}"),
        }
    }
}
