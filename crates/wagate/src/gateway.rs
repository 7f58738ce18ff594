// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The gateway front: one handle over sessions, deliveries, and events.

use std::sync::Arc;

use tokio::sync::{broadcast, oneshot};
use tracing::info;

use wagate_config::WagateConfig;
use wagate_core::{
    CreateOutcome, CredentialStore, Payload, QueueStatus, SessionEvent, SessionId, SessionStatus,
    Target, TaskId, TaskOutcome, WagateError, WireConnector,
};
use wagate_creds::FileCredentialStore;
use wagate_queue::OutboundQueue;
use wagate_session::SessionRegistry;

use crate::fanout::EventFanout;

/// Assembled gateway: session registry, outbound queue, and event fanout.
pub struct Gateway {
    registry: Arc<SessionRegistry>,
    queue: Arc<OutboundQueue>,
    fanout: Arc<EventFanout>,
}

impl Gateway {
    /// Builds a gateway with the file-backed credential store from the
    /// configuration.
    pub fn new(config: WagateConfig, connector: Arc<dyn WireConnector>) -> Arc<Self> {
        let credentials: Arc<dyn CredentialStore> =
            Arc::new(FileCredentialStore::new(config.credentials.dir.clone()));
        Gateway::with_credential_store(config, connector, credentials)
    }

    /// Builds a gateway over an explicit credential store.
    pub fn with_credential_store(
        config: WagateConfig,
        connector: Arc<dyn WireConnector>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Arc<Self> {
        let fanout = Arc::new(EventFanout::default());
        let registry = SessionRegistry::new(
            config.session,
            connector,
            credentials,
            Arc::clone(&fanout) as Arc<_>,
        );
        let queue = OutboundQueue::new(
            config.queue,
            Arc::clone(&registry),
            Arc::clone(&fanout) as Arc<_>,
        );
        registry.set_queue_purge(Arc::clone(&queue) as Arc<_>);

        Arc::new(Gateway {
            registry,
            queue,
            fanout,
        })
    }

    /// Creates a session and waits for its first decisive moment: a pairing
    /// challenge, a resumed connection, or the creation error.
    pub async fn create_session(&self, session_id: SessionId) -> Result<CreateOutcome, WagateError> {
        let pending = self.registry.create(session_id)?;
        match pending.outcome.await {
            Ok(outcome) => outcome,
            // The sender dropped without a value: deleted or replaced while
            // we were waiting.
            Err(_) => Err(WagateError::SessionNotFound(pending.session_id)),
        }
    }

    /// Current lifecycle snapshot of a session.
    pub fn session_status(&self, session_id: &SessionId) -> Result<SessionStatus, WagateError> {
        Ok(self.registry.get(session_id)?.status())
    }

    /// Ids of every live session, sorted.
    pub fn list_sessions(&self) -> Vec<SessionId> {
        self.registry.list()
    }

    /// Tears a session down; with `erase_credentials` the device is logged
    /// out and its stored pairing material wiped. Returns whether the
    /// session existed.
    pub async fn delete_session(&self, session_id: &SessionId, erase_credentials: bool) -> bool {
        self.registry.delete(session_id, erase_credentials).await
    }

    /// Queues a message to a single recipient, normalizing the raw phone
    /// number into a wire target.
    pub fn send_message(
        &self,
        session_id: &SessionId,
        raw_phone: &str,
        payload: Payload,
    ) -> Result<(TaskId, oneshot::Receiver<TaskOutcome>), WagateError> {
        self.queue
            .enqueue(session_id, Target::from_phone(raw_phone), payload)
    }

    /// Queues a message to a group.
    pub fn send_group_message(
        &self,
        session_id: &SessionId,
        raw_group: &str,
        payload: Payload,
    ) -> Result<(TaskId, oneshot::Receiver<TaskOutcome>), WagateError> {
        self.queue
            .enqueue(session_id, Target::from_group(raw_group), payload)
    }

    /// Queues the same payload to every recipient in a separated list
    /// (`,` or `|`), one task per recipient in list order.
    pub fn send_broadcast(
        &self,
        session_id: &SessionId,
        raw_recipients: &str,
        payload: Payload,
    ) -> Result<Vec<(TaskId, oneshot::Receiver<TaskOutcome>)>, WagateError> {
        let targets = parse_recipients(raw_recipients);
        if targets.is_empty() {
            return Err(WagateError::Config(format!(
                "no recipients in {raw_recipients:?}"
            )));
        }
        let mut tasks = Vec::with_capacity(targets.len());
        for target in targets {
            tasks.push(self.queue.enqueue(session_id, target, payload.clone())?);
        }
        info!(session_id = %session_id, recipients = tasks.len(), "broadcast queued");
        Ok(tasks)
    }

    /// Snapshot of a session's outbound queue.
    pub fn queue_status(&self, session_id: &SessionId) -> QueueStatus {
        self.queue.status(session_id)
    }

    /// Discards a session's pending deliveries. Returns how many were
    /// dropped.
    pub fn clear_queue(&self, session_id: &SessionId) -> usize {
        self.queue.clear(session_id)
    }

    /// Subscribes to lifecycle and delivery events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.fanout.subscribe()
    }

    /// Recreates every session with stored credentials, typically at
    /// startup. Returns the ids that were started.
    pub async fn restore_sessions(&self) -> Result<Vec<SessionId>, WagateError> {
        self.registry.restore_all().await
    }

    /// Stops deliveries, then cancels every session and waits for the
    /// lifecycle tasks to exit.
    pub async fn shutdown(&self) {
        self.queue.shutdown().await;
        self.registry.shutdown().await;
        info!("gateway shut down");
    }
}

/// Splits a comma or pipe separated recipient list into wire targets,
/// skipping empty fragments.
fn parse_recipients(raw: &str) -> Vec<Target> {
    raw.split([',', '|'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Target::from_phone)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipients_split_on_comma_and_pipe() {
        let targets = parse_recipients("08123, 08124|08125");
        assert_eq!(
            targets,
            vec![
                Target::from_phone("08123"),
                Target::from_phone("08124"),
                Target::from_phone("08125"),
            ]
        );
    }

    #[test]
    fn empty_fragments_are_skipped() {
        let targets = parse_recipients("08123,,|  ,08124");
        assert_eq!(targets.len(), 2);
    }

    #[test]
    fn blank_list_yields_nothing() {
        assert!(parse_recipients("  ").is_empty());
        assert!(parse_recipients("").is_empty());
    }
}
