// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The session registry: one entry per live session id.
//!
//! The registry is the single authority on which sessions exist. Lifecycle
//! tasks register themselves through [`SessionRegistry::create`] and remove
//! their own entry on terminal exit; an explicit delete wins over a
//! concurrent lifecycle exit because removal is compared by entry identity.

use std::sync::{Arc, RwLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use wagate_config::SessionConfig;
use wagate_core::{
    CreateOutcome, CredentialStore, EventSink, SessionId, SessionState, SessionStatus,
    WagateError, WireConnector, WireHandle,
};

use crate::lifecycle::ConnectionLifecycle;

/// Hook the outbound queue installs so terminal closures can drop a
/// session's pending tasks.
///
/// Implementations must not call back into the registry; purge runs while
/// registry internals may be locked.
pub trait QueuePurge: Send + Sync + 'static {
    /// Drops every queued task for the session without failing them.
    fn purge(&self, session_id: &SessionId);
}

/// A session known to the registry.
///
/// The entry outlives its map slot: lifecycle tasks and status watchers hold
/// their own `Arc`, so a deleted session's watchers still observe the final
/// `Closed` transition.
pub struct SessionEntry {
    id: SessionId,
    status: watch::Sender<SessionStatus>,
    handle: RwLock<Option<Arc<dyn WireHandle>>>,
    cancel: CancellationToken,
}

impl SessionEntry {
    fn new(id: SessionId) -> Arc<Self> {
        let (status, _) = watch::channel(SessionStatus::uninitialized());
        Arc::new(SessionEntry {
            id,
            status,
            handle: RwLock::new(None),
            cancel: CancellationToken::new(),
        })
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Current lifecycle snapshot.
    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    /// Subscribes to lifecycle snapshots.
    pub fn watch(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// The live transmit handle, present only between handshake completion
    /// and the next drop.
    pub fn live_handle(&self) -> Option<Arc<dyn WireHandle>> {
        self.handle.read().expect("handle lock poisoned").clone()
    }

    /// Token cancelled when the session is deleted or replaced.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }

    pub(crate) fn install_handle(&self, handle: Arc<dyn WireHandle>) {
        *self.handle.write().expect("handle lock poisoned") = Some(handle);
    }

    pub(crate) fn take_handle(&self) -> Option<Arc<dyn WireHandle>> {
        self.handle.write().expect("handle lock poisoned").take()
    }

    pub(crate) fn set_state(&self, state: SessionState, retry_count: u32) {
        let connected_since = if state == SessionState::Connected {
            Some(chrono::Utc::now())
        } else {
            None
        };
        self.status.send_replace(SessionStatus {
            state,
            retry_count,
            connected_since,
        });
    }
}

/// Handed back by [`SessionRegistry::create`].
///
/// `outcome` resolves exactly once: with the pairing challenge, with
/// `Connected` for a resumed session, or with the creation error. The sender
/// is dropped without a value when the session is deleted mid-creation.
#[derive(Debug)]
pub struct PendingSession {
    pub session_id: SessionId,
    pub status: watch::Receiver<SessionStatus>,
    pub outcome: oneshot::Receiver<Result<CreateOutcome, WagateError>>,
}

/// Owns every session and spawns one lifecycle task per create.
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<SessionEntry>>,
    connector: Arc<dyn WireConnector>,
    credentials: Arc<dyn CredentialStore>,
    events: Arc<dyn EventSink>,
    config: SessionConfig,
    purge: RwLock<Option<Arc<dyn QueuePurge>>>,
    tracker: TaskTracker,
}

impl SessionRegistry {
    pub fn new(
        config: SessionConfig,
        connector: Arc<dyn WireConnector>,
        credentials: Arc<dyn CredentialStore>,
        events: Arc<dyn EventSink>,
    ) -> Arc<Self> {
        Arc::new(SessionRegistry {
            sessions: DashMap::new(),
            connector,
            credentials,
            events,
            config,
            purge: RwLock::new(None),
            tracker: TaskTracker::new(),
        })
    }

    /// Installs the queue purge hook. Called once at gateway assembly, after
    /// the queue is constructed against this registry.
    pub fn set_queue_purge(&self, purge: Arc<dyn QueuePurge>) {
        *self.purge.write().expect("purge lock poisoned") = Some(purge);
    }

    /// Registers a session and starts its connection lifecycle.
    ///
    /// Rejected with [`WagateError::SessionExists`] only while a connected
    /// session is live under the id. Any non-connected leftover (failed,
    /// stuck handshake, mid-reconnect) is torn down and replaced.
    pub fn create(self: &Arc<Self>, session_id: SessionId) -> Result<PendingSession, WagateError> {
        let entry = match self.sessions.entry(session_id.as_str().to_string()) {
            Entry::Occupied(mut occ) => {
                let existing = Arc::clone(occ.get());
                if existing.status().state == SessionState::Connected {
                    return Err(WagateError::SessionExists(session_id));
                }
                // The old lifecycle observes the cancellation and exits; its
                // deregistration compares entry identity so it cannot remove
                // the replacement.
                existing.cancel();
                self.purge_queue(&session_id);
                info!(session_id = %session_id, "replacing stale session");
                let fresh = SessionEntry::new(session_id.clone());
                occ.insert(Arc::clone(&fresh));
                fresh
            }
            Entry::Vacant(vac) => {
                let fresh = SessionEntry::new(session_id.clone());
                vac.insert(Arc::clone(&fresh));
                fresh
            }
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        let status = entry.watch();
        let lifecycle = ConnectionLifecycle::new(Arc::clone(self), Arc::clone(&entry));
        self.tracker.spawn(lifecycle.run(reply_tx));

        info!(session_id = %session_id, "session created");
        Ok(PendingSession {
            session_id,
            status,
            outcome: reply_rx,
        })
    }

    /// Looks up a live session.
    pub fn get(&self, session_id: &SessionId) -> Result<Arc<SessionEntry>, WagateError> {
        self.sessions
            .get(session_id.as_str())
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| WagateError::SessionNotFound(session_id.clone()))
    }

    /// Ids of every registered session, sorted.
    pub fn list(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self
            .sessions
            .iter()
            .map(|e| e.value().id().clone())
            .collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    /// Tears a session down. Idempotent; returns whether the session existed.
    ///
    /// With `erase_credentials` the device is also logged out remotely and
    /// the stored auth material wiped, so the next create starts from a
    /// fresh pairing challenge.
    pub async fn delete(&self, session_id: &SessionId, erase_credentials: bool) -> bool {
        let Some((_, entry)) = self.sessions.remove(session_id.as_str()) else {
            return false;
        };

        if erase_credentials {
            if let Some(handle) = entry.live_handle() {
                if let Err(e) = handle.logout().await {
                    warn!(session_id = %session_id, error = %e, "remote logout failed");
                }
            }
        }

        entry.cancel();
        self.purge_queue(session_id);

        if erase_credentials {
            if let Err(e) = self.credentials.erase(session_id).await {
                warn!(session_id = %session_id, error = %e, "credential erase failed");
            }
        }

        info!(session_id = %session_id, erase_credentials, "session deleted");
        true
    }

    /// Recreates a session for every id with stored credentials.
    ///
    /// Individual failures are logged and skipped; one broken session must
    /// not block the rest of the restore.
    pub async fn restore_all(self: &Arc<Self>) -> Result<Vec<SessionId>, WagateError> {
        let stored = self.credentials.list().await?;
        let mut started = Vec::with_capacity(stored.len());
        for session_id in stored {
            match self.create(session_id.clone()) {
                Ok(_pending) => started.push(session_id),
                Err(e) => {
                    warn!(session_id = %session_id, error = %e, "restore skipped")
                }
            }
        }
        info!(restored = started.len(), "session restore complete");
        Ok(started)
    }

    /// Cancels every session and waits for all lifecycle tasks to exit.
    pub async fn shutdown(&self) {
        for entry in self.sessions.iter() {
            entry.value().cancel();
        }
        self.tracker.close();
        self.tracker.wait().await;
        self.sessions.clear();
        info!("session registry shut down");
    }

    /// Removes the entry only if it is still the registered one; a
    /// replacement created under the same id is left alone.
    pub(crate) fn deregister(&self, entry: &Arc<SessionEntry>) {
        self.sessions
            .remove_if(entry.id().as_str(), |_, current| Arc::ptr_eq(current, entry));
    }

    pub(crate) fn purge_queue(&self, session_id: &SessionId) {
        if let Some(purge) = self.purge.read().expect("purge lock poisoned").as_ref() {
            purge.purge(session_id);
        }
    }

    pub(crate) fn connector(&self) -> &Arc<dyn WireConnector> {
        &self.connector
    }

    pub(crate) fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    pub(crate) fn events(&self) -> &Arc<dyn EventSink> {
        &self.events
    }

    pub(crate) fn session_config(&self) -> &SessionConfig {
        &self.config
    }
}
