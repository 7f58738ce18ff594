// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory credential store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use wagate_core::{CredentialStore, Credentials, SessionId, WagateError};

/// [`CredentialStore`] backed by a hash map, recording erase calls so tests
/// can assert that terminal closures wipe auth material.
#[derive(Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<HashMap<String, Credentials>>,
    erased: Mutex<Vec<SessionId>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds stored material, as if a previous run had authenticated.
    pub fn preload(&self, session_id: &SessionId, credentials: Credentials) {
        self.entries
            .lock()
            .unwrap()
            .insert(session_id.as_str().to_string(), credentials);
    }

    /// Currently stored material for a session, if any.
    pub fn stored(&self, session_id: &SessionId) -> Option<Credentials> {
        self.entries
            .lock()
            .unwrap()
            .get(session_id.as_str())
            .cloned()
    }

    /// Every session id `erase` was called for, in call order.
    pub fn erase_calls(&self) -> Vec<SessionId> {
        self.erased.lock().unwrap().clone()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self, session_id: &SessionId) -> Result<Option<Credentials>, WagateError> {
        Ok(self.stored(session_id))
    }

    async fn save(
        &self,
        session_id: &SessionId,
        credentials: &Credentials,
    ) -> Result<(), WagateError> {
        self.preload(session_id, credentials.clone());
        Ok(())
    }

    async fn erase(&self, session_id: &SessionId) -> Result<(), WagateError> {
        self.entries.lock().unwrap().remove(session_id.as_str());
        self.erased.lock().unwrap().push(session_id.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<SessionId>, WagateError> {
        let mut ids: Vec<SessionId> = self
            .entries
            .lock()
            .unwrap()
            .keys()
            .map(|k| SessionId(k.clone()))
            .collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_load_erase() {
        let store = MemoryCredentialStore::new();
        let id = SessionId("s1".into());
        let creds = Credentials(serde_json::json!({"k": 1}));

        assert!(store.load(&id).await.unwrap().is_none());
        store.save(&id, &creds).await.unwrap();
        assert_eq!(store.load(&id).await.unwrap(), Some(creds));

        store.erase(&id).await.unwrap();
        assert!(store.load(&id).await.unwrap().is_none());
        assert_eq!(store.erase_calls(), vec![id]);
    }

    #[tokio::test]
    async fn list_is_sorted() {
        let store = MemoryCredentialStore::new();
        let creds = Credentials(serde_json::json!({}));
        store.save(&SessionId("b".into()), &creds).await.unwrap();
        store.save(&SessionId("a".into()), &creds).await.unwrap();
        assert_eq!(
            store.list().await.unwrap(),
            vec![SessionId("a".into()), SessionId("b".into())]
        );
    }
}
