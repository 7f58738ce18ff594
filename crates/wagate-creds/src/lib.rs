// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! File-backed [`CredentialStore`].
//!
//! One subdirectory per session under a configured root, each holding a
//! single `creds.json` blob. A directory without a readable `creds.json` is
//! considered stale and is cleaned up on the next load, so a half-written
//! handshake never poisons a later create.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use wagate_core::{CredentialStore, Credentials, SessionId, WagateError};

const CREDS_FILE: &str = "creds.json";

/// Credential store keeping one directory of auth material per session.
pub struct FileCredentialStore {
    root: PathBuf,
}

impl FileCredentialStore {
    /// Creates a store rooted at `root`. The directory is created lazily on
    /// the first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn session_dir(&self, session_id: &SessionId) -> Result<PathBuf, WagateError> {
        let id = session_id.as_str();
        // Session ids become directory names; refuse anything that could
        // escape the root.
        if id.is_empty()
            || id.contains(['/', '\\'])
            || id == "."
            || id == ".."
        {
            return Err(WagateError::Config(format!(
                "invalid session id for credential storage: {id:?}"
            )));
        }
        Ok(self.root.join(id))
    }

    fn creds_path(&self, session_id: &SessionId) -> Result<PathBuf, WagateError> {
        Ok(self.session_dir(session_id)?.join(CREDS_FILE))
    }

    async fn remove_dir_if_present(dir: &Path) -> Result<(), WagateError> {
        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(WagateError::credentials(e)),
        }
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self, session_id: &SessionId) -> Result<Option<Credentials>, WagateError> {
        let dir = self.session_dir(session_id)?;
        let path = self.creds_path(session_id)?;

        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // A session dir without creds is a leftover from an aborted
                // handshake; clean it so create starts fresh.
                if tokio::fs::try_exists(&dir).await.unwrap_or(false) {
                    info!(session_id = %session_id, "cleaning stale session directory");
                    Self::remove_dir_if_present(&dir).await?;
                }
                return Ok(None);
            }
            Err(e) => return Err(WagateError::credentials(e)),
        };

        match serde_json::from_slice::<Credentials>(&bytes) {
            Ok(creds) => {
                debug!(session_id = %session_id, "loaded credentials");
                Ok(Some(creds))
            }
            Err(e) => {
                warn!(
                    session_id = %session_id,
                    error = %e,
                    "corrupt credential file, discarding"
                );
                Self::remove_dir_if_present(&dir).await?;
                Ok(None)
            }
        }
    }

    async fn save(
        &self,
        session_id: &SessionId,
        credentials: &Credentials,
    ) -> Result<(), WagateError> {
        let dir = self.session_dir(session_id)?;
        let path = self.creds_path(session_id)?;

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(WagateError::credentials)?;

        let bytes = serde_json::to_vec(credentials)
            .map_err(|e| WagateError::Internal(format!("credential serialization: {e}")))?;

        // Write-then-rename so a crash mid-write never leaves a torn file.
        let tmp = dir.join(format!("{CREDS_FILE}.tmp"));
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(WagateError::credentials)?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(WagateError::credentials)?;

        debug!(session_id = %session_id, "saved credentials");
        Ok(())
    }

    async fn erase(&self, session_id: &SessionId) -> Result<(), WagateError> {
        let dir = self.session_dir(session_id)?;
        Self::remove_dir_if_present(&dir).await?;
        info!(session_id = %session_id, "erased credentials");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<SessionId>, WagateError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(WagateError::credentials(e)),
        };

        let mut sessions = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(WagateError::credentials)?
        {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            if !path.join(CREDS_FILE).is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                sessions.push(SessionId(name.to_string()));
            }
        }

        sessions.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn creds(marker: &str) -> Credentials {
        Credentials(serde_json::json!({ "noise_key": marker, "registered": true }))
    }

    #[tokio::test]
    async fn load_absent_session_returns_none() {
        let dir = tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path());
        let loaded = store.load(&SessionId("s1".into())).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path());
        let id = SessionId("s1".into());

        store.save(&id, &creds("abc")).await.unwrap();
        let loaded = store.load(&id).await.unwrap().unwrap();
        assert_eq!(loaded, creds("abc"));
    }

    #[tokio::test]
    async fn save_overwrites_previous_material() {
        let dir = tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path());
        let id = SessionId("s1".into());

        store.save(&id, &creds("old")).await.unwrap();
        store.save(&id, &creds("new")).await.unwrap();
        let loaded = store.load(&id).await.unwrap().unwrap();
        assert_eq!(loaded, creds("new"));
    }

    #[tokio::test]
    async fn erase_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path());
        let id = SessionId("s1".into());

        store.save(&id, &creds("x")).await.unwrap();
        store.erase(&id).await.unwrap();
        assert!(store.load(&id).await.unwrap().is_none());

        // Erasing again is a no-op, not an error.
        store.erase(&id).await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_creds_file_is_discarded() {
        let dir = tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path());
        let id = SessionId("s1".into());

        let session_dir = dir.path().join("s1");
        std::fs::create_dir_all(&session_dir).unwrap();
        std::fs::write(session_dir.join(CREDS_FILE), b"not json {").unwrap();

        assert!(store.load(&id).await.unwrap().is_none());
        // The stale directory is gone.
        assert!(!session_dir.exists());
    }

    #[tokio::test]
    async fn stale_dir_without_creds_is_cleaned() {
        let dir = tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path());
        let id = SessionId("s1".into());

        let session_dir = dir.path().join("s1");
        std::fs::create_dir_all(&session_dir).unwrap();

        assert!(store.load(&id).await.unwrap().is_none());
        assert!(!session_dir.exists());
    }

    #[tokio::test]
    async fn list_returns_only_sessions_with_creds() {
        let dir = tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path());

        store.save(&SessionId("b".into()), &creds("1")).await.unwrap();
        store.save(&SessionId("a".into()), &creds("2")).await.unwrap();
        // Stale dir without creds is skipped.
        std::fs::create_dir_all(dir.path().join("stale")).unwrap();

        let sessions = store.list().await.unwrap();
        assert_eq!(
            sessions,
            vec![SessionId("a".into()), SessionId("b".into())]
        );
    }

    #[tokio::test]
    async fn list_with_missing_root_is_empty() {
        let dir = tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("never-created"));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn path_escaping_ids_are_rejected() {
        let dir = tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path());

        for bad in ["../up", "a/b", "", ".."] {
            let result = store.load(&SessionId(bad.into())).await;
            assert!(result.is_err(), "id {bad:?} should be rejected");
        }
    }
}
