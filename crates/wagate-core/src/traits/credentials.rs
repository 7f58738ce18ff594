// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable per-session authentication material.

use async_trait::async_trait;

use crate::error::WagateError;
use crate::types::{Credentials, SessionId};

/// Durable store for per-session authentication material.
///
/// Read at connect time, written on credential rotation, erased on logout.
/// Implementations must not block a connection's event processing for long;
/// callers invoke `save` from the handshake-success path and `erase` from the
/// terminal-closure path.
#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    /// Loads the stored material for a session, `None` if absent.
    async fn load(&self, session_id: &SessionId) -> Result<Option<Credentials>, WagateError>;

    /// Persists (or overwrites) the material for a session.
    async fn save(
        &self,
        session_id: &SessionId,
        credentials: &Credentials,
    ) -> Result<(), WagateError>;

    /// Removes the material for a session. Idempotent.
    async fn erase(&self, session_id: &SessionId) -> Result<(), WagateError>;

    /// Lists sessions with stored material, for restore at startup.
    async fn list(&self) -> Result<Vec<SessionId>, WagateError>;
}
