// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error taxonomy for the Wagate gateway.
//!
//! Connection-level failures are session-scoped and task-level failures are
//! task-scoped; neither crosses session boundaries or aborts the process.

use thiserror::Error;

use crate::types::{DisconnectCause, SessionId};

/// The primary error type used across the Wagate workspace.
#[derive(Debug, Error)]
pub enum WagateError {
    /// Operation referenced a session with no registry entry.
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    /// Create was called while a connected session is live for the id.
    #[error("session already connected: {0}")]
    SessionExists(SessionId),

    /// No challenge or auth success arrived within the handshake bound.
    #[error("handshake timed out after {duration:?}")]
    HandshakeTimeout { duration: std::time::Duration },

    /// Disconnect cause that permanently invalidates the credentials.
    #[error("terminal disconnect (cause {cause})")]
    TerminalDisconnect { cause: DisconnectCause },

    /// Reconnection gave up after the attempt cap.
    #[error("reconnection exhausted after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    /// A single transmission attempt failed (retried per task).
    #[error("transmission failed: {message}")]
    Transmission { message: String },

    /// Credential store failure (load, save, or erase).
    #[error("credential store error: {source}")]
    Credentials {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors (invalid TOML, missing fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// The pairing challenge could not be rendered.
    #[error("failed to encode handshake challenge: {0}")]
    ChallengeEncoding(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl WagateError {
    /// Convenience constructor for credential store failures.
    pub fn credentials<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        WagateError::Credentials {
            source: Box::new(source),
        }
    }
}
