// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seam to the opaque wire client library.
//!
//! The gateway never speaks the network's protocol itself. A [`WireConnector`]
//! opens authenticated connections and every live connection is driven through
//! a [`WireHandle`] plus a stream of [`WireEvent`]s. Dropping the event
//! receiver detaches all subscriptions from the handle, which is required
//! before closing it so stale callbacks cannot re-register a removed session.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::WagateError;
use crate::types::{Credentials, MessageId, Payload, Presence, SessionId, Target, WireEvent};

/// A live connection: the transmit handle and its event stream.
///
/// The handle is exclusively owned by the session's connection lifecycle;
/// other components only borrow it for the duration of a send attempt.
pub struct WireConnection {
    pub handle: std::sync::Arc<dyn WireHandle>,
    pub events: mpsc::Receiver<WireEvent>,
}

/// Factory for wire connections.
#[async_trait]
pub trait WireConnector: Send + Sync + 'static {
    /// Opens a connection attempt for the session.
    ///
    /// With credentials the connection resumes an authenticated session;
    /// without them the network will emit a pairing challenge.
    async fn connect(
        &self,
        session_id: &SessionId,
        credentials: Option<Credentials>,
    ) -> Result<WireConnection, WagateError>;
}

/// Operations on a single live connection.
#[async_trait]
pub trait WireHandle: Send + Sync {
    /// Transmits a payload to a target; resolves to the network's message id.
    async fn transmit(&self, target: &Target, payload: &Payload)
        -> Result<MessageId, WagateError>;

    /// Signals a presence state ("composing"/"paused") to a target.
    async fn set_presence(&self, target: &Target, presence: Presence)
        -> Result<(), WagateError>;

    /// Logs the device out, invalidating the session's credentials remotely.
    async fn logout(&self) -> Result<(), WagateError>;

    /// Closes the underlying transport. Idempotent.
    async fn close(&self);
}
