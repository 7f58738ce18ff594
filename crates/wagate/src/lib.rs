// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wagate: a multi-tenant messaging gateway.
//!
//! Each tenant owns a named session to the wire network. The [`Gateway`]
//! front assembles the session registry, the per-session outbound delivery
//! queue, and the event fanout into one handle:
//!
//! ```no_run
//! use std::sync::Arc;
//! use wagate::{Gateway, Payload};
//!
//! # async fn demo(connector: Arc<dyn wagate::WireConnector>) -> Result<(), wagate::WagateError> {
//! let config = wagate::load_config().map_err(|e| wagate::WagateError::Config(e.to_string()))?;
//! let gateway = Gateway::new(config, connector);
//!
//! gateway.restore_sessions().await?;
//! let outcome = gateway.create_session("tenant-1".into()).await?;
//! let (_task, delivery) = gateway.send_message(
//!     &"tenant-1".into(),
//!     "08123456789",
//!     Payload::Text { body: "hello".into() },
//! )?;
//! # Ok(())
//! # }
//! ```

mod fanout;
mod gateway;
pub mod telemetry;

pub use fanout::EventFanout;
pub use gateway::Gateway;

pub use wagate_config::{load_config, load_config_from_path, load_config_from_str, WagateConfig};
pub use wagate_core::{
    CreateOutcome, Credentials, DisconnectCause, MediaKind, MessageId, Payload, Presence,
    QueueStatus, SessionEvent, SessionId, SessionState, SessionStatus, Target, TaskId,
    TaskOutcome, WagateError, WireConnection, WireConnector, WireEvent, WireHandle,
};
pub use wagate_creds::FileCredentialStore;
