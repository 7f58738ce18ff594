// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Boundary to the downstream event consumer (webhook subsystem etc.).

use crate::types::SessionEvent;

/// Receives lifecycle and delivery events for downstream forwarding.
///
/// Publishing must be cheap and non-blocking; slow consumers are the sink's
/// problem, never the session's.
pub trait EventSink: Send + Sync + 'static {
    fn publish(&self, event: SessionEvent);
}

/// A sink that drops every event, for tests and headless deployments.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn publish(&self, _event: SessionEvent) {}
}
