// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session registry and connection lifecycle.
//!
//! A [`SessionRegistry`] owns every live session. Each session runs one
//! connection lifecycle task: a state machine that drives the pairing
//! handshake, persists rotated credentials, and applies bounded reconnection
//! after transient transport drops. Terminal disconnect causes erase the
//! session's credentials and purge its outbound queue.

mod challenge;
mod lifecycle;
mod registry;

pub use registry::{PendingSession, QueuePurge, SessionEntry, SessionRegistry};
