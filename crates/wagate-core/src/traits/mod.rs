// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Traits for the gateway's external collaborators.

pub mod credentials;
pub mod events;
pub mod wire;

pub use credentials::CredentialStore;
pub use events::{EventSink, NullEventSink};
pub use wire::{WireConnection, WireConnector, WireHandle};
