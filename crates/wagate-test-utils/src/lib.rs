// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test doubles for the Wagate gateway.
//!
//! [`MockWire`] is a scriptable [`WireConnector`]: each connect pops a
//! [`ConnectScript`] whose steps are replayed as [`WireEvent`]s, and later
//! events can be injected into a live connection by hand. Alongside it live an
//! in-memory credential store and an event sink that records what it saw.
//!
//! [`WireConnector`]: wagate_core::WireConnector
//! [`WireEvent`]: wagate_core::WireEvent

mod capture;
mod memory;
mod mock;

pub use capture::CaptureEventSink;
pub use memory::MemoryCredentialStore;
pub use mock::{ConnectScript, MockWire, ScriptStep, TransmitRecord};
