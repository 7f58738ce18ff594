// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session outbound delivery queue.
//!
//! Each session gets one worker task, so deliveries for a session are
//! strictly sequential while different sessions proceed in parallel up to a
//! global transmit concurrency limit. A task is retried with exponential
//! backoff up to the attempt cap and resolves to exactly one terminal
//! [`TaskOutcome`]; clearing a queue discards pending tasks without failing
//! them.

mod queue;
mod worker;

pub use queue::OutboundQueue;
