// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tracing setup for embedding binaries.

use tracing_subscriber::{fmt, EnvFilter};

/// Installs a global tracing subscriber honoring `RUST_LOG`, defaulting to
/// `info` for the gateway crates. Safe to call once per process; later calls
/// are ignored.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,wagate=debug"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
