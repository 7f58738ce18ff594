// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the Wagate gateway.
//!
//! TOML files merged in XDG order with `WAGATE_` environment overrides.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{CredentialsConfig, QueueConfig, SessionConfig, WagateConfig};
