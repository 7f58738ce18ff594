// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Wagate gateway.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Wagate configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WagateConfig {
    /// Session lifecycle settings (handshake, reconnection).
    #[serde(default)]
    pub session: SessionConfig,

    /// Outbound delivery queue settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Credential store settings.
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

/// Session lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Hard upper bound on handshake establishment, in seconds.
    /// Exceeding it fails the session; it never hangs.
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,

    /// Reconnection attempt cap after a transient disconnect.
    #[serde(default = "default_reconnect_max_attempts")]
    pub reconnect_max_attempts: u32,

    /// Fixed delay between reconnection attempts, in seconds.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            handshake_timeout_secs: default_handshake_timeout_secs(),
            reconnect_max_attempts: default_reconnect_max_attempts(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
        }
    }
}

fn default_handshake_timeout_secs() -> u64 {
    60
}

fn default_reconnect_max_attempts() -> u32 {
    3
}

fn default_reconnect_delay_secs() -> u64 {
    3
}

/// Outbound delivery queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Transmission attempt cap per task.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay for exponential retry backoff, in milliseconds.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// How many sessions may transmit simultaneously. Within one session
    /// delivery is always single-flight regardless of this limit.
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    /// Whether to signal a "composing" presence before each transmission.
    #[serde(default = "default_typing_simulation")]
    pub typing_simulation: bool,

    /// Composing hold per character of visible text, in milliseconds.
    #[serde(default = "default_typing_ms_per_char")]
    pub typing_ms_per_char: u64,

    /// Lower clamp for the composing hold, in milliseconds.
    #[serde(default = "default_typing_min_ms")]
    pub typing_min_ms: u64,

    /// Upper clamp for the composing hold, in milliseconds.
    #[serde(default = "default_typing_max_ms")]
    pub typing_max_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            concurrency_limit: default_concurrency_limit(),
            typing_simulation: default_typing_simulation(),
            typing_ms_per_char: default_typing_ms_per_char(),
            typing_min_ms: default_typing_min_ms(),
            typing_max_ms: default_typing_max_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    2000
}

fn default_concurrency_limit() -> usize {
    3
}

fn default_typing_simulation() -> bool {
    true
}

fn default_typing_ms_per_char() -> u64 {
    50
}

fn default_typing_min_ms() -> u64 {
    500
}

fn default_typing_max_ms() -> u64 {
    5000
}

/// Credential store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialsConfig {
    /// Directory holding one subdirectory of auth material per session.
    #[serde(default = "default_credentials_dir")]
    pub dir: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            dir: default_credentials_dir(),
        }
    }
}

fn default_credentials_dir() -> String {
    "./sessions".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = WagateConfig::default();
        assert_eq!(config.session.handshake_timeout_secs, 60);
        assert_eq!(config.session.reconnect_max_attempts, 3);
        assert_eq!(config.session.reconnect_delay_secs, 3);
        assert_eq!(config.queue.max_attempts, 3);
        assert_eq!(config.queue.backoff_base_ms, 2000);
        assert_eq!(config.queue.concurrency_limit, 3);
        assert!(config.queue.typing_simulation);
        assert_eq!(config.credentials.dir, "./sessions");
    }

    #[test]
    fn typing_clamp_bounds_are_ordered() {
        let config = QueueConfig::default();
        assert!(config.typing_min_ms <= config.typing_max_ms);
    }
}
