// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./wagate.toml` > `~/.config/wagate/wagate.toml` >
//! `/etc/wagate/wagate.toml` with environment variable overrides via the
//! `WAGATE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::WagateConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/wagate/wagate.toml` (system-wide)
/// 3. `~/.config/wagate/wagate.toml` (user XDG config)
/// 4. `./wagate.toml` (local directory)
/// 5. `WAGATE_*` environment variables
pub fn load_config() -> Result<WagateConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WagateConfig::default()))
        .merge(Toml::file("/etc/wagate/wagate.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("wagate/wagate.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("wagate.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and embedded configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<WagateConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WagateConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<WagateConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WagateConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `WAGATE_QUEUE_MAX_ATTEMPTS` must map to
/// `queue.max_attempts`, not `queue.max.attempts`.
fn env_provider() -> Env {
    Env::prefixed("WAGATE_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("session_", "session.", 1)
            .replacen("queue_", "queue.", 1)
            .replacen("credentials_", "credentials.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn load_from_str_overrides_defaults() {
        let config = load_config_from_str(
            r#"
            [session]
            handshake_timeout_secs = 20
            reconnect_max_attempts = 5

            [queue]
            max_attempts = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.session.handshake_timeout_secs, 20);
        assert_eq!(config.session.reconnect_max_attempts, 5);
        assert_eq!(config.queue.max_attempts, 2);
        // Untouched keys keep their defaults.
        assert_eq!(config.session.reconnect_delay_secs, 3);
        assert_eq!(config.queue.backoff_base_ms, 2000);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = load_config_from_str(
            r#"
            [queue]
            max_retires = 4
            "#,
        );
        assert!(result.is_err(), "typoed key should be rejected");
    }

    #[test]
    fn empty_config_is_all_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.session.handshake_timeout_secs, 60);
        assert_eq!(config.queue.concurrency_limit, 3);
    }

    #[test]
    #[serial]
    fn env_vars_override_file_values() {
        // SAFETY: serial test, no other thread reads the environment.
        unsafe {
            std::env::set_var("WAGATE_QUEUE_MAX_ATTEMPTS", "7");
        }

        let config = Figment::new()
            .merge(Serialized::defaults(WagateConfig::default()))
            .merge(env_provider())
            .extract::<WagateConfig>()
            .unwrap();

        unsafe {
            std::env::remove_var("WAGATE_QUEUE_MAX_ATTEMPTS");
        }

        assert_eq!(config.queue.max_attempts, 7);
    }
}
