// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./waflow.toml` > `~/.config/waflow/waflow.toml`
//! > `/etc/waflow/waflow.toml` with environment variable overrides via the
//! `WAFLOW_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::WaflowConfig;

/// Load configuration from the standard XDG hierarchy with env overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/waflow/waflow.toml` (system-wide)
/// 3. `~/.config/waflow/waflow.toml` (user XDG config)
/// 4. `./waflow.toml` (local directory)
/// 5. `WAFLOW_*` environment variables
pub fn load_config() -> Result<WaflowConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WaflowConfig::default()))
        .merge(Toml::file("/etc/waflow/waflow.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("waflow/waflow.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("waflow.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<WaflowConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WaflowConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env overrides.
pub fn load_config_from_path(path: &Path) -> Result<WaflowConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WaflowConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `WAFLOW_WEBHOOK_APP_SECRET` must map to
/// `webhook.app_secret`, not `webhook.app.secret`.
fn env_provider() -> Env {
    Env::prefixed("WAFLOW_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a prefix-stripped env key to its dotted config path.
///
/// The `undeliverable_131026` subtable gets its own replacement so nested
/// tier settings like `WAFLOW_SUPPRESSION_UNDELIVERABLE_131026_TTL_BASE_DAYS`
/// resolve to `suppression.undeliverable_131026.ttl_base_days`.
fn map_env_key(key: &str) -> String {
    key.replacen("gateway_", "gateway.", 1)
        .replacen("webhook_", "webhook.", 1)
        .replacen("storage_", "storage.", 1)
        .replacen("suppression_", "suppression.", 1)
        .replacen("undeliverable_131026_", "undeliverable_131026.", 1)
        .replacen("log_", "log.", 1)
}
