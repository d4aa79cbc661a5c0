// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as valid bind addresses and coherent TTL tiers.

use thiserror::Error;

use crate::model::WaflowConfig;

/// A single configuration problem, suitable for startup diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Figment failed to parse or merge the config sources.
    #[error("config parse error: {message}")]
    Parse { message: String },
    /// The config parsed but a semantic constraint failed.
    #[error("config error: {message}")]
    Validation { message: String },
}

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects all problems rather than failing fast, so an operator can fix
/// everything in one pass.
pub fn validate_config(config: &WaflowConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.gateway.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("gateway.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if config.storage.path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.path must not be empty".to_string(),
        });
    }

    let tiers = &config.suppression.undeliverable_131026;
    if tiers.window_days <= 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "suppression.undeliverable_131026.window_days must be positive, got {}",
                tiers.window_days
            ),
        });
    }
    if tiers.threshold < 2 {
        errors.push(ConfigError::Validation {
            message: format!(
                "suppression.undeliverable_131026.threshold must be at least 2, got {}",
                tiers.threshold
            ),
        });
    }
    for (name, value) in [
        ("ttl_base_days", tiers.ttl_base_days),
        ("ttl2_days", tiers.ttl2_days),
        ("ttl3_days", tiers.ttl3_days),
    ] {
        if value <= 0 {
            errors.push(ConfigError::Validation {
                message: format!(
                    "suppression.undeliverable_131026.{name} must be positive, got {value}"
                ),
            });
        }
    }
    if tiers.ttl_base_days > tiers.ttl2_days || tiers.ttl2_days > tiers.ttl3_days {
        errors.push(ConfigError::Validation {
            message: "suppression TTL tiers must be non-decreasing \
                      (ttl_base_days <= ttl2_days <= ttl3_days)"
                .to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Print collected config errors to stderr, one per line.
pub fn render_errors(errors: &[ConfigError]) {
    for error in errors {
        eprintln!("waflow: {error}");
    }
}
