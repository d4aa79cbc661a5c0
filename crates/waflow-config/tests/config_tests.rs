// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Waflow configuration system.

use waflow_config::{ConfigError, load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_waflow_config() {
    let toml = r#"
[gateway]
host = "0.0.0.0"
port = 9090

[webhook]
app_secret = "shhh"
verify_token = "handshake-token"

[storage]
path = "/tmp/waflow-test.db"

[suppression]
enabled = true

[suppression.undeliverable_131026]
enabled = true
window_days = 120
threshold = 3
ttl_base_days = 30
ttl2_days = 60
ttl3_days = 120

[log]
level = "debug"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.gateway.host, "0.0.0.0");
    assert_eq!(config.gateway.port, 9090);
    assert_eq!(config.webhook.app_secret, "shhh");
    assert_eq!(config.webhook.verify_token, "handshake-token");
    assert_eq!(config.storage.path, "/tmp/waflow-test.db");
    assert_eq!(config.suppression.undeliverable_131026.ttl_base_days, 30);
    assert_eq!(config.suppression.undeliverable_131026.window_days, 120);
    assert_eq!(config.log.level, "debug");
}

/// Empty input produces the compiled defaults.
#[test]
fn empty_toml_yields_defaults() {
    let config = load_config_from_str("").expect("defaults should apply");
    assert_eq!(config.gateway.host, "127.0.0.1");
    assert_eq!(config.gateway.port, 8787);
    assert_eq!(config.webhook.app_secret, "");
    assert!(config.suppression.enabled);
    assert_eq!(config.suppression.undeliverable_131026.ttl_base_days, 90);
    assert_eq!(config.suppression.undeliverable_131026.ttl2_days, 180);
    assert_eq!(config.suppression.undeliverable_131026.ttl3_days, 365);
}

/// Unknown keys are rejected rather than silently ignored.
#[test]
fn unknown_key_is_rejected() {
    let toml = r#"
[gateway]
hostt = "typo"
"#;
    assert!(load_config_from_str(toml).is_err());
}

/// Validation collects all problems rather than failing fast.
#[test]
fn validation_collects_multiple_errors() {
    let toml = r#"
[gateway]
host = ""

[storage]
path = ""
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert!(errors.len() >= 2);
    assert!(
        errors
            .iter()
            .all(|e| matches!(e, ConfigError::Validation { .. }))
    );
}

/// Decreasing TTL tiers are a validation error.
#[test]
fn decreasing_ttl_tiers_are_rejected() {
    let toml = r#"
[suppression.undeliverable_131026]
ttl_base_days = 365
ttl2_days = 180
ttl3_days = 90
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert!(
        errors
            .iter()
            .any(|e| e.to_string().contains("non-decreasing"))
    );
}

/// A well-formed config passes validation end to end.
#[test]
fn valid_config_passes_validation() {
    let config = load_and_validate_str("[gateway]\nport = 1234\n").expect("should validate");
    assert_eq!(config.gateway.port, 1234);
}

/// Config errors are real `Error` values with stable display messages.
#[test]
fn config_error_formats_and_boxes_as_error() {
    let parse = ConfigError::Parse {
        message: "bad toml".to_string(),
    };
    let validation = ConfigError::Validation {
        message: "storage.path must not be empty".to_string(),
    };
    assert_eq!(parse.to_string(), "config parse error: bad toml");
    assert_eq!(
        validation.to_string(),
        "config error: storage.path must not be empty"
    );

    let boxed: Box<dyn std::error::Error> = Box::new(parse);
    assert!(boxed.to_string().starts_with("config parse error"));
}
