// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire shape of the provider error envelope.

use serde::{Deserialize, Serialize};

/// The `error` object inside a provider failure response or webhook status
/// callback. Unknown fields are ignored; every field except `message` and
/// `code` is routinely absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderError {
    /// Developer-facing error description.
    #[serde(default)]
    pub message: String,
    /// Provider error class string (e.g. "OAuthException").
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
    /// Top-level numeric error code.
    #[serde(default)]
    pub code: Option<i64>,
    /// Refining subcode under a generic top-level code.
    #[serde(default)]
    pub error_subcode: Option<i64>,
    /// Title the provider suggests showing to end users.
    #[serde(default)]
    pub error_user_title: Option<String>,
    /// Message the provider suggests showing to end users.
    #[serde(default)]
    pub error_user_msg: Option<String>,
    /// Provider-side trace id for support escalation.
    #[serde(default)]
    pub fbtrace_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_full_envelope() {
        let raw = r#"{
            "message": "(#131026) Message undeliverable",
            "type": "OAuthException",
            "code": 131026,
            "error_subcode": 0,
            "error_user_msg": "The recipient cannot receive this message.",
            "fbtrace_id": "AbCdEf123"
        }"#;
        let err: ProviderError = serde_json::from_str(raw).unwrap();
        assert_eq!(err.code, Some(131026));
        assert_eq!(
            err.error_user_msg.as_deref(),
            Some("The recipient cannot receive this message.")
        );
    }

    #[test]
    fn tolerates_missing_fields() {
        let err: ProviderError = serde_json::from_str("{}").unwrap();
        assert_eq!(err.code, None);
        assert_eq!(err.message, "");
    }
}
