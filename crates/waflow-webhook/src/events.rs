// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery-status callback payload parsing.
//!
//! The provider posts batched, out-of-order, possibly duplicated status
//! callbacks. This module flattens the nested envelope into a list of
//! per-message status events; idempotence and ordering rules are enforced
//! at the storage layer, not here.

use serde::{Deserialize, Serialize};
use waflow_core::{DeliveryStatus, ProviderError, WaflowError};

/// Top-level webhook envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookEnvelope {
    /// Always "whatsapp_business_account" for the callbacks we consume.
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

/// One account entry inside the envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

/// One change notification.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub field: String,
    pub value: ChangeValue,
}

/// The value object carrying status updates.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub statuses: Vec<RawStatus>,
}

/// One raw status entry as the provider sends it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawStatus {
    /// Provider message id.
    #[serde(default)]
    pub id: String,
    /// Status string: "sent", "delivered", "read", "failed".
    #[serde(default)]
    pub status: String,
    /// Unix epoch seconds as a string.
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Recipient phone number.
    #[serde(default)]
    pub recipient_id: String,
    /// Error details attached to failed statuses.
    #[serde(default)]
    pub errors: Vec<ProviderError>,
}

/// A flattened status event ready for the storage transition guard.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusEvent {
    /// Provider message id.
    pub message_id: String,
    /// Recipient phone number.
    pub phone: String,
    /// Normalized delivery status.
    pub status: DeliveryStatus,
    /// Unix epoch seconds, when the provider supplied one.
    pub timestamp: Option<i64>,
    /// First attached provider error, for failed statuses.
    pub error: Option<ProviderError>,
}

/// Parse a raw webhook body into flattened status events.
///
/// Status strings we do not track ("delivered", "read" only confirm what
/// "sent" already recorded) and unknown strings are dropped with a debug
/// log rather than failing the whole batch.
pub fn parse_status_events(raw_body: &[u8]) -> Result<Vec<StatusEvent>, WaflowError> {
    let envelope: WebhookEnvelope =
        serde_json::from_slice(raw_body).map_err(|e| WaflowError::Webhook {
            message: format!("malformed webhook body: {e}"),
        })?;

    let mut events = Vec::new();
    for entry in envelope.entry {
        for change in entry.changes {
            for raw in change.value.statuses {
                let status = match raw.status.as_str() {
                    "sent" | "delivered" | "read" => DeliveryStatus::Sent,
                    "failed" => DeliveryStatus::Failed,
                    other => {
                        tracing::debug!(status = other, "ignoring unrecognized status");
                        continue;
                    }
                };
                events.push(StatusEvent {
                    message_id: raw.id,
                    phone: raw.recipient_id,
                    status,
                    timestamp: raw.timestamp.as_deref().and_then(|t| t.parse().ok()),
                    error: raw.errors.into_iter().next(),
                });
            }
        }
    }
    Ok(events)
}

/// Answer the provider's subscription handshake.
///
/// `GET /webhook?hub.mode=subscribe&hub.verify_token=...&hub.challenge=...`
/// must echo the challenge when the token matches the configured value.
pub fn check_verify_token(expected: &str, mode: &str, token: &str) -> bool {
    !expected.is_empty() && mode == "subscribe" && token == expected
}
