// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Waflow workspace.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Stable internal taxonomy for upstream provider errors.
///
/// The classifier maps heterogeneous provider payloads onto these kinds;
/// everything downstream (retry loop, suppression policy, account-health UI)
/// keys off the kind rather than raw provider codes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum ErrorKind {
    /// Spam/policy violation family. Never retry; the operator must review
    /// account health with the provider.
    PolicyBlocked,
    /// Duplicate template name or duplicate content submission.
    DuplicateResource,
    /// Payload or template content rejected by provider validation.
    ValidationError,
    /// A referenced upstream resource is missing or misconfigured.
    ConfigurationError,
    /// Access token expired or invalidated; needs a credential refresh.
    AuthExpired,
    /// Account-level throughput limit. Retryable with backoff.
    RateLimited,
    /// Per sender/recipient pair throttle, distinct from the account-wide
    /// limit and with a much shorter suggested wait.
    PairRateLimited,
    /// Caller lacks permission for the attempted operation.
    PermissionDenied,
    /// Destination is permanently unreachable; triggers auto-suppression
    /// instead of retry.
    Unreachable,
    /// Anything we have no mapping for. Conservatively non-retryable.
    Unknown,
}

/// Result of classifying one provider error payload.
///
/// A pure function of `(code, subcode, message)`, derived on demand, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureClassification {
    /// Taxonomy bucket this error falls into.
    pub kind: ErrorKind,
    /// Whether the dispatch loop may retry this send.
    pub retryable: bool,
    /// Suggested wait before retrying, when the kind carries a backoff hint.
    pub retry_delay_ms: Option<u64>,
    /// Human-readable message safe to surface in the dashboard.
    pub user_message: String,
    /// Whether resolving this error needs operator intervention.
    pub requires_user_action: bool,
    /// Raw top-level provider error code.
    pub raw_code: i64,
    /// Raw provider error subcode, when present.
    pub raw_subcode: Option<i64>,
}

/// Persisted suppression state for one destination address.
///
/// `is_active = false` makes the record inert regardless of `expires_at`;
/// an explicit operator override always wins over time-based expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressionRecord {
    /// Destination phone number in E.164 form.
    pub address: String,
    /// Explicit on/off switch. Cleared by operator action.
    pub is_active: bool,
    /// ISO-8601 expiry; `None` means indefinite suppression.
    pub expires_at: Option<String>,
    /// Human-readable reason recorded when the suppression was created.
    pub reason: Option<String>,
    /// Provider failure code that triggered the suppression.
    pub failure_code: Option<i64>,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
    /// ISO-8601 last-update timestamp.
    pub updated_at: String,
}

/// Per-code auto-suppression tier settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CodePolicy {
    /// Whether this code participates in auto-suppression.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Rolling window (days) over which repeated failures are counted.
    #[serde(default = "default_window_days")]
    pub window_days: i64,
    /// Failure count at which the top tier kicks in.
    #[serde(default = "default_threshold")]
    pub threshold: i64,
    /// Suppression length (days) for a first-time failure.
    #[serde(default = "default_ttl_base")]
    pub ttl_base_days: i64,
    /// Suppression length (days) after a second failure in the window.
    #[serde(default = "default_ttl2")]
    pub ttl2_days: i64,
    /// Suppression length (days) at or beyond the threshold.
    #[serde(default = "default_ttl3")]
    pub ttl3_days: i64,
}

impl Default for CodePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            window_days: default_window_days(),
            threshold: default_threshold(),
            ttl_base_days: default_ttl_base(),
            ttl2_days: default_ttl2(),
            ttl3_days: default_ttl3(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_window_days() -> i64 {
    180
}
fn default_threshold() -> i64 {
    3
}
fn default_ttl_base() -> i64 {
    90
}
fn default_ttl2() -> i64 {
    180
}
fn default_ttl3() -> i64 {
    365
}

/// Auto-suppression policy configuration, injected into the decision
/// functions by the caller (never read from process-wide state).
///
/// Currently only the persistent-undeliverable code (131026) participates;
/// the per-code table shape leaves room to add more codes without changing
/// the decision function signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AutoSuppressionConfig {
    /// Master switch for the whole auto-suppression feature.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Tier settings for provider code 131026 (recipient unreachable).
    #[serde(default)]
    pub undeliverable_131026: CodePolicy,
}

impl Default for AutoSuppressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            undeliverable_131026: CodePolicy::default(),
        }
    }
}

impl AutoSuppressionConfig {
    /// Look up the tier settings governing a provider code, if that code
    /// participates in auto-suppression at all.
    pub fn policy_for(&self, code: i64) -> Option<&CodePolicy> {
        match code {
            crate::codes::UNDELIVERABLE => Some(&self.undeliverable_131026),
            _ => None,
        }
    }
}

/// Aggregate row written incrementally during one dispatch run and finalized
/// at completion. May be entirely absent if the run crashed before any flush.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetricsRecord {
    /// Correlation id for the run.
    pub trace_id: String,
    /// Campaign the run belongs to.
    pub campaign_id: String,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
    /// Total recipients targeted by the run.
    pub recipients: i64,
    /// Count of successfully dispatched sends.
    pub sent_total: i64,
    /// Count of failed sends.
    pub failed_total: i64,
    /// Count of sends skipped (suppressed or otherwise filtered).
    pub skipped_total: i64,
    /// ISO-8601 timestamp of the first dispatch attempt, if any.
    pub first_dispatch_at: Option<String>,
    /// ISO-8601 timestamp of the most recent successful send, if any.
    pub last_sent_at: Option<String>,
}

/// Per-recipient delivery event row, keyed by `(campaign_id, phone)`.
///
/// Always written per-recipient even when the aggregate flush fails; this is
/// the durability fallback the reconciler leans on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientEvent {
    /// Campaign the recipient belongs to.
    pub campaign_id: String,
    /// Recipient phone number.
    pub phone: String,
    /// Run correlation id; `None` for rows predating run tracing.
    pub trace_id: Option<String>,
    /// ISO-8601 timestamp recorded when dispatch started.
    pub sending_at: Option<String>,
    /// ISO-8601 timestamp recorded on delivery confirmation.
    pub sent_at: Option<String>,
    /// ISO-8601 timestamp recorded on definitive failure.
    pub failed_at: Option<String>,
    /// ISO-8601 timestamp recorded when the send was skipped.
    pub skipped_at: Option<String>,
}

/// Which table a reconciled delivery run was derived from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum RunSource {
    /// The aggregate run_metrics table (authoritative when present).
    #[serde(rename = "run_metrics")]
    #[strum(serialize = "run_metrics")]
    RunMetrics,
    /// Synthesized from per-recipient event rows (crash fallback).
    #[serde(rename = "campaign_contacts")]
    #[strum(serialize = "campaign_contacts")]
    CampaignContacts,
}

/// One entry in the reconciled "what happened to campaign X" listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRun {
    /// Run correlation id.
    pub trace_id: String,
    /// Table the entry was derived from.
    pub source: RunSource,
    /// Run creation time; unknown for fallback-sourced entries.
    pub created_at: Option<String>,
    /// Most recent activity signal observed for the run.
    pub last_seen_at: Option<String>,
    /// Recipient count, when the aggregate row is available.
    pub recipients: Option<i64>,
    /// Sent count, when the aggregate row is available.
    pub sent_total: Option<i64>,
    /// Failed count, when the aggregate row is available.
    pub failed_total: Option<i64>,
    /// Skipped count, when the aggregate row is available.
    pub skipped_total: Option<i64>,
}

impl RecipientEvent {
    /// Derive the row's effective status from its timestamp columns, using
    /// the write-priority rule `Failed > Sent > Skipped > Sending`.
    pub fn effective_status(&self) -> Option<DeliveryStatus> {
        if self.failed_at.is_some() {
            Some(DeliveryStatus::Failed)
        } else if self.sent_at.is_some() {
            Some(DeliveryStatus::Sent)
        } else if self.skipped_at.is_some() {
            Some(DeliveryStatus::Skipped)
        } else if self.sending_at.is_some() {
            Some(DeliveryStatus::Sending)
        } else {
            None
        }
    }
}

/// Terminal and in-flight delivery statuses for one recipient event row.
///
/// Priority order for racing writers: `Failed > Sent > Skipped > Sending`.
/// A later-arriving lower-priority status never regresses a recorded
/// higher-priority one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sending,
    Sent,
    Failed,
    Skipped,
}

impl DeliveryStatus {
    /// Write-priority rank; higher ranks are never overwritten by lower ones.
    pub fn priority(self) -> u8 {
        match self {
            DeliveryStatus::Sending => 0,
            DeliveryStatus::Skipped => 1,
            DeliveryStatus::Sent => 2,
            DeliveryStatus::Failed => 3,
        }
    }
}
