// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Auto-suppression policy and the store-guard predicate.
//!
//! The policy side is an allow-list, not a blocklist: a false positive here
//! silently stops sending to a real customer, so only the single
//! persistent-undeliverable code ever triggers suppression. The guard side
//! fails closed: when in doubt about an expiry, keep the address blocked.
//!
//! These are pure decision functions. The caller owns the store round-trips
//! and combines the computed TTL with "now" to produce `expires_at`.

use chrono::{DateTime, Duration, Utc};
use waflow_core::codes;
use waflow_core::{AutoSuppressionConfig, SuppressionRecord};

/// Whether a provider failure code triggers automatic suppression of the
/// destination. Exactly one code qualifies; adjacent-looking codes (payment
/// failure 131042, pair rate limit 131056) deliberately do not.
pub fn should_auto_suppress(code: i64) -> bool {
    code == codes::UNDELIVERABLE
}

/// Compute the suppression TTL in days for a failure.
///
/// Returns `0` when the code does not participate in auto-suppression or
/// the feature is disabled. Otherwise applies escalating tiers against
/// `recent_failure_count` (identical failures for this destination within
/// the configured window). Tier thresholds are inclusive: a count equal to
/// the threshold lands in the higher tier.
pub fn compute_ttl_days(
    config: &AutoSuppressionConfig,
    code: i64,
    recent_failure_count: i64,
) -> i64 {
    if !config.enabled || !should_auto_suppress(code) {
        return 0;
    }
    let Some(policy) = config.policy_for(code) else {
        return 0;
    };
    if !policy.enabled {
        return 0;
    }

    if recent_failure_count >= policy.threshold {
        policy.ttl3_days
    } else if recent_failure_count >= 2 {
        policy.ttl2_days
    } else {
        policy.ttl_base_days
    }
}

/// Turn a TTL into an ISO-8601 expiry timestamp relative to `now`.
///
/// `ttl_days <= 0` yields `None`, which callers treat as "do not suppress".
pub fn expiry_from_ttl(now: DateTime<Utc>, ttl_days: i64) -> Option<String> {
    if ttl_days <= 0 {
        return None;
    }
    Some((now + Duration::days(ttl_days)).to_rfc3339())
}

/// Whether a persisted suppression record currently blocks sends.
///
/// The explicit `is_active` flag always wins: an operator-cleared record is
/// inert no matter what `expires_at` says. An active record with no expiry
/// is suppressed indefinitely. An active record whose expiry cannot be
/// parsed stays suppressed; an unreadable expiry must not silently unblock
/// sends. The expiry instant itself counts as expired.
pub fn is_active(record: &SuppressionRecord, now: DateTime<Utc>) -> bool {
    if !record.is_active {
        return false;
    }
    let Some(expires_at) = record.expires_at.as_deref() else {
        return true;
    };
    match DateTime::parse_from_rfc3339(expires_at) {
        Ok(expiry) => expiry.with_timezone(&Utc) > now,
        Err(_) => {
            tracing::warn!(
                address = %record.address,
                expires_at,
                "unparseable suppression expiry, treating as active"
            );
            true
        }
    }
}

/// [`is_active`] evaluated against the current wall clock.
pub fn is_active_now(record: &SuppressionRecord) -> bool {
    is_active(record, Utc::now())
}
