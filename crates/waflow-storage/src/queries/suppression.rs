// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Suppression record and failure-log operations.
//!
//! The policy decisions (allow-list, TTL tiers, activity guard) live in
//! waflow-engine; this module owns the store round-trips around them.

use rusqlite::{OptionalExtension, params};
use waflow_core::{AutoSuppressionConfig, SuppressionRecord, WaflowError};

use crate::database::{Database, now_iso8601};

/// Fetch the suppression record for an address, if one exists.
pub async fn get_suppression(
    db: &Database,
    address: &str,
) -> Result<Option<SuppressionRecord>, WaflowError> {
    let address = address.to_string();
    db.connection()
        .call(move |conn| {
            let record = conn
                .query_row(
                    "SELECT address, is_active, expires_at, reason, failure_code,
                            created_at, updated_at
                     FROM suppression_records WHERE address = ?1",
                    params![address],
                    |row| {
                        Ok(SuppressionRecord {
                            address: row.get(0)?,
                            is_active: row.get(1)?,
                            expires_at: row.get(2)?,
                            reason: row.get(3)?,
                            failure_code: row.get(4)?,
                            created_at: row.get(5)?,
                            updated_at: row.get(6)?,
                        })
                    },
                )
                .optional()?;
            Ok(record)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Whether sends to this address are currently blocked.
///
/// The send path consults this before every dispatch attempt. No record
/// means no suppression.
pub async fn is_suppressed(db: &Database, address: &str) -> Result<bool, WaflowError> {
    let record = get_suppression(db, address).await?;
    Ok(record.is_some_and(|r| waflow_engine::is_active_now(&r)))
}

/// Create or refresh an active suppression for an address.
///
/// `expires_at = None` suppresses indefinitely.
pub async fn upsert_suppression(
    db: &Database,
    address: &str,
    reason: &str,
    failure_code: i64,
    expires_at: Option<String>,
) -> Result<(), WaflowError> {
    let address = address.to_string();
    let reason = reason.to_string();
    let now = now_iso8601();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO suppression_records
                     (address, is_active, expires_at, reason, failure_code,
                      created_at, updated_at)
                 VALUES (?1, 1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT(address) DO UPDATE SET
                     is_active = 1,
                     expires_at = excluded.expires_at,
                     reason = excluded.reason,
                     failure_code = excluded.failure_code,
                     updated_at = excluded.updated_at",
                params![address, expires_at, reason, failure_code, now],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Operator action: lift a suppression. Sets `is_active = 0` but keeps the
/// record as history. Returns whether a record existed.
pub async fn clear_suppression(db: &Database, address: &str) -> Result<bool, WaflowError> {
    let address = address.to_string();
    let now = now_iso8601();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE suppression_records
                 SET is_active = 0, updated_at = ?2
                 WHERE address = ?1",
                params![address, now],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Append one failure to the rolling log.
pub async fn record_failure(
    db: &Database,
    address: &str,
    failure_code: i64,
) -> Result<(), WaflowError> {
    let address = address.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO suppression_failures (address, failure_code)
                 VALUES (?1, ?2)",
                params![address, failure_code],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Count identical failures for an address within the rolling window.
pub async fn recent_failure_count(
    db: &Database,
    address: &str,
    failure_code: i64,
    window_days: i64,
) -> Result<i64, WaflowError> {
    let address = address.to_string();
    db.connection()
        .call(move |conn| {
            let count = conn.query_row(
                "SELECT count(*) FROM suppression_failures
                 WHERE address = ?1 AND failure_code = ?2
                   AND occurred_at >= strftime('%Y-%m-%dT%H:%M:%fZ', 'now',
                                               '-' || ?3 || ' days')",
                params![address, failure_code, window_days],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Full auto-suppression flow for one observed failure.
///
/// Logs the failure, then asks the policy layer whether and for how long to
/// suppress. Counting happens before the TTL decision, so the failure being
/// processed participates in its own tier escalation. Returns the computed
/// TTL in days (`0` means no suppression was written).
pub async fn process_failure(
    db: &Database,
    config: &AutoSuppressionConfig,
    address: &str,
    failure_code: i64,
    user_message: &str,
) -> Result<i64, WaflowError> {
    if !waflow_engine::should_auto_suppress(failure_code) {
        return Ok(0);
    }

    record_failure(db, address, failure_code).await?;

    let window_days = config
        .policy_for(failure_code)
        .map(|p| p.window_days)
        .unwrap_or(0);
    let count = recent_failure_count(db, address, failure_code, window_days).await?;
    let ttl_days = waflow_engine::compute_ttl_days(config, failure_code, count);
    if ttl_days == 0 {
        return Ok(0);
    }

    let expires_at = waflow_engine::expiry_from_ttl(chrono::Utc::now(), ttl_days);
    upsert_suppression(db, address, user_message, failure_code, expires_at).await?;
    tracing::info!(
        address,
        failure_code,
        count,
        ttl_days,
        "destination auto-suppressed"
    );
    Ok(ttl_days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use waflow_core::codes;

    async fn db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn upsert_get_clear_round_trip() {
        let db = db().await;
        upsert_suppression(&db, "15551230001", "undeliverable", 131026, None)
            .await
            .unwrap();

        let record = get_suppression(&db, "15551230001").await.unwrap().unwrap();
        assert!(record.is_active);
        assert_eq!(record.failure_code, Some(131026));
        assert_eq!(record.expires_at, None);
        assert!(is_suppressed(&db, "15551230001").await.unwrap());

        assert!(clear_suppression(&db, "15551230001").await.unwrap());
        let record = get_suppression(&db, "15551230001").await.unwrap().unwrap();
        assert!(!record.is_active);
        assert!(!is_suppressed(&db, "15551230001").await.unwrap());

        // Clearing an unknown address is a no-op.
        assert!(!clear_suppression(&db, "15559999999").await.unwrap());
    }

    #[tokio::test]
    async fn unknown_address_is_not_suppressed() {
        let db = db().await;
        assert!(!is_suppressed(&db, "15551230001").await.unwrap());
        assert!(get_suppression(&db, "15551230001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_reactivates_cleared_record() {
        let db = db().await;
        upsert_suppression(&db, "15551230001", "undeliverable", 131026, None)
            .await
            .unwrap();
        clear_suppression(&db, "15551230001").await.unwrap();

        upsert_suppression(&db, "15551230001", "undeliverable again", 131026, None)
            .await
            .unwrap();
        assert!(is_suppressed(&db, "15551230001").await.unwrap());
    }

    #[tokio::test]
    async fn failure_count_scopes_by_address_and_code() {
        let db = db().await;
        record_failure(&db, "15551230001", 131026).await.unwrap();
        record_failure(&db, "15551230001", 131026).await.unwrap();
        record_failure(&db, "15551230001", 131042).await.unwrap();
        record_failure(&db, "15551230002", 131026).await.unwrap();

        let count = recent_failure_count(&db, "15551230001", 131026, 180)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn process_failure_escalates_ttl() {
        let db = db().await;
        let config = AutoSuppressionConfig::default();

        let ttl = process_failure(&db, &config, "15551230001", codes::UNDELIVERABLE, "gone")
            .await
            .unwrap();
        assert_eq!(ttl, 90);

        let ttl = process_failure(&db, &config, "15551230001", codes::UNDELIVERABLE, "gone")
            .await
            .unwrap();
        assert_eq!(ttl, 180);

        let ttl = process_failure(&db, &config, "15551230001", codes::UNDELIVERABLE, "gone")
            .await
            .unwrap();
        assert_eq!(ttl, 365);

        let record = get_suppression(&db, "15551230001").await.unwrap().unwrap();
        assert!(record.is_active);
        assert!(record.expires_at.is_some());
        assert!(is_suppressed(&db, "15551230001").await.unwrap());
    }

    #[tokio::test]
    async fn process_failure_ignores_non_suppressible_codes() {
        let db = db().await;
        let config = AutoSuppressionConfig::default();

        let ttl = process_failure(&db, &config, "15551230001", 131042, "payment")
            .await
            .unwrap();
        assert_eq!(ttl, 0);
        assert!(get_suppression(&db, "15551230001").await.unwrap().is_none());
    }
}
