// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-recipient delivery event rows and the status-transition guard.
//!
//! Two writers race on these rows: the send path (sending/failed/skipped)
//! and the webhook path (sent). Every update is idempotent per
//! `(campaign_id, phone)` and guarded so a later-arriving status never
//! regresses a recorded terminal one. Priority: failed > sent > skipped >
//! sending. In particular, a late webhook "sent" does not override an
//! already-recorded "failed". The guards are conditional SQL updates, not
//! read-modify-write, so they hold under concurrency.

use rusqlite::{OptionalExtension, params};
use waflow_core::{DeliveryStatus, RecipientEvent, WaflowError};

use crate::database::{Database, now_iso8601};

/// Open (or reset) the event row for a new dispatch attempt.
///
/// A different trace id means a new run: terminal timestamps from the
/// previous run are cleared. Re-running under the same trace id is
/// idempotent and preserves any terminal timestamps already recorded.
pub async fn begin_attempt(
    db: &Database,
    campaign_id: &str,
    phone: &str,
    trace_id: &str,
) -> Result<(), WaflowError> {
    let campaign_id = campaign_id.to_string();
    let phone = phone.to_string();
    let trace_id = trace_id.to_string();
    let now = now_iso8601();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO campaign_contacts
                     (campaign_id, phone, trace_id, sending_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(campaign_id, phone) DO UPDATE SET
                     trace_id = excluded.trace_id,
                     sending_at = excluded.sending_at,
                     sent_at = CASE WHEN campaign_contacts.trace_id IS excluded.trace_id
                                    THEN sent_at ELSE NULL END,
                     failed_at = CASE WHEN campaign_contacts.trace_id IS excluded.trace_id
                                      THEN failed_at ELSE NULL END,
                     skipped_at = CASE WHEN campaign_contacts.trace_id IS excluded.trace_id
                                       THEN skipped_at ELSE NULL END",
                params![campaign_id, phone, trace_id, now],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record a delivery confirmation. Rejected if the row already carries a
/// `failed_at` (failed outranks sent) or is already sent (idempotent).
/// Returns whether the transition was applied.
pub async fn mark_sent(
    db: &Database,
    campaign_id: &str,
    phone: &str,
) -> Result<bool, WaflowError> {
    guarded_stamp(
        db,
        campaign_id,
        phone,
        "UPDATE campaign_contacts SET sent_at = ?3
         WHERE campaign_id = ?1 AND phone = ?2
           AND sent_at IS NULL AND failed_at IS NULL",
    )
    .await
}

/// Record a definitive failure. Failed is the highest-priority status: it
/// may be recorded even after a sent confirmation, but never twice.
pub async fn mark_failed(
    db: &Database,
    campaign_id: &str,
    phone: &str,
) -> Result<bool, WaflowError> {
    guarded_stamp(
        db,
        campaign_id,
        phone,
        "UPDATE campaign_contacts SET failed_at = ?3
         WHERE campaign_id = ?1 AND phone = ?2
           AND failed_at IS NULL",
    )
    .await
}

/// Record a skipped send (suppressed or filtered recipient). Rejected when
/// any terminal status is already present.
pub async fn mark_skipped(
    db: &Database,
    campaign_id: &str,
    phone: &str,
) -> Result<bool, WaflowError> {
    guarded_stamp(
        db,
        campaign_id,
        phone,
        "UPDATE campaign_contacts SET skipped_at = ?3
         WHERE campaign_id = ?1 AND phone = ?2
           AND skipped_at IS NULL AND sent_at IS NULL AND failed_at IS NULL",
    )
    .await
}

async fn guarded_stamp(
    db: &Database,
    campaign_id: &str,
    phone: &str,
    sql: &'static str,
) -> Result<bool, WaflowError> {
    let campaign_id = campaign_id.to_string();
    let phone = phone.to_string();
    let now = now_iso8601();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(sql, params![campaign_id, phone, now])?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Apply a normalized status to a row through the transition guard.
///
/// The webhook ingestion path funnels through here. Returns whether the
/// transition was applied.
pub async fn apply_status(
    db: &Database,
    campaign_id: &str,
    phone: &str,
    status: DeliveryStatus,
) -> Result<bool, WaflowError> {
    match status {
        DeliveryStatus::Sent => mark_sent(db, campaign_id, phone).await,
        DeliveryStatus::Failed => mark_failed(db, campaign_id, phone).await,
        DeliveryStatus::Skipped => mark_skipped(db, campaign_id, phone).await,
        // A stale "sending" never touches an existing row's timestamps.
        DeliveryStatus::Sending => Ok(false),
    }
}

/// Locate the most recently active event row for a phone number across
/// campaigns. Webhook callbacks carry only the recipient id, so ingestion
/// resolves the campaign through the latest dispatch attempt.
pub async fn find_latest_by_phone(
    db: &Database,
    phone: &str,
) -> Result<Option<RecipientEvent>, WaflowError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            let event = conn
                .query_row(
                    "SELECT campaign_id, phone, trace_id, sending_at, sent_at,
                            failed_at, skipped_at
                     FROM campaign_contacts
                     WHERE phone = ?1
                     ORDER BY max(COALESCE(sending_at, ''), COALESCE(sent_at, ''),
                                  COALESCE(failed_at, ''), COALESCE(skipped_at, '')) DESC
                     LIMIT 1",
                    params![phone],
                    |row| {
                        Ok(RecipientEvent {
                            campaign_id: row.get(0)?,
                            phone: row.get(1)?,
                            trace_id: row.get(2)?,
                            sending_at: row.get(3)?,
                            sent_at: row.get(4)?,
                            failed_at: row.get(5)?,
                            skipped_at: row.get(6)?,
                        })
                    },
                )
                .optional()?;
            Ok(event)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch the event row for one recipient.
pub async fn get_event(
    db: &Database,
    campaign_id: &str,
    phone: &str,
) -> Result<Option<RecipientEvent>, WaflowError> {
    let campaign_id = campaign_id.to_string();
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            let event = conn
                .query_row(
                    "SELECT campaign_id, phone, trace_id, sending_at, sent_at,
                            failed_at, skipped_at
                     FROM campaign_contacts
                     WHERE campaign_id = ?1 AND phone = ?2",
                    params![campaign_id, phone],
                    |row| {
                        Ok(RecipientEvent {
                            campaign_id: row.get(0)?,
                            phone: row.get(1)?,
                            trace_id: row.get(2)?,
                            sending_at: row.get(3)?,
                            sent_at: row.get(4)?,
                            failed_at: row.get(5)?,
                            skipped_at: row.get(6)?,
                        })
                    },
                )
                .optional()?;
            Ok(event)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn normal_send_flow() {
        let db = db().await;
        begin_attempt(&db, "camp-1", "15551230001", "trace-1")
            .await
            .unwrap();
        assert!(mark_sent(&db, "camp-1", "15551230001").await.unwrap());

        let event = get_event(&db, "camp-1", "15551230001").await.unwrap().unwrap();
        assert_eq!(event.trace_id.as_deref(), Some("trace-1"));
        assert!(event.sending_at.is_some());
        assert_eq!(event.effective_status(), Some(DeliveryStatus::Sent));
    }

    #[tokio::test]
    async fn late_sent_does_not_override_failed() {
        let db = db().await;
        begin_attempt(&db, "camp-1", "15551230001", "trace-1")
            .await
            .unwrap();
        assert!(mark_failed(&db, "camp-1", "15551230001").await.unwrap());

        // Late webhook confirmation for a send we already recorded as failed.
        assert!(!mark_sent(&db, "camp-1", "15551230001").await.unwrap());

        let event = get_event(&db, "camp-1", "15551230001").await.unwrap().unwrap();
        assert!(event.sent_at.is_none());
        assert_eq!(event.effective_status(), Some(DeliveryStatus::Failed));
    }

    #[tokio::test]
    async fn duplicate_webhook_is_idempotent() {
        let db = db().await;
        begin_attempt(&db, "camp-1", "15551230001", "trace-1")
            .await
            .unwrap();
        assert!(mark_sent(&db, "camp-1", "15551230001").await.unwrap());
        assert!(!mark_sent(&db, "camp-1", "15551230001").await.unwrap());

        let event = get_event(&db, "camp-1", "15551230001").await.unwrap().unwrap();
        assert_eq!(event.effective_status(), Some(DeliveryStatus::Sent));
    }

    #[tokio::test]
    async fn failed_outranks_sent() {
        let db = db().await;
        begin_attempt(&db, "camp-1", "15551230001", "trace-1")
            .await
            .unwrap();
        assert!(mark_sent(&db, "camp-1", "15551230001").await.unwrap());
        assert!(mark_failed(&db, "camp-1", "15551230001").await.unwrap());

        let event = get_event(&db, "camp-1", "15551230001").await.unwrap().unwrap();
        assert_eq!(event.effective_status(), Some(DeliveryStatus::Failed));
    }

    #[tokio::test]
    async fn skip_rejected_after_terminal_status() {
        let db = db().await;
        begin_attempt(&db, "camp-1", "15551230001", "trace-1")
            .await
            .unwrap();
        assert!(mark_sent(&db, "camp-1", "15551230001").await.unwrap());
        assert!(!mark_skipped(&db, "camp-1", "15551230001").await.unwrap());
    }

    #[tokio::test]
    async fn new_trace_resets_terminal_columns() {
        let db = db().await;
        begin_attempt(&db, "camp-1", "15551230001", "trace-1")
            .await
            .unwrap();
        mark_failed(&db, "camp-1", "15551230001").await.unwrap();

        // A fresh run for the same recipient starts clean.
        begin_attempt(&db, "camp-1", "15551230001", "trace-2")
            .await
            .unwrap();
        let event = get_event(&db, "camp-1", "15551230001").await.unwrap().unwrap();
        assert_eq!(event.trace_id.as_deref(), Some("trace-2"));
        assert!(event.failed_at.is_none());
        assert_eq!(event.effective_status(), Some(DeliveryStatus::Sending));

        assert!(mark_sent(&db, "camp-1", "15551230001").await.unwrap());
    }

    #[tokio::test]
    async fn same_trace_begin_preserves_terminal() {
        let db = db().await;
        begin_attempt(&db, "camp-1", "15551230001", "trace-1")
            .await
            .unwrap();
        mark_sent(&db, "camp-1", "15551230001").await.unwrap();

        begin_attempt(&db, "camp-1", "15551230001", "trace-1")
            .await
            .unwrap();
        let event = get_event(&db, "camp-1", "15551230001").await.unwrap().unwrap();
        assert_eq!(event.effective_status(), Some(DeliveryStatus::Sent));
    }

    #[tokio::test]
    async fn apply_status_routes_through_guards() {
        let db = db().await;
        begin_attempt(&db, "camp-1", "15551230001", "trace-1")
            .await
            .unwrap();

        assert!(
            apply_status(&db, "camp-1", "15551230001", DeliveryStatus::Failed)
                .await
                .unwrap()
        );
        assert!(
            !apply_status(&db, "camp-1", "15551230001", DeliveryStatus::Sent)
                .await
                .unwrap()
        );
        assert!(
            !apply_status(&db, "camp-1", "15551230001", DeliveryStatus::Sending)
                .await
                .unwrap()
        );
    }
}
