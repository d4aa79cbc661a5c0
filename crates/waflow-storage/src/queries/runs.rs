// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Aggregate run-metrics operations.
//!
//! One row per dispatch run, keyed by trace id. Counters are bumped
//! incrementally; a run that crashes early may never write its row at all,
//! which is why the reconciler carries a fallback source.

use rusqlite::{OptionalExtension, params};
use waflow_core::{RunMetricsRecord, WaflowError};

use crate::database::{Database, now_iso8601};

/// Create the aggregate row for a new dispatch run.
pub async fn start_run(
    db: &Database,
    trace_id: &str,
    campaign_id: &str,
    recipients: i64,
) -> Result<(), WaflowError> {
    let trace_id = trace_id.to_string();
    let campaign_id = campaign_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO run_metrics (trace_id, campaign_id, recipients)
                 VALUES (?1, ?2, ?3)",
                params![trace_id, campaign_id, recipients],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record one successful send: bumps `sent_total`, stamps `last_sent_at`,
/// and stamps `first_dispatch_at` on the first call.
pub async fn record_sent(db: &Database, trace_id: &str) -> Result<(), WaflowError> {
    let trace_id = trace_id.to_string();
    let now = now_iso8601();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE run_metrics SET
                     sent_total = sent_total + 1,
                     last_sent_at = ?2,
                     first_dispatch_at = COALESCE(first_dispatch_at, ?2)
                 WHERE trace_id = ?1",
                params![trace_id, now],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record one failed send.
pub async fn record_failed(db: &Database, trace_id: &str) -> Result<(), WaflowError> {
    bump(db, trace_id, "failed_total").await
}

/// Record one skipped send (suppressed or filtered recipient).
pub async fn record_skipped(db: &Database, trace_id: &str) -> Result<(), WaflowError> {
    bump(db, trace_id, "skipped_total").await
}

async fn bump(db: &Database, trace_id: &str, column: &'static str) -> Result<(), WaflowError> {
    let trace_id = trace_id.to_string();
    let now = now_iso8601();
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "UPDATE run_metrics SET
                         {column} = {column} + 1,
                         first_dispatch_at = COALESCE(first_dispatch_at, ?2)
                     WHERE trace_id = ?1"
                ),
                params![trace_id, now],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch the aggregate row for a run, if it was ever flushed.
pub async fn get_run(
    db: &Database,
    trace_id: &str,
) -> Result<Option<RunMetricsRecord>, WaflowError> {
    let trace_id = trace_id.to_string();
    db.connection()
        .call(move |conn| {
            let record = conn
                .query_row(
                    "SELECT trace_id, campaign_id, created_at, recipients,
                            sent_total, failed_total, skipped_total,
                            first_dispatch_at, last_sent_at
                     FROM run_metrics WHERE trace_id = ?1",
                    params![trace_id],
                    map_run_row,
                )
                .optional()?;
            Ok(record)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub(crate) fn map_run_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunMetricsRecord> {
    Ok(RunMetricsRecord {
        trace_id: row.get(0)?,
        campaign_id: row.get(1)?,
        created_at: row.get(2)?,
        recipients: row.get(3)?,
        sent_total: row.get(4)?,
        failed_total: row.get(5)?,
        skipped_total: row.get(6)?,
        first_dispatch_at: row.get(7)?,
        last_sent_at: row.get(8)?,
    })
}
