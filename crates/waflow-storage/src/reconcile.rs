// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Run/trace reconciliation.
//!
//! Merges the aggregate `run_metrics` table with raw `campaign_contacts`
//! event rows into one ordered, deduplicated list of delivery runs for a
//! campaign. The two-tier strategy exists because a bulk send can be
//! interrupted (crash, deploy, provider outage) after recipient rows were
//! written but before the aggregate row was finalized; without the
//! fallback, such runs would be invisible to any "what happened" query.

use std::collections::HashSet;

use rusqlite::params;
use waflow_core::{DeliveryRun, RunSource, WaflowError};

use crate::database::Database;

/// Fallback scan multiplier: the event table holds one row per recipient,
/// so many rows can collapse into one run after dedup.
const FALLBACK_SCAN_FACTOR: usize = 5;
/// Hard cap on the fallback scan window.
const FALLBACK_SCAN_MAX: usize = 500;

/// List delivery runs for a campaign, newest-first, at most `limit` entries.
///
/// Aggregate rows come first and are authoritative; runs that only exist in
/// the per-recipient event table are synthesized as fallback entries with
/// no creation timestamp. A trace id present in both sources appears
/// exactly once, attributed to `run_metrics`.
pub async fn list_runs(
    db: &Database,
    campaign_id: &str,
    limit: usize,
) -> Result<Vec<DeliveryRun>, WaflowError> {
    if limit == 0 {
        return Ok(Vec::new());
    }
    let campaign_id = campaign_id.to_string();
    let scan_window = (limit * FALLBACK_SCAN_FACTOR).min(FALLBACK_SCAN_MAX);

    db.connection()
        .call(move |conn| {
            let mut runs: Vec<DeliveryRun> = Vec::new();
            let mut seen: HashSet<String> = HashSet::new();

            // Tier 1: aggregate rows, newest-first by creation time.
            let mut stmt = conn.prepare(
                "SELECT trace_id, created_at, recipients, sent_total,
                        failed_total, skipped_total, first_dispatch_at,
                        last_sent_at
                 FROM run_metrics
                 WHERE campaign_id = ?1 AND trace_id <> ''
                 ORDER BY created_at DESC
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![campaign_id, limit as i64], |row| {
                let trace_id: String = row.get(0)?;
                let created_at: String = row.get(1)?;
                let first_dispatch_at: Option<String> = row.get(6)?;
                let last_sent_at: Option<String> = row.get(7)?;
                // Most-specific activity signal wins.
                let last_seen_at = last_sent_at
                    .or(first_dispatch_at)
                    .or_else(|| Some(created_at.clone()));
                Ok(DeliveryRun {
                    trace_id,
                    source: RunSource::RunMetrics,
                    created_at: Some(created_at),
                    last_seen_at,
                    recipients: Some(row.get(2)?),
                    sent_total: Some(row.get(3)?),
                    failed_total: Some(row.get(4)?),
                    skipped_total: Some(row.get(5)?),
                })
            })?;
            for row in rows {
                let run = row?;
                seen.insert(run.trace_id.clone());
                runs.push(run);
            }
            drop(stmt);

            if runs.len() >= limit {
                return Ok(runs);
            }

            // Tier 2: fallback over per-recipient events, covering runs
            // that never completed an aggregate row. Ordered by the most
            // recent activity on any column; the ISO-8601 text format
            // sorts chronologically.
            let mut stmt = conn.prepare(
                "SELECT trace_id, sending_at, sent_at, failed_at, skipped_at
                 FROM campaign_contacts
                 WHERE campaign_id = ?1
                   AND trace_id IS NOT NULL AND trace_id <> ''
                 ORDER BY max(COALESCE(sending_at, ''), COALESCE(sent_at, ''),
                              COALESCE(failed_at, ''), COALESCE(skipped_at, '')) DESC
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![campaign_id, scan_window as i64], |row| {
                let trace_id: String = row.get(0)?;
                let sending_at: Option<String> = row.get(1)?;
                let sent_at: Option<String> = row.get(2)?;
                let failed_at: Option<String> = row.get(3)?;
                let skipped_at: Option<String> = row.get(4)?;
                let last_seen_at = sent_at.or(failed_at).or(skipped_at).or(sending_at);
                Ok((trace_id, last_seen_at))
            })?;
            for row in rows {
                if runs.len() >= limit {
                    break;
                }
                let (trace_id, last_seen_at) = row?;
                if !seen.insert(trace_id.clone()) {
                    continue;
                }
                runs.push(DeliveryRun {
                    trace_id,
                    source: RunSource::CampaignContacts,
                    created_at: None,
                    last_seen_at,
                    recipients: None,
                    sent_total: None,
                    failed_total: None,
                    skipped_total: None,
                });
            }

            Ok(runs)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;

    async fn db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    async fn seed_run(db: &Database, trace: &str, campaign: &str, created_at: &str) {
        let trace = trace.to_string();
        let campaign = campaign.to_string();
        let created_at = created_at.to_string();
        db.connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO run_metrics
                         (trace_id, campaign_id, created_at, recipients, sent_total)
                     VALUES (?1, ?2, ?3, 10, 8)",
                    params![trace, campaign, created_at],
                )?;
                Ok::<_, rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    async fn seed_event(db: &Database, trace: &str, campaign: &str, phone: &str, sent_at: &str) {
        let trace = trace.to_string();
        let campaign = campaign.to_string();
        let phone = phone.to_string();
        let sent_at = sent_at.to_string();
        db.connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO campaign_contacts
                         (campaign_id, phone, trace_id, sent_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![campaign, phone, trace, sent_at],
                )?;
                Ok::<_, rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn aggregate_rows_come_newest_first() {
        let db = db().await;
        seed_run(&db, "t-old", "camp-1", "2026-01-01T00:00:00.000Z").await;
        seed_run(&db, "t-new", "camp-1", "2026-02-01T00:00:00.000Z").await;
        seed_run(&db, "t-other", "camp-2", "2026-03-01T00:00:00.000Z").await;

        let runs = list_runs(&db, "camp-1", 10).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].trace_id, "t-new");
        assert_eq!(runs[1].trace_id, "t-old");
        assert_eq!(runs[0].source, RunSource::RunMetrics);
        assert_eq!(runs[0].recipients, Some(10));
        // No dispatch timestamps seeded, so created_at is the signal.
        assert_eq!(runs[0].last_seen_at.as_deref(), Some("2026-02-01T00:00:00.000Z"));
    }

    #[tokio::test]
    async fn dedup_attributes_to_run_metrics() {
        let db = db().await;
        seed_run(&db, "t-1", "camp-1", "2026-01-01T00:00:00.000Z").await;
        seed_event(&db, "t-1", "camp-1", "p1", "2026-01-01T00:10:00.000Z").await;
        seed_event(&db, "t-2", "camp-1", "p2", "2026-01-02T00:00:00.000Z").await;

        let runs = list_runs(&db, "camp-1", 10).await.unwrap();
        assert_eq!(runs.len(), 2);

        let t1: Vec<_> = runs.iter().filter(|r| r.trace_id == "t-1").collect();
        assert_eq!(t1.len(), 1);
        assert_eq!(t1[0].source, RunSource::RunMetrics);

        let t2 = runs.iter().find(|r| r.trace_id == "t-2").unwrap();
        assert_eq!(t2.source, RunSource::CampaignContacts);
        assert_eq!(t2.created_at, None);
        assert_eq!(t2.recipients, None);
    }

    #[tokio::test]
    async fn fallback_covers_crashed_runs() {
        let db = db().await;
        // No aggregate rows at all: the run crashed before any flush.
        seed_event(&db, "t-a", "camp-1", "p1", "2026-01-01T00:00:00.000Z").await;
        seed_event(&db, "t-a", "camp-1", "p2", "2026-01-01T00:01:00.000Z").await;
        seed_event(&db, "t-b", "camp-1", "p3", "2026-01-02T00:00:00.000Z").await;

        let runs = list_runs(&db, "camp-1", 10).await.unwrap();
        assert_eq!(runs.len(), 2);
        // Newest activity first.
        assert_eq!(runs[0].trace_id, "t-b");
        assert_eq!(runs[1].trace_id, "t-a");
        assert!(runs.iter().all(|r| r.source == RunSource::CampaignContacts));
        assert_eq!(
            runs[1].last_seen_at.as_deref(),
            Some("2026-01-01T00:01:00.000Z")
        );
    }

    #[tokio::test]
    async fn limit_caps_combined_result() {
        let db = db().await;
        seed_run(&db, "t-1", "camp-1", "2026-01-03T00:00:00.000Z").await;
        seed_event(&db, "t-2", "camp-1", "p1", "2026-01-02T00:00:00.000Z").await;
        seed_event(&db, "t-3", "camp-1", "p2", "2026-01-01T00:00:00.000Z").await;

        let runs = list_runs(&db, "camp-1", 2).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].trace_id, "t-1");
        assert_eq!(runs[1].trace_id, "t-2");
    }

    #[tokio::test]
    async fn rows_without_trace_id_are_ignored() {
        let db = db().await;
        let conn = db.connection().clone();
        conn.call(|conn| {
            conn.execute(
                "INSERT INTO campaign_contacts (campaign_id, phone, sent_at)
                 VALUES ('camp-1', 'p1', '2026-01-01T00:00:00.000Z')",
                [],
            )?;
            Ok::<_, rusqlite::Error>(())
        })
        .await
        .unwrap();

        let runs = list_runs(&db, "camp-1", 10).await.unwrap();
        assert!(runs.is_empty());
    }

    #[tokio::test]
    async fn zero_limit_returns_empty() {
        let db = db().await;
        seed_run(&db, "t-1", "camp-1", "2026-01-01T00:00:00.000Z").await;
        let runs = list_runs(&db, "camp-1", 0).await.unwrap();
        assert!(runs.is_empty());
    }

    #[tokio::test]
    async fn fallback_skips_when_aggregate_fills_limit() {
        let db = db().await;
        seed_run(&db, "t-1", "camp-1", "2026-01-02T00:00:00.000Z").await;
        seed_event(&db, "t-2", "camp-1", "p1", "2026-01-01T00:00:00.000Z").await;

        let runs = list_runs(&db, "camp-1", 1).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].trace_id, "t-1");
        assert_eq!(runs[0].source, RunSource::RunMetrics);
    }
}
