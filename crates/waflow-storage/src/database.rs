// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use waflow_core::WaflowError;

/// Handle to the single-writer SQLite connection.
///
/// Cloning is cheap; all clones share the one background thread, which is
/// what serializes concurrent send-path and webhook-path writes.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs, and run all
    /// pending migrations.
    pub async fn open(path: &str) -> Result<Self, WaflowError> {
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| map_tr_err(e.into()))?;
        Self::init(conn).await
    }

    /// Open an in-memory database. Test and tooling use only.
    pub async fn open_in_memory() -> Result<Self, WaflowError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| map_tr_err(e.into()))?;
        Self::init(conn).await
    }

    async fn init(conn: tokio_rusqlite::Connection) -> Result<Self, WaflowError> {
        conn.call(
            |conn| -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
                conn.pragma_update(None, "journal_mode", "WAL")?;
                conn.pragma_update(None, "synchronous", "NORMAL")?;
                conn.pragma_update(None, "foreign_keys", "ON")?;
                conn.pragma_update(None, "busy_timeout", 5000)?;
                crate::migrations::run_migrations(conn)?;
                Ok(())
            },
        )
        .await
        .map_err(|e| match e {
            tokio_rusqlite::Error::Error(source) => WaflowError::Storage { source },
            other => WaflowError::Storage {
                source: other.to_string().into(),
            },
        })?;

        tracing::debug!("database opened, migrations applied");
        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection. Query modules call through
    /// `connection().call(...)`.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }
}

/// Map a tokio-rusqlite error into the workspace storage error.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> WaflowError {
    WaflowError::Storage {
        source: Box::new(e),
    }
}

/// Current wall-clock time in the ISO-8601 format used for every timestamp
/// column (`%Y-%m-%dT%H:%M:%fZ`, matching SQLite's strftime output).
pub fn now_iso8601() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_in_memory_runs_migrations() {
        let db = Database::open_in_memory().await.unwrap();
        let count: i64 = db
            .connection()
            .call(|conn| {
                Ok::<_, rusqlite::Error>(conn.query_row(
                    "SELECT count(*) FROM sqlite_master WHERE type = 'table'
                     AND name IN ('suppression_records', 'suppression_failures',
                                  'run_metrics', 'campaign_contacts')",
                    [],
                    |row| row.get(0),
                )?)
            })
            .await
            .unwrap();
        assert_eq!(count, 4);
    }

    #[tokio::test]
    async fn open_creates_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("waflow.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        drop(db);
        assert!(path.exists());
    }

    #[test]
    fn now_iso8601_is_sortable_format() {
        let ts = now_iso8601();
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), "2026-01-01T00:00:00.000Z".len());
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
