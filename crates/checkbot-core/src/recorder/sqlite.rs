//! SQLite-backed outcome recorder.
//!
//! Uniqueness is enforced by the `session_id` primary key, so concurrent
//! writers (threads or processes sharing the file) race safely.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use super::{OutcomeFact, OutcomeRecorder};
use crate::error::CoreError;

const SELECT_COLUMNS: &str = "session_id, winner, winner_kind, provider, model, \
     duration_secs, move_count, finish_reason, recorded_at";

#[derive(Clone)]
pub struct SqliteOutcomeRecorder {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteOutcomeRecorder {
    /// Open (or create) the database at `path`. Parent directories are
    /// created as needed.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| CoreError::Storage(format!("create {}: {}", parent.display(), e)))?;
        }
        let conn = Connection::open(path)
            .map_err(|e| CoreError::Storage(format!("open sqlite outcome store: {}", e)))?;
        debug!(path = %path.display(), "Opened outcome store");
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CoreError::Storage(format!("open in-memory outcome store: {}", e)))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, CoreError> {
        let recorder = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        recorder.ensure_schema()?;
        Ok(recorder)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CoreError> {
        self.conn
            .lock()
            .map_err(|_| CoreError::Storage("sqlite outcome store lock poisoned".to_string()))
    }

    fn ensure_schema(&self) -> Result<(), CoreError> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS game_outcomes (
              session_id TEXT PRIMARY KEY,
              winner TEXT NOT NULL,
              winner_kind TEXT NOT NULL,
              provider TEXT NULL,
              model TEXT NULL,
              duration_secs INTEGER NULL,
              move_count INTEGER NULL,
              finish_reason TEXT NOT NULL,
              recorded_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_game_outcomes_recorded_at ON game_outcomes(recorded_at DESC);
            "#,
        )
        .map_err(|e| CoreError::Storage(format!("init sqlite outcome schema: {}", e)))?;
        Ok(())
    }

    /// Most recently recorded facts, newest first.
    pub fn list_recent(&self, limit: usize) -> Result<Vec<OutcomeFact>, CoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM game_outcomes ORDER BY recorded_at DESC, rowid DESC LIMIT ?1"
            ))
            .map_err(|e| CoreError::Storage(format!("prepare list outcomes: {}", e)))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![limit], row_to_fact)
            .map_err(|e| CoreError::Storage(format!("query list outcomes: {}", e)))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| CoreError::Storage(format!("read outcome row: {}", e)))
    }
}

impl OutcomeRecorder for SqliteOutcomeRecorder {
    fn record_once(&self, fact: &OutcomeFact) -> Result<bool, CoreError> {
        let duration_secs = fact
            .duration_secs
            .map(i64::try_from)
            .transpose()
            .map_err(|_| CoreError::Storage("duration_secs out of range".into()))?;
        let conn = self.lock()?;
        let changes = conn
            .execute(
                "INSERT INTO game_outcomes (session_id, winner, winner_kind, provider, model,
                   duration_secs, move_count, finish_reason, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(session_id) DO NOTHING",
                params![
                    fact.session_id,
                    fact.winner,
                    fact.winner_kind,
                    fact.provider,
                    fact.model,
                    duration_secs,
                    fact.move_count,
                    fact.finish_reason,
                    fact.recorded_at.to_rfc3339_opts(SecondsFormat::Micros, true),
                ],
            )
            .map_err(|e| CoreError::Storage(format!("insert outcome: {}", e)))?;

        let inserted = changes == 1;
        if inserted {
            info!(session = %fact.session_id, winner = %fact.winner, "Recorded game outcome");
        } else {
            info!(session = %fact.session_id, "Outcome already recorded, ignoring duplicate");
        }
        Ok(inserted)
    }

    fn get(&self, session_id: &str) -> Result<Option<OutcomeFact>, CoreError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM game_outcomes WHERE session_id = ?1"),
            params![session_id],
            row_to_fact,
        )
        .optional()
        .map_err(|e| CoreError::Storage(format!("get outcome: {}", e)))
    }
}

fn row_to_fact(row: &Row<'_>) -> rusqlite::Result<OutcomeFact> {
    let recorded_at: String = row.get(8)?;
    let recorded_at = DateTime::parse_from_rfc3339(&recorded_at)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e)))?;
    let duration_secs: Option<i64> = row.get(5)?;

    Ok(OutcomeFact {
        session_id: row.get(0)?,
        winner: row.get(1)?,
        winner_kind: row.get(2)?,
        provider: row.get(3)?,
        model: row.get(4)?,
        duration_secs: duration_secs.and_then(|d| u64::try_from(d).ok()),
        move_count: row.get(6)?,
        finish_reason: row.get(7)?,
        recorded_at,
    })
}
