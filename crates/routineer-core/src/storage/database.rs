//! SQLite-backed implementation of the store seams.
//!
//! Persists routine definitions, execution records and attachment
//! markers. The executions table's rowid doubles as the creation
//! sequence, which gives the deterministic last-created-wins ordering
//! for duplicate records without a separate counter.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::StorageError;
use crate::model::{
    ExecutionRecord, Frequency, RecordPatch, RecurrencePattern, RoutineDefinition, RoutineKind,
};
use crate::store::{RecordStore, RoutineStore};

/// SQLite database holding routines, executions and attachments.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/routineer.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let path = super::data_dir()?.join("routineer.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), StorageError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS routines (
                    id                   TEXT PRIMARY KEY,
                    title                TEXT NOT NULL,
                    kind                 TEXT NOT NULL,
                    anchor_date          TEXT NOT NULL,
                    frequency            TEXT,
                    weekdays             TEXT,
                    end_date             TEXT,
                    planned_minutes      INTEGER,
                    requires_attachment  INTEGER NOT NULL DEFAULT 0,
                    operator_id          TEXT NOT NULL,
                    created_at           TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS executions (
                    id                  TEXT PRIMARY KEY,
                    routine_id          TEXT NOT NULL,
                    operator_id         TEXT NOT NULL,
                    occurrence_date     TEXT NOT NULL,
                    started_at          TEXT,
                    paused_at           TEXT,
                    finished_at         TEXT,
                    accumulated_seconds INTEGER NOT NULL DEFAULT 0,
                    created_at          TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS attachments (
                    id           INTEGER PRIMARY KEY AUTOINCREMENT,
                    execution_id TEXT NOT NULL,
                    name         TEXT NOT NULL,
                    created_at   TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_executions_occurrence
                    ON executions(routine_id, operator_id, occurrence_date);
                CREATE INDEX IF NOT EXISTS idx_attachments_execution
                    ON attachments(execution_id);",
            )
            .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;
        Ok(())
    }

    // ── Routines ─────────────────────────────────────────────────────

    /// Insert a routine definition.
    pub fn insert_routine(&self, def: &RoutineDefinition) -> Result<(), StorageError> {
        let (frequency, weekdays, end_date) = match &def.recurrence {
            Some(p) => (
                Some(frequency_str(p.frequency)),
                Some(encode_weekdays(&p.weekdays)),
                p.end_date.map(|d| d.to_string()),
            ),
            None => (None, None, None),
        };
        self.conn.execute(
            "INSERT INTO routines (id, title, kind, anchor_date, frequency, weekdays, end_date,
                                   planned_minutes, requires_attachment, operator_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                def.id,
                def.title,
                match def.kind {
                    RoutineKind::OneOff => "one_off",
                    RoutineKind::Recurring => "recurring",
                },
                def.anchor_date.to_string(),
                frequency,
                weekdays,
                end_date,
                def.planned_duration_minutes,
                def.requires_attachment_to_finish,
                def.operator_id,
                def.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Fetch one routine definition by id.
    pub fn get_routine(&self, id: &str) -> Result<RoutineDefinition, StorageError> {
        self.conn
            .query_row(
                "SELECT id, title, kind, anchor_date, frequency, weekdays, end_date,
                        planned_minutes, requires_attachment, operator_id, created_at
                 FROM routines WHERE id = ?1",
                params![id],
                routine_from_row,
            )
            .optional()?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    /// All routine definitions, ordered by id.
    pub fn list_routines(&self) -> Result<Vec<RoutineDefinition>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, kind, anchor_date, frequency, weekdays, end_date,
                    planned_minutes, requires_attachment, operator_id, created_at
             FROM routines ORDER BY id",
        )?;
        let rows = stmt.query_map([], routine_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Executions ───────────────────────────────────────────────────

    /// All execution records, in creation order.
    pub fn list_execution_records(&self) -> Result<Vec<ExecutionRecord>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT rowid, id, routine_id, operator_id, occurrence_date, started_at,
                    paused_at, finished_at, accumulated_seconds, created_at
             FROM executions ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], execution_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Attach a named file marker to an execution record.
    pub fn add_attachment(&self, execution_id: &str, name: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO attachments (execution_id, name, created_at) VALUES (?1, ?2, ?3)",
            params![execution_id, name, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

impl RecordStore for Database {
    type Error = StorageError;

    fn load_execution_record(
        &self,
        routine_id: &str,
        operator_id: &str,
        date: NaiveDate,
    ) -> Result<Option<ExecutionRecord>, Self::Error> {
        self.conn
            .query_row(
                "SELECT rowid, id, routine_id, operator_id, occurrence_date, started_at,
                        paused_at, finished_at, accumulated_seconds, created_at
                 FROM executions
                 WHERE routine_id = ?1 AND operator_id = ?2 AND occurrence_date = ?3
                 ORDER BY rowid DESC LIMIT 1",
                params![routine_id, operator_id, date.to_string()],
                execution_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    fn create_execution_record(
        &self,
        routine_id: &str,
        operator_id: &str,
        started_at: DateTime<Utc>,
        date: NaiveDate,
    ) -> Result<ExecutionRecord, Self::Error> {
        let id = format!("exec-{}", uuid::Uuid::new_v4());
        self.conn.execute(
            "INSERT INTO executions (id, routine_id, operator_id, occurrence_date,
                                     started_at, accumulated_seconds, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
            params![
                id,
                routine_id,
                operator_id,
                date.to_string(),
                started_at.to_rfc3339(),
                started_at.to_rfc3339(),
            ],
        )?;
        Ok(ExecutionRecord {
            id,
            routine_definition_id: routine_id.to_string(),
            operator_id: operator_id.to_string(),
            occurrence_date: date,
            started_at: Some(started_at),
            paused_at: None,
            finished_at: None,
            accumulated_seconds: 0,
            created_seq: self.conn.last_insert_rowid(),
            created_at: started_at,
        })
    }

    fn update_execution_record(&self, id: &str, patch: &RecordPatch) -> Result<(), Self::Error> {
        // Read-modify-write keeps the patch semantics (including
        // clearing pausedAt) in one place: RecordPatch::apply.
        let mut record = self
            .conn
            .query_row(
                "SELECT rowid, id, routine_id, operator_id, occurrence_date, started_at,
                        paused_at, finished_at, accumulated_seconds, created_at
                 FROM executions WHERE id = ?1",
                params![id],
                execution_from_row,
            )
            .optional()?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        patch.apply(&mut record);
        self.conn.execute(
            "UPDATE executions
             SET started_at = ?2, paused_at = ?3, finished_at = ?4, accumulated_seconds = ?5
             WHERE id = ?1",
            params![
                id,
                record.started_at.map(|t| t.to_rfc3339()),
                record.paused_at.map(|t| t.to_rfc3339()),
                record.finished_at.map(|t| t.to_rfc3339()),
                record.accumulated_seconds,
            ],
        )?;
        Ok(())
    }

    fn has_attachment(&self, record_id: &str) -> bool {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM attachments WHERE execution_id = ?1",
                params![record_id],
                |row| row.get::<_, i64>(0),
            )
            .map(|count| count > 0)
            .unwrap_or(false)
    }
}

impl RoutineStore for Database {
    type Error = StorageError;

    fn load_routine_definitions(&self) -> Result<Vec<RoutineDefinition>, Self::Error> {
        self.list_routines()
    }
}

fn frequency_str(frequency: Frequency) -> &'static str {
    match frequency {
        Frequency::Daily => "daily",
        Frequency::Weekly => "weekly",
        Frequency::Monthly => "monthly",
    }
}

fn encode_weekdays(weekdays: &BTreeSet<u8>) -> String {
    weekdays
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn decode_weekdays(raw: &str) -> BTreeSet<u8> {
    raw.split(',')
        .filter_map(|part| part.trim().parse::<u8>().ok())
        .collect()
}

fn parse_date(raw: &str, row_idx: usize) -> Result<NaiveDate, rusqlite::Error> {
    raw.parse::<NaiveDate>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(row_idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_instant(raw: &str, row_idx: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                row_idx,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

fn routine_from_row(row: &Row<'_>) -> Result<RoutineDefinition, rusqlite::Error> {
    let kind: String = row.get(2)?;
    let anchor: String = row.get(3)?;
    let frequency: Option<String> = row.get(4)?;
    let weekdays: Option<String> = row.get(5)?;
    let end_date: Option<String> = row.get(6)?;
    let created_at: String = row.get(10)?;

    let recurrence = match frequency.as_deref() {
        Some("daily") => Some(Frequency::Daily),
        Some("weekly") => Some(Frequency::Weekly),
        Some("monthly") => Some(Frequency::Monthly),
        // Unknown cadence degrades to one-off-on-anchor downstream.
        _ => None,
    }
    .map(|frequency| -> Result<RecurrencePattern, rusqlite::Error> {
        Ok(RecurrencePattern {
            frequency,
            weekdays: weekdays.as_deref().map(decode_weekdays).unwrap_or_default(),
            end_date: end_date.as_deref().map(|d| parse_date(d, 6)).transpose()?,
        })
    })
    .transpose()?;

    Ok(RoutineDefinition {
        id: row.get(0)?,
        title: row.get(1)?,
        kind: if kind == "recurring" {
            RoutineKind::Recurring
        } else {
            RoutineKind::OneOff
        },
        anchor_date: parse_date(&anchor, 3)?,
        recurrence,
        planned_duration_minutes: row.get(7)?,
        requires_attachment_to_finish: row.get(8)?,
        operator_id: row.get(9)?,
        created_at: parse_instant(&created_at, 10)?,
    })
}

fn execution_from_row(row: &Row<'_>) -> Result<ExecutionRecord, rusqlite::Error> {
    let occurrence_date: String = row.get(4)?;
    let started_at: Option<String> = row.get(5)?;
    let paused_at: Option<String> = row.get(6)?;
    let finished_at: Option<String> = row.get(7)?;
    let created_at: String = row.get(9)?;

    Ok(ExecutionRecord {
        created_seq: row.get(0)?,
        id: row.get(1)?,
        routine_definition_id: row.get(2)?,
        operator_id: row.get(3)?,
        occurrence_date: parse_date(&occurrence_date, 4)?,
        started_at: started_at.as_deref().map(|t| parse_instant(t, 5)).transpose()?,
        paused_at: paused_at.as_deref().map(|t| parse_instant(t, 6)).transpose()?,
        finished_at: finished_at
            .as_deref()
            .map(|t| parse_instant(t, 7))
            .transpose()?,
        accumulated_seconds: row.get(8)?,
        created_at: parse_instant(&created_at, 9)?,
    })
}
