//! Routine definitions, occurrences and execution records.
//!
//! `RoutineDefinition` is the template an operator works from,
//! `Occurrence` is its due-on-a-specific-date projection (computed,
//! never persisted), and `ExecutionRecord` is the durable trace of one
//! operator actually working an occurrence.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Planned duration applied when a definition does not set one.
pub const DEFAULT_PLANNED_MINUTES: u32 = 30;

/// Whether a routine is due once or repeats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoutineKind {
    OneOff,
    Recurring,
}

/// Repeat cadence of a recurring routine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

/// How a recurring routine repeats.
///
/// The anchor date lives on the definition itself (one-off routines
/// carry it too); the pattern only describes the repetition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecurrencePattern {
    pub frequency: Frequency,
    /// Weekday numbers in the stored scheme (Monday=1 .. Sunday=7).
    /// Only consulted for weekly routines.
    #[serde(default)]
    pub weekdays: BTreeSet<u8>,
    /// Last date the routine generates occurrences, inclusive.
    pub end_date: Option<NaiveDate>,
}

/// A task template an operator must perform, once or on a schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutineDefinition {
    /// Unique identifier
    pub id: String,
    /// Routine title
    pub title: String,
    /// One-off or recurring
    pub kind: RoutineKind,
    /// First (or only) date the routine is due
    pub anchor_date: NaiveDate,
    /// Repetition rule; absent for one-off routines
    pub recurrence: Option<RecurrencePattern>,
    /// Planned duration in minutes; `None` falls back to
    /// [`DEFAULT_PLANNED_MINUTES`]
    pub planned_duration_minutes: Option<u32>,
    /// Whether finishing an execution requires at least one attachment
    pub requires_attachment_to_finish: bool,
    /// Operator the routine is assigned to
    pub operator_id: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl RoutineDefinition {
    /// Create a new one-off routine with default values.
    pub fn new(
        title: impl Into<String>,
        operator_id: impl Into<String>,
        anchor_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        RoutineDefinition {
            id: format!("routine-{}-{}", now.timestamp(), uuid::Uuid::new_v4()),
            title: title.into(),
            kind: RoutineKind::OneOff,
            anchor_date,
            recurrence: None,
            planned_duration_minutes: None,
            requires_attachment_to_finish: false,
            operator_id: operator_id.into(),
            created_at: now,
        }
    }

    /// Effective planned duration in minutes.
    ///
    /// Unset or zero durations fall back to the default policy value so
    /// downstream math never divides or multiplies by zero.
    pub fn planned_minutes(&self) -> u32 {
        match self.planned_duration_minutes {
            Some(m) if m >= 1 => m,
            _ => DEFAULT_PLANNED_MINUTES,
        }
    }

    /// Validate authoring-time fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(m) = self.planned_duration_minutes {
            if m < 1 {
                return Err(ValidationError::InvalidDuration {
                    minutes: i64::from(m),
                });
            }
        }
        if let Some(pattern) = &self.recurrence {
            if let Some(&day) = pattern.weekdays.iter().find(|d| !(1..=7).contains(*d)) {
                return Err(ValidationError::InvalidValue {
                    field: "weekdays".to_string(),
                    message: format!("weekday {day} is outside 1..=7"),
                });
            }
        }
        Ok(())
    }
}

/// A specific calendar-day instance of a routine being due.
///
/// Computed on demand by the recurrence engine; identity is
/// `(routine_id, date)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Occurrence {
    pub routine_id: String,
    pub date: NaiveDate,
    pub planned_minutes: u32,
    pub requires_attachment: bool,
}

/// Durable record of one operator working one occurrence.
///
/// The camelCase field names are the persisted contract shared with
/// existing stores and must not drift.
///
/// `accumulated_seconds` is the checkpointed total at the last save; it
/// excludes time elapsed since the last checkpoint while running. At
/// most one of {paused, finished, running} holds at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    /// Unique identifier
    pub id: String,
    /// Routine definition being worked
    pub routine_definition_id: String,
    /// Operator doing the work
    pub operator_id: String,
    /// The occurrence day this record belongs to
    pub occurrence_date: NaiveDate,
    /// When work first started; `None` means not started
    pub started_at: Option<DateTime<Utc>>,
    /// Set exactly while paused, cleared on resume
    pub paused_at: Option<DateTime<Utc>>,
    /// Terminal once set
    pub finished_at: Option<DateTime<Utc>>,
    /// Checkpointed elapsed total in seconds
    pub accumulated_seconds: u64,
    /// Monotonic creation sequence assigned by the store; orders
    /// duplicate records for the same occurrence (highest wins)
    pub created_seq: i64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl ExecutionRecord {
    /// Started and neither paused nor finished.
    pub fn is_running(&self) -> bool {
        self.started_at.is_some() && self.paused_at.is_none() && self.finished_at.is_none()
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }
}

/// Partial update written through `RecordStore::update_execution_record`.
///
/// `None` leaves a field untouched. `paused_at` is doubly optional so a
/// patch can distinguish "leave alone" (`None`) from "clear the pause
/// marker" (`Some(None)`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    pub accumulated_seconds: Option<u64>,
    pub started_at: Option<DateTime<Utc>>,
    pub paused_at: Option<Option<DateTime<Utc>>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RecordPatch {
    /// Periodic re-anchor: bank the total and move the running
    /// reference instant to `now`.
    pub fn checkpoint(total_seconds: u64, now: DateTime<Utc>) -> Self {
        RecordPatch {
            accumulated_seconds: Some(total_seconds),
            started_at: Some(now),
            ..Default::default()
        }
    }

    /// Freeze the total and mark the record paused.
    pub fn pause(total_seconds: u64, now: DateTime<Utc>) -> Self {
        RecordPatch {
            accumulated_seconds: Some(total_seconds),
            paused_at: Some(Some(now)),
            ..Default::default()
        }
    }

    /// Clear the pause marker and restart the running interval at `now`.
    pub fn resume(banked_seconds: u64, now: DateTime<Utc>) -> Self {
        RecordPatch {
            accumulated_seconds: Some(banked_seconds),
            started_at: Some(now),
            paused_at: Some(None),
            ..Default::default()
        }
    }

    /// Terminal write: final total, finished marker, pause cleared.
    pub fn finish(total_seconds: u64, now: DateTime<Utc>) -> Self {
        RecordPatch {
            accumulated_seconds: Some(total_seconds),
            paused_at: Some(None),
            finished_at: Some(now),
            ..Default::default()
        }
    }

    /// Persist a frozen total verbatim (paused/finished checkpoints).
    pub fn frozen(total_seconds: u64) -> Self {
        RecordPatch {
            accumulated_seconds: Some(total_seconds),
            ..Default::default()
        }
    }

    /// Apply this patch to an in-memory record.
    pub fn apply(&self, record: &mut ExecutionRecord) {
        if let Some(secs) = self.accumulated_seconds {
            record.accumulated_seconds = secs;
        }
        if let Some(at) = self.started_at {
            record.started_at = Some(at);
        }
        if let Some(paused) = self.paused_at {
            record.paused_at = paused;
        }
        if let Some(at) = self.finished_at {
            record.finished_at = Some(at);
        }
    }
}
