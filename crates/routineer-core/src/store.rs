//! External store seams.
//!
//! The core never owns a query engine; it consumes a record store
//! through these narrow traits. The associated error type only needs to
//! display, because checkpoint writes are fire-and-forget and logged
//! rather than propagated.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt::Display;

use chrono::{DateTime, NaiveDate, Utc};

use crate::model::{ExecutionRecord, RecordPatch, RoutineDefinition};

/// Persistence seam for execution records.
pub trait RecordStore {
    type Error: Display;

    /// The winning record for one occurrence, if any. When duplicates
    /// exist for the same `(routine, operator, date)` key, the most
    /// recently created one is returned.
    fn load_execution_record(
        &self,
        routine_id: &str,
        operator_id: &str,
        date: NaiveDate,
    ) -> Result<Option<ExecutionRecord>, Self::Error>;

    /// Create the backing record when an operator first starts an
    /// occurrence.
    fn create_execution_record(
        &self,
        routine_id: &str,
        operator_id: &str,
        started_at: DateTime<Utc>,
        date: NaiveDate,
    ) -> Result<ExecutionRecord, Self::Error>;

    /// Apply a partial update to an existing record.
    fn update_execution_record(&self, id: &str, patch: &RecordPatch) -> Result<(), Self::Error>;

    /// Whether at least one attachment exists for the record. Consumed
    /// only by the finalize transition.
    fn has_attachment(&self, record_id: &str) -> bool;
}

/// Persistence seam for routine definitions. Scoping and authorization
/// happen before this trait is reached.
pub trait RoutineStore {
    type Error: Display;

    fn load_routine_definitions(&self) -> Result<Vec<RoutineDefinition>, Self::Error>;
}

#[derive(Debug, Default)]
struct MemoryInner {
    routines: Vec<RoutineDefinition>,
    records: Vec<ExecutionRecord>,
    attachments: BTreeSet<String>,
    next_seq: i64,
}

/// In-memory store for tests and embedders without a durable backend.
///
/// Single-threaded by design, matching the core's event-driven model.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RefCell<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_routine(&self, def: RoutineDefinition) {
        self.inner.borrow_mut().routines.push(def);
    }

    /// Mark a record as having at least one attachment.
    pub fn add_attachment(&self, record_id: impl Into<String>) {
        self.inner.borrow_mut().attachments.insert(record_id.into());
    }

    /// Snapshot of a record by id, for assertions.
    pub fn record(&self, id: &str) -> Option<ExecutionRecord> {
        self.inner
            .borrow()
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    /// Snapshot of every record, in creation order.
    pub fn records(&self) -> Vec<ExecutionRecord> {
        self.inner.borrow().records.clone()
    }
}

impl RecordStore for MemoryStore {
    type Error = String;

    fn load_execution_record(
        &self,
        routine_id: &str,
        operator_id: &str,
        date: NaiveDate,
    ) -> Result<Option<ExecutionRecord>, Self::Error> {
        let inner = self.inner.borrow();
        Ok(inner
            .records
            .iter()
            .filter(|r| {
                r.routine_definition_id == routine_id
                    && r.operator_id == operator_id
                    && r.occurrence_date == date
            })
            .max_by_key(|r| r.created_seq)
            .cloned())
    }

    fn create_execution_record(
        &self,
        routine_id: &str,
        operator_id: &str,
        started_at: DateTime<Utc>,
        date: NaiveDate,
    ) -> Result<ExecutionRecord, Self::Error> {
        let mut inner = self.inner.borrow_mut();
        inner.next_seq += 1;
        let record = ExecutionRecord {
            id: format!("exec-{}", uuid::Uuid::new_v4()),
            routine_definition_id: routine_id.to_string(),
            operator_id: operator_id.to_string(),
            occurrence_date: date,
            started_at: Some(started_at),
            paused_at: None,
            finished_at: None,
            accumulated_seconds: 0,
            created_seq: inner.next_seq,
            created_at: started_at,
        };
        inner.records.push(record.clone());
        Ok(record)
    }

    fn update_execution_record(&self, id: &str, patch: &RecordPatch) -> Result<(), Self::Error> {
        let mut inner = self.inner.borrow_mut();
        let record = inner
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| format!("no such record: {id}"))?;
        patch.apply(record);
        Ok(())
    }

    fn has_attachment(&self, record_id: &str) -> bool {
        self.inner.borrow().attachments.contains(record_id)
    }
}

impl RoutineStore for MemoryStore {
    type Error = String;

    fn load_routine_definitions(&self) -> Result<Vec<RoutineDefinition>, Self::Error> {
        Ok(self.inner.borrow().routines.clone())
    }
}
