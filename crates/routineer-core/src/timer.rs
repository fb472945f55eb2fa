//! Execution timer state machine.
//!
//! Wall-clock based and caller-driven: the timer owns no threads and
//! schedules nothing. The host fires `tick()` on a display cadence and
//! `reanchor()` on a checkpoint cadence while the occurrence is open,
//! and stops both schedules whenever the state exits Running.
//!
//! ## State transitions
//!
//! ```text
//! NotStarted -> Running <-> Paused -> Finished
//!                  |                     ^
//!                  +---------------------+
//! ```
//!
//! `Finished` is terminal. All elapsed-time computation is driven by
//! two quantities: `base_accumulated` (seconds banked as of the last
//! re-anchor) and `running_since` (the instant the current running
//! interval began, `None` while not running). Every transition
//! recomputes the elapsed total itself and resets the re-anchor
//! reference, so a checkpoint scheduled right behind a transition
//! observes a consistent pair.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::error::{CoreError, ValidationError};
use crate::model::{ExecutionRecord, RecordPatch, RoutineDefinition};
use crate::store::RecordStore;

/// Display refresh cadence the host should schedule while running.
pub const TICK_INTERVAL_SECS: u64 = 1;

/// Durable checkpoint cadence. Bounds data loss on crash to one
/// interval and keeps the wall-clock base of the elapsed computation
/// from growing without bound.
pub const REANCHOR_INTERVAL_SECS: u64 = 5;

/// Timer state for one open occurrence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    NotStarted,
    Running,
    Paused,
    /// Terminal; no transition leaves this state.
    Finished,
}

impl ExecutionState {
    /// Check if a transition is valid.
    pub fn can_transition_to(&self, to: ExecutionState) -> bool {
        match self {
            ExecutionState::NotStarted => matches!(to, ExecutionState::Running),
            ExecutionState::Running => {
                matches!(to, ExecutionState::Paused | ExecutionState::Finished)
            }
            ExecutionState::Paused => {
                matches!(to, ExecutionState::Running | ExecutionState::Finished)
            }
            ExecutionState::Finished => false,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ExecutionState::NotStarted => "not started",
            ExecutionState::Running => "running",
            ExecutionState::Paused => "paused",
            ExecutionState::Finished => "finished",
        }
    }
}

/// Live timer for a single occurrence.
///
/// One instance exists per open occurrence and is dropped when the
/// occurrence is closed; nothing here is shared across occurrences.
/// Checkpoint writes go through the store fire-and-forget: a failed
/// write is logged and retried with fresher values on the next
/// checkpoint, so the in-memory machine always advances optimistically.
#[derive(Debug)]
pub struct ExecutionTimer<C: Clock = SystemClock> {
    routine_id: String,
    operator_id: String,
    date: NaiveDate,
    record_id: Option<String>,
    requires_attachment: bool,
    state: ExecutionState,
    /// Seconds banked as of the last re-anchor.
    base_accumulated: u64,
    /// Instant the current running interval began; `None` while not
    /// running.
    running_since: Option<DateTime<Utc>>,
    clock: C,
}

impl ExecutionTimer<SystemClock> {
    /// Open an occurrence against the system clock.
    pub fn open<S: RecordStore>(
        store: &S,
        routine: &RoutineDefinition,
        operator_id: &str,
        date: NaiveDate,
    ) -> Result<Self, CoreError> {
        Self::open_with_clock(store, routine, operator_id, date, SystemClock)
    }
}

impl<C: Clock> ExecutionTimer<C> {
    /// Open an occurrence, restoring any persisted execution state.
    ///
    /// Restoration is not a distinct state: a record that was running
    /// in a prior session re-enters Running with `running_since` taken
    /// straight from the persisted `startedAt` (which every re-anchor
    /// moved forward), so elapsed time continues exactly where the
    /// previous session left off.
    pub fn open_with_clock<S: RecordStore>(
        store: &S,
        routine: &RoutineDefinition,
        operator_id: &str,
        date: NaiveDate,
        clock: C,
    ) -> Result<Self, CoreError> {
        let record = store
            .load_execution_record(&routine.id, operator_id, date)
            .map_err(|e| CoreError::Store(e.to_string()))?;
        let mut timer = Self {
            routine_id: routine.id.clone(),
            operator_id: operator_id.to_string(),
            date,
            record_id: None,
            requires_attachment: routine.requires_attachment_to_finish,
            state: ExecutionState::NotStarted,
            base_accumulated: 0,
            running_since: None,
            clock,
        };
        if let Some(record) = record {
            timer.restore(&record);
        }
        Ok(timer)
    }

    fn restore(&mut self, record: &ExecutionRecord) {
        self.record_id = Some(record.id.clone());
        self.base_accumulated = record.accumulated_seconds;
        self.running_since = None;
        self.state = if record.finished_at.is_some() {
            ExecutionState::Finished
        } else if record.paused_at.is_some() {
            ExecutionState::Paused
        } else if let Some(started_at) = record.started_at {
            self.running_since = Some(started_at);
            ExecutionState::Running
        } else {
            ExecutionState::NotStarted
        };
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    pub fn routine_id(&self) -> &str {
        &self.routine_id
    }

    pub fn operator_id(&self) -> &str {
        &self.operator_id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Id of the backing record, once one exists.
    pub fn record_id(&self) -> Option<&str> {
        self.record_id.as_deref()
    }

    /// Elapsed working seconds at this instant.
    pub fn compute_elapsed(&self) -> u64 {
        self.compute_elapsed_at(self.clock.now())
    }

    fn compute_elapsed_at(&self, now: DateTime<Utc>) -> u64 {
        match self.running_since {
            None => self.base_accumulated,
            Some(since) => {
                let delta = (now - since).num_seconds();
                if delta < 0 {
                    log::warn!(
                        "clock anomaly on execution {:?}: running interval began {} \
                         in the future; clamping to the last checkpoint",
                        self.record_id,
                        since
                    );
                }
                self.base_accumulated + delta.max(0) as u64
            }
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start working the occurrence.
    ///
    /// Creates the backing record (a hard error if the store refuses;
    /// every later write is fire-and-forget against that record).
    /// Reuses an existing never-started record instead of creating a
    /// duplicate.
    pub fn start<S: RecordStore>(&mut self, store: &S) -> Result<(), CoreError> {
        if self.state != ExecutionState::NotStarted {
            return Err(ValidationError::InvalidTransition {
                action: "start",
                state: self.state.name(),
            }
            .into());
        }
        let now = self.clock.now();
        match &self.record_id {
            Some(_) => self.persist(
                store,
                RecordPatch {
                    accumulated_seconds: Some(0),
                    started_at: Some(now),
                    ..Default::default()
                },
            ),
            None => {
                let record = store
                    .create_execution_record(&self.routine_id, &self.operator_id, now, self.date)
                    .map_err(|e| CoreError::Store(e.to_string()))?;
                self.record_id = Some(record.id);
            }
        }
        self.base_accumulated = 0;
        self.running_since = Some(now);
        self.state = ExecutionState::Running;
        Ok(())
    }

    /// Display-cadence sample. Returns the current elapsed seconds
    /// while running, `None` otherwise so an orphaned schedule does no
    /// work outside Running.
    pub fn tick(&self) -> Option<u64> {
        (self.state == ExecutionState::Running).then(|| self.compute_elapsed())
    }

    /// Periodic durable checkpoint.
    ///
    /// While running, banks the current total and moves the running
    /// reference to now, persisting `{accumulatedSeconds, startedAt}`.
    /// While paused or finished, re-persists the frozen total verbatim;
    /// repeating it is harmless.
    pub fn reanchor<S: RecordStore>(&mut self, store: &S) {
        match self.state {
            ExecutionState::Running => {
                let now = self.clock.now();
                let total = self.compute_elapsed_at(now);
                self.persist(store, RecordPatch::checkpoint(total, now));
                self.base_accumulated = total;
                self.running_since = Some(now);
            }
            ExecutionState::Paused | ExecutionState::Finished => {
                self.persist(store, RecordPatch::frozen(self.base_accumulated));
            }
            ExecutionState::NotStarted => {}
        }
    }

    /// Pause the running occurrence, banking elapsed time.
    pub fn pause<S: RecordStore>(&mut self, store: &S) -> Result<(), CoreError> {
        if self.state != ExecutionState::Running {
            return Err(ValidationError::InvalidTransition {
                action: "pause",
                state: self.state.name(),
            }
            .into());
        }
        let now = self.clock.now();
        let total = self.compute_elapsed_at(now);
        self.persist(store, RecordPatch::pause(total, now));
        self.base_accumulated = total;
        self.running_since = None;
        self.state = ExecutionState::Paused;
        Ok(())
    }

    /// Resume a paused occurrence.
    pub fn resume<S: RecordStore>(&mut self, store: &S) -> Result<(), CoreError> {
        if self.state != ExecutionState::Paused {
            return Err(ValidationError::InvalidTransition {
                action: "resume",
                state: self.state.name(),
            }
            .into());
        }
        let now = self.clock.now();
        self.persist(store, RecordPatch::resume(self.base_accumulated, now));
        self.running_since = Some(now);
        self.state = ExecutionState::Running;
        Ok(())
    }

    /// Finish the occurrence. Terminal.
    ///
    /// Fails without a transition when the routine requires an
    /// attachment and none exists yet. Returns the final elapsed total.
    pub fn finalize<S: RecordStore>(&mut self, store: &S) -> Result<u64, CoreError> {
        if !matches!(
            self.state,
            ExecutionState::Running | ExecutionState::Paused
        ) {
            return Err(ValidationError::InvalidTransition {
                action: "finish",
                state: self.state.name(),
            }
            .into());
        }
        let Some(record_id) = self.record_id.clone() else {
            return Err(CoreError::Custom(
                "execution has no backing record".to_string(),
            ));
        };
        if self.requires_attachment && !store.has_attachment(&record_id) {
            return Err(ValidationError::AttachmentRequired { record_id }.into());
        }
        let now = self.clock.now();
        let total = self.compute_elapsed_at(now);
        self.persist(store, RecordPatch::finish(total, now));
        self.base_accumulated = total;
        self.running_since = None;
        self.state = ExecutionState::Finished;
        Ok(total)
    }

    /// Best-effort checkpoint for "user is leaving" signals (minimize,
    /// navigate away, tab close).
    ///
    /// Same computation as [`reanchor`](Self::reanchor), no state
    /// transition. Racing an in-flight periodic checkpoint is fine:
    /// both write the same derived quantities. If the host aborts
    /// before the write lands, the accepted failure mode is losing up
    /// to one checkpoint interval, never corruption.
    pub fn checkpoint_on_suspend<S: RecordStore>(&mut self, store: &S) {
        self.reanchor(store);
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn persist<S: RecordStore>(&self, store: &S, patch: RecordPatch) {
        let Some(id) = &self.record_id else {
            return;
        };
        if let Err(e) = store.update_execution_record(id, &patch) {
            log::warn!("checkpoint write failed for execution {id}: {e}");
        }
    }
}
