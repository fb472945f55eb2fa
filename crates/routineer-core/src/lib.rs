//! # Routineer Core Library
//!
//! Core business logic for Routineer, a tracker for recurring and
//! one-off routine tasks assigned to operators. The CLI binary is a
//! thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Recurrence engine**: pure expansion of routine definitions into
//!   due occurrences for a calendar day
//! - **Execution timer**: a wall-clock-based state machine; the caller
//!   schedules the tick and checkpoint cadence, the timer owns no
//!   threads
//! - **Status classifier**: one shared derivation of
//!   not-started/running/paused/finished/late from raw timestamps
//! - **Aggregator**: planned-vs-executed counts and time sums over a
//!   date range, feeding KPI views
//! - **Storage**: SQLite adapter behind narrow store traits; any other
//!   backend can implement the same seams
//!
//! ## Key components
//!
//! - [`RecurrenceEngine`]: due-occurrence expansion
//! - [`ExecutionTimer`]: per-occurrence timer state machine
//! - [`StatusClassifier`]: status + effective elapsed seconds
//! - [`OccurrenceAggregator`]: KPI summarization
//! - [`Database`]: rusqlite-backed store implementation

pub mod aggregate;
pub mod clock;
pub mod error;
pub mod model;
pub mod recurrence;
pub mod status;
pub mod storage;
pub mod store;
pub mod timer;

pub use aggregate::{OccurrenceAggregator, OccurrenceSummary};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CoreError, Result, StorageError, ValidationError};
pub use model::{
    ExecutionRecord, Frequency, Occurrence, RecordPatch, RecurrencePattern, RoutineDefinition,
    RoutineKind, DEFAULT_PLANNED_MINUTES,
};
pub use recurrence::{weekday_number, MonthlyOverflowPolicy, RecurrenceEngine};
pub use status::{Classification, LatenessPolicy, RoutineStatus, StatusClassifier};
pub use storage::Database;
pub use store::{MemoryStore, RecordStore, RoutineStore};
pub use timer::{ExecutionState, ExecutionTimer, REANCHOR_INTERVAL_SECS, TICK_INTERVAL_SECS};
