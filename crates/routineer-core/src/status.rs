//! Status classification.
//!
//! One shared derivation of a discrete status from raw record
//! timestamps, used by every consumer (board, KPI aggregation, badge
//! rendering). The status set is a closed enum so a new consumer is
//! forced to handle all cases instead of re-deriving its own strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ExecutionRecord;

/// Discrete execution status of one occurrence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoutineStatus {
    /// No record yet, or the record was never started
    NotStarted,
    /// Started, neither paused nor finished, within the planned window
    Running,
    /// Started and currently paused
    Paused,
    /// Finished (terminal)
    Finished,
    /// Running and 15-30 minutes over the planned duration
    LateMinor,
    /// Running and more than 30 minutes over the planned duration
    LateCritical,
}

impl RoutineStatus {
    /// Whether the occurrence is actively being worked (late statuses
    /// are running occurrences that overran their plan).
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            RoutineStatus::Running | RoutineStatus::LateMinor | RoutineStatus::LateCritical
        )
    }

    pub fn is_late(&self) -> bool {
        matches!(self, RoutineStatus::LateMinor | RoutineStatus::LateCritical)
    }
}

/// Lateness bands for a running occurrence, in seconds of overrun
/// beyond the planned duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatenessPolicy {
    /// Overrun at or beyond which a running occurrence is mildly late.
    pub minor_after_secs: i64,
    /// Overrun beyond which it is critically late.
    pub critical_after_secs: i64,
}

impl Default for LatenessPolicy {
    fn default() -> Self {
        Self {
            minor_after_secs: 15 * 60,
            critical_after_secs: 30 * 60,
        }
    }
}

/// Result of classifying one occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub status: RoutineStatus,
    /// Effective elapsed seconds at the reference instant.
    pub elapsed_seconds: u64,
}

/// Derives a [`RoutineStatus`] from an execution record.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusClassifier {
    policy: LatenessPolicy,
}

impl StatusClassifier {
    /// Create a classifier with the default lateness bands.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a classifier with custom lateness bands.
    pub fn with_policy(policy: LatenessPolicy) -> Self {
        Self { policy }
    }

    /// Classify one occurrence at the reference instant `now`.
    ///
    /// Decision order: no record / never started, finished, paused,
    /// running. While running, elapsed is
    /// `max(accumulated_seconds, now - started_at)` so displayed time
    /// never regresses below the last known checkpoint even under
    /// clock skew.
    pub fn classify(
        &self,
        record: Option<&ExecutionRecord>,
        planned_minutes: u32,
        now: DateTime<Utc>,
    ) -> Classification {
        let not_started = Classification {
            status: RoutineStatus::NotStarted,
            elapsed_seconds: 0,
        };
        let Some(record) = record else {
            return not_started;
        };
        let Some(started_at) = record.started_at else {
            return not_started;
        };
        if record.finished_at.is_some() {
            return Classification {
                status: RoutineStatus::Finished,
                elapsed_seconds: record.accumulated_seconds,
            };
        }
        if record.paused_at.is_some() {
            return Classification {
                status: RoutineStatus::Paused,
                elapsed_seconds: record.accumulated_seconds,
            };
        }

        let wall_secs = (now - started_at).num_seconds();
        if wall_secs < 0 {
            log::warn!(
                "clock anomaly for execution {}: startedAt {} is ahead of now {}; \
                 falling back to the last checkpoint",
                record.id,
                started_at,
                now
            );
        }
        let elapsed = record.accumulated_seconds.max(wall_secs.max(0) as u64);

        let status = if planned_minutes > 0 {
            let overrun = elapsed as i64 - i64::from(planned_minutes) * 60;
            if overrun > self.policy.critical_after_secs {
                RoutineStatus::LateCritical
            } else if overrun >= self.policy.minor_after_secs {
                RoutineStatus::LateMinor
            } else {
                RoutineStatus::Running
            }
        } else {
            RoutineStatus::Running
        };

        Classification {
            status,
            elapsed_seconds: elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn record_started(secs_ago: i64, now: DateTime<Utc>) -> ExecutionRecord {
        ExecutionRecord {
            id: "exec-1".to_string(),
            routine_definition_id: "routine-1".to_string(),
            operator_id: "op-1".to_string(),
            occurrence_date: NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            started_at: Some(now - Duration::seconds(secs_ago)),
            paused_at: None,
            finished_at: None,
            accumulated_seconds: 0,
            created_seq: 1,
            created_at: now - Duration::seconds(secs_ago),
        }
    }

    #[test]
    fn no_record_is_not_started() {
        let classifier = StatusClassifier::new();
        let c = classifier.classify(None, 30, Utc::now());
        assert_eq!(c.status, RoutineStatus::NotStarted);
        assert_eq!(c.elapsed_seconds, 0);
    }

    #[test]
    fn record_without_start_is_not_started() {
        let now = Utc::now();
        let mut record = record_started(0, now);
        record.started_at = None;
        let c = StatusClassifier::new().classify(Some(&record), 30, now);
        assert_eq!(c.status, RoutineStatus::NotStarted);
    }

    #[test]
    fn finished_uses_checkpointed_total() {
        let now = Utc::now();
        let mut record = record_started(5000, now);
        record.finished_at = Some(now);
        record.accumulated_seconds = 1234;
        let c = StatusClassifier::new().classify(Some(&record), 30, now);
        assert_eq!(c.status, RoutineStatus::Finished);
        assert_eq!(c.elapsed_seconds, 1234);
    }

    #[test]
    fn paused_freezes_elapsed() {
        let now = Utc::now();
        let mut record = record_started(5000, now);
        record.paused_at = Some(now);
        record.accumulated_seconds = 600;
        let c = StatusClassifier::new().classify(Some(&record), 30, now);
        assert_eq!(c.status, RoutineStatus::Paused);
        assert_eq!(c.elapsed_seconds, 600);
    }

    #[test]
    fn running_within_plan() {
        let now = Utc::now();
        let record = record_started(300, now);
        let c = StatusClassifier::new().classify(Some(&record), 30, now);
        assert_eq!(c.status, RoutineStatus::Running);
        assert_eq!(c.elapsed_seconds, 300);
    }

    #[test]
    fn running_forty_five_minutes_of_thirty_is_late_minor() {
        let now = Utc::now();
        let record = record_started(2700, now);
        let c = StatusClassifier::new().classify(Some(&record), 30, now);
        assert_eq!(c.status, RoutineStatus::LateMinor);
        assert_eq!(c.elapsed_seconds, 2700);
    }

    #[test]
    fn running_over_an_hour_of_thirty_is_late_critical() {
        let now = Utc::now();
        let record = record_started(3700, now);
        let c = StatusClassifier::new().classify(Some(&record), 30, now);
        assert_eq!(c.status, RoutineStatus::LateCritical);
    }

    #[test]
    fn overrun_of_exactly_thirty_minutes_is_still_minor() {
        let now = Utc::now();
        let record = record_started(3600, now);
        let c = StatusClassifier::new().classify(Some(&record), 30, now);
        assert_eq!(c.status, RoutineStatus::LateMinor);
    }

    #[test]
    fn elapsed_never_regresses_below_checkpoint() {
        let now = Utc::now();
        // Stale startedAt ahead of now, but a known checkpoint of 500s.
        let mut record = record_started(0, now);
        record.started_at = Some(now + Duration::seconds(120));
        record.accumulated_seconds = 500;
        let c = StatusClassifier::new().classify(Some(&record), 30, now);
        assert_eq!(c.elapsed_seconds, 500);
        assert_eq!(c.status, RoutineStatus::Running);
    }

    #[test]
    fn custom_policy_shifts_the_bands() {
        let now = Utc::now();
        let record = record_started(2000, now);
        let classifier = StatusClassifier::with_policy(LatenessPolicy {
            minor_after_secs: 60,
            critical_after_secs: 120,
        });
        let c = classifier.classify(Some(&record), 30, now);
        assert_eq!(c.status, RoutineStatus::LateCritical);
    }
}
