//! Planned-vs-executed aggregation over a date range.
//!
//! Combines recurrence expansion with existing execution records to
//! produce the counts and time sums behind KPI views. Uses the same
//! recurrence engine and classifier as the live board, so numbers on
//! different screens can never disagree.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{ExecutionRecord, RoutineDefinition};
use crate::recurrence::RecurrenceEngine;
use crate::status::{RoutineStatus, StatusClassifier};

/// Counts and time sums for a date range.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OccurrenceSummary {
    /// Occurrences the recurrence rules expected in the range
    pub planned: u32,
    pub finished: u32,
    pub running: u32,
    pub paused: u32,
    pub late_minor: u32,
    pub late_critical: u32,
    /// Expected occurrences not yet touched; clamped at zero
    pub pending: u32,
    /// Sum of planned durations for all expected occurrences
    pub planned_seconds: u64,
    /// Recorded working time of finished occurrences only
    pub executed_seconds: u64,
}

/// Aggregates due occurrences against execution records.
#[derive(Debug, Clone, Copy, Default)]
pub struct OccurrenceAggregator {
    engine: RecurrenceEngine,
    classifier: StatusClassifier,
}

impl OccurrenceAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parts(engine: RecurrenceEngine, classifier: StatusClassifier) -> Self {
        Self { engine, classifier }
    }

    /// Summarize the inclusive date range `from..=to` at instant `now`.
    ///
    /// Records are keyed by `(routine_definition_id, occurrence_date)`;
    /// when duplicates exist the highest creation sequence wins,
    /// independent of timestamp values.
    pub fn summarize(
        &self,
        definitions: &[RoutineDefinition],
        records: &[ExecutionRecord],
        from: NaiveDate,
        to: NaiveDate,
        now: DateTime<Utc>,
    ) -> OccurrenceSummary {
        let mut by_key: HashMap<(&str, NaiveDate), &ExecutionRecord> = HashMap::new();
        for record in records {
            by_key
                .entry((record.routine_definition_id.as_str(), record.occurrence_date))
                .and_modify(|winner| {
                    if record.created_seq > winner.created_seq {
                        *winner = record;
                    }
                })
                .or_insert(record);
        }

        let mut summary = OccurrenceSummary::default();
        let mut day = from;
        while day <= to {
            for occurrence in self.engine.due_on(definitions, day) {
                summary.planned += 1;
                summary.planned_seconds += u64::from(occurrence.planned_minutes.max(1)) * 60;

                let record = by_key
                    .get(&(occurrence.routine_id.as_str(), day))
                    .copied();
                let classification =
                    self.classifier
                        .classify(record, occurrence.planned_minutes, now);
                match classification.status {
                    RoutineStatus::NotStarted => {}
                    RoutineStatus::Running => summary.running += 1,
                    RoutineStatus::Paused => summary.paused += 1,
                    RoutineStatus::LateMinor => summary.late_minor += 1,
                    RoutineStatus::LateCritical => summary.late_critical += 1,
                    RoutineStatus::Finished => {
                        summary.finished += 1;
                        if let Some(record) = record {
                            summary.executed_seconds += executed_seconds(record);
                        }
                    }
                }
            }
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }

        summary.pending = pending(
            summary.planned,
            summary.finished,
            summary.running + summary.late_minor + summary.late_critical,
            summary.paused,
        );
        summary
    }
}

/// Expected occurrences with no work yet, clamped so over-execution
/// (more records than planned occurrences) never goes negative.
fn pending(planned: u32, finished: u32, in_progress: u32, paused: u32) -> u32 {
    planned.saturating_sub(finished + in_progress + paused)
}

/// Recorded working time of one finished occurrence. Falls back to the
/// finish-start span when no checkpoint total was ever written, and
/// discards negative spans.
fn executed_seconds(record: &ExecutionRecord) -> u64 {
    if record.accumulated_seconds > 0 {
        return record.accumulated_seconds;
    }
    match (record.started_at, record.finished_at) {
        (Some(started), Some(finished)) => (finished - started).num_seconds().max(0) as u64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Frequency, RecurrencePattern, RoutineKind};
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap()
    }

    fn daily(id: &str, anchor: NaiveDate, minutes: u32) -> RoutineDefinition {
        let mut def = RoutineDefinition::new("Daily routine", "op-1", anchor);
        def.id = id.to_string();
        def.kind = RoutineKind::Recurring;
        def.planned_duration_minutes = Some(minutes);
        def.recurrence = Some(RecurrencePattern {
            frequency: Frequency::Daily,
            weekdays: Default::default(),
            end_date: None,
        });
        def
    }

    fn record(
        id: &str,
        routine_id: &str,
        day: NaiveDate,
        seq: i64,
        accumulated: u64,
    ) -> ExecutionRecord {
        let started = now() - chrono::Duration::hours(3);
        ExecutionRecord {
            id: id.to_string(),
            routine_definition_id: routine_id.to_string(),
            operator_id: "op-1".to_string(),
            occurrence_date: day,
            started_at: Some(started),
            paused_at: None,
            finished_at: None,
            accumulated_seconds: accumulated,
            created_seq: seq,
            created_at: started,
        }
    }

    fn finished(
        id: &str,
        routine_id: &str,
        day: NaiveDate,
        seq: i64,
        accumulated: u64,
    ) -> ExecutionRecord {
        let mut r = record(id, routine_id, day, seq, accumulated);
        r.finished_at = Some(now() - chrono::Duration::hours(1));
        r
    }

    #[test]
    fn pending_clamps_at_zero() {
        assert_eq!(pending(3, 2, 2, 0), 0);
        assert_eq!(pending(5, 1, 1, 1), 2);
    }

    #[test]
    fn counts_planned_occurrences_across_the_range() {
        let defs = vec![daily("r-1", date(2024, 1, 1), 30)];
        let summary = OccurrenceAggregator::new().summarize(
            &defs,
            &[],
            date(2024, 1, 8),
            date(2024, 1, 10),
            now(),
        );
        assert_eq!(summary.planned, 3);
        assert_eq!(summary.pending, 3);
        assert_eq!(summary.planned_seconds, 3 * 30 * 60);
        assert_eq!(summary.executed_seconds, 0);
    }

    #[test]
    fn executed_seconds_only_counts_finished_work() {
        let defs = vec![daily("r-1", date(2024, 1, 1), 30)];
        let records = vec![
            finished("e-1", "r-1", date(2024, 1, 8), 1, 1500),
            record("e-2", "r-1", date(2024, 1, 9), 2, 700),
        ];
        let summary = OccurrenceAggregator::new().summarize(
            &defs,
            &records,
            date(2024, 1, 8),
            date(2024, 1, 10),
            now(),
        );
        assert_eq!(summary.finished, 1);
        assert_eq!(summary.executed_seconds, 1500);
        assert_eq!(summary.pending, 1);
    }

    #[test]
    fn latest_created_duplicate_wins() {
        let defs = vec![daily("r-1", date(2024, 1, 1), 30)];
        // Two records for the same occurrence: the older one finished,
        // the newer one still running. Creation order decides.
        let records = vec![
            finished("e-old", "r-1", date(2024, 1, 8), 1, 900),
            record("e-new", "r-1", date(2024, 1, 8), 2, 100),
        ];
        let summary = OccurrenceAggregator::new().summarize(
            &defs,
            &records,
            date(2024, 1, 8),
            date(2024, 1, 8),
            now(),
        );
        assert_eq!(summary.finished, 0);
        assert_eq!(summary.planned, 1);
        // The three-hour-old running record has blown its 30 min plan.
        assert_eq!(summary.late_critical, 1);
        assert_eq!(summary.pending, 0);
    }

    #[test]
    fn finished_record_without_checkpoint_falls_back_to_span() {
        let defs = vec![daily("r-1", date(2024, 1, 1), 30)];
        let mut r = finished("e-1", "r-1", date(2024, 1, 8), 1, 0);
        r.started_at = Some(now() - chrono::Duration::hours(2));
        r.finished_at = Some(now() - chrono::Duration::hours(1));
        let summary = OccurrenceAggregator::new().summarize(
            &defs,
            &[r],
            date(2024, 1, 8),
            date(2024, 1, 8),
            now(),
        );
        assert_eq!(summary.executed_seconds, 3600);
    }

    #[test]
    fn negative_span_is_discarded() {
        let defs = vec![daily("r-1", date(2024, 1, 1), 30)];
        let mut r = finished("e-1", "r-1", date(2024, 1, 8), 1, 0);
        r.started_at = Some(now());
        r.finished_at = Some(now() - chrono::Duration::hours(1));
        let summary = OccurrenceAggregator::new().summarize(
            &defs,
            &[r],
            date(2024, 1, 8),
            date(2024, 1, 8),
            now(),
        );
        assert_eq!(summary.executed_seconds, 0);
        assert_eq!(summary.finished, 1);
    }

    #[test]
    fn planned_seconds_floor_is_one_minute() {
        // planned_minutes() never yields zero, but the aggregator
        // guards its own floor as well.
        let mut def = daily("r-1", date(2024, 1, 1), 30);
        def.planned_duration_minutes = None;
        let summary = OccurrenceAggregator::new().summarize(
            &[def],
            &[],
            date(2024, 1, 8),
            date(2024, 1, 8),
            now(),
        );
        assert_eq!(summary.planned_seconds, 30 * 60);
    }
}
