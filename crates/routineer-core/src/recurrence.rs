//! Recurrence expansion.
//!
//! One pure function decides which routines are due on a given calendar
//! day. Every consumer (today board, live view, KPI aggregation) goes
//! through [`RecurrenceEngine::due_on`] so due-date logic can never
//! diverge between screens.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::model::{Frequency, Occurrence, RoutineDefinition, RoutineKind};

/// Map a date onto the stored weekday scheme (Monday=1 .. Sunday=7).
///
/// Kept as its own function so the mapping between the platform's
/// day-of-week convention and the stored 1..=7 scheme is tested in one
/// place.
pub fn weekday_number(date: NaiveDate) -> u8 {
    date.weekday().number_from_monday() as u8
}

/// Behavior when a monthly anchor day exceeds the target month's length
/// (e.g. anchor on the 31st evaluated in a 30-day month).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthlyOverflowPolicy {
    /// The occurrence silently never matches in shorter months. This is
    /// what existing data depends on, so it is the default.
    #[default]
    Skip,
    /// The occurrence lands on the last day of shorter months instead.
    ClampToMonthEnd,
}

/// Expands routine definitions into due occurrences for a calendar day.
///
/// Pure and deterministic: identical inputs always yield the identical
/// occurrence list, sorted by routine id.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecurrenceEngine {
    monthly_overflow: MonthlyOverflowPolicy,
}

impl RecurrenceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_monthly_overflow(policy: MonthlyOverflowPolicy) -> Self {
        Self {
            monthly_overflow: policy,
        }
    }

    /// All occurrences due on `date`, sorted by routine id.
    pub fn due_on(&self, definitions: &[RoutineDefinition], date: NaiveDate) -> Vec<Occurrence> {
        let mut due: Vec<Occurrence> = definitions
            .iter()
            .filter(|def| self.is_due(def, date))
            .map(|def| Occurrence {
                routine_id: def.id.clone(),
                date,
                planned_minutes: def.planned_minutes(),
                requires_attachment: def.requires_attachment_to_finish,
            })
            .collect();
        due.sort_by(|a, b| a.routine_id.cmp(&b.routine_id));
        due
    }

    /// Whether a single definition is due on `date`.
    pub fn is_due(&self, def: &RoutineDefinition, date: NaiveDate) -> bool {
        // A recurring definition without a pattern degrades to one-off
        // on its anchor date.
        let pattern = match (def.kind, &def.recurrence) {
            (RoutineKind::OneOff, _) | (_, None) => return date == def.anchor_date,
            (RoutineKind::Recurring, Some(pattern)) => pattern,
        };
        if date < def.anchor_date {
            return false;
        }
        if let Some(end) = pattern.end_date {
            if date > end {
                return false;
            }
        }
        match pattern.frequency {
            Frequency::Daily => true,
            Frequency::Weekly => pattern.weekdays.contains(&weekday_number(date)),
            Frequency::Monthly => self.monthly_matches(def.anchor_date, date),
        }
    }

    fn monthly_matches(&self, anchor: NaiveDate, date: NaiveDate) -> bool {
        if date.day() == anchor.day() {
            return true;
        }
        match self.monthly_overflow {
            MonthlyOverflowPolicy::Skip => false,
            MonthlyOverflowPolicy::ClampToMonthEnd => {
                anchor.day() > days_in_month(date) && date.day() == days_in_month(date)
            }
        }
    }
}

fn days_in_month(date: NaiveDate) -> u32 {
    match date.month() {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ => {
            if date.leap_year() {
                29
            } else {
                28
            }
        }
    }
}
