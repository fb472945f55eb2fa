use clap::Subcommand;
use routineer_core::storage::Database;
use routineer_core::{Frequency, RecurrencePattern, RoutineDefinition, RoutineKind};

#[derive(Subcommand)]
pub enum RoutineAction {
    /// Create a routine definition
    Add {
        /// Routine title
        title: String,
        /// Operator the routine is assigned to
        #[arg(long, default_value = "default")]
        operator: String,
        /// First (or only) due date, YYYY-MM-DD; defaults to today
        #[arg(long)]
        anchor: Option<String>,
        /// Repeat cadence: daily, weekly or monthly; omit for one-off
        #[arg(long)]
        frequency: Option<String>,
        /// Weekdays for weekly routines, e.g. "1,4" (Mon=1 .. Sun=7)
        #[arg(long)]
        weekdays: Option<String>,
        /// Last date the routine generates occurrences, YYYY-MM-DD
        #[arg(long)]
        end: Option<String>,
        /// Planned duration in minutes
        #[arg(long)]
        minutes: Option<u32>,
        /// Require an attachment before an execution can finish
        #[arg(long)]
        requires_attachment: bool,
    },
    /// List routine definitions as JSON
    List,
}

pub fn run(action: RoutineAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        RoutineAction::Add {
            title,
            operator,
            anchor,
            frequency,
            weekdays,
            end,
            minutes,
            requires_attachment,
        } => {
            let anchor = super::parse_date_or_today(anchor.as_deref())?;
            let mut def = RoutineDefinition::new(title, operator, anchor);
            def.planned_duration_minutes = minutes;
            def.requires_attachment_to_finish = requires_attachment;
            if let Some(frequency) = frequency {
                def.kind = RoutineKind::Recurring;
                def.recurrence = Some(RecurrencePattern {
                    frequency: parse_frequency(&frequency)?,
                    weekdays: weekdays
                        .as_deref()
                        .map(parse_weekdays)
                        .transpose()?
                        .unwrap_or_default(),
                    end_date: end.map(|d| d.parse()).transpose()?,
                });
            }
            def.validate()?;
            db.insert_routine(&def)?;
            println!("Routine created: {}", def.id);
        }
        RoutineAction::List => {
            let routines = db.list_routines()?;
            println!("{}", serde_json::to_string_pretty(&routines)?);
        }
    }
    Ok(())
}

fn parse_frequency(raw: &str) -> Result<Frequency, Box<dyn std::error::Error>> {
    match raw {
        "daily" => Ok(Frequency::Daily),
        "weekly" => Ok(Frequency::Weekly),
        "monthly" => Ok(Frequency::Monthly),
        other => Err(format!("unknown frequency '{other}' (daily|weekly|monthly)").into()),
    }
}

fn parse_weekdays(
    raw: &str,
) -> Result<std::collections::BTreeSet<u8>, Box<dyn std::error::Error>> {
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<u8>()
                .map_err(|_| format!("invalid weekday '{part}' (expected 1..=7)").into())
        })
        .collect()
}
