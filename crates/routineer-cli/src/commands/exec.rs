use clap::Subcommand;
use routineer_core::storage::Database;
use routineer_core::{ExecutionTimer, RecordStore, StatusClassifier};

#[derive(Subcommand)]
pub enum ExecAction {
    /// Start working an occurrence
    Start {
        routine_id: String,
        #[arg(long, default_value = "default")]
        operator: String,
        /// Occurrence day, YYYY-MM-DD; defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Pause a running occurrence, banking elapsed time
    Pause {
        routine_id: String,
        #[arg(long, default_value = "default")]
        operator: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Resume a paused occurrence
    Resume {
        routine_id: String,
        #[arg(long, default_value = "default")]
        operator: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Finish an occurrence (terminal)
    Finish {
        routine_id: String,
        #[arg(long, default_value = "default")]
        operator: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Show live status and elapsed time for an occurrence
    Status {
        routine_id: String,
        #[arg(long, default_value = "default")]
        operator: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Register an attachment for an occurrence's execution record
    Attach {
        routine_id: String,
        /// Attachment name (e.g. a report filename)
        name: String,
        #[arg(long, default_value = "default")]
        operator: String,
        #[arg(long)]
        date: Option<String>,
    },
}

pub fn run(action: ExecAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        ExecAction::Start {
            routine_id,
            operator,
            date,
        } => {
            let mut timer = open_timer(&db, &routine_id, &operator, date)?;
            timer.start(&db)?;
            println!("Started: {}", timer.record_id().unwrap_or(""));
        }
        ExecAction::Pause {
            routine_id,
            operator,
            date,
        } => {
            let mut timer = open_timer(&db, &routine_id, &operator, date)?;
            timer.pause(&db)?;
            println!("Paused at {}s", timer.compute_elapsed());
        }
        ExecAction::Resume {
            routine_id,
            operator,
            date,
        } => {
            let mut timer = open_timer(&db, &routine_id, &operator, date)?;
            timer.resume(&db)?;
            println!("Resumed at {}s", timer.compute_elapsed());
        }
        ExecAction::Finish {
            routine_id,
            operator,
            date,
        } => {
            let mut timer = open_timer(&db, &routine_id, &operator, date)?;
            let total = timer.finalize(&db)?;
            println!("Finished after {total}s");
        }
        ExecAction::Status {
            routine_id,
            operator,
            date,
        } => {
            let routine = db.get_routine(&routine_id)?;
            let date = super::parse_date_or_today(date.as_deref())?;
            let record = db.load_execution_record(&routine_id, &operator, date)?;
            let c = StatusClassifier::new().classify(
                record.as_ref(),
                routine.planned_minutes(),
                chrono::Utc::now(),
            );
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "routine_id": routine_id,
                    "date": date,
                    "status": c.status,
                    "elapsed_seconds": c.elapsed_seconds,
                }))?
            );
        }
        ExecAction::Attach {
            routine_id,
            name,
            operator,
            date,
        } => {
            let date = super::parse_date_or_today(date.as_deref())?;
            let record = db
                .load_execution_record(&routine_id, &operator, date)?
                .ok_or("no execution record for that occurrence; start it first")?;
            db.add_attachment(&record.id, &name)?;
            println!("Attached '{name}' to {}", record.id);
        }
    }
    Ok(())
}

fn open_timer(
    db: &Database,
    routine_id: &str,
    operator: &str,
    date: Option<String>,
) -> Result<ExecutionTimer, Box<dyn std::error::Error>> {
    let routine = db.get_routine(routine_id)?;
    let date = super::parse_date_or_today(date.as_deref())?;
    Ok(ExecutionTimer::open(db, &routine, operator, date)?)
}
