use clap::Args;
use routineer_core::storage::Database;
use routineer_core::{RecurrenceEngine, RoutineStatus, StatusClassifier};

#[derive(Args)]
pub struct BoardArgs {
    /// Day to show, YYYY-MM-DD; defaults to today
    #[arg(long)]
    date: Option<String>,
    /// Emit JSON instead of a table
    #[arg(long)]
    json: bool,
}

pub fn run(args: BoardArgs) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let date = super::parse_date_or_today(args.date.as_deref())?;
    let now = chrono::Utc::now();

    let definitions = db.list_routines()?;
    let records = db.list_execution_records()?;
    let engine = RecurrenceEngine::new();
    let classifier = StatusClassifier::new();

    let mut rows = Vec::new();
    for occurrence in engine.due_on(&definitions, date) {
        // Highest creation sequence wins when duplicates exist.
        let record = records
            .iter()
            .filter(|r| {
                r.routine_definition_id == occurrence.routine_id && r.occurrence_date == date
            })
            .max_by_key(|r| r.created_seq);
        let c = classifier.classify(record, occurrence.planned_minutes, now);
        let title = definitions
            .iter()
            .find(|d| d.id == occurrence.routine_id)
            .map(|d| d.title.as_str())
            .unwrap_or("");
        rows.push(serde_json::json!({
            "routine_id": occurrence.routine_id,
            "title": title,
            "status": c.status,
            "elapsed_seconds": c.elapsed_seconds,
            "planned_minutes": occurrence.planned_minutes,
        }));
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!("Board for {date}");
        for row in &rows {
            let late_flag = match serde_json::from_value::<RoutineStatus>(row["status"].clone()) {
                Ok(status) if status.is_late() => " !",
                _ => "",
            };
            println!(
                "  [{}]{} {} ({}) elapsed {}s of {}min",
                row["status"].as_str().unwrap_or("?"),
                late_flag,
                row["title"].as_str().unwrap_or(""),
                row["routine_id"].as_str().unwrap_or(""),
                row["elapsed_seconds"],
                row["planned_minutes"],
            );
        }
        if rows.is_empty() {
            println!("  nothing due");
        }
    }
    Ok(())
}
