use clap::Args;
use routineer_core::storage::Database;
use routineer_core::OccurrenceAggregator;

#[derive(Args)]
pub struct SummaryArgs {
    /// Range start, YYYY-MM-DD; defaults to today
    #[arg(long)]
    from: Option<String>,
    /// Range end (inclusive), YYYY-MM-DD; defaults to the start
    #[arg(long)]
    to: Option<String>,
}

pub fn run(args: SummaryArgs) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let from = super::parse_date_or_today(args.from.as_deref())?;
    let to = match args.to {
        Some(raw) => raw.parse()?,
        None => from,
    };
    if to < from {
        return Err(format!("range end {to} is before start {from}").into());
    }

    let definitions = db.list_routines()?;
    let records = db.list_execution_records()?;
    let summary = OccurrenceAggregator::new().summarize(
        &definitions,
        &records,
        from,
        to,
        chrono::Utc::now(),
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
