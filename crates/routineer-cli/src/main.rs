use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "routineer-cli", version, about = "Routineer CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Routine definition management
    Routine {
        #[command(subcommand)]
        action: commands::routine::RoutineAction,
    },
    /// Today's due occurrences with live status
    Board(commands::board::BoardArgs),
    /// Planned-vs-executed summary over a date range
    Summary(commands::summary::SummaryArgs),
    /// Execution control for one occurrence
    Exec {
        #[command(subcommand)]
        action: commands::exec::ExecAction,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Routine { action } => commands::routine::run(action),
        Commands::Board(args) => commands::board::run(args),
        Commands::Summary(args) => commands::summary::run(args),
        Commands::Exec { action } => commands::exec::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
