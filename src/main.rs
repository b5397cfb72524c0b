mod aggregate;
mod cli;
mod derive;
mod error;
mod fmt;
mod models;
mod normalize;
mod reports;
mod schema;
mod settings;
mod table;
mod workbook;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .without_time()
        .with_env_filter(
            EnvFilter::try_from_env("CASEBOOK_LOG").unwrap_or_else(|_| EnvFilter::new("casebook=warn")),
        )
        .init();

    let cli = Cli::parse();
    let wb = cli.workbook.as_deref();

    let result = match cli.command {
        Commands::Init { path, sheet } => cli::init::run(&path, sheet),
        Commands::Status => cli::status::run(wb),
        Commands::List { filter } => cli::report::list(wb, filter),
        Commands::Dashboard { filter } => cli::report::dashboard(wb, filter),
        Commands::Accounting {
            filter,
            outstanding,
        } => cli::report::accounting(wb, filter, outstanding),
        Commands::Escrow { filter } => cli::report::escrow(wb, filter),
        Commands::Compare {
            years,
            by,
            category,
        } => cli::compare::run(wb, years, by, category),
        Commands::Top { n, by, filter } => cli::report::top(wb, n, by, filter),
        Commands::MarkSent {
            case_id,
            date,
            force,
        } => cli::edit::mark_sent(wb, &case_id, date.as_deref(), force),
        Commands::Set {
            case_id,
            field,
            value,
            force,
        } => cli::edit::set(wb, &case_id, &field, &value, force),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
