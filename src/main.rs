use std::process;

use anyhow::Context;
use clap::Parser;
use dotenv::dotenv;
use dupelink::cli::Cli;
use dupelink::{config, logging, report, CliReporter, DedupeEngine};
use tracing::error;

fn main() {
    dotenv().ok();

    let args = Cli::parse();
    let _guard = logging::init_logger(args.verbose);

    if let Err(err) = run(args) {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn run(args: Cli) -> anyhow::Result<()> {
    let mut config =
        config::load_configuration().context("error loading configuration")?;
    if config.database_url.is_none() {
        config.database_url = std::env::var("DATABASE_URL").ok();
    }
    let config = args.apply(config);
    config.validate()?;

    let csv_path = config.csv_path.clone();

    let engine = DedupeEngine::new(config);
    let reporter = CliReporter::new();
    let outcome = engine.run(&reporter)?;

    report::print_duplicates(&outcome);
    report::print_summary(&outcome);

    if let Some(path) = csv_path {
        outcome
            .stats
            .write_csv(&path)
            .with_context(|| format!("error writing stats to {}", path))?;
    }

    Ok(())
}
