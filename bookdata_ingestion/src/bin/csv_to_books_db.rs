use std::path::PathBuf;

use anyhow::Context;
use bookdata_ingestion::dataset::DEFAULT_DATASET;
use bookdata_ingestion::loader::load_dataset;
use bookdata_repository::books_repository;
use bookdata_repository::settings::DatabaseSettings;
use bookdata_repository::telemetry::init_logging;
use clap::Parser;

/// Loads a scraped CSV dataset into the books database
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Dataset to load
    #[arg(long, visible_alias = "csv_name", default_value = DEFAULT_DATASET)]
    csv_name: PathBuf,

    /// Remove every stored book before loading
    #[arg(long, visible_alias = "clear_table")]
    clear_table: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_logging("csv_to_books_db", "info");
    let args = Args::parse();

    let database_settings = DatabaseSettings::load().context("Failed to load database settings")?;
    let books_repository = books_repository::open(&database_settings).await?;

    let report = load_dataset(books_repository.as_ref(), &args.csv_name, args.clear_table)
        .await
        .with_context(|| format!("Failed to load {}", args.csv_name.display()))?;
    tracing::info!("{} books inserted", report.inserted);
    Ok(())
}
