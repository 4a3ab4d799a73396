use std::path::PathBuf;

use anyhow::Context;
use bookdata_ingestion::catalog::CatalogSite;
use bookdata_ingestion::dataset::DEFAULT_DATASET;
use bookdata_ingestion::fetcher::HttpCatalogFetcher;
use bookdata_ingestion::scraper::{scrape_to_csv, scrape_to_store, PageSelector, Scraper};
use bookdata_repository::books_repository;
use bookdata_repository::settings::DatabaseSettings;
use bookdata_repository::telemetry::init_logging;
use clap::Parser;

/// Scrapes books.toscrape.com into a CSV dataset
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// `all` or a comma separated list of catalog pages, e.g. `1,2,3`
    #[arg(long, default_value = "all")]
    pages: PageSelector,

    /// Dataset to write
    #[arg(long, visible_alias = "csv_name", default_value = DEFAULT_DATASET)]
    csv_name: PathBuf,

    /// Continue an existing dataset instead of replacing it
    #[arg(long)]
    append: bool,

    /// Write books straight into the configured database instead of the dataset
    #[arg(long)]
    to_db: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_logging("scrape_books", "info");
    let args = Args::parse();

    let site = CatalogSite::books_to_scrape().context("Invalid catalog url")?;
    let fetcher = HttpCatalogFetcher::new().context("Failed to create http client")?;
    let scraper = Scraper::new(fetcher, site).context("Failed to create catalog parser")?;

    let report = if args.to_db {
        let database_settings =
            DatabaseSettings::load().context("Failed to load database settings")?;
        let books_repository = books_repository::open(&database_settings).await?;
        scrape_to_store(&scraper, &args.pages, books_repository, args.append).await
    } else {
        scrape_to_csv(&scraper, &args.pages, &args.csv_name, args.append).await
    }
    .context("Scraping failed")?;

    if report.stopped_early {
        tracing::info!("Catalog ended before the last planned page");
    }
    Ok(())
}
