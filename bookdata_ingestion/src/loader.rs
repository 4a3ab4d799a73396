use std::collections::HashSet;
use std::path::Path;

use bookdata_repository::api::NewBook;
use bookdata_repository::books_repository::BookRepository;

use crate::dataset::read_rows;
use crate::error::IngestionError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Books removed before loading, None when the table was kept
    pub cleared: Option<u64>,
    pub existing: usize,
    pub inserted: usize,
    pub duplicates_skipped: usize,
    pub invalid_rows: usize,
    /// Upcs of rows rejected by type conversion
    pub rejected_upcs: Vec<String>,
}

/// Loads the dataset into the book repository. Rows whose upc is already stored,
/// or repeated earlier in the file, are skipped. All new books are inserted in one batch.
pub async fn load_dataset(
    books_repository: &dyn BookRepository,
    csv_path: &Path,
    clear_table: bool,
) -> Result<LoadReport, IngestionError> {
    if !csv_path.is_file() {
        return Err(IngestionError::DatasetNotFound(csv_path.to_path_buf()));
    }
    let mut report = LoadReport::default();

    if clear_table {
        let cleared = books_repository.clear_books().await?;
        tracing::info!("Removed {} books before loading", cleared);
        report.cleared = Some(cleared);
    }

    let mut known_upcs: HashSet<String> = books_repository.all_upcs().await?;
    report.existing = known_upcs.len();
    tracing::info!("{} books already stored", report.existing);

    let mut staged: Vec<NewBook> = vec![];
    for (line, row) in read_rows(csv_path)?.enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                tracing::warn!("Skipping unreadable dataset line {} {}", line + 2, err);
                report.invalid_rows += 1;
                continue;
            }
        };
        if known_upcs.contains(&row.upc) {
            report.duplicates_skipped += 1;
            continue;
        }
        let upc = row.upc.clone();
        match row.into_new_book() {
            Ok(book) => {
                known_upcs.insert(book.upc.clone());
                staged.push(book);
            }
            Err(err) => {
                tracing::error!("Skipping book {:?} on dataset line {} {}", upc, line + 2, err);
                report.invalid_rows += 1;
                report.rejected_upcs.push(upc);
            }
        }
    }

    if !staged.is_empty() {
        report.inserted = books_repository.add_books(staged).await?.len();
    }
    tracing::info!(
        "Loaded {} books, {} already stored, {} invalid rows",
        report.inserted,
        report.duplicates_skipped,
        report.invalid_rows
    );
    Ok(report)
}
