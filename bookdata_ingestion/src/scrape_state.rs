use std::collections::HashSet;
use std::path::Path;

use bookdata_repository::api::NewBook;
use bookdata_repository::books_repository::BookRepository;

use crate::dataset::read_rows;
use crate::error::IngestionError;

/// Progress of earlier runs: every captured upc and the highest listing page with records
#[derive(Debug, Clone, Default)]
pub struct ScrapeState {
    seen_upcs: HashSet<String>,
    last_page: i32,
}

impl ScrapeState {
    pub fn from_dataset(path: &Path) -> Result<Self, IngestionError> {
        let mut state = Self::default();
        for row in read_rows(path)? {
            let row = match row {
                Ok(row) => row,
                Err(err) => {
                    tracing::warn!("Ignoring unreadable dataset line {}", err);
                    continue;
                }
            };
            if !row.upc.is_empty() {
                state.seen_upcs.insert(row.upc);
            }
            match row.source_page.trim().parse::<i32>() {
                Ok(page) => state.last_page = state.last_page.max(page),
                Err(_) if row.source_page.is_empty() => {}
                Err(_) => tracing::warn!("Ignoring source page {:?}", row.source_page),
            }
        }
        tracing::info!(
            "Found {} books in {}, last page with data {}",
            state.seen_upcs.len(),
            path.display(),
            state.last_page
        );
        Ok(state)
    }

    pub async fn from_store(books_repository: &dyn BookRepository) -> Result<Self, IngestionError> {
        Ok(Self {
            seen_upcs: books_repository.all_upcs().await?,
            last_page: books_repository.max_source_page().await?.unwrap_or(0),
        })
    }

    pub fn is_known(&self, upc: &str) -> bool {
        self.seen_upcs.contains(upc)
    }

    /// Marks the book as captured, false if its upc was already known
    pub fn record(&mut self, book: &NewBook) -> bool {
        self.last_page = self.last_page.max(book.source_page);
        self.seen_upcs.insert(book.upc.clone())
    }

    /// Highest listing page with captured records, 0 when nothing was captured
    pub fn last_page(&self) -> i32 {
        self.last_page
    }

    pub fn known_count(&self) -> usize {
        self.seen_upcs.len()
    }
}

#[cfg(test)]
mod scrape_state_tests {
    use std::io::Write;

    use crate::dataset::COLUMNS;
    use crate::scrape_state::ScrapeState;

    #[test]
    fn test_state_from_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("books.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{}", COLUMNS.join(",")).unwrap();
        writeln!(file, "u1,A,GBP,1.00,1,True,1,0,Poetry,,,3").unwrap();
        writeln!(file, "u2,B,GBP,1.00,1,True,1,0,Poetry,,,7").unwrap();
        writeln!(file, "u3,C,GBP,1.00,1,True,1,0,Poetry,,,x").unwrap();
        drop(file);

        let state = ScrapeState::from_dataset(&path).unwrap();

        assert_eq!(state.known_count(), 3);
        assert!(state.is_known("u2"));
        assert!(!state.is_known("u4"));
        assert_eq!(state.last_page(), 7);
    }

    #[test]
    fn test_empty_dataset_has_no_progress() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("books.csv");
        std::fs::write(&path, format!("{}\n", COLUMNS.join(","))).unwrap();

        let state = ScrapeState::from_dataset(&path).unwrap();
        assert_eq!(state.known_count(), 0);
        assert_eq!(state.last_page(), 0);
    }
}
