use std::path::Path;
use std::sync::Arc;

use bookdata_repository::api::NewBook;
use bookdata_repository::books_repository::BookRepository;

use crate::dataset::DatasetWriter;
use crate::error::IngestionError;

/// Destination of captured records. A failing sink ends the run.
#[async_trait::async_trait]
pub trait RecordSink: Send {
    async fn write(&mut self, book: &NewBook) -> Result<(), IngestionError>;
}

pub struct CsvSink {
    writer: DatasetWriter,
}

impl CsvSink {
    /// New dataset with a header row, an existing file is truncated
    pub fn create(path: &Path) -> Result<Self, IngestionError> {
        Ok(Self {
            writer: DatasetWriter::create(path)?,
        })
    }

    pub fn append(path: &Path) -> Result<Self, IngestionError> {
        Ok(Self {
            writer: DatasetWriter::append(path)?,
        })
    }
}

#[async_trait::async_trait]
impl RecordSink for CsvSink {
    async fn write(&mut self, book: &NewBook) -> Result<(), IngestionError> {
        self.writer.write(book)
    }
}

/// Writes every record straight into the book repository
pub struct StoreSink {
    books_repository: Arc<dyn BookRepository>,
}

impl StoreSink {
    pub fn new(books_repository: Arc<dyn BookRepository>) -> Self {
        Self { books_repository }
    }
}

#[async_trait::async_trait]
impl RecordSink for StoreSink {
    async fn write(&mut self, book: &NewBook) -> Result<(), IngestionError> {
        self.books_repository.add_books(vec![book.clone()]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod sink_tests {
    use std::str::FromStr;
    use std::sync::Arc;

    use bookdata_repository::api::NewBook;
    use bookdata_repository::books_repository::{BookRepository, InMemoryBookRepository};
    use rust_decimal::Decimal;

    use crate::error::IngestionError;
    use crate::sink::{RecordSink, StoreSink};

    fn book(upc: &str) -> NewBook {
        NewBook {
            upc: upc.to_string(),
            book_name: "Sharp Objects".to_string(),
            currency: "GBP".to_string(),
            price: Decimal::from_str("47.82").unwrap(),
            quantity: 20,
            availability: true,
            rating: 4,
            number_of_reviews: 0,
            category: "Mystery".to_string(),
            description: None,
            image_url: None,
            source_page: 1,
        }
    }

    #[tokio::test]
    async fn test_store_sink_writes_to_repository() {
        let books_repository: Arc<dyn BookRepository> = Arc::new(InMemoryBookRepository::default());
        let mut sink = StoreSink::new(books_repository.clone());

        sink.write(&book("e00eb4fd7b871a48")).await.unwrap();

        assert!(books_repository
            .all_upcs()
            .await
            .unwrap()
            .contains("e00eb4fd7b871a48"));
        assert!(matches!(
            sink.write(&book("e00eb4fd7b871a48")).await,
            Err(IngestionError::Repository(..))
        ));
    }
}
