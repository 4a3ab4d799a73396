use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;
use rust_decimal::Decimal;

pub use in_memory_books_repository::InMemoryBookRepository;
pub use postgres_books_repository::PostgresBooksRepository;

use crate::api::{Book, BookId, CategoryStats, NewBook, StatsOverview};
use crate::settings::DatabaseSettings;

mod in_memory_books_repository;
mod postgres_books_repository;

#[derive(thiserror::Error, Debug)]
pub enum BookRepositoryError {
    #[error("Book {0} not found")]
    NotFound(BookId),

    #[error("Book with duplicate key: {0}")]
    DuplicateKey(String),

    #[error("DatabaseFailure failure {0}")]
    DatabaseFailure(#[from] tokio_postgres::Error),

    #[error("Other error {0}")]
    Other(String),
}

#[async_trait::async_trait]
pub trait BookRepository: Send + Sync {
    /// Adds all books or none of them, fails with DuplicateKey if any upc is already stored
    /// or repeated within the batch. Returns ids in the order of the input.
    async fn add_books(&self, books: Vec<NewBook>) -> Result<Vec<BookId>, BookRepositoryError>;
    /// Removes every book, returns how many were removed
    async fn clear_books(&self) -> Result<u64, BookRepositoryError>;
    /// Upc of every stored book
    async fn all_upcs(&self) -> Result<HashSet<String>, BookRepositoryError>;
    /// Highest source page of stored books, None if there are no books
    async fn max_source_page(&self) -> Result<Option<i32>, BookRepositoryError>;
    /// Page of books in natural store order
    async fn list_books(&self, skip: i64, limit: i64) -> Result<Vec<Book>, BookRepositoryError>;
    async fn get_book(&self, book_id: BookId) -> Result<Book, BookRepositoryError>;
    /// Case insensitive substring match on name and category, absent filters match everything
    async fn search_books(
        &self,
        title: Option<String>,
        category: Option<String>,
    ) -> Result<Vec<Book>, BookRepositoryError>;
    /// Up to `limit` books ordered by rating, highest first
    async fn top_rated(&self, limit: i64) -> Result<Vec<Book>, BookRepositoryError>;
    /// Books with min_price <= price <= max_price
    async fn books_by_price_range(
        &self,
        min_price: Decimal,
        max_price: Decimal,
    ) -> Result<Vec<Book>, BookRepositoryError>;
    /// Distinct categories in lexicographic order
    async fn categories(&self) -> Result<Vec<String>, BookRepositoryError>;
    async fn stats_overview(&self) -> Result<StatsOverview, BookRepositoryError>;
    async fn category_stats(&self) -> Result<Vec<CategoryStats>, BookRepositoryError>;
    /// Checks that the store is reachable
    async fn ping(&self) -> Result<(), BookRepositoryError>;
}

/// Opens the repository selected by the settings
pub async fn open(settings: &DatabaseSettings) -> anyhow::Result<Arc<dyn BookRepository>> {
    Ok(if settings.use_in_memory_db {
        Arc::new(InMemoryBookRepository::default())
    } else {
        Arc::new(
            PostgresBooksRepository::init(settings.into())
                .await
                .context("Failed to init postgres books repository")?,
        )
    })
}
