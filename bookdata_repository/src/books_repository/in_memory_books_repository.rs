use std::collections::HashSet;
use std::sync::atomic::{AtomicI32, Ordering};

use rust_decimal::Decimal;

use crate::api::{Book, BookId, CategoryStats, NewBook, StatsOverview};
use crate::books_repository::{BookRepository, BookRepositoryError};
use crate::stats;

/// Books kept in insertion order, ids start at 1 like a postgres sequence
pub struct InMemoryBookRepository {
    book_sequence_generator: AtomicI32,
    books: parking_lot::RwLock<Vec<Book>>,
}

impl Default for InMemoryBookRepository {
    fn default() -> Self {
        Self {
            book_sequence_generator: AtomicI32::new(1),
            books: Default::default(),
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn page<T: Clone>(items: &[T], skip: i64, limit: i64) -> Vec<T> {
    items
        .iter()
        .skip(skip.max(0) as usize)
        .take(limit.max(0) as usize)
        .cloned()
        .collect()
}

#[async_trait::async_trait]
impl BookRepository for InMemoryBookRepository {
    async fn add_books(&self, books: Vec<NewBook>) -> Result<Vec<BookId>, BookRepositoryError> {
        let mut locked_books = self.books.write();

        {
            let mut upcs: HashSet<&str> =
                locked_books.iter().map(|book| book.upc.as_str()).collect();
            for book in &books {
                if !upcs.insert(book.upc.as_str()) {
                    return Err(BookRepositoryError::DuplicateKey(book.upc.clone()));
                }
            }
        }

        let ids = books
            .into_iter()
            .map(|book| {
                let id = self.book_sequence_generator.fetch_add(1, Ordering::Relaxed);
                locked_books.push(Book::from_new(id, book));
                id
            })
            .collect();
        Ok(ids)
    }

    async fn clear_books(&self) -> Result<u64, BookRepositoryError> {
        let mut locked_books = self.books.write();
        let removed = locked_books.len() as u64;
        locked_books.clear();
        Ok(removed)
    }

    async fn all_upcs(&self) -> Result<HashSet<String>, BookRepositoryError> {
        Ok(self
            .books
            .read()
            .iter()
            .map(|book| book.upc.clone())
            .collect())
    }

    async fn max_source_page(&self) -> Result<Option<i32>, BookRepositoryError> {
        Ok(self.books.read().iter().map(|book| book.source_page).max())
    }

    async fn list_books(&self, skip: i64, limit: i64) -> Result<Vec<Book>, BookRepositoryError> {
        Ok(page(&self.books.read(), skip, limit))
    }

    async fn get_book(&self, book_id: BookId) -> Result<Book, BookRepositoryError> {
        self.books
            .read()
            .iter()
            .find(|book| book.id == book_id)
            .cloned()
            .ok_or(BookRepositoryError::NotFound(book_id))
    }

    async fn search_books(
        &self,
        title: Option<String>,
        category: Option<String>,
    ) -> Result<Vec<Book>, BookRepositoryError> {
        Ok(self
            .books
            .read()
            .iter()
            .filter(|book| {
                title
                    .as_deref()
                    .map_or(true, |title| contains_ignore_case(&book.book_name, title))
            })
            .filter(|book| {
                category
                    .as_deref()
                    .map_or(true, |category| contains_ignore_case(&book.category, category))
            })
            .cloned()
            .collect())
    }

    async fn top_rated(&self, limit: i64) -> Result<Vec<Book>, BookRepositoryError> {
        let mut books = self.books.read().clone();
        books.sort_by(|a, b| b.rating.cmp(&a.rating));
        Ok(page(&books, 0, limit))
    }

    async fn books_by_price_range(
        &self,
        min_price: Decimal,
        max_price: Decimal,
    ) -> Result<Vec<Book>, BookRepositoryError> {
        Ok(self
            .books
            .read()
            .iter()
            .filter(|book| min_price <= book.price && book.price <= max_price)
            .cloned()
            .collect())
    }

    async fn categories(&self) -> Result<Vec<String>, BookRepositoryError> {
        let mut categories: Vec<String> = self
            .books
            .read()
            .iter()
            .map(|book| book.category.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        categories.sort();
        Ok(categories)
    }

    async fn stats_overview(&self) -> Result<StatsOverview, BookRepositoryError> {
        Ok(stats::overview(&self.books.read()))
    }

    async fn category_stats(&self) -> Result<Vec<CategoryStats>, BookRepositoryError> {
        Ok(stats::per_category(&self.books.read()))
    }

    async fn ping(&self) -> Result<(), BookRepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
mod in_memory_book_repository_tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use crate::api::NewBook;
    use crate::books_repository::{BookRepository, BookRepositoryError, InMemoryBookRepository};

    fn new_book(upc: &str, name: &str, category: &str, price: &str, rating: i32) -> NewBook {
        NewBook {
            upc: upc.to_string(),
            book_name: name.to_string(),
            currency: "GBP".to_string(),
            price: Decimal::from_str(price).unwrap(),
            quantity: 3,
            availability: true,
            rating,
            number_of_reviews: 0,
            category: category.to_string(),
            description: Some("description".to_string()),
            image_url: None,
            source_page: 2,
        }
    }

    async fn repo_with_books() -> InMemoryBookRepository {
        let repo = InMemoryBookRepository::default();
        repo.add_books(vec![
            new_book("a1", "A Light in the Attic", "Poetry", "51.77", 3),
            new_book("b2", "Tipping the Velvet", "Historical Fiction", "53.74", 1),
            new_book("c3", "Soumission", "Fiction", "50.10", 1),
            new_book("d4", "Sharp Objects", "Mystery", "47.82", 4),
        ])
        .await
        .expect("Failed to add books");
        repo
    }

    #[tokio::test]
    async fn test_add_books_and_get_them() {
        let repo = InMemoryBookRepository::default();

        let book_not_found = repo.get_book(20000).await;
        assert!(matches!(
            book_not_found,
            Err(BookRepositoryError::NotFound(..))
        ));

        let book = new_book("a1", "xx", "Poetry", "10.00", 2);
        let ids = repo
            .add_books(vec![book.clone()])
            .await
            .expect("Failed to add book");
        assert_eq!(ids.len(), 1);

        let stored = repo.get_book(ids[0]).await.expect("Failed to get book");
        assert_eq!(stored.upc, book.upc);
        assert_eq!(stored.price, book.price);
        assert_eq!(stored.description, book.description);
    }

    #[tokio::test]
    /// A batch containing an already stored upc is rejected as a whole
    async fn test_add_books_is_all_or_nothing() {
        let repo = repo_with_books().await;

        let result = repo
            .add_books(vec![
                new_book("new", "new", "Poetry", "1.00", 1),
                new_book("a1", "dup", "Poetry", "1.00", 1),
            ])
            .await;
        assert!(matches!(result, Err(BookRepositoryError::DuplicateKey(upc)) if upc == "a1"));
        assert_eq!(repo.all_upcs().await.unwrap().len(), 4);

        let result = repo
            .add_books(vec![
                new_book("x", "x", "Poetry", "1.00", 1),
                new_book("x", "x", "Poetry", "1.00", 1),
            ])
            .await;
        assert!(matches!(result, Err(BookRepositoryError::DuplicateKey(..))));
        assert_eq!(repo.all_upcs().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_list_books_with_skip_and_limit() {
        let repo = repo_with_books().await;

        let all = repo.list_books(0, 100).await.unwrap();
        assert_eq!(all.len(), 4);

        let page = repo.list_books(1, 2).await.unwrap();
        assert_eq!(
            page.iter().map(|b| b.upc.as_str()).collect::<Vec<_>>(),
            vec!["b2", "c3"]
        );
        assert!(repo.list_books(10, 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_books() {
        let repo = repo_with_books().await;

        let by_title = repo
            .search_books(Some("LIGHT".to_string()), None)
            .await
            .unwrap();
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].upc, "a1");

        let by_category = repo
            .search_books(None, Some("fiction".to_string()))
            .await
            .unwrap();
        assert_eq!(by_category.len(), 2);

        let both = repo
            .search_books(Some("sou".to_string()), Some("fiction".to_string()))
            .await
            .unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].upc, "c3");

        let none_filter = repo.search_books(None, None).await.unwrap();
        assert_eq!(none_filter.len(), 4);
    }

    #[tokio::test]
    async fn test_top_rated() {
        let repo = repo_with_books().await;
        let top = repo.top_rated(2).await.unwrap();
        assert_eq!(
            top.iter().map(|b| b.rating).collect::<Vec<_>>(),
            vec![4, 3]
        );
    }

    #[tokio::test]
    /// Books priced exactly at either bound are included
    async fn test_price_range_is_inclusive() {
        let repo = repo_with_books().await;
        let in_range = repo
            .books_by_price_range(
                Decimal::from_str("47.82").unwrap(),
                Decimal::from_str("51.77").unwrap(),
            )
            .await
            .unwrap();
        let mut upcs: Vec<_> = in_range.iter().map(|b| b.upc.clone()).collect();
        upcs.sort();
        assert_eq!(upcs, vec!["a1", "c3", "d4"]);
    }

    #[tokio::test]
    async fn test_categories_are_distinct_and_sorted() {
        let repo = repo_with_books().await;
        repo.add_books(vec![new_book("e5", "e", "Poetry", "1.00", 0)])
            .await
            .unwrap();
        assert_eq!(
            repo.categories().await.unwrap(),
            vec!["Fiction", "Historical Fiction", "Mystery", "Poetry"]
        );
    }

    #[tokio::test]
    async fn test_clear_books_and_max_source_page() {
        let repo = repo_with_books().await;
        assert_eq!(repo.max_source_page().await.unwrap(), Some(2));
        assert_eq!(repo.clear_books().await.unwrap(), 4);
        assert!(repo.all_upcs().await.unwrap().is_empty());
        assert_eq!(repo.max_source_page().await.unwrap(), None);
    }
}
