use std::collections::{BTreeMap, HashSet};

use rust_decimal::Decimal;
use tokio_postgres::{Client, Row, Statement};

use crate::api::{
    Book, BookId, CategoryStats, NewBook, PriceStats, PricedBook, ReviewedBook, StatsOverview,
};
use crate::books_repository::{BookRepository, BookRepositoryError};
use crate::postgres::{connect, is_unique_violation, PostgresConfig};
use crate::stats;

const BOOKS_SCHEMA: &str = "
        CREATE TABLE IF NOT EXISTS books (
            id                  SERIAL PRIMARY KEY,
            upc                 VARCHAR(50) NOT NULL UNIQUE,
            book_name           VARCHAR(255) NOT NULL,
            currency            VARCHAR(3) NOT NULL DEFAULT 'GBP',
            price               NUMERIC(10, 2) NOT NULL,
            quantity            INTEGER NOT NULL,
            availability        BOOLEAN NOT NULL DEFAULT TRUE,
            rating              INTEGER NOT NULL,
            number_of_reviews   INTEGER NOT NULL DEFAULT 0,
            category            VARCHAR(100) NOT NULL,
            description         TEXT,
            image_url           VARCHAR(255),
            source_page         INTEGER NOT NULL
            )
        ";

const BOOK_COLUMNS: &str = "id, upc, book_name, currency, price, quantity, availability, rating, \
     number_of_reviews, category, description, image_url, source_page";

pub struct PostgresBooksRepository {
    client: Client,
}

impl PostgresBooksRepository {
    pub async fn init(config: PostgresConfig) -> anyhow::Result<Self> {
        let client = connect(&config, BOOKS_SCHEMA).await?;
        Ok(Self { client })
    }

    async fn query_books(
        &self,
        query: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Vec<Book>, BookRepositoryError> {
        let stmt: Statement = self.client.prepare(query).await?;
        let rows = self.client.query(&stmt, params).await?;
        Ok(rows.iter().map(book_from_row).collect::<Result<_, _>>()?)
    }
}

fn book_from_row(row: &Row) -> Result<Book, tokio_postgres::Error> {
    Ok(Book {
        id: row.try_get("id")?,
        upc: row.try_get("upc")?,
        book_name: row.try_get("book_name")?,
        currency: row.try_get("currency")?,
        price: row.try_get("price")?,
        quantity: row.try_get("quantity")?,
        availability: row.try_get("availability")?,
        rating: row.try_get("rating")?,
        number_of_reviews: row.try_get("number_of_reviews")?,
        category: row.try_get("category")?,
        description: row.try_get("description")?,
        image_url: row.try_get("image_url")?,
        source_page: row.try_get("source_page")?,
    })
}

/// Pattern for ILIKE that matches `text` literally anywhere in the value
fn contains_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait::async_trait]
impl BookRepository for PostgresBooksRepository {
    async fn add_books(&self, books: Vec<NewBook>) -> Result<Vec<BookId>, BookRepositoryError> {
        if books.is_empty() {
            return Ok(vec![]);
        }
        // Single statement so the whole batch is committed or rejected together
        let stmt: Statement = self
            .client
            .prepare(
                "INSERT INTO books (upc, book_name, currency, price, quantity, availability, \
                 rating, number_of_reviews, category, description, image_url, source_page) \
                 SELECT * FROM UNNEST($1::TEXT[], $2::TEXT[], $3::TEXT[], $4::NUMERIC[], \
                 $5::INT4[], $6::BOOL[], $7::INT4[], $8::INT4[], $9::TEXT[], $10::TEXT[], \
                 $11::TEXT[], $12::INT4[]) \
                 RETURNING id",
            )
            .await?;

        let upcs: Vec<&str> = books.iter().map(|b| b.upc.as_str()).collect();
        let names: Vec<&str> = books.iter().map(|b| b.book_name.as_str()).collect();
        let currencies: Vec<&str> = books.iter().map(|b| b.currency.as_str()).collect();
        let prices: Vec<Decimal> = books.iter().map(|b| b.price).collect();
        let quantities: Vec<i32> = books.iter().map(|b| b.quantity).collect();
        let availabilities: Vec<bool> = books.iter().map(|b| b.availability).collect();
        let ratings: Vec<i32> = books.iter().map(|b| b.rating).collect();
        let reviews: Vec<i32> = books.iter().map(|b| b.number_of_reviews).collect();
        let categories: Vec<&str> = books.iter().map(|b| b.category.as_str()).collect();
        let descriptions: Vec<Option<&str>> =
            books.iter().map(|b| b.description.as_deref()).collect();
        let images: Vec<Option<&str>> = books.iter().map(|b| b.image_url.as_deref()).collect();
        let pages: Vec<i32> = books.iter().map(|b| b.source_page).collect();

        let result = self
            .client
            .query(
                &stmt,
                &[
                    &upcs,
                    &names,
                    &currencies,
                    &prices,
                    &quantities,
                    &availabilities,
                    &ratings,
                    &reviews,
                    &categories,
                    &descriptions,
                    &images,
                    &pages,
                ],
            )
            .await;

        match result {
            Ok(rows) => Ok(rows
                .iter()
                .map(|row| row.try_get(0))
                .collect::<Result<_, _>>()?),
            Err(err) if is_unique_violation(&err) => Err(BookRepositoryError::DuplicateKey(
                err.as_db_error()
                    .and_then(|db_err| db_err.detail())
                    .unwrap_or("upc")
                    .to_string(),
            )),
            Err(other_err) => Err(other_err.into()),
        }
    }

    async fn clear_books(&self) -> Result<u64, BookRepositoryError> {
        Ok(self.client.execute("DELETE FROM books", &[]).await?)
    }

    async fn all_upcs(&self) -> Result<HashSet<String>, BookRepositoryError> {
        let stmt: Statement = self.client.prepare("SELECT upc FROM books").await?;
        let rows = self.client.query(&stmt, &[]).await?;
        Ok(rows
            .iter()
            .map(|row| row.try_get(0))
            .collect::<Result<_, _>>()?)
    }

    async fn max_source_page(&self) -> Result<Option<i32>, BookRepositoryError> {
        let row = self
            .client
            .query_one("SELECT MAX(source_page) FROM books", &[])
            .await?;
        Ok(row.try_get(0)?)
    }

    async fn list_books(&self, skip: i64, limit: i64) -> Result<Vec<Book>, BookRepositoryError> {
        self.query_books(
            &format!(
                "SELECT {} FROM books ORDER BY id OFFSET $1 LIMIT $2",
                BOOK_COLUMNS
            ),
            &[&skip, &limit],
        )
        .await
    }

    async fn get_book(&self, book_id: BookId) -> Result<Book, BookRepositoryError> {
        self.query_books(
            &format!("SELECT {} FROM books WHERE id = ($1)", BOOK_COLUMNS),
            &[&book_id],
        )
        .await?
        .into_iter()
        .next()
        .ok_or(BookRepositoryError::NotFound(book_id))
    }

    async fn search_books(
        &self,
        title: Option<String>,
        category: Option<String>,
    ) -> Result<Vec<Book>, BookRepositoryError> {
        let title_pattern = title.as_deref().map(contains_pattern);
        let category_pattern = category.as_deref().map(contains_pattern);
        self.query_books(
            &format!(
                "SELECT {} FROM books \
                 WHERE ($1::TEXT IS NULL OR book_name ILIKE $1) \
                 AND ($2::TEXT IS NULL OR category ILIKE $2) \
                 ORDER BY id",
                BOOK_COLUMNS
            ),
            &[&title_pattern, &category_pattern],
        )
        .await
    }

    async fn top_rated(&self, limit: i64) -> Result<Vec<Book>, BookRepositoryError> {
        self.query_books(
            &format!(
                "SELECT {} FROM books ORDER BY rating DESC LIMIT $1",
                BOOK_COLUMNS
            ),
            &[&limit],
        )
        .await
    }

    async fn books_by_price_range(
        &self,
        min_price: Decimal,
        max_price: Decimal,
    ) -> Result<Vec<Book>, BookRepositoryError> {
        self.query_books(
            &format!(
                "SELECT {} FROM books WHERE price BETWEEN $1 AND $2 ORDER BY id",
                BOOK_COLUMNS
            ),
            &[&min_price, &max_price],
        )
        .await
    }

    async fn categories(&self) -> Result<Vec<String>, BookRepositoryError> {
        let rows = self
            .client
            .query(
                "SELECT DISTINCT category FROM books ORDER BY category COLLATE \"C\"",
                &[],
            )
            .await?;
        Ok(rows
            .iter()
            .map(|row| row.try_get(0))
            .collect::<Result<_, _>>()?)
    }

    async fn stats_overview(&self) -> Result<StatsOverview, BookRepositoryError> {
        let totals = self
            .client
            .query_one(
                "SELECT COUNT(*), COUNT(DISTINCT category), COALESCE(SUM(quantity), 0), \
                 COALESCE(SUM(price), 0) FROM books",
                &[],
            )
            .await?;
        let total_books: i64 = totals.try_get(0)?;
        let total_categories: i64 = totals.try_get(1)?;
        let total_stock_quantity: i64 = totals.try_get(2)?;
        let total_price: Decimal = totals.try_get(3)?;

        // Median needs every price, it can't be expressed as a simple aggregate
        let prices = self
            .client
            .query("SELECT price FROM books", &[])
            .await?
            .iter()
            .map(|row| row.try_get(0))
            .collect::<Result<Vec<Decimal>, _>>()?;

        let priced_book = |row: Option<Row>| -> Result<Option<PricedBook>, BookRepositoryError> {
            row.map(|row| -> Result<PricedBook, BookRepositoryError> {
                Ok(PricedBook {
                    name: row.try_get(0)?,
                    price: row.try_get(1)?,
                })
            })
            .transpose()
        };
        let cheapest_book = priced_book(
            self.client
                .query_opt(
                    "SELECT book_name, price FROM books ORDER BY price ASC, id LIMIT 1",
                    &[],
                )
                .await?,
        )?;
        let most_expensive_book = priced_book(
            self.client
                .query_opt(
                    "SELECT book_name, price FROM books ORDER BY price DESC, id LIMIT 1",
                    &[],
                )
                .await?,
        )?;

        let most_reviewed_book = self
            .client
            .query_opt(
                "SELECT book_name, number_of_reviews FROM books \
                 ORDER BY number_of_reviews DESC, id LIMIT 1",
                &[],
            )
            .await?
            .map(|row| -> Result<ReviewedBook, BookRepositoryError> {
                Ok(ReviewedBook {
                    name: row.try_get(0)?,
                    reviews: row.try_get(1)?,
                })
            })
            .transpose()?;

        let mut rating_distribution = BTreeMap::new();
        for row in self
            .client
            .query("SELECT rating, COUNT(*) FROM books GROUP BY rating", &[])
            .await?
        {
            rating_distribution.insert(row.try_get::<_, i32>(0)?, row.try_get::<_, i64>(1)?);
        }

        Ok(StatsOverview {
            total_books,
            total_categories,
            total_stock_quantity,
            price_stats: PriceStats {
                average: stats::average(total_price, prices.len()),
                median: stats::median(prices),
                cheapest_book,
                most_expensive_book,
            },
            most_reviewed_book,
            rating_distribution,
        })
    }

    async fn category_stats(&self) -> Result<Vec<CategoryStats>, BookRepositoryError> {
        let rows = self
            .client
            .query(
                "SELECT category, COUNT(*), SUM(price) FROM books GROUP BY category",
                &[],
            )
            .await?;
        rows.iter()
            .map(|row| -> Result<CategoryStats, BookRepositoryError> {
                let book_count: i64 = row.try_get(1)?;
                let total_price: Decimal = row.try_get(2)?;
                Ok(CategoryStats {
                    category: row.try_get(0)?,
                    book_count,
                    average_price: stats::average(total_price, book_count as usize),
                })
            })
            .collect()
    }

    async fn ping(&self) -> Result<(), BookRepositoryError> {
        self.client.simple_query("SELECT 1").await?;
        Ok(())
    }
}
