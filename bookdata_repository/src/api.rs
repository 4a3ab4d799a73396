use std::collections::BTreeMap;

use paperclip::actix::Apiv2Schema;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type BookId = i32;
pub type UserId = i32;

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
/// Book record as extracted from the catalog, before the store assigns it an id
pub struct NewBook {
    pub upc: String,
    pub book_name: String,
    pub currency: String,
    pub price: Decimal,
    pub quantity: i32,
    pub availability: bool,
    pub rating: i32,
    pub number_of_reviews: i32,
    pub category: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub source_page: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
/// Book record stored in the repository
pub struct Book {
    pub id: BookId,
    /// Catalog product code, unique across all books
    pub upc: String,
    pub book_name: String,
    pub currency: String,
    pub price: Decimal,
    pub quantity: i32,
    pub availability: bool,
    /// Star rating, 0 to 5
    pub rating: i32,
    pub number_of_reviews: i32,
    pub category: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// Catalog listing page the book was discovered on
    pub source_page: i32,
}

impl Book {
    pub fn from_new(id: BookId, book: NewBook) -> Self {
        Self {
            id,
            upc: book.upc,
            book_name: book.book_name,
            currency: book.currency,
            price: book.price,
            quantity: book.quantity,
            availability: book.availability,
            rating: book.rating,
            number_of_reviews: book.number_of_reviews,
            category: book.category,
            description: book.description,
            image_url: book.image_url,
            source_page: book.source_page,
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, Apiv2Schema)]
pub struct ListBooksQuery {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, Apiv2Schema)]
/// Both filters are optional, when both are given both have to match
pub struct SearchBooksQuery {
    pub title: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, Apiv2Schema)]
pub struct TopRatedQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Apiv2Schema)]
/// Inclusive price range, min_price defaults to 0
pub struct PriceRangeQuery {
    pub min_price: Option<Decimal>,
    pub max_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct PricedBook {
    pub name: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ReviewedBook {
    pub name: String,
    pub reviews: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct PriceStats {
    pub average: Decimal,
    pub median: Decimal,
    pub cheapest_book: Option<PricedBook>,
    pub most_expensive_book: Option<PricedBook>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
/// Statistics over the whole collection
pub struct StatsOverview {
    pub total_books: i64,
    pub total_categories: i64,
    pub total_stock_quantity: i64,
    pub price_stats: PriceStats,
    pub most_reviewed_book: Option<ReviewedBook>,
    /// Number of books per rating, ratings without books are not present
    pub rating_distribution: BTreeMap<i32, i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct CategoryStats {
    pub category: String,
    pub book_count: i64,
    pub average_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
/// Response of the overview endpoint, the overview fields with per category statistics attached
pub struct StatsOverviewResponse {
    pub total_books: i64,
    pub total_categories: i64,
    pub total_stock_quantity: i64,
    pub price_stats: PriceStats,
    pub most_reviewed_book: Option<ReviewedBook>,
    pub rating_distribution: BTreeMap<i32, i64>,
    pub categories_stats: Vec<CategoryStats>,
}

impl StatsOverviewResponse {
    pub fn new(overview: StatsOverview, categories_stats: Vec<CategoryStats>) -> Self {
        Self {
            total_books: overview.total_books,
            total_categories: overview.total_categories,
            total_stock_quantity: overview.total_stock_quantity,
            price_stats: overview.price_stats,
            most_reviewed_book: overview.most_reviewed_book,
            rating_distribution: overview.rating_distribution,
            categories_stats,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct HealthStatus {
    pub status: String,
    pub database_connection: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct UserCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Apiv2Schema)]
/// Form encoded login request
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
/// User details without the password hash
pub struct UserPublic {
    pub id: UserId,
    pub username: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ErrorResponse {
    pub detail: String,
}
