use anyhow::{bail, Context};
use reqwest::{Response, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;

use crate::api::{
    AccessToken, Book, BookId, CategoryStats, ErrorResponse, HealthStatus, LoginForm,
    StatsOverviewResponse, UserCredentials, UserPublic,
};

/// Typed client of the book data HTTP api
pub struct BookDataClient {
    url: String,
    client: ClientWithMiddleware,
}

async fn error_detail(response: Response) -> String {
    response
        .json::<ErrorResponse>()
        .await
        .map(|error| error.detail)
        .unwrap_or_default()
}

async fn parse_success<T: DeserializeOwned>(
    response: Response,
    operation: &str,
) -> anyhow::Result<T> {
    if response.status().is_success() {
        Ok(response.json().await?)
    } else {
        let status = response.status();
        bail!("{} failed with {} {}", operation, status, error_detail(response).await)
    }
}

impl BookDataClient {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let reqwest_client = reqwest::Client::builder()
            .build()
            .context("Failed to build reqwest client")?;
        let client = ClientBuilder::new(reqwest_client)
            // Insert the tracing middleware
            .with(TracingMiddleware::default())
            .build();

        Ok(Self {
            url: url.to_string(),
            client,
        })
    }

    /// Calls GET /api/v1/health
    pub async fn health(&self) -> anyhow::Result<HealthStatus> {
        let response = self
            .client
            .get(format!("{}/api/v1/health", self.url))
            .send()
            .await?;
        parse_success(response, "Health").await
    }

    /// Calls GET /api/v1/books, server defaults apply to missing parameters
    pub async fn list_books(
        &self,
        skip: Option<u32>,
        limit: Option<u32>,
    ) -> anyhow::Result<Vec<Book>> {
        let mut query = vec![];
        if let Some(skip) = skip {
            query.push(("skip", skip));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit));
        }
        let response = self
            .client
            .get(format!("{}/api/v1/books", self.url))
            .query(&query)
            .send()
            .await?;
        parse_success(response, "List books").await
    }

    /// Calls GET /api/v1/books/{book_id}
    /// Returns None if there is no book with given id
    pub async fn get_book(&self, book_id: BookId) -> anyhow::Result<Option<Book>> {
        let response = self
            .client
            .get(format!("{}/api/v1/books/{}", self.url, book_id))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            Ok(None)
        } else {
            parse_success(response, "Get book").await.map(Some)
        }
    }

    /// Calls GET /api/v1/books/search
    pub async fn search_books(
        &self,
        title: Option<&str>,
        category: Option<&str>,
    ) -> anyhow::Result<Vec<Book>> {
        let mut query = vec![];
        if let Some(title) = title {
            query.push(("title", title));
        }
        if let Some(category) = category {
            query.push(("category", category));
        }
        let response = self
            .client
            .get(format!("{}/api/v1/books/search", self.url))
            .query(&query)
            .send()
            .await?;
        parse_success(response, "Search books").await
    }

    /// Calls GET /api/v1/books/top-rated
    pub async fn top_rated(&self, limit: u32) -> anyhow::Result<Vec<Book>> {
        let response = self
            .client
            .get(format!("{}/api/v1/books/top-rated", self.url))
            .query(&[("limit", limit)])
            .send()
            .await?;
        parse_success(response, "Top rated books").await
    }

    /// Calls GET /api/v1/books/price-range
    pub async fn books_by_price_range(
        &self,
        min_price: Option<Decimal>,
        max_price: Decimal,
    ) -> anyhow::Result<Vec<Book>> {
        let mut query = vec![("max_price", max_price.to_string())];
        if let Some(min_price) = min_price {
            query.push(("min_price", min_price.to_string()));
        }
        let response = self
            .client
            .get(format!("{}/api/v1/books/price-range", self.url))
            .query(&query)
            .send()
            .await?;
        parse_success(response, "Books by price range").await
    }

    /// Calls GET /api/v1/categories
    pub async fn categories(&self) -> anyhow::Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/api/v1/categories", self.url))
            .send()
            .await?;
        parse_success(response, "Categories").await
    }

    /// Calls GET /api/v1/stats/overview
    pub async fn stats_overview(&self) -> anyhow::Result<StatsOverviewResponse> {
        let response = self
            .client
            .get(format!("{}/api/v1/stats/overview", self.url))
            .send()
            .await?;
        parse_success(response, "Stats overview").await
    }

    /// Calls GET /api/v1/stats/categories
    pub async fn category_stats(&self) -> anyhow::Result<Vec<CategoryStats>> {
        let response = self
            .client
            .get(format!("{}/api/v1/stats/categories", self.url))
            .send()
            .await?;
        parse_success(response, "Category stats").await
    }

    /// Calls POST /api/v1/auth/users
    /// Returns None if the username is already registered
    pub async fn register_user(
        &self,
        credentials: &UserCredentials,
    ) -> anyhow::Result<Option<UserPublic>> {
        let response = self
            .client
            .post(format!("{}/api/v1/auth/users", self.url))
            .json(credentials)
            .send()
            .await?;
        if response.status() == StatusCode::BAD_REQUEST {
            tracing::info!("Registration rejected {}", error_detail(response).await);
            Ok(None)
        } else {
            parse_success(response, "Register user").await.map(Some)
        }
    }

    /// Calls POST /api/v1/auth/login
    /// Returns None if the credentials were rejected
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> anyhow::Result<Option<AccessToken>> {
        let response = self
            .client
            .post(format!("{}/api/v1/auth/login", self.url))
            .form(&LoginForm {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            Ok(None)
        } else {
            parse_success(response, "Login").await.map(Some)
        }
    }

    /// Calls GET /api/v1/auth/users/me
    /// Returns None if the token is not accepted
    pub async fn current_user(&self, access_token: &str) -> anyhow::Result<Option<UserPublic>> {
        let response = self
            .client
            .get(format!("{}/api/v1/auth/users/me", self.url))
            .bearer_auth(access_token)
            .send()
            .await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            Ok(None)
        } else {
            parse_success(response, "Current user").await.map(Some)
        }
    }
}
