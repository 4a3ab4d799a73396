use std::sync::Arc;

use actix_web::http::header::{self, HeaderValue};
use actix_web::http::StatusCode;
use actix_web::web::Data;
use actix_web::{Error, HttpRequest, HttpResponse};
use paperclip::actix::{api_v2_operation, web};
use rust_decimal::Decimal;
use serde_json::json;

use crate::api::{
    BookId, ErrorResponse, HealthStatus, ListBooksQuery, LoginForm, PriceRangeQuery,
    SearchBooksQuery, StatsOverviewResponse, TopRatedQuery, UserCredentials,
};
use crate::auth::{AuthError, AuthService};
use crate::books_repository::{BookRepository, BookRepositoryError};

pub const DEFAULT_LIST_LIMIT: u32 = 20;
pub const DEFAULT_TOP_RATED_LIMIT: u32 = 5;

fn error_response(status: StatusCode, detail: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        detail: detail.into(),
    })
}

fn internal_error(operation: &str, err: BookRepositoryError) -> HttpResponse {
    tracing::error!("{} failed {}", operation, err);
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

fn unauthorized(detail: &str) -> HttpResponse {
    let mut response = error_response(StatusCode::UNAUTHORIZED, detail);
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    response
}

fn bearer_token(request: &HttpRequest) -> Option<&str> {
    let value = request.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
}

#[api_v2_operation]
pub async fn root() -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().json(json!({ "message": "Welcome to the Book Data API!" })))
}

#[api_v2_operation]
/// Always answers, reports whether the book store is reachable
pub async fn health(
    books_repository: Data<Arc<dyn BookRepository>>,
) -> Result<HttpResponse, Error> {
    let database_connection = match books_repository.ping().await {
        Ok(()) => "ok",
        Err(err) => {
            tracing::warn!("Database health check failed {}", err);
            "error"
        }
    };
    Ok(HttpResponse::Ok().json(HealthStatus {
        status: "ok".to_string(),
        database_connection: database_connection.to_string(),
    }))
}

#[api_v2_operation]
pub async fn list_books(
    books_repository: Data<Arc<dyn BookRepository>>,
    query: web::Query<ListBooksQuery>,
) -> Result<HttpResponse, Error> {
    let skip = query.skip.unwrap_or_default();
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    Ok(
        match books_repository.list_books(skip.into(), limit.into()).await {
            Ok(books) => HttpResponse::Ok().json(books),
            Err(err) => internal_error("List books", err),
        },
    )
}

#[api_v2_operation]
pub async fn get_book(
    books_repository: Data<Arc<dyn BookRepository>>,
    book_id: web::Path<BookId>,
) -> Result<HttpResponse, Error> {
    Ok(match books_repository.get_book(book_id.into_inner()).await {
        Ok(book) => HttpResponse::Ok().json(book),
        Err(BookRepositoryError::NotFound(_)) => {
            error_response(StatusCode::NOT_FOUND, "Book not found")
        }
        Err(err) => internal_error("Get book", err),
    })
}

#[api_v2_operation]
pub async fn search_books(
    books_repository: Data<Arc<dyn BookRepository>>,
    query: web::Query<SearchBooksQuery>,
) -> Result<HttpResponse, Error> {
    let SearchBooksQuery { title, category } = query.into_inner();
    Ok(match books_repository.search_books(title, category).await {
        Ok(books) => HttpResponse::Ok().json(books),
        Err(err) => internal_error("Search books", err),
    })
}

#[api_v2_operation]
pub async fn top_rated_books(
    books_repository: Data<Arc<dyn BookRepository>>,
    query: web::Query<TopRatedQuery>,
) -> Result<HttpResponse, Error> {
    let limit = query.limit.unwrap_or(DEFAULT_TOP_RATED_LIMIT);
    Ok(match books_repository.top_rated(limit.into()).await {
        Ok(books) => HttpResponse::Ok().json(books),
        Err(err) => internal_error("Top rated books", err),
    })
}

#[api_v2_operation]
pub async fn books_by_price_range(
    books_repository: Data<Arc<dyn BookRepository>>,
    query: web::Query<PriceRangeQuery>,
) -> Result<HttpResponse, Error> {
    let min_price = query.min_price.unwrap_or(Decimal::ZERO);
    if min_price < Decimal::ZERO {
        return Ok(error_response(
            StatusCode::BAD_REQUEST,
            "min_price must be greater than or equal to 0",
        ));
    }
    Ok(
        match books_repository
            .books_by_price_range(min_price, query.max_price)
            .await
        {
            Ok(books) => HttpResponse::Ok().json(books),
            Err(err) => internal_error("Books by price range", err),
        },
    )
}

#[api_v2_operation]
pub async fn categories(
    books_repository: Data<Arc<dyn BookRepository>>,
) -> Result<HttpResponse, Error> {
    Ok(match books_repository.categories().await {
        Ok(categories) => HttpResponse::Ok().json(categories),
        Err(err) => internal_error("Categories", err),
    })
}

#[api_v2_operation]
pub async fn stats_overview(
    books_repository: Data<Arc<dyn BookRepository>>,
) -> Result<HttpResponse, Error> {
    let overview = match books_repository.stats_overview().await {
        Ok(overview) => overview,
        Err(err) => return Ok(internal_error("Stats overview", err)),
    };
    Ok(match books_repository.category_stats().await {
        Ok(categories_stats) => {
            HttpResponse::Ok().json(StatsOverviewResponse::new(overview, categories_stats))
        }
        Err(err) => internal_error("Stats overview", err),
    })
}

#[api_v2_operation]
pub async fn stats_categories(
    books_repository: Data<Arc<dyn BookRepository>>,
) -> Result<HttpResponse, Error> {
    Ok(match books_repository.category_stats().await {
        Ok(stats) => HttpResponse::Ok().json(stats),
        Err(err) => internal_error("Category stats", err),
    })
}

#[api_v2_operation]
pub async fn register_user(
    auth_service: Data<AuthService>,
    credentials: web::Json<UserCredentials>,
) -> Result<HttpResponse, Error> {
    Ok(
        match auth_service
            .register(&credentials.username, &credentials.password)
            .await
        {
            Ok(user) => HttpResponse::Created().json(user),
            Err(AuthError::Conflict(_)) => {
                error_response(StatusCode::BAD_REQUEST, "Username already registered")
            }
            Err(err) => {
                tracing::error!("Register user failed {}", err);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        },
    )
}

#[api_v2_operation]
pub async fn login(
    auth_service: Data<AuthService>,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse, Error> {
    Ok(match auth_service.login(&form.username, &form.password).await {
        Ok(token) => HttpResponse::Ok().json(token),
        Err(AuthError::Unauthorized) => unauthorized("Incorrect username or password"),
        Err(err) => {
            tracing::error!("Login failed {}", err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    })
}

#[api_v2_operation]
pub async fn current_user(
    auth_service: Data<AuthService>,
    request: HttpRequest,
) -> Result<HttpResponse, Error> {
    let Some(token) = bearer_token(&request) else {
        return Ok(unauthorized("Not authenticated"));
    };
    Ok(match auth_service.current_user(token).await {
        Ok(user) => HttpResponse::Ok().json(user),
        Err(AuthError::Unauthorized) => unauthorized("Could not validate credentials"),
        Err(err) => {
            tracing::error!("Current user failed {}", err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    })
}
