use std::path::PathBuf;

use bookdata_repository::books_repository::BookRepositoryError;

#[derive(thiserror::Error, Debug)]
pub enum IngestionError {
    #[error("Io failure {0}")]
    Io(#[from] std::io::Error),

    #[error("Csv failure {0}")]
    Csv(#[from] csv::Error),

    #[error("Repository failure {0}")]
    Repository(#[from] BookRepositoryError),

    #[error("Invalid page selector {0:?}, use 'all' or comma separated page numbers")]
    InvalidPageSelector(String),

    #[error("Dataset {0} not found")]
    DatasetNotFound(PathBuf),

    #[error("Invalid url {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to build http client {0}")]
    HttpClient(String),

    #[error("Catalog parser setup failure {0}")]
    Parser(#[from] ParseError),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Unexpected response status {0}")]
    Status(u16),

    #[error("Transport failure {0}")]
    Transport(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Missing element {0}")]
    MissingElement(&'static str),

    #[error("Missing product field {0}")]
    MissingField(&'static str),

    #[error("Malformed number {value:?} in {field}")]
    MalformedNumber { field: &'static str, value: String },

    #[error("Invalid pattern {0}")]
    Pattern(&'static str),
}

/// Dataset row value that doesn't convert to its column type
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid value {value:?} in column {column}")]
pub struct RowError {
    pub column: &'static str,
    pub value: String,
}
