//! CSV dataset shared by the scraper and the loader.
//!
//! The header row is always present, columns are in [`COLUMNS`] order and
//! availability is written as `True`/`False`.

use std::fs::{File, OpenOptions};
use std::ops::RangeInclusive;
use std::path::Path;
use std::str::FromStr;

use bookdata_repository::api::NewBook;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{IngestionError, RowError};

pub const DEFAULT_DATASET: &str = "books_data_detailed.csv";

pub const COLUMNS: [&str; 12] = [
    "upc",
    "book_name",
    "currency",
    "price",
    "quantity",
    "availability",
    "rating",
    "number_of_reviews",
    "category",
    "description",
    "image_url",
    "source_page",
];

/// One dataset line with every column kept as text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRow {
    pub upc: String,
    pub book_name: String,
    pub currency: String,
    pub price: String,
    pub quantity: String,
    pub availability: String,
    pub rating: String,
    pub number_of_reviews: String,
    pub category: String,
    pub description: String,
    pub image_url: String,
    pub source_page: String,
}

impl From<&NewBook> for DatasetRow {
    fn from(book: &NewBook) -> Self {
        Self {
            upc: book.upc.clone(),
            book_name: book.book_name.clone(),
            currency: book.currency.clone(),
            price: book.price.to_string(),
            quantity: book.quantity.to_string(),
            availability: if book.availability { "True" } else { "False" }.to_string(),
            rating: book.rating.to_string(),
            number_of_reviews: book.number_of_reviews.to_string(),
            category: book.category.clone(),
            description: book.description.clone().unwrap_or_default(),
            image_url: book.image_url.clone().unwrap_or_default(),
            source_page: book.source_page.to_string(),
        }
    }
}

fn parse_column<T: FromStr>(column: &'static str, value: &str) -> Result<T, RowError> {
    value.trim().parse().map_err(|_| RowError {
        column,
        value: value.to_string(),
    })
}

fn bounded(
    column: &'static str,
    value: &str,
    range: RangeInclusive<i32>,
) -> Result<i32, RowError> {
    let parsed = parse_column(column, value)?;
    if range.contains(&parsed) {
        Ok(parsed)
    } else {
        Err(RowError {
            column,
            value: value.to_string(),
        })
    }
}

fn required(column: &'static str, value: String) -> Result<String, RowError> {
    if value.trim().is_empty() {
        Err(RowError { column, value })
    } else {
        Ok(value)
    }
}

fn optional(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

impl DatasetRow {
    pub fn into_new_book(self) -> Result<NewBook, RowError> {
        Ok(NewBook {
            price: parse_column::<Decimal>("price", &self.price)?,
            quantity: bounded("quantity", &self.quantity, 0..=i32::MAX)?,
            availability: self.availability.trim().eq_ignore_ascii_case("true"),
            rating: bounded("rating", &self.rating, 0..=5)?,
            number_of_reviews: bounded(
                "number_of_reviews",
                &self.number_of_reviews,
                0..=i32::MAX,
            )?,
            source_page: parse_column("source_page", &self.source_page)?,
            upc: required("upc", self.upc)?,
            book_name: required("book_name", self.book_name)?,
            currency: self.currency,
            category: required("category", self.category)?,
            description: optional(self.description),
            image_url: optional(self.image_url),
        })
    }
}

/// Appends records to a dataset file, every record is flushed as soon as it is written
pub struct DatasetWriter {
    writer: csv::Writer<File>,
}

impl DatasetWriter {
    /// Truncates the dataset and writes the header row
    pub fn create(path: &Path) -> Result<Self, IngestionError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(File::create(path)?);
        writer.write_record(COLUMNS)?;
        writer.flush()?;
        Ok(Self { writer })
    }

    /// Continues an existing dataset, its header is assumed to be there
    pub fn append(path: &Path) -> Result<Self, IngestionError> {
        let file = OpenOptions::new().append(true).open(path)?;
        Ok(Self {
            writer: csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(file),
        })
    }

    pub fn write(&mut self, book: &NewBook) -> Result<(), IngestionError> {
        self.writer.serialize(DatasetRow::from(book))?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Rows of the dataset, a line that doesn't match the columns yields an error item
pub fn read_rows(
    path: &Path,
) -> Result<impl Iterator<Item = Result<DatasetRow, csv::Error>>, IngestionError> {
    Ok(csv::Reader::from_path(path)?.into_deserialize())
}
