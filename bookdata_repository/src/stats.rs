//! Aggregations over book records.
//!
//! The in-memory repository computes everything here, the postgres repository pushes
//! the plain aggregates to the database and only uses [`median`] and [`average`].

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;

use crate::api::{
    Book, CategoryStats, PriceStats, PricedBook, ReviewedBook, StatsOverview,
};

/// Fractional digits of reported averages, same as prices
pub const AVERAGE_SCALE: u32 = 2;

/// Middle value of the sorted prices, mean of the two middle values for an even count.
/// Zero when there are no prices.
pub fn median(mut prices: Vec<Decimal>) -> Decimal {
    if prices.is_empty() {
        return Decimal::ZERO;
    }
    prices.sort_unstable();
    let middle = prices.len() / 2;
    if prices.len() % 2 == 1 {
        prices[middle]
    } else {
        (prices[middle - 1] + prices[middle]) / Decimal::from(2)
    }
}

/// Mean rounded to [`AVERAGE_SCALE`], zero for an empty set
pub fn average(total: Decimal, count: usize) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    (total / Decimal::from(count)).round_dp(AVERAGE_SCALE)
}

pub fn rating_histogram(ratings: impl IntoIterator<Item = i32>) -> BTreeMap<i32, i64> {
    let mut histogram = BTreeMap::new();
    for rating in ratings {
        *histogram.entry(rating).or_insert(0) += 1;
    }
    histogram
}

// First book for which no later book compares as strictly better
fn first_best<'a, F>(books: &'a [Book], compare: F) -> Option<&'a Book>
where
    F: Fn(&Book, &Book) -> Ordering,
{
    books.iter().fold(None, |best, book| match best {
        Some(current) if compare(book, current) != Ordering::Greater => Some(current),
        _ => Some(book),
    })
}

pub fn overview(books: &[Book]) -> StatsOverview {
    let total_price: Decimal = books.iter().map(|book| book.price).sum();
    let categories = books
        .iter()
        .map(|book| book.category.as_str())
        .collect::<std::collections::HashSet<_>>();

    let priced = |book: &Book| PricedBook {
        name: book.book_name.clone(),
        price: book.price,
    };

    StatsOverview {
        total_books: books.len() as i64,
        total_categories: categories.len() as i64,
        total_stock_quantity: books.iter().map(|book| book.quantity as i64).sum(),
        price_stats: PriceStats {
            average: average(total_price, books.len()),
            median: median(books.iter().map(|book| book.price).collect()),
            cheapest_book: first_best(books, |a, b| b.price.cmp(&a.price)).map(priced),
            most_expensive_book: first_best(books, |a, b| a.price.cmp(&b.price)).map(priced),
        },
        most_reviewed_book: first_best(books, |a, b| {
            a.number_of_reviews.cmp(&b.number_of_reviews)
        })
        .map(|book| ReviewedBook {
            name: book.book_name.clone(),
            reviews: book.number_of_reviews,
        }),
        rating_distribution: rating_histogram(books.iter().map(|book| book.rating)),
    }
}

/// Book count and average price of every category, in order of first appearance
pub fn per_category(books: &[Book]) -> Vec<CategoryStats> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut totals: Vec<(&str, usize, Decimal)> = Vec::new();

    for book in books {
        let position = *positions.entry(book.category.as_str()).or_insert_with(|| {
            totals.push((book.category.as_str(), 0, Decimal::ZERO));
            totals.len() - 1
        });
        let (_, count, total) = &mut totals[position];
        *count += 1;
        *total += book.price;
    }

    totals
        .into_iter()
        .map(|(category, count, total)| CategoryStats {
            category: category.to_string(),
            book_count: count as i64,
            average_price: average(total, count),
        })
        .collect()
}
