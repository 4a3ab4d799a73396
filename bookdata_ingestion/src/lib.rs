pub mod catalog;
pub mod dataset;
pub mod error;
pub mod fetcher;
pub mod loader;
pub mod scrape_state;
pub mod scraper;
pub mod sink;

#[cfg(test)]
mod test_pages;
