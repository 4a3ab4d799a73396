//! Catalog traversal: page planning, record extraction and de-duplication.
//!
//! Requests are issued one at a time. A failing listing page is treated as empty and a
//! failing product page only skips that product, a failing sink ends the run.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use bookdata_repository::api::NewBook;
use bookdata_repository::books_repository::BookRepository;

use crate::catalog::{CatalogParser, CatalogSite, ListingPage, DEFAULT_TOTAL_PAGES};
use crate::error::IngestionError;
use crate::fetcher::CatalogFetcher;
use crate::scrape_state::ScrapeState;
use crate::sink::{CsvSink, RecordSink, StoreSink};

/// Pages requested on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSelector {
    All,
    Pages(Vec<i32>),
}

impl FromStr for PageSelector {
    type Err = IngestionError;

    /// Accepts `all` in any case or a comma separated list like `3,5,7` or `[4, 5, 6]`
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        trimmed
            .trim_start_matches('[')
            .trim_end_matches(']')
            .split(',')
            .map(|page| page.trim().parse())
            .collect::<Result<Vec<i32>, _>>()
            .map(Self::Pages)
            .map_err(|_| IngestionError::InvalidPageSelector(value.to_string()))
    }
}

/// Pages a run visits. Only a range ends early, on a page without books and without a next page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagePlan {
    Range { first: i32, last: i32 },
    List(Vec<i32>),
}

impl PagePlan {
    /// A range over the whole catalog starts again at the last page with known records,
    /// it may have been left half done
    pub fn new(selector: &PageSelector, last_known_page: i32, total_pages: i32) -> Self {
        match selector {
            PageSelector::All => Self::Range {
                first: if last_known_page > 0 { last_known_page } else { 1 },
                last: total_pages,
            },
            PageSelector::Pages(pages) => Self::List(pages.clone()),
        }
    }

    /// Pages in visiting order, a range is walked lazily since its end comes from the remote pager
    pub fn pages(&self) -> Box<dyn Iterator<Item = i32> + Send + '_> {
        match self {
            Self::Range { first, last } => Box::new(*first..=*last),
            Self::List(pages) => Box::new(pages.iter().copied()),
        }
    }

    fn stops_early(&self) -> bool {
        matches!(self, Self::Range { .. })
    }
}

impl fmt::Display for PagePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Range { first, last } => write!(f, "{} to {}", first, last),
            Self::List(pages) => write!(f, "{:?}", pages),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeReport {
    pub pages_visited: usize,
    pub records_captured: usize,
    pub duplicates_skipped: usize,
    pub items_failed: usize,
    pub stopped_early: bool,
}

pub struct Scraper<F> {
    fetcher: F,
    site: CatalogSite,
    parser: CatalogParser,
}

impl<F: CatalogFetcher> Scraper<F> {
    pub fn new(fetcher: F, site: CatalogSite) -> Result<Self, IngestionError> {
        Ok(Self {
            fetcher,
            site,
            parser: CatalogParser::new()?,
        })
    }

    /// Page count announced by the first catalog page, [`DEFAULT_TOTAL_PAGES`] if it can't be read
    pub async fn total_pages(&self) -> i32 {
        let total_pages = match self.fetcher.fetch_page(&self.site.page_url(1)).await {
            Ok(html) => self.parser.parse_total_pages(&html),
            Err(err) => {
                tracing::warn!("Failed to fetch the first catalog page {}", err);
                None
            }
        };
        match total_pages {
            Some(total_pages) => {
                tracing::info!("Catalog has {} pages", total_pages);
                total_pages
            }
            None => {
                tracing::warn!(
                    "Could not detect the number of catalog pages, using {}",
                    DEFAULT_TOTAL_PAGES
                );
                DEFAULT_TOTAL_PAGES
            }
        }
    }

    /// The catalog is only asked for its page count when every page is selected
    pub async fn plan(&self, selector: &PageSelector, last_known_page: i32) -> PagePlan {
        let total_pages = match selector {
            PageSelector::All => self.total_pages().await,
            PageSelector::Pages(_) => DEFAULT_TOTAL_PAGES,
        };
        PagePlan::new(selector, last_known_page, total_pages)
    }

    async fn listing(&self, page: i32) -> ListingPage {
        match self.fetcher.fetch_page(&self.site.page_url(page)).await {
            Ok(html) => self.parser.parse_listing(&html, &self.site),
            Err(err) => {
                tracing::warn!(
                    "Catalog page {} unavailable, it may be the end of the catalog {}",
                    page,
                    err
                );
                ListingPage::default()
            }
        }
    }

    async fn book(&self, url: &str, page: i32) -> Option<NewBook> {
        let html = match self.fetcher.fetch_page(url).await {
            Ok(html) => html,
            Err(err) => {
                tracing::error!("Failed to fetch book {} {}", url, err);
                return None;
            }
        };
        self.parser
            .parse_book(&html, &self.site, page)
            .map_err(|err| tracing::error!("Failed to parse book {} {}", url, err))
            .ok()
    }

    /// Visits the planned pages and writes every book with an unknown upc to the sink
    pub async fn run<S: RecordSink + ?Sized>(
        &self,
        plan: &PagePlan,
        state: &mut ScrapeState,
        sink: &mut S,
    ) -> Result<ScrapeReport, IngestionError> {
        tracing::info!("Scraping catalog pages {}", plan);
        let mut report = ScrapeReport::default();

        for page in plan.pages() {
            tracing::debug!("Processing catalog page {}", page);
            let listing = self.listing(page).await;
            report.pages_visited += 1;

            if listing.links.is_empty() && !listing.has_next && plan.stops_early() {
                tracing::info!("Reached the end of the catalog at page {}", page);
                report.stopped_early = true;
                break;
            }

            for link in &listing.links {
                let Some(book) = self.book(link, page).await else {
                    report.items_failed += 1;
                    continue;
                };
                if state.is_known(&book.upc) {
                    tracing::debug!("Page {}: skipping known book {}", page, book.book_name);
                    report.duplicates_skipped += 1;
                    continue;
                }
                sink.write(&book).await?;
                state.record(&book);
                report.records_captured += 1;
                tracing::info!("Page {}: captured {}", page, book.book_name);
            }
        }

        tracing::info!(
            "Scraping done, {} pages, {} books captured, {} known skipped, {} failed",
            report.pages_visited,
            report.records_captured,
            report.duplicates_skipped,
            report.items_failed
        );
        Ok(report)
    }
}

/// Scrapes into the dataset at `csv_path`. With `append` an existing dataset is continued,
/// otherwise it is replaced.
pub async fn scrape_to_csv<F: CatalogFetcher>(
    scraper: &Scraper<F>,
    selector: &PageSelector,
    csv_path: &Path,
    append: bool,
) -> Result<ScrapeReport, IngestionError> {
    let resume = append && csv_path.exists();
    if append && !resume {
        tracing::info!("No dataset at {}, starting from scratch", csv_path.display());
    }
    let (mut state, mut sink) = if resume {
        (ScrapeState::from_dataset(csv_path)?, CsvSink::append(csv_path)?)
    } else {
        (ScrapeState::default(), CsvSink::create(csv_path)?)
    };

    let plan = scraper.plan(selector, state.last_page()).await;
    let report = scraper.run(&plan, &mut state, &mut sink).await?;
    tracing::info!("Dataset saved in {}", csv_path.display());
    Ok(report)
}

/// Scrapes straight into the book repository, books already stored are always skipped.
/// With `resume` a whole catalog run starts at the highest stored source page.
pub async fn scrape_to_store<F: CatalogFetcher>(
    scraper: &Scraper<F>,
    selector: &PageSelector,
    books_repository: Arc<dyn BookRepository>,
    resume: bool,
) -> Result<ScrapeReport, IngestionError> {
    let mut state = ScrapeState::from_store(books_repository.as_ref()).await?;
    let last_known_page = if resume { state.last_page() } else { 0 };
    let plan = scraper.plan(selector, last_known_page).await;
    let mut sink = StoreSink::new(books_repository);
    scraper.run(&plan, &mut state, &mut sink).await
}
