//! Layout of the books.toscrape.com catalog: where pages live and how records are read
//! out of listing and product pages.

use std::collections::HashMap;
use std::str::FromStr;

use bookdata_repository::api::NewBook;
use regex::Regex;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::ParseError;

pub const BASE_URL: &str = "https://books.toscrape.com/";

/// Page count used when the pager of the first catalog page can't be read
pub const DEFAULT_TOTAL_PAGES: i32 = 50;

/// Currency code of prices without a recognised symbol
pub const UNKNOWN_CURRENCY: &str = "N/A";

#[derive(Debug, Clone)]
pub struct CatalogSite {
    base: Url,
    catalogue: Url,
}

impl CatalogSite {
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        let base = Url::parse(base_url)?;
        let catalogue = base.join("catalogue/")?;
        Ok(Self { base, catalogue })
    }

    pub fn books_to_scrape() -> Result<Self, url::ParseError> {
        Self::new(BASE_URL)
    }

    pub fn page_url(&self, page: i32) -> String {
        format!("{}page-{}.html", self.catalogue, page)
    }

    fn resolve_link(&self, href: &str) -> Option<String> {
        self.catalogue.join(href).ok().map(String::from)
    }

    fn resolve_image(&self, src: &str) -> Option<String> {
        self.base
            .join(&src.replace("../../", ""))
            .ok()
            .map(String::from)
    }
}

/// Book links of a catalog page and whether the pager offers a next page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub links: Vec<String>,
    pub has_next: bool,
}

pub fn infer_currency(price_text: &str) -> &'static str {
    // "R$" contains "$" so it has to be checked first
    if price_text.contains("R$") {
        "BRL"
    } else if price_text.contains('£') {
        "GBP"
    } else if price_text.contains('$') {
        "USD"
    } else if price_text.contains('€') {
        "EUR"
    } else {
        UNKNOWN_CURRENCY
    }
}

/// Price from its display text, anything but digits and '.' is dropped.
/// Text that still isn't a number gives 0.00.
pub fn parse_price(price_text: &str) -> Decimal {
    let digits: String = price_text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    Decimal::from_str(&digits).unwrap_or_else(|_| Decimal::new(0, 2))
}

pub fn rating_from_class(class: &str) -> Option<i32> {
    match class {
        "One" => Some(1),
        "Two" => Some(2),
        "Three" => Some(3),
        "Four" => Some(4),
        "Five" => Some(5),
        _ => None,
    }
}

fn selector(css: &'static str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|_| ParseError::Pattern(css))
}

fn pattern(regex: &'static str) -> Result<Regex, ParseError> {
    Regex::new(regex).map_err(|_| ParseError::Pattern(regex))
}

fn text_of(element: ElementRef) -> String {
    element.text().collect()
}

pub struct CatalogParser {
    pager: Selector,
    pager_pattern: Regex,
    book_links: Selector,
    next_page: Selector,
    product_rows: Selector,
    header_cell: Selector,
    data_cell: Selector,
    title: Selector,
    description_marker: Selector,
    breadcrumb: Selector,
    star_rating: Selector,
    image: Selector,
    price: Selector,
    quantity_pattern: Regex,
}

impl CatalogParser {
    pub fn new() -> Result<Self, ParseError> {
        Ok(Self {
            pager: selector("li.current")?,
            pager_pattern: pattern(r"Page \d+ of (\d+)")?,
            book_links: selector("h3 > a")?,
            next_page: selector("li.next")?,
            product_rows: selector("table.table-striped tr")?,
            header_cell: selector("th")?,
            data_cell: selector("td")?,
            title: selector("h1")?,
            description_marker: selector("div#product_description")?,
            breadcrumb: selector("ul.breadcrumb li")?,
            star_rating: selector("p.star-rating")?,
            image: selector("div.item.active img")?,
            price: selector("p.price_color")?,
            quantity_pattern: pattern(r"\((\d+) available\)")?,
        })
    }

    /// Total page count from the "Page N of M" pager text
    pub fn parse_total_pages(&self, html: &str) -> Option<i32> {
        let document = Html::parse_document(html);
        let pager_text = text_of(document.select(&self.pager).next()?);
        self.pager_pattern
            .captures(pager_text.trim())?
            .get(1)?
            .as_str()
            .parse()
            .ok()
    }

    pub fn parse_listing(&self, html: &str, site: &CatalogSite) -> ListingPage {
        let document = Html::parse_document(html);
        let links = document
            .select(&self.book_links)
            .filter_map(|link| link.value().attr("href"))
            .filter_map(|href| {
                let resolved = site.resolve_link(href);
                if resolved.is_none() {
                    tracing::warn!("Skipping unresolvable book link {}", href);
                }
                resolved
            })
            .collect();
        ListingPage {
            links,
            has_next: document.select(&self.next_page).next().is_some(),
        }
    }

    fn product_information(&self, document: &Html) -> HashMap<String, String> {
        document
            .select(&self.product_rows)
            .filter_map(|row| {
                let header = row.select(&self.header_cell).next()?;
                let value = row.select(&self.data_cell).next()?;
                Some((text_of(header).trim().to_string(), text_of(value).trim().to_string()))
            })
            .collect()
    }

    /// Book record of a product page discovered on listing page `source_page`
    pub fn parse_book(
        &self,
        html: &str,
        site: &CatalogSite,
        source_page: i32,
    ) -> Result<NewBook, ParseError> {
        let document = Html::parse_document(html);
        let product_information = self.product_information(&document);

        let upc = product_information
            .get("UPC")
            .filter(|upc| !upc.is_empty())
            .cloned()
            .ok_or(ParseError::MissingField("UPC"))?;

        let quantity = product_information
            .get("Availability")
            .and_then(|availability| self.quantity_pattern.captures(availability))
            .and_then(|captures| captures[1].parse().ok())
            .unwrap_or(0);

        let number_of_reviews = match product_information.get("Number of reviews") {
            None => 0,
            Some(reviews) => reviews.parse().map_err(|_| ParseError::MalformedNumber {
                field: "Number of reviews",
                value: reviews.clone(),
            })?,
        };

        let book_name = text_of(
            document
                .select(&self.title)
                .next()
                .ok_or(ParseError::MissingElement("h1"))?,
        )
        .trim()
        .to_string();

        let description = document
            .select(&self.description_marker)
            .next()
            .and_then(|marker| {
                marker
                    .next_siblings()
                    .filter_map(ElementRef::wrap)
                    .find(|sibling| sibling.value().name() == "p")
            })
            .map(text_of)
            .unwrap_or_default();

        let category = document
            .select(&self.breadcrumb)
            .nth(2)
            .map(|entry| text_of(entry).trim().to_string())
            .filter(|category| !category.is_empty())
            .ok_or(ParseError::MissingElement("breadcrumb category"))?;

        let rating = document
            .select(&self.star_rating)
            .next()
            .and_then(|rating| rating.value().classes().find_map(rating_from_class))
            .unwrap_or(0);

        let image_url = document
            .select(&self.image)
            .next()
            .and_then(|image| image.value().attr("src"))
            .and_then(|src| site.resolve_image(src));

        let price_text = text_of(
            document
                .select(&self.price)
                .next()
                .ok_or(ParseError::MissingElement("price"))?,
        );

        Ok(NewBook {
            upc,
            book_name,
            currency: infer_currency(&price_text).to_string(),
            price: parse_price(&price_text),
            quantity,
            availability: quantity > 0,
            rating,
            number_of_reviews,
            category,
            description: Some(description),
            image_url,
            source_page,
        })
    }
}

#[cfg(test)]
mod catalog_tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use crate::catalog::{
        infer_currency, parse_price, CatalogParser, CatalogSite, ListingPage, UNKNOWN_CURRENCY,
    };
    use crate::error::ParseError;
    use crate::test_pages::{book_page, listing_page, BookPage};

    fn site() -> CatalogSite {
        CatalogSite::books_to_scrape().unwrap()
    }

    #[test]
    fn test_page_url() {
        assert_eq!(
            site().page_url(3),
            "https://books.toscrape.com/catalogue/page-3.html"
        );
    }

    #[test]
    fn test_currency_inference() {
        assert_eq!(infer_currency("£51.77"), "GBP");
        assert_eq!(infer_currency("R$ 10,00"), "BRL");
        assert_eq!(infer_currency("$10.00"), "USD");
        assert_eq!(infer_currency("€3.50"), "EUR");
        assert_eq!(infer_currency("51.77"), UNKNOWN_CURRENCY);
    }

    #[test]
    fn test_price_parsing() {
        assert_eq!(parse_price("£51.77"), Decimal::from_str("51.77").unwrap());
        assert_eq!(parse_price("Â£13.99"), Decimal::from_str("13.99").unwrap());
        assert_eq!(parse_price("free").to_string(), "0.00");
        assert_eq!(parse_price("1.2.3").to_string(), "0.00");
    }

    #[test]
    fn test_parse_total_pages() {
        let parser = CatalogParser::new().unwrap();
        let html = listing_page(&[], true, Some((1, 50)));
        assert_eq!(parser.parse_total_pages(&html), Some(50));
        assert_eq!(parser.parse_total_pages("<html></html>"), None);
    }

    #[test]
    fn test_parse_listing() {
        let parser = CatalogParser::new().unwrap();
        let html = listing_page(
            &["a-light-in-the-attic_1000/index.html", "soumission_998/index.html"],
            true,
            None,
        );
        assert_eq!(
            parser.parse_listing(&html, &site()),
            ListingPage {
                links: vec![
                    "https://books.toscrape.com/catalogue/a-light-in-the-attic_1000/index.html"
                        .to_string(),
                    "https://books.toscrape.com/catalogue/soumission_998/index.html".to_string(),
                ],
                has_next: true,
            }
        );

        let last = parser.parse_listing(&listing_page(&[], false, None), &site());
        assert!(last.links.is_empty());
        assert!(!last.has_next);
    }

    #[test]
    fn test_parse_book() {
        let parser = CatalogParser::new().unwrap();
        let html = book_page(&BookPage {
            upc: "a897fe39b1053632",
            name: "A Light in the Attic",
            price: "£51.77",
            ..BookPage::default()
        });

        let book = parser.parse_book(&html, &site(), 7).unwrap();

        assert_eq!(book.upc, "a897fe39b1053632");
        assert_eq!(book.book_name, "A Light in the Attic");
        assert_eq!(book.currency, "GBP");
        assert_eq!(book.price, Decimal::from_str("51.77").unwrap());
        assert_eq!(book.quantity, 22);
        assert!(book.availability);
        assert_eq!(book.rating, 3);
        assert_eq!(book.number_of_reviews, 0);
        assert_eq!(book.category, "Poetry");
        assert_eq!(book.description.as_deref(), Some("It's hard to imagine a world"));
        assert_eq!(
            book.image_url.as_deref(),
            Some("https://books.toscrape.com/media/cache/fe/72/fe72.jpg")
        );
        assert_eq!(book.source_page, 7);
    }

    #[test]
    fn test_parse_book_optional_parts() {
        let parser = CatalogParser::new().unwrap();
        let html = book_page(&BookPage {
            availability: "Out of stock",
            rating_class: "Zero",
            reviews: None,
            description: None,
            image: false,
            ..BookPage::default()
        });

        let book = parser.parse_book(&html, &site(), 1).unwrap();

        assert_eq!(book.quantity, 0);
        assert!(!book.availability);
        assert_eq!(book.rating, 0);
        assert_eq!(book.number_of_reviews, 0);
        assert_eq!(book.description.as_deref(), Some(""));
        assert_eq!(book.image_url, None);
    }

    #[test]
    fn test_parse_book_failures() {
        let parser = CatalogParser::new().unwrap();

        let no_upc = book_page(&BookPage {
            upc: "",
            ..BookPage::default()
        });
        assert_eq!(
            parser.parse_book(&no_upc, &site(), 1),
            Err(ParseError::MissingField("UPC"))
        );

        let bad_reviews = book_page(&BookPage {
            reviews: Some("many"),
            ..BookPage::default()
        });
        assert!(matches!(
            parser.parse_book(&bad_reviews, &site(), 1),
            Err(ParseError::MalformedNumber { .. })
        ));
    }
}
