//! HTML parsers for listing and company pages
//!
//! This module handles extracting:
//! - Pagination metadata from the block above the listings table
//! - Company identifiers from the listings table
//! - Attribute rows from a company detail table
//!
//! All functions are pure: they only read the parsed document.

use crate::config::PaginationRounding;
use crate::{ParseError, ParseResult};
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::collections::BTreeMap;

/// Marker preceding the company identifier in listing links
pub const COMPANY_PATH_MARKER: &str = "/companies/";

/// Separator inside the "listings shown" range, e.g. `1 - 25`
const RANGE_SEPARATOR: &str = " - ";

/// Page size and listing count read from the pagination block of page 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationInfo {
    /// Upper bound of the range shown on page 1
    pub listings_per_page: u32,

    /// Total number of listings on the site
    pub total_listings: u32,
}

impl PaginationInfo {
    /// Total listing pages, truncating a trailing partial page
    pub fn total_pages(&self) -> u32 {
        self.total_pages_with(PaginationRounding::Truncate)
    }

    /// Total listing pages under the given rounding policy
    pub fn total_pages_with(&self, rounding: PaginationRounding) -> u32 {
        match rounding {
            PaginationRounding::Truncate => self.total_listings / self.listings_per_page,
            PaginationRounding::Ceil => self.total_listings.div_ceil(self.listings_per_page),
        }
    }
}

/// A company record: attribute name to attribute text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CompanyRecord(BTreeMap<String, String>);

impl CompanyRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an attribute, replacing any earlier value under the same name
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CompanyRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// One row of a company detail table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyRow {
    /// The attribute cell's `id`, if it has one
    pub key: Option<String>,

    /// The attribute cell's text
    pub value: String,
}

/// Reads the pagination block of a listing page
///
/// Expects `div.pagination-page-info` holding exactly two `<b>` elements:
/// the range shown on this page (`1 - 25`) and the total listing count.
/// On page 1 the upper bound of the range equals the page size.
///
/// # Example
///
/// ```
/// use edgar_ripple::crawler::parse_pagination;
/// use scraper::Html;
///
/// let html = r#"<div class="pagination-page-info">Showing <b>1 - 25</b> of <b>237</b></div>"#;
/// let info = parse_pagination(&Html::parse_document(html)).unwrap();
/// assert_eq!(info.listings_per_page, 25);
/// assert_eq!(info.total_pages(), 9);
/// ```
pub fn parse_pagination(document: &Html) -> ParseResult<PaginationInfo> {
    let info_selector = selector("div.pagination-page-info");
    let bold_selector = selector("b");

    let block = document
        .select(&info_selector)
        .next()
        .ok_or(ParseError::MissingElement("div.pagination-page-info"))?;

    let numbers: Vec<String> = block.select(&bold_selector).map(element_text).collect();
    let [shown, total] = numbers.as_slice() else {
        return Err(ParseError::UnexpectedCount {
            element: "b",
            expected: 2,
            found: numbers.len(),
        });
    };

    let upper_bound = shown
        .split(RANGE_SEPARATOR)
        .nth(1)
        .ok_or_else(|| ParseError::MalformedRange(shown.clone()))?;

    let listings_per_page = parse_number(upper_bound)?;
    let total_listings = parse_number(total)?;

    if listings_per_page == 0 {
        return Err(ParseError::ZeroPageSize);
    }

    Ok(PaginationInfo {
        listings_per_page,
        total_listings,
    })
}

/// Extracts company identifiers from a listing page, in document order
///
/// Every anchor inside the first `<tbody>` contributes the part of its `href`
/// that follows `/companies/`.
///
/// # Example
///
/// ```
/// use edgar_ripple::crawler::extract_company_ids;
/// use scraper::Html;
///
/// let html = r#"<table><tbody>
///     <tr><td><a href="/companies/acme-corp">Acme</a></td></tr>
///     <tr><td><a href="/companies/globex">Globex</a></td></tr>
/// </tbody></table>"#;
/// let ids = extract_company_ids(&Html::parse_document(html)).unwrap();
/// assert_eq!(ids, vec!["acme-corp", "globex"]);
/// ```
pub fn extract_company_ids(document: &Html) -> ParseResult<Vec<String>> {
    let anchor_selector = selector("a");
    let body = first_table_body(document)?;

    body.select(&anchor_selector)
        .map(|anchor| -> ParseResult<String> {
            let href = anchor
                .value()
                .attr("href")
                .ok_or(ParseError::MissingAttribute {
                    element: "a",
                    attribute: "href",
                })?;
            company_id_from_href(href).map(str::to_string)
        })
        .collect()
}

/// Returns the path segment following `/companies/` in a link
///
/// The segment runs up to the next occurrence of the marker, if any.
pub fn company_id_from_href(href: &str) -> ParseResult<&str> {
    href.split(COMPANY_PATH_MARKER)
        .nth(1)
        .ok_or_else(|| ParseError::MissingMarker {
            href: href.to_string(),
            marker: COMPANY_PATH_MARKER,
        })
}

/// Parses the rows of a company detail table
///
/// The second cell of every row carries the attribute: its `id` names the
/// attribute and its text is the value. Rows are returned in document order.
pub fn parse_company_rows(document: &Html) -> ParseResult<Vec<CompanyRow>> {
    let row_selector = selector("tr");
    let cell_selector = selector("td");
    let body = first_table_body(document)?;

    body.select(&row_selector)
        .enumerate()
        .map(|(index, row)| -> ParseResult<CompanyRow> {
            let cells: Vec<ElementRef> = row.select(&cell_selector).collect();
            let cell = cells.get(1).ok_or(ParseError::TooFewCells {
                row: index,
                found: cells.len(),
            })?;

            Ok(CompanyRow {
                key: cell.value().attr("id").map(str::to_string),
                value: cell.text().collect(),
            })
        })
        .collect()
}

/// Builds a company record from a detail page
///
/// Rows whose attribute cell has no `id` are skipped.
///
/// # Example
///
/// ```
/// use edgar_ripple::crawler::extract_company_fields;
/// use scraper::Html;
///
/// let html = r#"<table><tbody>
///     <tr><td>Name</td><td id="company_name">Acme Corp</td></tr>
///     <tr><td>State</td><td id="state">NY</td></tr>
/// </tbody></table>"#;
/// let record = extract_company_fields(&Html::parse_document(html)).unwrap();
/// assert_eq!(record.get("company_name"), Some("Acme Corp"));
/// assert_eq!(record.get("state"), Some("NY"));
/// ```
pub fn extract_company_fields(document: &Html) -> ParseResult<CompanyRecord> {
    let mut record = CompanyRecord::new();

    for row in parse_company_rows(document)? {
        match row.key {
            Some(key) => record.insert(key, row.value),
            None => tracing::debug!("Skipping unnamed company attribute: {:?}", row.value),
        }
    }

    Ok(record)
}

/// Finds the first `<tbody>` in the document
fn first_table_body(document: &Html) -> ParseResult<ElementRef<'_>> {
    let body_selector = selector("tbody");
    document
        .select(&body_selector)
        .next()
        .ok_or(ParseError::MissingElement("tbody"))
}

/// Parses a decimal count, ignoring surrounding whitespace
fn parse_number(text: &str) -> ParseResult<u32> {
    text.trim()
        .parse()
        .map_err(|_| ParseError::MalformedNumber(text.to_string()))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// Compiles a selector from a literal known to be valid
fn selector(css: &'static str) -> Selector {
    Selector::parse(css).unwrap_or_else(|_| panic!("invalid built-in selector: {}", css))
}
