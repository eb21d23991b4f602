//! Index page parsing
//!
//! The index page lists source feeds in tables like:
//!
//! ```html
//! <section>
//!   <table class="nodeTable">
//!     <tr><td class="nameColumn"><a href="/feeds/a.ics">a.ics</a></td><td>...</td></tr>
//!   </table>
//! </section>
//! ```
//!
//! Only tables whose class is exactly `nodeTable` are considered, and in each
//! row only the first cell whose class is exactly `nameColumn` is used.

use crate::pipeline::fetcher::SourceFetcher;
use crate::pipeline::SourceReference;
use crate::{CalproxyError, DecodeError};
use scraper::{ElementRef, Html, Selector};
use tokio_util::sync::CancellationToken;
use url::Url;

const TABLE_CLASS: &str = "nodeTable";
const NAME_CELL_CLASS: &str = "nameColumn";

/// Fetches the index page and extracts the source feed paths from it
///
/// Any failure is fatal to the call; a partial list is never returned.
pub async fn resolve_sources(
    fetcher: &SourceFetcher,
    base: &Url,
    cancel: &CancellationToken,
) -> Result<Vec<SourceReference>, CalproxyError> {
    let body = fetcher.fetch(base, cancel).await?;
    let html = std::str::from_utf8(&body)
        .map_err(|e| DecodeError::Markup(format!("index page is not valid UTF-8: {}", e)))?;

    let sources = parse_index(html)?;
    tracing::debug!(url = %base, sources = sources.len(), "Resolved index page");
    Ok(sources)
}

/// Extracts source feed paths from index page markup, in document order
///
/// # Example
///
/// ```
/// use calproxy::pipeline::parse_index;
///
/// let html = r#"<html><body><section><table class="nodeTable">
///   <tr><td class="nameColumn"><a href="/a.ics">a</a></td></tr>
/// </table></section></body></html>"#;
/// let sources = parse_index(html).unwrap();
/// assert_eq!(sources[0].as_str(), "/a.ics");
/// ```
pub fn parse_index(html: &str) -> Result<Vec<SourceReference>, DecodeError> {
    if html.trim().is_empty() {
        return Err(DecodeError::Markup("index page is empty".to_string()));
    }

    let document = Html::parse_document(html);
    let table_selector = selector("section > table")?;
    let link_selector = selector("a[href]")?;

    let mut sources = Vec::new();
    for table in document.select(&table_selector) {
        if table.value().attr("class") != Some(TABLE_CLASS) {
            continue;
        }

        for row in table_rows(table) {
            if let Some(source) = source_from_row(row, &link_selector) {
                sources.push(source);
            }
        }
    }

    Ok(sources)
}

fn selector(css: &str) -> Result<Selector, DecodeError> {
    Selector::parse(css).map_err(|e| DecodeError::Markup(format!("bad selector {}: {:?}", css, e)))
}

/// Rows of a table, including those the parser moved into row groups
///
/// Rows of nested tables are not included.
fn table_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in child_elements(table) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(
                child_elements(child).filter(|row| row.value().name() == "tr"),
            ),
            _ => {}
        }
    }
    rows
}

fn child_elements(element: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    element.children().filter_map(ElementRef::wrap)
}

/// Link target of the first name cell in a row
///
/// Cells after the first name cell are ignored even when the name cell has
/// no usable link.
fn source_from_row(row: ElementRef<'_>, link_selector: &Selector) -> Option<SourceReference> {
    let cell = child_elements(row).find(|cell| {
        cell.value().name() == "td" && cell.value().attr("class") == Some(NAME_CELL_CLASS)
    })?;

    let href = cell
        .select(link_selector)
        .next()
        .and_then(|link| link.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty());

    if href.is_none() {
        tracing::debug!("Name cell without a link, skipping row");
    }

    href.map(SourceReference::from)
}
