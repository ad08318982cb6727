//! Open-access proceedings pages (CVF and ECVA).
//!
//! Both sites list papers as a definition list: a `dt.ptitle` followed by a
//! `dd` with the authors and a `dd` whose first link is the PDF. ECVA keeps
//! every year on one page, each in a `#content` block headed by a
//! `button.accordion` that names the year.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::html::{
    absolutize, compile_static_regex, compile_static_selector, element_text, first_href,
    split_authors,
};
use super::{HarvestError, ListingKey, PdfLocator, VenueId};
use crate::paper::{PaperRecord, PaperSource};

static PAPER_TITLE: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("dt.ptitle"));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("a"));
static YEAR_HEADER: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector("button.accordion"));
static YEAR_SECTION: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("#content"));
static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"\b(\d{4})\b"));

/// CVF listing URL, e.g. `https://openaccess.thecvf.com/CVPR2023?day=all`.
pub(super) fn cvf_listing_url(base: &str, venue: VenueId, key: ListingKey) -> String {
    let conference = venue.as_str().to_ascii_uppercase();
    match key {
        ListingKey::Year(year) => format!("{base}/{conference}{year}?day=all"),
        ListingKey::Volume(volume) => format!("{base}/{conference}{volume}?day=all"),
    }
}

/// Parses a CVF open-access "all days" page.
pub(super) fn parse_cvf(
    html: &str,
    page_url: &str,
    venue: VenueId,
    key: ListingKey,
) -> Result<Vec<PaperRecord>, HarvestError> {
    let year = year_of(key);
    let document = Html::parse_document(html);
    let (entries, records) = parse_title_list(document.root_element(), page_url, venue, year);
    check_parsed(venue, page_url, entries, records)
}

/// Parses the ECVA papers page, keeping only the requested year's section.
pub(super) fn parse_ecva(
    html: &str,
    page_url: &str,
    venue: VenueId,
    key: ListingKey,
) -> Result<Vec<PaperRecord>, HarvestError> {
    let year = year_of(key);
    let document = Html::parse_document(html);

    let headers: Vec<ElementRef<'_>> = document.select(&YEAR_HEADER).collect();
    let sections: Vec<ElementRef<'_>> = document.select(&YEAR_SECTION).collect();
    if headers.len() != sections.len() {
        return Err(HarvestError::parse(
            venue,
            page_url,
            format!(
                "{} year headers but {} paper sections",
                headers.len(),
                sections.len()
            ),
        ));
    }

    let wanted = headers.iter().position(|header| {
        let text = element_text(*header);
        YEAR_RE
            .captures(&text)
            .and_then(|caps| caps[1].parse::<u16>().ok())
            .is_some_and(|found| Some(found) == year)
    });
    let Some(index) = wanted else {
        warn!(venue = %venue, ?year, "no proceedings section for the requested year");
        return Ok(Vec::new());
    };

    let (entries, records) = parse_title_list(sections[index], page_url, venue, year);
    check_parsed(venue, page_url, entries, records)
}

fn year_of(key: ListingKey) -> Option<u16> {
    match key {
        ListingKey::Year(year) => Some(year),
        ListingKey::Volume(_) => None,
    }
}

/// Walks `dt.ptitle` entries under `scope`. Returns the number of entries
/// seen and the records that parsed.
fn parse_title_list(
    scope: ElementRef<'_>,
    page_url: &str,
    venue: VenueId,
    year: Option<u16>,
) -> (usize, Vec<PaperRecord>) {
    let locator = PdfLocator::for_venue(venue, year);
    let mut entries = 0usize;
    let mut records = Vec::new();

    for title_el in scope.select(&PAPER_TITLE) {
        entries += 1;
        let title = element_text(title_el);

        let mut details = title_el
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .take_while(|el| el.value().name() == "dd");
        let authors_dd = details.next();
        let links_dd = details.next();

        let link = links_dd
            .and_then(|dd| first_href(dd, &ANCHOR))
            .and_then(|href| absolutize(page_url, href));

        let Some(link) = link.filter(|_| !title.is_empty()) else {
            debug!(title = %title, "skipping proceedings entry without title or link");
            continue;
        };

        let authors = authors_dd
            .map(|dd| split_authors(&element_text(dd)))
            .unwrap_or_default();
        records.push(
            PaperRecord::new(title, venue, PaperSource::from_link(link, locator))
                .with_year(year)
                .with_authors(authors),
        );
    }

    (entries, records)
}

fn check_parsed(
    venue: VenueId,
    page_url: &str,
    entries: usize,
    records: Vec<PaperRecord>,
) -> Result<Vec<PaperRecord>, HarvestError> {
    if entries > 0 && records.is_empty() {
        return Err(HarvestError::parse(
            venue,
            page_url,
            format!("{entries} paper titles found but none had a PDF link"),
        ));
    }
    Ok(records)
}
