//! DBLP table-of-contents parsing.
//!
//! Most venues are harvested through their DBLP index page, which lists one
//! `li.entry` per paper with the title, the authors and a drop-down whose
//! first link is the electronic edition (a PDF or a publisher landing page).

use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::debug;

use super::html::{absolutize, compile_static_selector, element_text, first_href};
use super::{HarvestError, ListingKey, PdfLocator, VenueId};
use crate::paper::{PaperRecord, PaperSource};

static CONFERENCE_ENTRY: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector("li.entry.inproceedings"));
static JOURNAL_ENTRY: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector("li.entry.article"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| compile_static_selector(".title"));
static EE_LINK: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector(".drop-down:first-child a"));
static AUTHOR: LazyLock<Selector> = LazyLock::new(|| {
    compile_static_selector(r#"[itemprop="author"] [itemprop="name"]"#)
});

/// Path of the DBLP index page below `https://dblp.org/db`.
pub(super) fn index_path(venue: VenueId, key: ListingKey) -> String {
    match key {
        ListingKey::Volume(volume) => format!("journals/{0}/{0}{volume}.html", venue.as_str()),
        ListingKey::Year(year) => {
            let (dir, stem) = conference_key(venue, year);
            let suffix = conference_suffix(venue, year);
            format!("conf/{dir}/{stem}{year}{suffix}.html")
        }
    }
}

fn conference_key(venue: VenueId, year: u16) -> (&'static str, &'static str) {
    match venue {
        VenueId::Atc => ("usenix", "usenix"),
        VenueId::Neurips if year <= 2019 => ("nips", "nips"),
        VenueId::Neurips => ("nips", "neurips"),
        other => (other.as_str(), other.as_str()),
    }
}

fn conference_suffix(venue: VenueId, year: u16) -> &'static str {
    match venue {
        VenueId::Atc if (1999..=2006).contains(&year) => "g",
        VenueId::Acl if year >= 2012 => "-1",
        VenueId::Emnlp if (2019..=2021).contains(&year) => "-1",
        VenueId::Naacl if (2018..=2019).contains(&year) => "-1",
        _ => "",
    }
}

/// Parses a DBLP index page into records.
///
/// Entries without a title or link are skipped. A page with entries of which
/// none parse is a layout error; a page with no entries is an empty listing.
pub(super) fn parse_index(
    html: &str,
    page_url: &str,
    venue: VenueId,
    key: ListingKey,
) -> Result<Vec<PaperRecord>, HarvestError> {
    let (year, volume, entry_selector) = match key {
        ListingKey::Year(year) => (Some(year), None, &*CONFERENCE_ENTRY),
        ListingKey::Volume(volume) => (None, Some(volume), &*JOURNAL_ENTRY),
    };
    let locator = PdfLocator::for_venue(venue, year);
    let document = Html::parse_document(html);

    let mut entries = 0usize;
    let mut records = Vec::new();
    for entry in document.select(entry_selector) {
        entries += 1;
        let title = entry
            .select(&TITLE)
            .next()
            .map(element_text)
            .filter(|title| !title.is_empty());
        let link = first_href(entry, &EE_LINK).and_then(|href| absolutize(page_url, href));

        let (Some(title), Some(link)) = (title, link) else {
            debug!(
                entry = entry.value().attr("id").unwrap_or("?"),
                "skipping DBLP entry without title or link"
            );
            continue;
        };

        let authors = entry.select(&AUTHOR).map(element_text).collect();
        records.push(
            PaperRecord::new(title, venue, PaperSource::from_link(link, locator))
                .with_year(year)
                .with_volume(volume)
                .with_authors(authors),
        );
    }

    if entries > 0 && records.is_empty() {
        return Err(HarvestError::parse(
            venue,
            page_url,
            format!("{entries} entries found but none had a title and link"),
        ));
    }
    Ok(records)
}
