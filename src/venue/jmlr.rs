//! JMLR volume pages.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::debug;

use super::html::{absolutize, compile_static_selector, element_text, first_href, split_authors};
use super::{HarvestError, ListingKey, PdfLocator, VenueId};
use crate::paper::{PaperRecord, PaperSource};

static ENTRY: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("dl"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("dt"));
static AUTHORS: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("dd b i"));
static PDF_LINK: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector(r#"dd a[href$=".pdf"]"#));

/// Volume page URL, e.g. `https://jmlr.org/papers/v24/`.
pub(super) fn volume_url(base: &str, key: ListingKey) -> String {
    match key {
        ListingKey::Volume(volume) => format!("{base}/papers/v{volume}/"),
        ListingKey::Year(year) => format!("{base}/papers/v{year}/"),
    }
}

/// Parses a JMLR volume page. Each `dl` holds one paper.
pub(super) fn parse_volume(
    html: &str,
    page_url: &str,
    key: ListingKey,
) -> Result<Vec<PaperRecord>, HarvestError> {
    let volume = match key {
        ListingKey::Volume(volume) => Some(volume),
        ListingKey::Year(_) => None,
    };
    let document = Html::parse_document(html);

    let mut entries = 0usize;
    let mut records = Vec::new();
    for entry in document.select(&ENTRY) {
        let Some(title) = entry.select(&TITLE).next().map(element_text) else {
            continue;
        };
        entries += 1;

        let link = first_href(entry, &PDF_LINK).and_then(|href| absolutize(page_url, href));
        let Some(link) = link.filter(|_| !title.is_empty()) else {
            debug!(title = %title, "skipping JMLR entry without title or PDF link");
            continue;
        };

        let authors = entry
            .select(&AUTHORS)
            .next()
            .map(|el| split_authors(&element_text(el)))
            .unwrap_or_default();
        records.push(
            PaperRecord::new(
                title,
                VenueId::Jmlr,
                PaperSource::from_link(link, PdfLocator::GENERIC),
            )
            .with_volume(volume)
            .with_authors(authors),
        );
    }

    if entries > 0 && records.is_empty() {
        return Err(HarvestError::parse(
            VenueId::Jmlr,
            page_url,
            format!("{entries} papers found but none had a PDF link"),
        ));
    }
    Ok(records)
}
