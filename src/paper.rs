//! Harvested paper records.
//!
//! A [`PaperRecord`] is the unit of work flowing from the venue adapters,
//! through the filter, into the download scheduler. Records are plain values:
//! they are created by an adapter and never mutated afterwards.

use serde::Serialize;
use url::Url;

use crate::venue::{PdfLocator, VenueId};

/// Where the PDF of a paper can be obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaperSource {
    /// The listing links the PDF directly.
    Pdf {
        /// Absolute PDF URL.
        url: String,
    },

    /// The listing links an HTML landing page; the PDF link is found on that
    /// page with the venue's locator when the download is attempted.
    LandingPage {
        /// Absolute landing page URL.
        url: String,
        /// Selector chain used to find the PDF link on the landing page.
        #[serde(skip)]
        locator: PdfLocator,
    },
}

impl PaperSource {
    /// Builds a source from a listing link.
    ///
    /// Links whose path ends in `.pdf` are taken as direct PDF links; anything
    /// else is a landing page resolved with `locator`.
    #[must_use]
    pub fn from_link(url: String, locator: PdfLocator) -> Self {
        if looks_like_pdf_url(&url) {
            Self::Pdf { url }
        } else {
            Self::LandingPage { url, locator }
        }
    }

    /// The URL recorded by the listing, PDF or landing page.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Pdf { url } | Self::LandingPage { url, .. } => url,
        }
    }
}

/// Returns `true` when the URL path ends in `.pdf` (case-insensitive).
#[must_use]
pub fn looks_like_pdf_url(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(url) => url.path().to_ascii_lowercase().ends_with(".pdf"),
        Err(_) => raw.to_ascii_lowercase().ends_with(".pdf"),
    }
}

/// Normalizes a URL for duplicate detection.
///
/// Scheme and host are lowercased by the URL parser and the fragment is
/// dropped. Unparseable input is compared verbatim after trimming.
#[must_use]
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => trimmed.to_string(),
    }
}

/// One paper discovered in a venue listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaperRecord {
    /// Paper title with surrounding whitespace and trailing period removed.
    pub title: String,
    /// Venue the record was harvested from.
    pub venue: VenueId,
    /// Publication year, for year-indexed venues.
    pub year: Option<u16>,
    /// Journal volume, for volume-indexed venues.
    pub volume: Option<u32>,
    /// PDF or landing page link.
    pub source: PaperSource,
    /// Author names in listing order, possibly empty.
    pub authors: Vec<String>,
}

impl PaperRecord {
    /// Creates a record with no authors.
    #[must_use]
    pub fn new(title: impl Into<String>, venue: VenueId, source: PaperSource) -> Self {
        Self {
            title: clean_title(&title.into()),
            venue,
            year: None,
            volume: None,
            source,
            authors: Vec::new(),
        }
    }

    /// Sets the publication year.
    #[must_use]
    pub fn with_year(mut self, year: Option<u16>) -> Self {
        self.year = year;
        self
    }

    /// Sets the journal volume.
    #[must_use]
    pub fn with_volume(mut self, volume: Option<u32>) -> Self {
        self.volume = volume;
        self
    }

    /// Sets the author list.
    #[must_use]
    pub fn with_authors(mut self, authors: Vec<String>) -> Self {
        self.authors = authors;
        self
    }

    /// The source URL used as the duplicate-detection key.
    #[must_use]
    pub fn source_url(&self) -> &str {
        self.source.url()
    }

    /// Two records are duplicates when they come from the same venue and
    /// point at the same source URL.
    #[must_use]
    pub fn is_duplicate_of(&self, other: &Self) -> bool {
        self.venue == other.venue
            && normalize_url(self.source_url()) == normalize_url(other.source_url())
    }
}

/// Collapses inner whitespace and strips a single trailing period.
fn clean_title(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.strip_suffix('.') {
        Some(stripped) => stripped.trim_end().to_string(),
        None => collapsed,
    }
}
