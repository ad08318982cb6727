//! PDF link locators for venue landing pages.
//!
//! DBLP entries usually link to a publisher landing page rather than to the
//! PDF itself. Each venue family has a short chain of CSS selectors that finds
//! the PDF link on such a page; the first selector that matches an `<a href>`
//! wins. USENIX and NDSS pages also link a slide deck, found the same way.

use scraper::{Html, Selector};
use tracing::debug;

use super::VenueId;
use super::html::{absolutize, anchor_href};

/// Ordered selector chain for finding a PDF link on a landing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfLocator {
    name: &'static str,
    selectors: &'static [&'static str],
    slides: Option<&'static str>,
}

impl Default for PdfLocator {
    fn default() -> Self {
        Self::GENERIC
    }
}

impl PdfLocator {
    /// USENIX presentation pages.
    pub const USENIX: Self = Self::new("usenix", &[".file a", r#"a[href$=".pdf"]"#])
        .with_slides(".usenix-schedule-slides a");
    /// NDSS paper pages.
    pub const NDSS: Self =
        Self::new("ndss", &[".pdf-button", r#"a[href$=".pdf"]"#]).with_slides(".button-slides");
    /// AAAI OJS article pages.
    pub const AAAI: Self = Self::new("aaai", &[".pdf"]);
    /// IJCAI proceedings pages.
    pub const IJCAI: Self = Self::new("ijcai", &[".btn-download:first-child"]);
    /// arXiv abstract pages.
    pub const ARXIV: Self = Self::new("arxiv", &[".download-pdf"]);
    /// `OpenReview` forum pages.
    pub const OPENREVIEW: Self = Self::new("openreview", &[r#"a[href^="/pdf"]"#]);
    /// `NeurIPS` proceedings pages.
    pub const NEURIPS: Self = Self::new("neurips", &[r#".col a[href$=".pdf"]"#]);
    /// ACL Anthology pages.
    pub const ACL_ANTHOLOGY: Self =
        Self::new("acl-anthology", &[".acl-paper-link-block .btn-primary"]);
    /// Any page with a link ending in `.pdf`.
    pub const GENERIC: Self = Self::new("generic", &[r#"a[href$=".pdf"]"#]);

    const fn new(name: &'static str, selectors: &'static [&'static str]) -> Self {
        Self {
            name,
            selectors,
            slides: None,
        }
    }

    const fn with_slides(mut self, css: &'static str) -> Self {
        self.slides = Some(css);
        self
    }

    /// The locator used for a venue's landing pages in a given year.
    #[must_use]
    pub fn for_venue(venue: VenueId, year: Option<u16>) -> Self {
        match venue {
            VenueId::Fast | VenueId::Osdi | VenueId::Atc | VenueId::Nsdi | VenueId::Uss => {
                Self::USENIX
            }
            VenueId::Ndss => Self::NDSS,
            VenueId::Aaai => Self::AAAI,
            VenueId::Ijcai => Self::IJCAI,
            VenueId::Iclr => match year {
                Some(year) if year <= 2016 => Self::ARXIV,
                _ => Self::OPENREVIEW,
            },
            VenueId::Icml => match year {
                Some(year) if year <= 2023 => Self::GENERIC,
                _ => Self::OPENREVIEW,
            },
            VenueId::Neurips => Self::NEURIPS,
            VenueId::Acl | VenueId::Emnlp | VenueId::Naacl => Self::ACL_ANTHOLOGY,
            VenueId::Cvpr
            | VenueId::Iccv
            | VenueId::Eccv
            | VenueId::Rss
            | VenueId::Pvldb
            | VenueId::Jmlr => Self::GENERIC,
        }
    }

    /// Short name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Finds the absolute PDF URL on a landing page.
    ///
    /// Relative links are resolved against `page_url`. Returns `None` when no
    /// selector in the chain matches an `<a href>`.
    #[must_use]
    pub fn locate(&self, html: &str, page_url: &str) -> Option<String> {
        self.links(html, page_url).pdf
    }

    /// Finds both the PDF link and, for venues that publish them, the slide
    /// deck link. The page is parsed once.
    #[must_use]
    pub fn links(&self, html: &str, page_url: &str) -> LandingLinks {
        let document = Html::parse_document(html);
        let pdf = self
            .selectors
            .iter()
            .find_map(|css| self.first_link(&document, css, page_url));
        let slides = self
            .slides
            .and_then(|css| self.first_link(&document, css, page_url));
        LandingLinks { pdf, slides }
    }

    fn first_link(&self, document: &Html, css: &str, page_url: &str) -> Option<String> {
        let Ok(selector) = Selector::parse(css) else {
            debug!(locator = self.name, css, "skipping unparseable selector");
            return None;
        };
        let url = document
            .select(&selector)
            .next()
            .and_then(anchor_href)
            .and_then(|href| absolutize(page_url, href))?;
        debug!(locator = self.name, css, %url, "located link");
        Some(url)
    }
}

/// Links found on one landing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LandingLinks {
    /// The paper PDF.
    pub pdf: Option<String>,
    /// The slide deck, if the venue publishes one.
    pub slides: Option<String>,
}
