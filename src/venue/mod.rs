//! Venue catalog and listing adapters.
//!
//! Every supported conference or journal has a static [`VenueDescriptor`] in
//! the registry. A [`VenueAdapter`] turns a descriptor plus query constraints
//! into a lazy [`PaperStream`] by fetching the venue's listing page and
//! parsing it with the sub-strategy the venue family shares:
//!
//! - [`ListingStrategy::Dblp`] - DBLP conference/journal index pages
//! - [`ListingStrategy::CvfOpenAccess`] - CVF open-access proceedings
//! - [`ListingStrategy::Ecva`] - ECVA proceedings with per-year sections
//! - [`ListingStrategy::Jmlr`] - JMLR volume pages
//!
//! Listing fetches are not retried. A failure ends that venue's stream with a
//! single [`HarvestError`] item.

mod dblp;
mod error;
mod html;
mod jmlr;
mod locator;
mod proceedings;
mod registry;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use futures_util::stream::{self, BoxStream, StreamExt};
use serde::Serialize;
use tracing::{info, instrument, warn};

pub use error::{HarvestError, UnknownVenue};
pub use locator::{LandingLinks, PdfLocator};
pub use registry::{all_venues, lookup};

use crate::fetch::Fetch;
use crate::paper::PaperRecord;

/// Lazy, single-pass sequence of harvested records.
pub type PaperStream = BoxStream<'static, Result<PaperRecord, HarvestError>>;

/// Identifier of a supported venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VenueId {
    Fast,
    Osdi,
    Atc,
    Nsdi,
    Uss,
    Ndss,
    Aaai,
    Ijcai,
    Cvpr,
    Iccv,
    Eccv,
    Iclr,
    Icml,
    Neurips,
    Acl,
    Emnlp,
    Naacl,
    Rss,
    Pvldb,
    Jmlr,
}

impl VenueId {
    /// Canonical lower-case identifier as accepted on the command line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Osdi => "osdi",
            Self::Atc => "atc",
            Self::Nsdi => "nsdi",
            Self::Uss => "uss",
            Self::Ndss => "ndss",
            Self::Aaai => "aaai",
            Self::Ijcai => "ijcai",
            Self::Cvpr => "cvpr",
            Self::Iccv => "iccv",
            Self::Eccv => "eccv",
            Self::Iclr => "iclr",
            Self::Icml => "icml",
            Self::Neurips => "neurips",
            Self::Acl => "acl",
            Self::Emnlp => "emnlp",
            Self::Naacl => "naacl",
            Self::Rss => "rss",
            Self::Pvldb => "pvldb",
            Self::Jmlr => "jmlr",
        }
    }

    /// The registry descriptor for this venue.
    #[must_use]
    pub fn descriptor(self) -> &'static VenueDescriptor {
        registry::descriptor(self)
    }
}

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VenueId {
    type Err = UnknownVenue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(s).map(|descriptor| descriptor.id).ok_or_else(|| UnknownVenue {
            name: s.to_string(),
        })
    }
}

/// How a venue's listings are partitioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryDimension {
    /// Conference proceedings, one listing per year.
    Year,
    /// Journal, one listing per volume.
    Volume,
}

impl fmt::Display for QueryDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Year => f.write_str("year"),
            Self::Volume => f.write_str("volume"),
        }
    }
}

/// Listing sub-strategy shared by a venue family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingStrategy {
    /// DBLP table of contents.
    Dblp,
    /// CVF open-access proceedings (CVPR, ICCV).
    CvfOpenAccess,
    /// ECVA proceedings page (ECCV).
    Ecva,
    /// JMLR volume page.
    Jmlr,
}

/// Static description of one venue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueDescriptor {
    /// Canonical identifier.
    pub id: VenueId,
    /// Human-readable name.
    pub name: &'static str,
    /// Listing partition.
    pub dimension: QueryDimension,
    /// Listing sub-strategy.
    pub strategy: ListingStrategy,
    /// Root URL the listing paths are built under.
    pub base_url: &'static str,
    /// First year the listing source covers, when limited.
    pub first_year: Option<u16>,
    /// Alternative identifiers accepted by [`lookup`].
    pub aliases: &'static [&'static str],
}

/// Resolved listing key for one harvest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListingKey {
    Year(u16),
    Volume(u32),
}

impl VenueDescriptor {
    /// Validates query constraints against this venue before any fetch.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::MissingConstraint`] when the venue's dimension
    /// is not supplied and [`HarvestError::UnsupportedQuery`] for years
    /// outside the venue's coverage.
    pub fn check_constraints(&self, constraints: &QueryConstraints) -> Result<(), HarvestError> {
        self.listing_key(constraints).map(|_| ())
    }

    pub(crate) fn listing_key(
        &self,
        constraints: &QueryConstraints,
    ) -> Result<ListingKey, HarvestError> {
        let missing = || HarvestError::MissingConstraint {
            venue: self.id,
            dimension: self.dimension,
        };
        match self.dimension {
            QueryDimension::Year => {
                let year = constraints.year.ok_or_else(missing)?;
                if let Some(first) = self.first_year
                    && year < first
                {
                    return Err(HarvestError::unsupported(
                        self.id,
                        format!("year {year} is before {first}, the first year covered"),
                    ));
                }
                Ok(ListingKey::Year(year))
            }
            QueryDimension::Volume => constraints
                .volume
                .map(ListingKey::Volume)
                .ok_or_else(missing),
        }
    }
}

/// Year/volume selection for one harvest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryConstraints {
    /// Year for year-indexed venues.
    pub year: Option<u16>,
    /// Volume for volume-indexed venues.
    pub volume: Option<u32>,
}

impl QueryConstraints {
    /// Constraints for a year-indexed venue.
    #[must_use]
    pub fn year(year: u16) -> Self {
        Self {
            year: Some(year),
            volume: None,
        }
    }

    /// Constraints for a volume-indexed venue.
    #[must_use]
    pub fn volume(volume: u32) -> Self {
        Self {
            year: None,
            volume: Some(volume),
        }
    }
}

/// Produces candidate records for one venue.
///
/// The adapter is a cheap value; each [`VenueAdapter::list_papers`] call
/// starts a fresh crawl.
#[derive(Debug, Clone)]
pub struct VenueAdapter {
    descriptor: &'static VenueDescriptor,
    base_url: String,
}

impl VenueAdapter {
    /// Creates the adapter for a registry descriptor.
    #[must_use]
    pub fn new(descriptor: &'static VenueDescriptor) -> Self {
        Self {
            descriptor,
            base_url: descriptor.base_url.to_string(),
        }
    }

    /// Overrides the listing root URL (for testing with mock servers).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// The descriptor this adapter harvests.
    #[must_use]
    pub fn descriptor(&self) -> &'static VenueDescriptor {
        self.descriptor
    }

    /// Builds the listing page URL for the given constraints.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`VenueDescriptor::check_constraints`].
    pub fn listing_url(&self, constraints: &QueryConstraints) -> Result<String, HarvestError> {
        let key = self.descriptor.listing_key(constraints)?;
        let base = &self.base_url;
        Ok(match self.descriptor.strategy {
            ListingStrategy::Dblp => format!("{base}/{}", dblp::index_path(self.descriptor.id, key)),
            ListingStrategy::CvfOpenAccess => proceedings::cvf_listing_url(base, self.descriptor.id, key),
            ListingStrategy::Ecva => format!("{base}/papers.php"),
            ListingStrategy::Jmlr => jmlr::volume_url(base, key),
        })
    }

    /// Lazily lists the venue's papers.
    ///
    /// Nothing is fetched until the stream is first polled. A harvest failure
    /// is yielded as the stream's only item.
    #[must_use]
    pub fn list_papers(&self, fetcher: Arc<dyn Fetch>, constraints: QueryConstraints) -> PaperStream {
        let adapter = self.clone();
        let harvest = async move { adapter.harvest(fetcher.as_ref(), constraints).await };
        stream::once(harvest)
            .flat_map(|outcome| match outcome {
                Ok(records) => stream::iter(records.into_iter().map(Ok)).left_stream(),
                Err(error) => stream::iter([Err(error)]).right_stream(),
            })
            .boxed()
    }

    #[instrument(skip(self, fetcher), fields(venue = %self.descriptor.id))]
    async fn harvest(
        &self,
        fetcher: &dyn Fetch,
        constraints: QueryConstraints,
    ) -> Result<Vec<PaperRecord>, HarvestError> {
        let id = self.descriptor.id;
        if self.descriptor.dimension == QueryDimension::Year && constraints.volume.is_some() {
            warn!("{id} is indexed by year; ignoring --volume for the listing");
        }
        if self.descriptor.dimension == QueryDimension::Volume && constraints.year.is_some() {
            warn!("{id} is indexed by volume; ignoring --year for the listing");
        }

        let url = self.listing_url(&constraints)?;
        let key = self.descriptor.listing_key(&constraints)?;
        info!(%url, "fetching listing page");
        let page = fetcher
            .get(&url)
            .await
            .map_err(|source| HarvestError::listing(id, url.as_str(), source))?;
        let body = page.text();

        let records = match self.descriptor.strategy {
            ListingStrategy::Dblp => dblp::parse_index(&body, &page.final_url, id, key)?,
            ListingStrategy::CvfOpenAccess => {
                proceedings::parse_cvf(&body, &page.final_url, id, key)?
            }
            ListingStrategy::Ecva => proceedings::parse_ecva(&body, &page.final_url, id, key)?,
            ListingStrategy::Jmlr => jmlr::parse_volume(&body, &page.final_url, key)?,
        };
        info!(count = records.len(), "parsed listing");
        Ok(records)
    }
}
