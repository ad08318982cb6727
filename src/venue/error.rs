//! Error types for venue harvesting.

use thiserror::Error;

use super::{QueryDimension, VenueId};
use crate::fetch::FetchError;

/// Errors that abort the harvest of one venue.
///
/// Listing pages are never retried: a failure here means the venue is down or
/// its page layout changed, and the caller is told so instead of receiving a
/// silently truncated listing.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// The listing page could not be fetched.
    #[error("failed to fetch {venue} listing {url}: {source}")]
    Listing {
        /// Venue being harvested.
        venue: VenueId,
        /// Listing page URL.
        url: String,
        /// The underlying fetch failure.
        #[source]
        source: FetchError,
    },

    /// The listing page did not have the structure the adapter expects.
    #[error("unexpected {venue} listing layout at {url}: {reason}")]
    Parse {
        /// Venue being harvested.
        venue: VenueId,
        /// Listing page URL.
        url: String,
        /// What did not match.
        reason: String,
    },

    /// The venue is indexed by a dimension the query did not supply.
    #[error("{venue} is indexed by {dimension}; pass --{dimension}")]
    MissingConstraint {
        /// Venue being harvested.
        venue: VenueId,
        /// The required dimension.
        dimension: QueryDimension,
    },

    /// The venue cannot answer this query (e.g. a year before its coverage).
    #[error("unsupported query for {venue}: {reason}")]
    UnsupportedQuery {
        /// Venue being harvested.
        venue: VenueId,
        /// Why the query is rejected.
        reason: String,
    },
}

impl HarvestError {
    /// Creates a listing fetch error.
    pub fn listing(venue: VenueId, url: impl Into<String>, source: FetchError) -> Self {
        Self::Listing {
            venue,
            url: url.into(),
            source,
        }
    }

    /// Creates a layout mismatch error.
    pub fn parse(venue: VenueId, url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            venue,
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an unsupported query error.
    pub fn unsupported(venue: VenueId, reason: impl Into<String>) -> Self {
        Self::UnsupportedQuery {
            venue,
            reason: reason.into(),
        }
    }

    /// The venue whose harvest failed.
    #[must_use]
    pub fn venue(&self) -> VenueId {
        match self {
            Self::Listing { venue, .. }
            | Self::Parse { venue, .. }
            | Self::MissingConstraint { venue, .. }
            | Self::UnsupportedQuery { venue, .. } => *venue,
        }
    }
}

/// A venue name that is not in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown venue '{name}' (see --list-venues)")]
pub struct UnknownVenue {
    /// The name as given.
    pub name: String,
}
