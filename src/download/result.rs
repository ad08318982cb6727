//! Terminal task outcomes and the run summary.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::fetch::FetchError;
use crate::venue::{HarvestError, VenueId};

/// Why a download failed, kept after the underlying error is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureCause {
    /// Connection-level failure.
    Network {
        /// Error text.
        message: String,
    },
    /// The request exceeded the configured timeout.
    Timeout,
    /// Non-success HTTP status.
    Http {
        /// Status code.
        status: u16,
    },
    /// The source URL is not a fetchable http(s) URL.
    InvalidUrl {
        /// The URL as recorded.
        url: String,
    },
    /// The landing page had no link matching the venue's locator.
    MissingPdfLink {
        /// Landing page URL.
        landing_url: String,
    },
    /// The server answered with an empty body.
    EmptyBody,
    /// Writing the file failed.
    Io {
        /// Error text.
        message: String,
    },
    /// The download task ended abnormally.
    Internal {
        /// Error text.
        message: String,
    },
}

impl From<&FetchError> for FailureCause {
    fn from(error: &FetchError) -> Self {
        match error {
            FetchError::Network { source, .. } => Self::Network {
                message: source.to_string(),
            },
            FetchError::Timeout { .. } => Self::Timeout,
            FetchError::HttpStatus { status, .. } => Self::Http { status: *status },
            FetchError::InvalidUrl { url } => Self::InvalidUrl { url: url.clone() },
        }
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network { message } => write!(f, "network error: {message}"),
            Self::Timeout => f.write_str("timed out"),
            Self::Http { status } => write!(f, "HTTP {status}"),
            Self::InvalidUrl { url } => write!(f, "invalid URL: {url}"),
            Self::MissingPdfLink { landing_url } => {
                write!(f, "no PDF link found on {landing_url}")
            }
            Self::EmptyBody => f.write_str("empty response body"),
            Self::Io { message } => write!(f, "write failed: {message}"),
            Self::Internal { message } => write!(f, "internal error: {message}"),
        }
    }
}

/// Why a task was resolved without downloading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The destination already holds a non-empty file.
    AlreadyExists,
    /// Another record in this run already claimed the same source URL.
    DuplicateUrl,
    /// Another record in this run already claimed the same destination path.
    PathClaimed,
    /// The run was stopped before the task's first attempt started.
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AlreadyExists => "already downloaded",
            Self::DuplicateUrl => "duplicate URL",
            Self::PathClaimed => "duplicate destination",
            Self::Cancelled => "cancelled",
        })
    }
}

/// Terminal state of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The PDF was written to the destination.
    Completed {
        /// Bytes written.
        bytes: u64,
        /// Slide deck saved next to the PDF, when the landing page had one.
        #[serde(skip_serializing_if = "Option::is_none")]
        slides: Option<PathBuf>,
    },
    /// Nothing was fetched.
    Skipped {
        /// Why.
        reason: SkipReason,
    },
    /// Every attempt failed, or a non-retryable failure occurred.
    Failed {
        /// Cause of the last attempt's failure.
        cause: FailureCause,
        /// Attempts made.
        attempts: u32,
    },
}

/// Terminal outcome of one task, as appended to the result log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadResult {
    /// Venue of the record.
    pub venue: VenueId,
    /// Paper title.
    pub title: String,
    /// Source URL from the listing.
    pub source_url: String,
    /// Destination path.
    pub path: PathBuf,
    /// What happened.
    pub outcome: Outcome,
}

impl DownloadResult {
    /// Returns `true` for [`Outcome::Completed`].
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, Outcome::Completed { .. })
    }

    /// Returns `true` for [`Outcome::Skipped`].
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, Outcome::Skipped { .. })
    }

    /// Returns `true` for [`Outcome::Failed`].
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, Outcome::Failed { .. })
    }
}

/// A venue whose listing could not be harvested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarvestFailure {
    /// Venue.
    pub venue: VenueId,
    /// Error text.
    pub message: String,
}

impl From<&HarvestError> for HarvestFailure {
    fn from(error: &HarvestError) -> Self {
        Self {
            venue: error.venue(),
            message: error.to_string(),
        }
    }
}

/// Append-only, completion-ordered result log shared by the download tasks.
#[derive(Debug, Default)]
pub(crate) struct ResultLog {
    entries: Mutex<Vec<DownloadResult>>,
}

impl ResultLog {
    pub(crate) fn push(&self, result: DownloadResult) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(result);
    }

    pub(crate) fn snapshot(&self) -> Vec<DownloadResult> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn into_entries(self) -> Vec<DownloadResult> {
        self.entries
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// One entry per admitted record, in completion order.
    pub results: Vec<DownloadResult>,
    /// Records dropped by the filter.
    pub filtered: usize,
    /// Venues whose harvest failed.
    pub harvest_errors: Vec<HarvestFailure>,
    /// The run was stopped before the listings were exhausted.
    pub cancelled: bool,
}

impl RunSummary {
    /// Records that became tasks.
    #[must_use]
    pub fn admitted(&self) -> usize {
        self.results.len()
    }

    /// Completed downloads.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.results.iter().filter(|r| r.is_completed()).count()
    }

    /// Skipped tasks.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.results.iter().filter(|r| r.is_skipped()).count()
    }

    /// Failed tasks.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.is_failed()).count()
    }

    /// Slide decks saved alongside completed papers.
    #[must_use]
    pub fn slides(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Completed { slides: Some(_), .. }))
            .count()
    }

    /// Failed results, in completion order.
    pub fn failures(&self) -> impl Iterator<Item = &DownloadResult> {
        self.results.iter().filter(|r| r.is_failed())
    }

    /// `true` when nothing failed, every venue was harvested and the run
    /// was not cancelled.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.harvest_errors.is_empty() && self.failed() == 0
    }
}
