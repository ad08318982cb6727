//! Paper Downloader Core Library
//!
//! This library provides the harvest-and-download pipeline behind the
//! `paper-downloader` CLI: it crawls the paper listings of a fixed catalog of
//! conferences and journals, filters the candidates, and downloads the
//! matching PDFs under a bounded, paced and retrying scheduler.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`paper`] - The `PaperRecord` data model shared by every stage
//! - [`venue`] - Static venue registry and per-family listing adapters
//! - [`filter`] - Keyword/year/volume predicate applied to harvested records
//! - [`fetch`] - Outbound HTTP with proxy, timeout and header policy
//! - [`download`] - Concurrency-bounded, rate-limited, retrying download scheduler
//! - [`config`] - Immutable run configuration and optional config file
//! - [`pipeline`] - Glue that runs adapters, filter and scheduler as one call

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
pub mod fetch;
pub mod filter;
pub mod paper;
pub mod pipeline;
pub mod venue;

mod user_agent;

// Re-export commonly used types
pub use config::{ConfigError, FileConfig, RunConfig, RunConfigBuilder};
pub use download::{
    DEFAULT_MAX_RETRIES, DownloadResult, FailureCause, FailureType, NullSink, Outcome,
    ProgressEvent, ProgressSink, RetryDecision, RetryPolicy, RunSummary, Scheduler,
    SchedulerError, SkipReason, StopSignal, TracingSink, classify_failure,
};
pub use fetch::{Fetch, FetchClient, FetchError, FetchedBody};
pub use filter::{PaperFilter, TitlePattern};
pub use paper::{PaperRecord, PaperSource};
pub use pipeline::{HarvestRequest, harvest_and_download, harvest_stream};
pub use venue::{
    HarvestError, LandingLinks, PaperStream, PdfLocator, QueryConstraints, QueryDimension,
    VenueAdapter, VenueDescriptor, VenueId,
};
