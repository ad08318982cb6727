//! Download scheduling: turning harvested records into files on disk.
//!
//! The [`Scheduler`] admits records from a venue stream, bounds how many
//! fetches run at once, spaces dispatches per worker slot and retries
//! failed attempts according to a [`RetryPolicy`]. Every admitted record
//! ends as exactly one [`DownloadResult`] in the [`RunSummary`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use paper_downloader_core::download::{Scheduler, StopSignal, TracingSink};
//! use paper_downloader_core::venue::{QueryConstraints, VenueAdapter, VenueId};
//! use paper_downloader_core::{FetchClient, PaperFilter, RunConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RunConfig::default();
//! let fetcher = Arc::new(FetchClient::new(&config)?);
//! let records = VenueAdapter::new(VenueId::Fast.descriptor())
//!     .list_papers(fetcher.clone(), QueryConstraints::year(2023));
//!
//! let scheduler = Scheduler::from_config(&config, fetcher)?;
//! let summary = scheduler
//!     .run(records, &PaperFilter::new(), Arc::new(TracingSink), &StopSignal::new())
//!     .await?;
//! println!("completed {}, failed {}", summary.completed(), summary.failed());
//! # Ok(())
//! # }
//! ```

mod filename;
mod result;
mod retry;
mod scheduler;
mod sink;
mod slots;
mod stop;
mod task;

pub use filename::{
    MAX_TITLE_BYTES, MAX_TITLE_CHARS, destination_name, destination_path, sanitize_title,
    slides_path, temp_path,
};
pub use result::{DownloadResult, FailureCause, HarvestFailure, Outcome, RunSummary, SkipReason};
pub use retry::{
    DEFAULT_MAX_RETRIES, FailureType, RetryDecision, RetryPolicy, classify_failure,
    parse_retry_after,
};
pub use scheduler::{Scheduler, SchedulerError};
pub use sink::{NullSink, ProgressEvent, ProgressSink, TracingSink};
pub use stop::StopSignal;
pub use task::{DownloadTask, TaskState};
