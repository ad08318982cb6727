//! Progress reporting.
//!
//! A [`ProgressSink`] observes the run; it never drives control flow. Events
//! are delivered synchronously from the scheduler and its tasks, so sinks
//! must be cheap and must not block.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{DownloadResult, FailureCause, Outcome};
use crate::paper::PaperRecord;
use crate::venue::HarvestError;

/// One observable step of a run.
#[derive(Debug)]
pub enum ProgressEvent<'a> {
    /// A venue's harvest failed; its listing contributes no records.
    HarvestFailed {
        /// The harvest error.
        error: &'a HarvestError,
    },
    /// A record was dropped by the filter.
    Filtered {
        /// The dropped record.
        record: &'a PaperRecord,
    },
    /// A record became a download task.
    Admitted {
        /// The record.
        record: &'a PaperRecord,
        /// Its destination path.
        path: &'a Path,
    },
    /// A task began an attempt on a worker slot.
    Started {
        /// The record.
        record: &'a PaperRecord,
        /// Attempt number, 1-indexed.
        attempt: u32,
    },
    /// An attempt failed and will be retried after `delay`.
    Retrying {
        /// The record.
        record: &'a PaperRecord,
        /// The attempt that will run next.
        attempt: u32,
        /// Backoff before the next attempt.
        delay: Duration,
        /// Why the previous attempt failed.
        cause: &'a FailureCause,
    },
    /// A task reached its terminal state.
    Finished {
        /// The result appended to the log.
        result: &'a DownloadResult,
    },
}

/// Receiver of [`ProgressEvent`]s.
pub trait ProgressSink: Send + Sync {
    /// Handles one event.
    fn on_event(&self, event: &ProgressEvent<'_>);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_event(&self, _event: &ProgressEvent<'_>) {}
}

/// Logs every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn on_event(&self, event: &ProgressEvent<'_>) {
        match event {
            ProgressEvent::HarvestFailed { error } => {
                warn!(venue = %error.venue(), error = %error, "harvest failed");
            }
            ProgressEvent::Filtered { record } => {
                debug!(title = %record.title, "filtered out");
            }
            ProgressEvent::Admitted { record, path } => {
                debug!(title = %record.title, path = %path.display(), "admitted");
            }
            ProgressEvent::Started { record, attempt } => {
                debug!(title = %record.title, attempt, "downloading");
            }
            ProgressEvent::Retrying {
                record,
                attempt,
                delay,
                cause,
            } => {
                info!(
                    title = %record.title,
                    attempt,
                    delay_ms = delay.as_millis(),
                    %cause,
                    "retrying"
                );
            }
            ProgressEvent::Finished { result } => match &result.outcome {
                Outcome::Completed { bytes, slides } => {
                    info!(title = %result.title, bytes, path = %result.path.display(), "downloaded");
                    if let Some(slides) = slides {
                        info!(title = %result.title, path = %slides.display(), "saved slides");
                    }
                }
                Outcome::Skipped { reason } => {
                    info!(title = %result.title, %reason, "skipped");
                }
                Outcome::Failed { cause, attempts } => {
                    warn!(title = %result.title, %cause, attempts, "failed");
                }
            },
        }
    }
}
