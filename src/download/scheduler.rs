//! Bounded-concurrency download scheduler.
//!
//! The scheduler pulls records from a [`PaperStream`] one at a time, filters
//! them, turns the survivors into [`DownloadTask`]s and hands each task to a
//! Tokio task once a worker slot is free. Pulling is lazy: the stream is not
//! polled again until the previous record has a slot, so a slow pool applies
//! backpressure all the way to the venue listings.
//!
//! # Guarantees
//!
//! - At most `concurrency` fetches are in flight.
//! - Every admitted record produces exactly one [`DownloadResult`].
//! - No destination path and no normalized source URL is written twice in a
//!   run.
//! - A task makes at most `max_retries + 1` attempts.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::filename::destination_path;
use super::result::ResultLog;
use super::retry::{RetryDecision, RetryPolicy, classify_failure};
use super::slots::{SlotGuard, SlotPool};
use super::task::{DownloadTask, already_downloaded, attempt_download};
use super::{
    DownloadResult, FailureCause, HarvestFailure, Outcome, ProgressEvent, ProgressSink,
    RunSummary, SkipReason, StopSignal,
};
use crate::config::{MAX_WORKERS, RunConfig};
use crate::fetch::Fetch;
use crate::filter::PaperFilter;
use crate::paper::normalize_url;
use crate::venue::PaperStream;

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Error type for scheduler operations.
///
/// Per-task failures never surface here; they are recorded in the
/// [`RunSummary`].
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Invalid concurrency value provided.
    #[error("invalid concurrency value {value}: must be between 1 and 32")]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// The save directory could not be created.
    #[error("cannot create save directory {}: {source}", path.display())]
    SaveDir {
        /// Directory path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The slot pool was closed unexpectedly.
    #[error("worker slot pool closed unexpectedly")]
    SlotPoolClosed,
}

/// URLs and paths already claimed in this run.
#[derive(Debug, Default)]
struct Claims {
    urls: HashSet<String>,
    paths: HashSet<PathBuf>,
}

impl Claims {
    /// Claims both keys for a task, or reports which one is taken.
    fn claim(&mut self, source_url: &str, path: &Path) -> Result<(), SkipReason> {
        let url = normalize_url(source_url);
        if self.urls.contains(&url) {
            return Err(SkipReason::DuplicateUrl);
        }
        if self.paths.contains(path) {
            return Err(SkipReason::PathClaimed);
        }
        self.urls.insert(url);
        self.paths.insert(path.to_path_buf());
        Ok(())
    }
}

/// Everything a spawned task needs, shared across tasks.
struct TaskContext {
    fetcher: Arc<dyn Fetch>,
    slots: Arc<SlotPool>,
    retry_policy: RetryPolicy,
    sink: Arc<dyn ProgressSink>,
    stop: StopSignal,
    log: Arc<ResultLog>,
}

impl TaskContext {
    fn record(&self, result: DownloadResult) {
        self.sink.on_event(&ProgressEvent::Finished { result: &result });
        self.log.push(result);
    }
}

/// Downloads admitted records with bounded concurrency, pacing and retries.
pub struct Scheduler {
    slots: Arc<SlotPool>,
    retry_policy: RetryPolicy,
    save_dir: PathBuf,
    fetcher: Arc<dyn Fetch>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("concurrency", &self.slots.size())
            .field("spacing", &self.slots.spacing())
            .field("retry_policy", &self.retry_policy)
            .field("save_dir", &self.save_dir)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Creates a scheduler.
    ///
    /// # Arguments
    ///
    /// * `concurrency` - Worker slots (1-32)
    /// * `retry_policy` - Policy for retrying failed attempts
    /// * `spacing` - Minimum gap between two dispatches on the same slot
    /// * `save_dir` - Directory receiving the PDFs
    /// * `fetcher` - HTTP seam used for every request
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConcurrency`] if `concurrency` is out
    /// of range.
    #[instrument(level = "debug", skip(retry_policy, fetcher), fields(save_dir = %save_dir.display()))]
    pub fn new(
        concurrency: usize,
        retry_policy: RetryPolicy,
        spacing: Duration,
        save_dir: PathBuf,
        fetcher: Arc<dyn Fetch>,
    ) -> Result<Self, SchedulerError> {
        if !(MIN_CONCURRENCY..=MAX_WORKERS).contains(&concurrency) {
            return Err(SchedulerError::InvalidConcurrency { value: concurrency });
        }

        debug!(
            concurrency,
            max_attempts = retry_policy.max_attempts(),
            spacing_ms = spacing.as_millis(),
            "creating scheduler"
        );

        Ok(Self {
            slots: Arc::new(SlotPool::new(concurrency, spacing)),
            retry_policy,
            save_dir,
            fetcher,
        })
    }

    /// Creates a scheduler from a validated [`RunConfig`].
    ///
    /// # Errors
    ///
    /// Same as [`Scheduler::new`].
    pub fn from_config(config: &RunConfig, fetcher: Arc<dyn Fetch>) -> Result<Self, SchedulerError> {
        Self::new(
            config.workers(),
            RetryPolicy::with_max_retries(config.max_retries()),
            config.sleep_per_paper(),
            config.save_dir().to_path_buf(),
            fetcher,
        )
    }

    /// Overrides the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Configured number of worker slots.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.slots.size()
    }

    /// Directory receiving the PDFs.
    #[must_use]
    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    /// Drains `records`, downloading every record that passes `filter`.
    ///
    /// Returns once the stream is exhausted (or `stop` fires) and every
    /// spawned task has finished. Attempts already fetching when `stop` fires
    /// run to completion; nothing new starts afterwards, not even on a slot
    /// that is still pacing.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::SaveDir`] if the save directory cannot be
    /// created, or [`SchedulerError::SlotPoolClosed`] if the pool is closed.
    /// Individual download failures do NOT cause this method to error.
    #[instrument(skip_all, fields(save_dir = %self.save_dir.display(), concurrency = self.slots.size()))]
    pub async fn run(
        &self,
        mut records: PaperStream,
        filter: &PaperFilter,
        sink: Arc<dyn ProgressSink>,
        stop: &StopSignal,
    ) -> Result<RunSummary, SchedulerError> {
        tokio::fs::create_dir_all(&self.save_dir)
            .await
            .map_err(|source| SchedulerError::SaveDir {
                path: self.save_dir.clone(),
                source,
            })?;

        let context = Arc::new(TaskContext {
            fetcher: Arc::clone(&self.fetcher),
            slots: Arc::clone(&self.slots),
            retry_policy: self.retry_policy.clone(),
            sink,
            stop: stop.clone(),
            log: Arc::new(ResultLog::default()),
        });
        let mut claims = Claims::default();
        let mut handles: Vec<(JoinHandle<()>, DownloadResult)> = Vec::new();
        let mut summary = RunSummary::default();

        info!("starting run");

        loop {
            let next = tokio::select! {
                biased;
                () = stop.stopped() => {
                    summary.cancelled = true;
                    break;
                }
                next = records.next() => next,
            };
            let Some(item) = next else {
                break;
            };

            let record = match item {
                Ok(record) => record,
                Err(error) => {
                    context.sink.on_event(&ProgressEvent::HarvestFailed { error: &error });
                    summary.harvest_errors.push(HarvestFailure::from(&error));
                    continue;
                }
            };

            if !filter.keep(&record) {
                summary.filtered += 1;
                context.sink.on_event(&ProgressEvent::Filtered { record: &record });
                continue;
            }

            let destination = destination_path(&self.save_dir, &record);
            let task = DownloadTask::new(record, destination);
            context.sink.on_event(&ProgressEvent::Admitted {
                record: task.record(),
                path: task.destination(),
            });

            if let Err(reason) = claims.claim(task.record().source_url(), task.destination()) {
                context.record(task.skip(reason));
                continue;
            }
            if already_downloaded(task.destination()).await {
                context.record(task.skip(SkipReason::AlreadyExists));
                continue;
            }

            let guard = tokio::select! {
                biased;
                () = stop.stopped() => {
                    context.record(task.skip(SkipReason::Cancelled));
                    summary.cancelled = true;
                    break;
                }
                guard = self.slots.acquire() => guard?,
            };

            let fallback = panic_result(&task);
            let context = Arc::clone(&context);
            handles.push((
                tokio::spawn(async move {
                    let result = drive_task(&context, task, guard).await;
                    context.record(result);
                }),
                fallback,
            ));
        }

        debug!(task_count = handles.len(), "waiting for downloads to complete");

        for (handle, fallback) in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, title = %fallback.title, "download task panicked");
                context.record(fallback);
            }
        }

        summary.results = match Arc::try_unwrap(context) {
            Ok(context) => Arc::try_unwrap(context.log)
                .map(ResultLog::into_entries)
                .unwrap_or_else(|log| log.snapshot()),
            Err(context) => context.log.snapshot(),
        };

        info!(
            admitted = summary.admitted(),
            completed = summary.completed(),
            skipped = summary.skipped(),
            failed = summary.failed(),
            filtered = summary.filtered,
            harvest_errors = summary.harvest_errors.len(),
            cancelled = summary.cancelled,
            "run complete"
        );

        Ok(summary)
    }
}

/// Result recorded for a task whose Tokio task panicked.
fn panic_result(task: &DownloadTask) -> DownloadResult {
    DownloadResult {
        venue: task.record().venue,
        title: task.record().title.clone(),
        source_url: task.record().source_url().to_string(),
        path: task.destination().to_path_buf(),
        outcome: Outcome::Failed {
            cause: FailureCause::Internal {
                message: "download task panicked".to_string(),
            },
            attempts: 0,
        },
    }
}

/// Runs attempts until one succeeds, the retry budget is spent, or the run
/// is stopped.
///
/// The slot is held only for the attempt itself. A task waiting out its
/// backoff gives the slot back and queues for a new one. Stop is honoured
/// during pacing too: a task that never started ends `Skipped(Cancelled)`,
/// one that already failed ends `Failed` with its last cause.
#[instrument(skip_all, fields(title = %task.record().title, url = %task.record().source_url()))]
async fn drive_task(context: &TaskContext, mut task: DownloadTask, mut guard: SlotGuard) -> DownloadResult {
    let mut last_cause: Option<FailureCause> = None;
    loop {
        let stopped = tokio::select! {
            biased;
            () = context.stop.stopped() => true,
            () = guard.pace() => false,
        };
        if stopped {
            debug!(slot = guard.index(), "stopped while pacing");
            return match last_cause {
                Some(cause) => task.fail(cause),
                None => task.skip(SkipReason::Cancelled),
            };
        }

        let attempt = task.begin_attempt();
        debug!(attempt, slot = guard.index(), "attempting download");
        context.sink.on_event(&ProgressEvent::Started {
            record: task.record(),
            attempt,
        });

        let outcome = attempt_download(context.fetcher.as_ref(), &task).await;
        drop(guard);

        let error = match outcome {
            Ok(saved) => return task.complete(saved),
            Err(error) => error,
        };

        let RetryDecision::Retry {
            delay,
            attempt: next_attempt,
        } = context
            .retry_policy
            .should_retry(classify_failure(&error.cause), attempt)
        else {
            return task.fail(error.cause);
        };
        let delay = error.retry_after.map_or(delay, |server| server.max(delay));

        task.requeue();
        context.sink.on_event(&ProgressEvent::Retrying {
            record: task.record(),
            attempt: next_attempt,
            delay,
            cause: &error.cause,
        });
        let cause = error.cause;

        tokio::select! {
            biased;
            () = context.stop.stopped() => return task.fail(cause),
            () = tokio::time::sleep(delay) => {}
        }

        guard = tokio::select! {
            biased;
            () = context.stop.stopped() => return task.fail(cause),
            acquired = context.slots.acquire() => match acquired {
                Ok(guard) => guard,
                Err(e) => {
                    return task.fail(FailureCause::Internal {
                        message: e.to_string(),
                    });
                }
            },
        };
        last_cause = Some(cause);
    }
}
