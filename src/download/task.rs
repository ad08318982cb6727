//! One download task: a record bound to a destination path.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::filename::{slides_path, temp_path};
use super::retry::parse_retry_after;
use super::{DownloadResult, FailureCause, Outcome, SkipReason};
use crate::fetch::{Fetch, FetchError, FetchedBody};
use crate::paper::{PaperRecord, PaperSource};

/// Lifecycle of a [`DownloadTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Admitted, waiting for a worker slot.
    Pending,
    /// Holding a slot and fetching.
    Fetching,
    /// Terminal: written to disk.
    Completed,
    /// Terminal: gave up.
    Failed,
    /// Terminal: nothing fetched.
    Skipped,
}

/// A record bound to its destination and attempt counter.
///
/// Owned by the scheduler; consumed into a [`DownloadResult`] when it reaches
/// a terminal state.
#[derive(Debug)]
pub struct DownloadTask {
    record: PaperRecord,
    destination: PathBuf,
    attempts: u32,
    state: TaskState,
}

impl DownloadTask {
    /// Creates a pending task.
    #[must_use]
    pub fn new(record: PaperRecord, destination: PathBuf) -> Self {
        Self {
            record,
            destination,
            attempts: 0,
            state: TaskState::Pending,
        }
    }

    /// The record being downloaded.
    #[must_use]
    pub fn record(&self) -> &PaperRecord {
        &self.record
    }

    /// Destination path.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Attempts started so far.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Moves to `Fetching` and counts the attempt. Returns the attempt number.
    pub(crate) fn begin_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.state = TaskState::Fetching;
        self.attempts
    }

    /// Back to `Pending` while waiting out a backoff.
    pub(crate) fn requeue(&mut self) {
        self.state = TaskState::Pending;
    }

    pub(crate) fn complete(self, saved: Saved) -> DownloadResult {
        let Saved { bytes, slides } = saved;
        self.finish(TaskState::Completed, Outcome::Completed { bytes, slides })
    }

    pub(crate) fn fail(self, cause: FailureCause) -> DownloadResult {
        let attempts = self.attempts;
        self.finish(TaskState::Failed, Outcome::Failed { cause, attempts })
    }

    pub(crate) fn skip(self, reason: SkipReason) -> DownloadResult {
        self.finish(TaskState::Skipped, Outcome::Skipped { reason })
    }

    fn finish(mut self, state: TaskState, outcome: Outcome) -> DownloadResult {
        self.state = state;
        debug!(title = %self.record.title, state = ?self.state, attempts = self.attempts, "task finished");
        DownloadResult {
            venue: self.record.venue,
            title: self.record.title,
            source_url: self.record.source.url().to_string(),
            path: self.destination,
            outcome,
        }
    }
}

/// Returns `true` if `path` already holds a non-empty file.
pub(crate) async fn already_downloaded(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.is_file() && meta.len() > 0)
}

/// A failed attempt: its cause plus any server-requested delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AttemptError {
    pub(crate) cause: FailureCause,
    pub(crate) retry_after: Option<Duration>,
}

impl From<FailureCause> for AttemptError {
    fn from(cause: FailureCause) -> Self {
        Self {
            cause,
            retry_after: None,
        }
    }
}

impl From<FetchError> for AttemptError {
    fn from(error: FetchError) -> Self {
        let retry_after = match &error {
            FetchError::HttpStatus {
                retry_after: Some(value),
                ..
            } => parse_retry_after(value),
            _ => None,
        };
        Self {
            cause: FailureCause::from(&error),
            retry_after,
        }
    }
}

/// What a successful attempt put on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Saved {
    pub(crate) bytes: u64,
    pub(crate) slides: Option<PathBuf>,
}

/// Runs one attempt: fetch (resolving a landing page if needed), then write
/// the bytes atomically. A slide deck linked from the landing page is saved
/// next to the PDF on a best-effort basis.
pub(crate) async fn attempt_download(
    fetcher: &dyn Fetch,
    task: &DownloadTask,
) -> Result<Saved, AttemptError> {
    let (body, slides_url) = fetch_pdf(fetcher, &task.record.source).await?;
    if body.bytes.is_empty() {
        return Err(FailureCause::EmptyBody.into());
    }
    let bytes = persist_atomically(&task.destination, &body.bytes).await?;
    let slides = match slides_url {
        Some(url) => save_slides(fetcher, &task.destination, &url).await,
        None => None,
    };
    Ok(Saved { bytes, slides })
}

async fn fetch_pdf(
    fetcher: &dyn Fetch,
    source: &PaperSource,
) -> Result<(FetchedBody, Option<String>), AttemptError> {
    match source {
        PaperSource::Pdf { url } => Ok((fetcher.get(url).await?, None)),
        PaperSource::LandingPage { url, locator } => {
            let landing = fetcher.get(url).await?;
            if landing.is_pdf() {
                return Ok((landing, None));
            }
            let links = locator.links(&landing.text(), &landing.final_url);
            let pdf_url = links.pdf.ok_or_else(|| FailureCause::MissingPdfLink {
                landing_url: landing.final_url.clone(),
            })?;
            debug!(landing = %url, pdf = %pdf_url, locator = locator.name(), "resolved landing page");
            Ok((fetcher.get(&pdf_url).await?, links.slides))
        }
    }
}

/// Saves the slide deck beside `paper`. Failures are logged and yield
/// `None`; they never fail the paper itself.
async fn save_slides(fetcher: &dyn Fetch, paper: &Path, url: &str) -> Option<PathBuf> {
    let path = slides_path(paper, url);
    if already_downloaded(&path).await {
        return Some(path);
    }
    let body = match fetcher.get(url).await {
        Ok(body) if !body.bytes.is_empty() => body,
        Ok(_) => {
            warn!(%url, "slides response was empty");
            return None;
        }
        Err(error) => {
            warn!(%url, %error, "slides download failed");
            return None;
        }
    };
    match persist_atomically(&path, &body.bytes).await {
        Ok(_) => {
            debug!(%url, path = %path.display(), "saved slides");
            Some(path)
        }
        Err(cause) => {
            warn!(%url, %cause, "slides could not be written");
            None
        }
    }
}

/// Writes to a hidden temp file, then renames it over `destination`.
///
/// The temp file is removed when any step fails, so the final path only ever
/// holds a complete file.
async fn persist_atomically(destination: &Path, bytes: &[u8]) -> Result<u64, FailureCause> {
    let temp = temp_path(destination);
    match write_and_rename(&temp, destination, bytes).await {
        Ok(()) => Ok(bytes.len() as u64),
        Err(error) => {
            if let Err(cleanup) = fs::remove_file(&temp).await
                && cleanup.kind() != std::io::ErrorKind::NotFound
            {
                warn!(path = %temp.display(), error = %cleanup, "failed to remove temp file");
            }
            Err(FailureCause::Io {
                message: format!("{}: {error}", destination.display()),
            })
        }
    }
}

async fn write_and_rename(temp: &Path, destination: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(temp).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(temp, destination).await
}
