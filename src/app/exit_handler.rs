//! Exit code logic for the paper-downloader process.
//!
//! Single responsibility: map a run summary to the process exit outcome.

use paper_downloader_core::RunSummary;

use crate::ProcessExit;

/// Success only when nothing failed, every listing was harvested and the run
/// was not interrupted.
pub(crate) fn determine_exit_outcome(summary: &RunSummary) -> ProcessExit {
    if summary.is_success() {
        ProcessExit::Success
    } else {
        ProcessExit::Failure
    }
}
