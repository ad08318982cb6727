//! Human-facing output: the venue catalog and the end-of-run summary.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use paper_downloader_core::venue::all_venues;
use paper_downloader_core::{Outcome, QueryDimension, RunSummary};

/// One line per venue: id, name, listing dimension and aliases.
pub(crate) fn render_venue_list() -> String {
    let mut out = String::new();
    for venue in all_venues() {
        let needs = match venue.dimension {
            QueryDimension::Year => "--year",
            QueryDimension::Volume => "--volume",
        };
        let _ = write!(out, "{:<8} {:<20} {needs:<9}", venue.id.as_str(), venue.name);
        if let Some(first) = venue.first_year {
            let _ = write!(out, " from {first}");
        }
        if !venue.aliases.is_empty() {
            let _ = write!(out, " (alias: {})", venue.aliases.join(", "));
        }
        out.push('\n');
    }
    out
}

pub(crate) fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Completed: {}  Skipped: {}  Failed: {}  Filtered out: {}",
        summary.completed(),
        summary.skipped(),
        summary.failed(),
        summary.filtered
    );
    if summary.slides() > 0 {
        let _ = writeln!(out, "Slide decks saved: {}", summary.slides());
    }

    if summary.failed() > 0 {
        out.push_str("\nFailed papers:\n");
        for result in summary.failures() {
            if let Outcome::Failed { cause, attempts } = &result.outcome {
                let _ = writeln!(
                    out,
                    "  [{}] {}: {cause} (after {attempts} attempt{})",
                    result.venue,
                    result.title,
                    if *attempts == 1 { "" } else { "s" }
                );
            }
        }
    }

    if !summary.harvest_errors.is_empty() {
        out.push_str("\nListings that could not be harvested:\n");
        for failure in &summary.harvest_errors {
            let _ = writeln!(out, "  [{}] {}", failure.venue, failure.message);
        }
    }

    if summary.cancelled {
        out.push_str("\nInterrupted. Run again to resume; finished papers are skipped.\n");
    }
    out
}

pub(crate) fn write_summary_json(path: &Path, summary: &RunSummary) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("cannot create directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(summary).context("cannot serialize run summary")?;
    fs::write(path, json).with_context(|| format!("cannot write summary to {}", path.display()))
}
