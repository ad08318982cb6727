//! Progress bar for download runs.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use paper_downloader_core::{Outcome, ProgressEvent, ProgressSink, TracingSink};

/// Drives an `indicatif` bar from scheduler events and forwards every event
/// to the log.
///
/// The bar's length grows as records are admitted, since the listing size is
/// unknown up front.
pub(crate) struct ProgressBarSink {
    bar: ProgressBar,
    log: TracingSink,
}

impl ProgressBarSink {
    pub(crate) fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self {
            bar,
            log: TracingSink,
        }
    }

    pub(crate) fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressSink for ProgressBarSink {
    fn on_event(&self, event: &ProgressEvent<'_>) {
        self.log.on_event(event);
        match event {
            ProgressEvent::Admitted { .. } => self.bar.inc_length(1),
            ProgressEvent::Started { record, attempt } => {
                if *attempt == 1 {
                    self.bar.set_message(record.title.clone());
                } else {
                    self.bar
                        .set_message(format!("{} (attempt {attempt})", record.title));
                }
            }
            ProgressEvent::Finished { result } => {
                self.bar.inc(1);
                if let Outcome::Failed { cause, .. } = &result.outcome {
                    self.bar
                        .println(format!("failed: [{}] {}: {cause}", result.venue, result.title));
                }
            }
            ProgressEvent::HarvestFailed { error } => {
                self.bar.println(format!("listing failed: {error}"));
            }
            ProgressEvent::Filtered { .. } | ProgressEvent::Retrying { .. } => {}
        }
    }
}
