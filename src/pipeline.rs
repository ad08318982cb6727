//! End-to-end run: harvest every requested venue, then download.

use std::sync::Arc;

use futures_util::{StreamExt, stream};
use tracing::{info, instrument};

use crate::config::RunConfig;
use crate::download::{ProgressSink, RunSummary, Scheduler, SchedulerError, StopSignal};
use crate::fetch::Fetch;
use crate::filter::PaperFilter;
use crate::venue::{PaperStream, QueryConstraints, VenueAdapter, VenueDescriptor};

/// What to harvest and which records to keep.
#[derive(Debug, Clone)]
pub struct HarvestRequest {
    /// Venues, harvested in this order.
    pub venues: Vec<&'static VenueDescriptor>,
    /// Year or volume passed to each venue's listing.
    pub constraints: QueryConstraints,
    /// Admission filter.
    pub filter: PaperFilter,
}

impl HarvestRequest {
    /// Builds a request whose filter also enforces the constraints.
    ///
    /// Listings are already scoped to one year or volume, but DBLP pages
    /// occasionally mix in companion volumes; the filter drops those.
    #[must_use]
    pub fn new(
        venues: Vec<&'static VenueDescriptor>,
        constraints: QueryConstraints,
        keyword: Option<&str>,
    ) -> Self {
        let mut filter = PaperFilter::new()
            .with_year(constraints.year)
            .with_volume(constraints.volume);
        if let Some(keyword) = keyword {
            filter = filter.with_keyword(keyword);
        }
        Self {
            venues,
            constraints,
            filter,
        }
    }
}

/// Concatenates the listings of `venues`, one venue after another.
///
/// A venue is not fetched until the previous venue's records have all been
/// pulled.
pub fn harvest_stream(
    venues: Vec<&'static VenueDescriptor>,
    constraints: QueryConstraints,
    fetcher: Arc<dyn Fetch>,
) -> PaperStream {
    stream::iter(venues)
        .flat_map(move |descriptor| {
            VenueAdapter::new(descriptor).list_papers(Arc::clone(&fetcher), constraints)
        })
        .boxed()
}

/// Harvests the requested venues and downloads the admitted papers.
///
/// # Errors
///
/// Returns a [`SchedulerError`] if the scheduler cannot be built or the save
/// directory cannot be created. Harvest and download failures are reported
/// in the [`RunSummary`].
#[instrument(skip_all, fields(venues = request.venues.len()))]
pub async fn harvest_and_download(
    config: &RunConfig,
    request: HarvestRequest,
    fetcher: Arc<dyn Fetch>,
    sink: Arc<dyn ProgressSink>,
    stop: StopSignal,
) -> Result<RunSummary, SchedulerError> {
    let scheduler = Scheduler::from_config(config, Arc::clone(&fetcher))?;
    info!(
        venues = ?request.venues.iter().map(|v| v.id.as_str()).collect::<Vec<_>>(),
        workers = scheduler.concurrency(),
        save_dir = %scheduler.save_dir().display(),
        "harvesting"
    );
    let records = harvest_stream(request.venues, request.constraints, fetcher);
    scheduler.run(records, &request.filter, sink, &stop).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::download::NullSink;
    use crate::fetch::{FetchError, FetchedBody};
    use crate::paper::{PaperRecord, PaperSource};
    use crate::venue::VenueId;

    struct NotFound;

    #[async_trait]
    impl Fetch for NotFound {
        async fn get(&self, url: &str) -> Result<FetchedBody, FetchError> {
            Err(FetchError::http_status(url, 404))
        }
    }

    #[test]
    fn test_request_filter_carries_constraints() {
        let request = HarvestRequest::new(
            vec![VenueId::Fast.descriptor()],
            QueryConstraints::year(2023),
            Some("cache"),
        );
        let source = PaperSource::Pdf {
            url: "https://x.org/a.pdf".to_string(),
        };
        let matching = PaperRecord::new("A Cache Story", VenueId::Fast, source.clone());
        assert!(request.filter.keep(&matching.clone().with_year(Some(2023))));
        assert!(!request.filter.keep(&matching.with_year(Some(2022))));
        assert!(!request.filter.keep(&PaperRecord::new("Kernels", VenueId::Fast, source)));
    }

    #[tokio::test]
    async fn test_every_failing_venue_is_reported() {
        let records = harvest_stream(
            vec![VenueId::Fast.descriptor(), VenueId::Osdi.descriptor()],
            QueryConstraints::year(2023),
            Arc::new(NotFound),
        );
        let items: Vec<_> = records.collect().await;
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(Result::is_err));
    }

    #[tokio::test]
    async fn test_harvest_and_download_with_failing_listing() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig::builder()
            .save_dir(dir.path())
            .sleep_per_paper_secs(0.0)
            .build()
            .unwrap();
        let request = HarvestRequest::new(
            vec![VenueId::Fast.descriptor()],
            QueryConstraints::year(2023),
            None,
        );

        let summary = harvest_and_download(
            &config,
            request,
            Arc::new(NotFound),
            Arc::new(NullSink),
            StopSignal::new(),
        )
        .await
        .unwrap();

        assert_eq!(summary.admitted(), 0);
        assert_eq!(summary.harvest_errors.len(), 1);
        assert_eq!(summary.harvest_errors[0].venue, VenueId::Fast);
        assert!(!summary.is_success());
    }
}
