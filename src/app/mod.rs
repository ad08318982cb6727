//! Application runtime: turns parsed arguments into one pipeline run.

pub(crate) mod exit_handler;
pub(crate) mod output;
pub(crate) mod progress;
pub(crate) mod terminal;

use std::io::{self, IsTerminal};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use paper_downloader_core::venue::{UnknownVenue, lookup};
use paper_downloader_core::{
    FetchClient, FileConfig, HarvestRequest, ProgressSink, QueryConstraints, RunConfig,
    StopSignal, TracingSink, VenueDescriptor, harvest_and_download,
};
use tracing::{debug, info, warn};

use crate::ProcessExit;
use crate::cli::Args;
use progress::ProgressBarSink;

pub(crate) async fn run() -> Result<ProcessExit> {
    let args = Args::parse();

    if args.list_venues {
        print!("{}", output::render_venue_list());
        return Ok(ProcessExit::Success);
    }

    let use_progress_bar = terminal::should_use_progress_bar(
        io::stderr().is_terminal(),
        args.quiet,
        terminal::is_dumb_terminal(),
    );
    terminal::init_tracing(args.default_log_level(), &args.log_file, use_progress_bar)?;
    debug!(?args, "CLI arguments parsed");

    let config = build_config(&args)?;
    let venues = resolve_venues(&args.venue)?;
    let constraints = QueryConstraints {
        year: args.year,
        volume: args.volume,
    };
    for venue in &venues {
        venue.check_constraints(&constraints)?;
    }

    let fetcher = Arc::new(FetchClient::new(&config)?);
    let request = HarvestRequest::new(venues, constraints, args.keyword.as_deref());

    let stop = StopSignal::new();
    let interrupt = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; finishing in-flight downloads");
            interrupt.stop();
        }
    });

    info!(save_dir = %config.save_dir().display(), workers = config.workers(), "paper-downloader starting");

    let progress_bar = use_progress_bar.then(|| Arc::new(ProgressBarSink::new()));
    let sink: Arc<dyn ProgressSink> = match &progress_bar {
        Some(bar) => Arc::clone(bar) as Arc<dyn ProgressSink>,
        None => Arc::new(TracingSink),
    };

    let summary = harvest_and_download(&config, request, fetcher, sink, stop).await?;

    if let Some(bar) = &progress_bar {
        bar.finish();
    }
    if !args.quiet {
        print!("{}", output::render_summary(&summary));
    }
    if let Some(path) = &args.summary_json {
        output::write_summary_json(path, &summary)?;
        info!(path = %path.display(), "wrote run summary");
    }

    Ok(exit_handler::determine_exit_outcome(&summary))
}

/// Layers CLI flags over the config file (explicit `--config`, else the
/// default location if it exists).
fn build_config(args: &Args) -> Result<RunConfig> {
    let file = match &args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => FileConfig::load_default()?,
    };

    let mut builder = RunConfig::builder().parallel(args.parallel);
    if let Some(dir) = &args.save_dir {
        builder = builder.save_dir(dir);
    }
    if let Some(secs) = args.sleep_time_per_paper {
        builder = builder.sleep_per_paper_secs(secs);
    }
    if let Some(workers) = args.workers {
        builder = builder.workers(usize::from(workers));
    }
    if let Some(retries) = args.max_retries {
        builder = builder.max_retries(retries);
    }
    if let Some(secs) = args.timeout {
        builder = builder.timeout_secs(secs);
    }
    if let Some(proxy) = &args.http_proxy {
        builder = builder.http_proxy(proxy);
    }
    if let Some(proxy) = &args.https_proxy {
        builder = builder.https_proxy(proxy);
    }
    if let Some(file) = &file {
        builder = builder.with_file_defaults(file);
    }
    builder.build().context("invalid configuration")
}

/// Maps names to descriptors, keeping first-seen order and dropping repeats.
fn resolve_venues(names: &[String]) -> Result<Vec<&'static VenueDescriptor>> {
    let mut venues: Vec<&'static VenueDescriptor> = Vec::with_capacity(names.len());
    for name in names.iter().filter(|n| !n.trim().is_empty()) {
        let descriptor = lookup(name).ok_or_else(|| UnknownVenue { name: name.clone() })?;
        if !venues.iter().any(|v| v.id == descriptor.id) {
            venues.push(descriptor);
        }
    }
    anyhow::ensure!(!venues.is_empty(), "no venue given; see --list-venues");
    Ok(venues)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use paper_downloader_core::VenueId;

    use super::*;

    #[test]
    fn test_resolve_venues_dedups_aliases() {
        let names = vec!["nips".to_string(), "NeurIPS".to_string(), "fast".to_string()];
        let venues = resolve_venues(&names).unwrap();
        let ids: Vec<_> = venues.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![VenueId::Neurips, VenueId::Fast]);
    }

    #[test]
    fn test_resolve_venues_rejects_unknown() {
        let err = resolve_venues(&["sosp".to_string()]).unwrap_err();
        assert!(err.to_string().contains("sosp"));
    }

    #[test]
    fn test_build_config_cli_over_defaults() {
        let args = Args::try_parse_from([
            "paper-downloader",
            "--venue",
            "fast",
            "--config",
            "/nonexistent/paper-downloader.toml",
        ])
        .unwrap();
        assert!(build_config(&args).is_err());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "max_retries = 5\nsave_dir = \"from-file\"\n").unwrap();
        let args = Args::try_parse_from([
            "paper-downloader",
            "--venue",
            "fast",
            "--save-dir",
            "from-cli",
            "--config",
            path.to_str().unwrap(),
        ])
        .unwrap();
        let config = build_config(&args).unwrap();
        assert_eq!(config.save_dir(), std::path::Path::new("from-cli"));
        assert_eq!(config.max_retries(), 5);
    }
}
