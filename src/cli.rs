//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Bulk-download papers from academic venues.
///
/// Harvests the paper listing of one or more venues for a given year (or
/// journal volume), keeps the papers whose titles match --keyword, and
/// downloads their PDFs into --save-dir.
///
/// Exit codes: 0 = everything downloaded or skipped, 1 = some papers or
/// listings failed or the run was interrupted, 2 = invalid configuration.
#[derive(Parser, Debug)]
#[command(name = "paper-downloader")]
#[command(author, version, about)]
pub struct Args {
    /// Venue identifiers, comma separated (see --list-venues)
    #[arg(long, value_delimiter = ',', required_unless_present = "list_venues")]
    pub venue: Vec<String>,

    /// Destination directory for PDFs [default: ./paper]
    #[arg(long)]
    pub save_dir: Option<PathBuf>,

    /// Append-only log file
    #[arg(long, default_value = "paper-downloader.log")]
    pub log_file: PathBuf,

    /// Seconds each worker waits between two papers [default: 2]
    #[arg(long)]
    pub sleep_time_per_paper: Option<f64>,

    /// Title filter: a case-insensitive regex, or a literal if it is not a valid regex
    #[arg(long)]
    pub keyword: Option<String>,

    /// Year to harvest (year-indexed venues)
    #[arg(long)]
    pub year: Option<u16>,

    /// Volume to harvest (journals)
    #[arg(long)]
    pub volume: Option<u32>,

    /// Proxy for http:// requests
    #[arg(long)]
    pub http_proxy: Option<String>,

    /// Proxy for https:// requests
    #[arg(long)]
    pub https_proxy: Option<String>,

    /// Download with several workers instead of one
    #[arg(long)]
    pub parallel: bool,

    /// Worker count in parallel mode (1-32) [default: min(CPUs, 8)]
    #[arg(long, requires = "parallel", value_parser = clap::value_parser!(u8).range(1..=32))]
    pub workers: Option<u8>,

    /// Retries after a failed attempt (0-10) [default: 2]
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=10))]
    pub max_retries: Option<u32>,

    /// Per-request timeout in seconds (1-3600) [default: 60]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: Option<u64>,

    /// Config file [default: $XDG_CONFIG_HOME/paper-downloader/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the run summary as JSON to this path
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    /// Print the supported venues and exit
    #[arg(long)]
    pub list_venues: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    /// Default tracing level from -q/-v.
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }
}
