//! Run configuration.
//!
//! A [`RunConfig`] is assembled once at startup (built-in defaults, then the
//! optional [`FileConfig`], then command-line flags), validated, and passed
//! by reference into [`crate::FetchClient::new`] and
//! [`crate::Scheduler::from_config`]. Nothing reads it from global state.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::download::DEFAULT_MAX_RETRIES;

/// Default directory for downloaded PDFs.
pub const DEFAULT_SAVE_DIR: &str = "./paper";

/// Default delay between two downloads on one worker slot, in seconds.
pub const DEFAULT_SLEEP_TIME_PER_PAPER: f64 = 2.0;

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Upper bound on parallel workers.
pub const MAX_WORKERS: usize = 32;

/// Worker count used by `--parallel` when none is configured is capped here.
pub const DEFAULT_PARALLEL_CAP: usize = 8;

/// Upper bound on the retry budget.
pub const MAX_RETRIES_LIMIT: u32 = 10;

const MAX_TIMEOUT_SECS: u64 = 3600;

/// Errors detected while building the run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A proxy URL could not be parsed or has an unsupported scheme.
    #[error("invalid {scheme} proxy '{value}': {reason}")]
    InvalidProxy {
        /// Which proxy setting (`http` or `https`).
        scheme: &'static str,
        /// The value as given.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Worker count out of range.
    #[error("invalid worker count {value}: expected 1..=32")]
    InvalidWorkers {
        /// The value as given.
        value: usize,
    },

    /// Timeout out of range.
    #[error("invalid timeout {value}s: expected 1..=3600")]
    InvalidTimeout {
        /// The value as given.
        value: u64,
    },

    /// Retry budget out of range.
    #[error("invalid max retries {value}: expected 0..=10")]
    InvalidRetries {
        /// The value as given.
        value: u32,
    },

    /// Negative or non-finite sleep time.
    #[error("invalid sleep time per paper {value}: expected a finite number >= 0")]
    InvalidSleep {
        /// The value as given.
        value: f64,
    },

    /// The config file could not be read.
    #[error("failed to read config file '{}': {source}", path.display())]
    ReadFile {
        /// Config file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML or has unknown keys.
    #[error("failed to parse config file '{}': {source}", path.display())]
    ParseFile {
        /// Config file path.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// The HTTP client could not be constructed from this configuration.
    #[error("failed to build HTTP client: {reason}")]
    HttpClient {
        /// Builder error text.
        reason: String,
    },
}

/// Immutable, validated settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    save_dir: PathBuf,
    sleep_per_paper: Duration,
    workers: usize,
    max_retries: u32,
    timeout: Duration,
    http_proxy: Option<Url>,
    https_proxy: Option<Url>,
}

impl RunConfig {
    /// Starts a builder with built-in defaults.
    #[must_use]
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }

    /// Destination directory for PDFs.
    #[must_use]
    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    /// Minimum delay between two downloads on one worker slot.
    #[must_use]
    pub fn sleep_per_paper(&self) -> Duration {
        self.sleep_per_paper
    }

    /// Concurrency bound (1 in sequential mode).
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Retries after the first attempt.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Proxy for `http://` requests.
    #[must_use]
    pub fn http_proxy(&self) -> Option<&Url> {
        self.http_proxy.as_ref()
    }

    /// Proxy for `https://` requests.
    #[must_use]
    pub fn https_proxy(&self) -> Option<&Url> {
        self.https_proxy.as_ref()
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from(DEFAULT_SAVE_DIR),
            sleep_per_paper: Duration::from_secs_f64(DEFAULT_SLEEP_TIME_PER_PAPER),
            workers: 1,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            http_proxy: None,
            https_proxy: None,
        }
    }
}

/// Collects raw settings and validates them into a [`RunConfig`].
///
/// Setters take raw values; all range and syntax checks happen in
/// [`RunConfigBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct RunConfigBuilder {
    save_dir: Option<PathBuf>,
    sleep_per_paper: Option<f64>,
    workers: Option<usize>,
    parallel: bool,
    max_retries: Option<u32>,
    timeout_secs: Option<u64>,
    http_proxy: Option<String>,
    https_proxy: Option<String>,
}

impl RunConfigBuilder {
    /// Sets the destination directory.
    #[must_use]
    pub fn save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = Some(dir.into());
        self
    }

    /// Sets the per-slot delay in seconds.
    #[must_use]
    pub fn sleep_per_paper_secs(mut self, secs: f64) -> Self {
        self.sleep_per_paper = Some(secs);
        self
    }

    /// Enables parallel mode.
    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the worker count used in parallel mode.
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Sets the retry budget.
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Sets the per-request timeout in seconds.
    #[must_use]
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Sets the HTTP proxy URL.
    #[must_use]
    pub fn http_proxy(mut self, url: impl Into<String>) -> Self {
        self.http_proxy = Some(url.into());
        self
    }

    /// Sets the HTTPS proxy URL.
    #[must_use]
    pub fn https_proxy(mut self, url: impl Into<String>) -> Self {
        self.https_proxy = Some(url.into());
        self
    }

    /// Fills every unset value from the config file.
    #[must_use]
    pub fn with_file_defaults(mut self, file: &FileConfig) -> Self {
        if self.save_dir.is_none() {
            self.save_dir.clone_from(&file.save_dir);
        }
        if self.sleep_per_paper.is_none() {
            self.sleep_per_paper = file.sleep_time_per_paper;
        }
        if self.workers.is_none() {
            self.workers = file.workers;
        }
        if self.max_retries.is_none() {
            self.max_retries = file.max_retries;
        }
        if self.timeout_secs.is_none() {
            self.timeout_secs = file.timeout_secs;
        }
        if self.http_proxy.is_none() {
            self.http_proxy.clone_from(&file.http_proxy);
        }
        if self.https_proxy.is_none() {
            self.https_proxy.clone_from(&file.https_proxy);
        }
        self
    }

    /// Validates the collected settings.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn build(self) -> Result<RunConfig, ConfigError> {
        let defaults = RunConfig::default();

        let sleep_secs = self.sleep_per_paper.unwrap_or(DEFAULT_SLEEP_TIME_PER_PAPER);
        let sleep_per_paper = Duration::try_from_secs_f64(sleep_secs)
            .map_err(|_| ConfigError::InvalidSleep { value: sleep_secs })?;

        let workers = if self.parallel {
            let workers = self.workers.unwrap_or_else(default_parallel_workers);
            if !(1..=MAX_WORKERS).contains(&workers) {
                return Err(ConfigError::InvalidWorkers { value: workers });
            }
            workers
        } else {
            1
        };

        let max_retries = self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES);
        if max_retries > MAX_RETRIES_LIMIT {
            return Err(ConfigError::InvalidRetries { value: max_retries });
        }

        let timeout_secs = self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if !(1..=MAX_TIMEOUT_SECS).contains(&timeout_secs) {
            return Err(ConfigError::InvalidTimeout {
                value: timeout_secs,
            });
        }

        Ok(RunConfig {
            save_dir: self.save_dir.unwrap_or(defaults.save_dir),
            sleep_per_paper,
            workers,
            max_retries,
            timeout: Duration::from_secs(timeout_secs),
            http_proxy: parse_proxy("http", self.http_proxy.as_deref())?,
            https_proxy: parse_proxy("https", self.https_proxy.as_deref())?,
        })
    }
}

/// `min(available_parallelism, 8)`, at least 1.
#[must_use]
pub fn default_parallel_workers() -> usize {
    std::thread::available_parallelism()
        .map_or(1, std::num::NonZeroUsize::get)
        .clamp(1, DEFAULT_PARALLEL_CAP)
}

fn parse_proxy(scheme: &'static str, raw: Option<&str>) -> Result<Option<Url>, ConfigError> {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    let invalid = |reason: String| ConfigError::InvalidProxy {
        scheme,
        value: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!(
            "unsupported scheme '{}', expected http or https",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(Some(url))
}

/// Optional TOML config file.
///
/// Every key is optional; unknown keys are rejected so typos surface.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Destination directory.
    pub save_dir: Option<PathBuf>,
    /// Per-slot delay in seconds.
    pub sleep_time_per_paper: Option<f64>,
    /// Retry budget.
    pub max_retries: Option<u32>,
    /// Parallel worker count.
    pub workers: Option<usize>,
    /// Per-request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// HTTP proxy URL.
    pub http_proxy: Option<String>,
    /// HTTPS proxy URL.
    pub https_proxy: Option<String>,
}

impl FileConfig {
    /// Resolves the default config path.
    ///
    /// Priority:
    /// 1. `$XDG_CONFIG_HOME/paper-downloader/config.toml`
    /// 2. `$HOME/.config/paper-downloader/config.toml`
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
            return Some(
                PathBuf::from(xdg_config_home)
                    .join("paper-downloader")
                    .join("config.toml"),
            );
        }

        let home = env_var_non_empty_os("HOME")?;
        Some(
            PathBuf::from(home)
                .join(".config")
                .join("paper-downloader")
                .join("config.toml"),
        )
    }

    /// Loads a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadFile`] or [`ConfigError::ParseFile`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw).map_err(|source| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads the file at the default path when it exists.
    ///
    /// # Errors
    ///
    /// Returns an error only when the file exists and cannot be loaded.
    pub fn load_default() -> Result<Option<Self>, ConfigError> {
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path).map(Some),
            _ => Ok(None),
        }
    }

    fn parse(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // ==================== Builder Tests ====================

    #[test]
    fn test_defaults() {
        let config = RunConfig::builder().build().unwrap();
        assert_eq!(config.save_dir(), Path::new("./paper"));
        assert_eq!(config.sleep_per_paper(), Duration::from_secs(2));
        assert_eq!(config.workers(), 1);
        assert_eq!(config.max_retries(), DEFAULT_MAX_RETRIES);
        assert!(config.http_proxy().is_none());
    }

    #[test]
    fn test_sequential_ignores_workers() {
        let config = RunConfig::builder().workers(6).build().unwrap();
        assert_eq!(config.workers(), 1);
    }

    #[test]
    fn test_parallel_uses_workers_or_default() {
        let config = RunConfig::builder().parallel(true).workers(6).build().unwrap();
        assert_eq!(config.workers(), 6);

        let config = RunConfig::builder().parallel(true).build().unwrap();
        assert!((1..=DEFAULT_PARALLEL_CAP).contains(&config.workers()));
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        assert!(matches!(
            RunConfig::builder().parallel(true).workers(0).build(),
            Err(ConfigError::InvalidWorkers { value: 0 })
        ));
        assert!(matches!(
            RunConfig::builder().parallel(true).workers(33).build(),
            Err(ConfigError::InvalidWorkers { value: 33 })
        ));
        assert!(matches!(
            RunConfig::builder().max_retries(11).build(),
            Err(ConfigError::InvalidRetries { value: 11 })
        ));
        assert!(matches!(
            RunConfig::builder().timeout_secs(0).build(),
            Err(ConfigError::InvalidTimeout { value: 0 })
        ));
        assert!(matches!(
            RunConfig::builder().sleep_per_paper_secs(-1.0).build(),
            Err(ConfigError::InvalidSleep { .. })
        ));
        assert!(matches!(
            RunConfig::builder().sleep_per_paper_secs(f64::NAN).build(),
            Err(ConfigError::InvalidSleep { .. })
        ));
    }

    #[test]
    fn test_zero_sleep_is_allowed() {
        let config = RunConfig::builder().sleep_per_paper_secs(0.0).build().unwrap();
        assert_eq!(config.sleep_per_paper(), Duration::ZERO);
    }

    // ==================== Proxy Tests ====================

    #[test]
    fn test_valid_proxies() {
        let config = RunConfig::builder()
            .http_proxy("http://127.0.0.1:8080")
            .https_proxy("http://proxy.local:3128")
            .build()
            .unwrap();
        assert_eq!(config.http_proxy().unwrap().port(), Some(8080));
        assert_eq!(config.https_proxy().unwrap().host_str(), Some("proxy.local"));
    }

    #[test]
    fn test_malformed_proxy_is_rejected() {
        let err = RunConfig::builder().http_proxy("not a url").build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidProxy { scheme: "http", .. }));

        let err = RunConfig::builder()
            .https_proxy("ftp://proxy:21")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("unsupported scheme 'ftp'"));
    }

    #[test]
    fn test_blank_proxy_is_unset() {
        let config = RunConfig::builder().http_proxy("  ").build().unwrap();
        assert!(config.http_proxy().is_none());
    }

    // ==================== File Config Tests ====================

    #[test]
    fn test_file_config_parse_and_layering() {
        let file = FileConfig::parse(
            r#"
save_dir = "/data/papers"
sleep_time_per_paper = 0.5
max_retries = 4
workers = 3
"#,
        )
        .unwrap();

        let config = RunConfig::builder()
            .max_retries(1)
            .parallel(true)
            .with_file_defaults(&file)
            .build()
            .unwrap();
        assert_eq!(config.save_dir(), Path::new("/data/papers"));
        assert_eq!(config.sleep_per_paper(), Duration::from_millis(500));
        assert_eq!(config.max_retries(), 1, "CLI value wins over file");
        assert_eq!(config.workers(), 3);
    }

    #[test]
    fn test_file_config_rejects_unknown_keys() {
        assert!(FileConfig::parse("concurrency = 4").is_err());
    }

    #[test]
    fn test_file_config_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "workers = \"many\"").unwrap();

        let err = FileConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseFile { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_file_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }
}
