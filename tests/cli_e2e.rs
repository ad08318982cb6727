//! End-to-end CLI tests for the paper-downloader binary.
//!
//! None of these reach the network: each one exits at startup or only
//! prints the catalog.

// `Command::cargo_bin` is deprecated in assert_cmd >=2.0.17 in favor of
// `cargo::cargo_bin_cmd!` macro. Suppressed until migration to the new API.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A command isolated from the user's config file and working directory.
fn paper_downloader(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("paper-downloader").unwrap();
    cmd.current_dir(temp.path())
        .env("XDG_CONFIG_HOME", temp.path().join("config"))
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(temp: &TempDir, contents: &str) {
    let dir = temp.path().join("config").join("paper-downloader");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), contents).unwrap();
}

#[test]
fn test_binary_help_displays_usage_and_exit_codes() {
    let temp = TempDir::new().unwrap();
    paper_downloader(&temp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--venue"))
        .stdout(predicate::str::contains("--sleep-time-per-paper"))
        .stdout(predicate::str::contains("Exit codes"));
}

#[test]
fn test_binary_version_displays_version() {
    let temp = TempDir::new().unwrap();
    paper_downloader(&temp)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_binary_list_venues_prints_catalog() {
    let temp = TempDir::new().unwrap();
    paper_downloader(&temp)
        .arg("--list-venues")
        .assert()
        .success()
        .stdout(predicate::str::contains("fast"))
        .stdout(predicate::str::contains("neurips"))
        .stdout(predicate::str::contains("jmlr"));
}

#[test]
fn test_binary_without_venue_is_usage_error() {
    let temp = TempDir::new().unwrap();
    paper_downloader(&temp)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--venue"));
}

#[test]
fn test_binary_missing_year_exits_two() {
    let temp = TempDir::new().unwrap();
    paper_downloader(&temp)
        .args(["--venue", "fast", "--log-file", "logs/run.log"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("pass --year"));

    let log = std::fs::read_to_string(temp.path().join("logs/run.log")).unwrap();
    assert!(!log.contains('\u{1b}'), "log file must not contain ANSI escapes");
}

#[test]
fn test_binary_missing_volume_for_journal_exits_two() {
    let temp = TempDir::new().unwrap();
    paper_downloader(&temp)
        .args(["--venue", "jmlr", "--year", "2023"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("pass --volume"));
}

#[test]
fn test_binary_unknown_venue_exits_two() {
    let temp = TempDir::new().unwrap();
    paper_downloader(&temp)
        .args(["--venue", "sosp", "--year", "2023"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown venue 'sosp'"));
}

#[test]
fn test_binary_malformed_proxy_exits_two() {
    let temp = TempDir::new().unwrap();
    paper_downloader(&temp)
        .args([
            "--venue",
            "fast",
            "--year",
            "2023",
            "--https-proxy",
            "ftp://proxy.invalid:21",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("https proxy"));

    assert!(!temp.path().join("paper").exists(), "no work before validation");
}

#[test]
fn test_binary_out_of_range_workers_exits_two() {
    let temp = TempDir::new().unwrap();
    paper_downloader(&temp)
        .args(["--venue", "fast", "--year", "2023", "--parallel", "--workers", "64"])
        .assert()
        .code(2);
}

#[test]
fn test_binary_config_file_unknown_key_exits_two() {
    let temp = TempDir::new().unwrap();
    write_config(&temp, "save_dir = \"papers\"\nthreads = 4\n");
    paper_downloader(&temp)
        .args(["--venue", "fast", "--year", "2023"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("config file"));
}

#[test]
fn test_binary_config_file_proxy_is_validated() {
    let temp = TempDir::new().unwrap();
    write_config(&temp, "http_proxy = \"not a url\"\n");
    paper_downloader(&temp)
        .args(["--venue", "fast", "--year", "2023"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("http proxy"));
}
