use std::net::TcpListener;
use std::panic::Location;

use wiremock::MockServer;

const REQUIRE_ENV: &str = "PAPER_DOWNLOADER_REQUIRE_SOCKET_TESTS";

fn required() -> bool {
    std::env::var(REQUIRE_ENV)
        .is_ok_and(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

/// Starts a wiremock server, or returns `None` when the sandbox forbids
/// binding localhost. Setting `PAPER_DOWNLOADER_REQUIRE_SOCKET_TESTS` turns
/// the skip into a failure.
#[track_caller]
pub fn start_mock_server_or_skip() -> impl std::future::Future<Output = Option<MockServer>> {
    let caller = Location::caller();
    let bindable = TcpListener::bind("127.0.0.1:0").is_ok();
    async move {
        if bindable {
            return Some(MockServer::start().await);
        }
        let note = format!(
            "localhost is not bindable ({}:{}), wiremock test cannot run",
            caller.file(),
            caller.line()
        );
        assert!(!required(), "{note}; unset {REQUIRE_ENV} to allow skipping");
        eprintln!("{note}; skipping");
        None
    }
}
