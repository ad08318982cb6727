//! The identifying User-Agent sent with every request.
//!
//! Listing pages and PDFs go out under the same stable header so venue
//! operators can recognize (and contact) the tool.

const TOOL_NAME: &str = "paper-downloader";

/// User-Agent for listing and PDF requests.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{TOOL_NAME}/{version} (academic-paper-harvester)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_carries_name_and_version() {
        let ua = default_user_agent();
        let version = ua
            .strip_prefix("paper-downloader/")
            .and_then(|rest| rest.split(' ').next());
        assert_eq!(version, Some(env!("CARGO_PKG_VERSION")));
        assert!(ua.ends_with("(academic-paper-harvester)"), "{ua}");
    }
}
