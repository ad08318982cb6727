//! Outbound HTTP for listing pages and PDF bytes.
//!
//! The [`Fetch`] trait is the seam between the pipeline and the network:
//! adapters and the scheduler only see `Arc<dyn Fetch>`, so tests substitute
//! in-memory or instrumented implementations for [`FetchClient`].

mod client;
mod error;

use std::borrow::Cow;

use async_trait::async_trait;

pub use client::FetchClient;
pub use error::FetchError;

use crate::paper::looks_like_pdf_url;

/// A successful (2xx) response, fully buffered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBody {
    /// HTTP status code.
    pub status: u16,
    /// URL after redirects; relative links are resolved against it.
    pub final_url: String,
    /// `Content-Type` header, if present.
    pub content_type: Option<String>,
    /// Response body.
    pub bytes: Vec<u8>,
}

impl FetchedBody {
    /// A 200 response with no content type, for in-memory fetchers.
    #[must_use]
    pub fn ok(final_url: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            final_url: final_url.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    /// Sets the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Returns `true` if the response is a PDF rather than an HTML page.
    ///
    /// Checks the content type, the `%PDF-` magic bytes, then the URL path.
    #[must_use]
    pub fn is_pdf(&self) -> bool {
        let by_type = self.content_type.as_deref().is_some_and(|value| {
            value
                .split(';')
                .next()
                .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/pdf"))
        });
        by_type || self.bytes.starts_with(b"%PDF-") || looks_like_pdf_url(&self.final_url)
    }
}

/// One GET request.
///
/// Implementations must not retry; retry policy lives in the scheduler.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetches `url`, returning the body of a successful response.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on network failure, timeout, invalid URL or a
    /// non-success status.
    async fn get(&self, url: &str) -> Result<FetchedBody, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_pdf_by_content_type_with_params() {
        let body = FetchedBody::ok("https://x.org/download?id=1", b"data".to_vec())
            .with_content_type("Application/PDF; charset=binary");
        assert!(body.is_pdf());
    }

    #[test]
    fn test_is_pdf_by_magic_bytes() {
        let body = FetchedBody::ok("https://x.org/download?id=1", b"%PDF-1.7\n".to_vec());
        assert!(body.is_pdf());
    }

    #[test]
    fn test_html_page_is_not_pdf() {
        let body = FetchedBody::ok("https://x.org/paper", b"<html></html>".to_vec())
            .with_content_type("text/html");
        assert!(!body.is_pdf());
    }

    #[test]
    fn test_text_is_lossy() {
        let body = FetchedBody::ok("https://x.org/", vec![b'o', b'k', 0xff]);
        assert_eq!(body.text(), "ok\u{fffd}");
    }
}
