//! In-memory `Fetch` with scripted replies and in-flight instrumentation.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use paper_downloader_core::{Fetch, FetchError, FetchedBody};

#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum Reply {
    Pdf(Vec<u8>),
    Html(String),
    Status(u16),
}

impl Reply {
    fn into_result(self, url: &str) -> Result<FetchedBody, FetchError> {
        match self {
            Self::Pdf(bytes) => Ok(FetchedBody::ok(url, bytes).with_content_type("application/pdf")),
            Self::Html(html) => {
                Ok(FetchedBody::ok(url, html).with_content_type("text/html; charset=utf-8"))
            }
            Self::Status(status) => Err(FetchError::http_status(url, status)),
        }
    }
}

/// Replies are consumed per URL in order; the last one repeats. Unknown URLs
/// answer 404.
#[derive(Debug, Default)]
pub struct FakeFetch {
    routes: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<HashMap<String, usize>>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[allow(dead_code)]
impl FakeFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn route(self, url: &str, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), replies.into_iter().collect());
        self
    }

    pub fn pdf(self, url: &str) -> Self {
        let body = format!("%PDF-1.7 {url}").into_bytes();
        self.route(url, [Reply::Pdf(body)])
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_reply(&self, url: &str) -> Reply {
        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(url) {
            Some(replies) if replies.len() > 1 => replies.pop_front().unwrap(),
            Some(replies) => replies.front().cloned().unwrap_or(Reply::Status(404)),
            None => Reply::Status(404),
        }
    }
}

#[async_trait]
impl Fetch for FakeFetch {
    async fn get(&self, url: &str) -> Result<FetchedBody, FetchError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let reply = self.next_reply(url);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        reply.into_result(url)
    }
}
