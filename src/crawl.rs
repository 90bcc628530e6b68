//! The crawl controller: fetch → extract → accumulate, page after page,
//! until the listing runs out or something breaks.
//!
//! # State machine
//!
//! A crawl moves through [`CrawlState`]s:
//! `Idle → (Fetching → Extracting → Accumulating → Delaying)* → Done | Failed`.
//! Fetch and parse failures abort the whole crawl and the accumulator is
//! discarded — a partial listing is worse than no update, so the repository
//! writer only ever sees a complete traversal.
//!
//! # Fetching
//!
//! All page loads go through the [`PageFetcher`] trait. The production
//! implementation, [`HttpFetcher`], wraps a `reqwest` client configured with
//! a browser User-Agent and a cookie store, and retries challenge-shaped
//! responses (403/429/503) with exponential backoff so cookie-based anti-bot
//! clearances get a chance to stick. Tests script the trait directly.
//!
//! # Pacing and safety
//!
//! Between pages the controller sleeps a jittered interval (1.5–3 s by
//! default) to respect the target site's rate limits. A configurable page
//! cap bounds runaway listings, and an optional cancellation channel is
//! honored at both suspension points (fetch and delay).

use crate::extract::{extract, ExtractionSchema, ParseError};
use crate::models::Publication;
use async_trait::async_trait;
use rand::{rng, Rng};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";
const FETCH_MAX_RETRIES: u32 = 3;
const FETCH_BASE_BACKOFF_MS: u64 = 2000;

/// Failure to load one page over the network.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (connect, TLS, timeout, body read).
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

impl FetchError {
    /// Statuses that usually mean an anti-bot challenge or throttling
    /// rather than a permanently broken page.
    fn is_challenge(&self) -> bool {
        matches!(
            self,
            FetchError::Status {
                status: 403 | 429 | 503,
                ..
            }
        )
    }
}

/// Why a crawl ended in `Failed` instead of `Done`.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("invalid crawl URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("crawl exceeded the {0}-page safety cap")]
    PageLimit(usize),
    #[error("crawl cancelled")]
    Cancelled,
}

/// Source of raw page bodies; the seam between the controller and the network.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` and return the response body as text.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Challenge-tolerant HTTP page fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher with a browser-like identity and a cookie store, so
    /// that clearance cookies issued by challenge pages survive the retry.
    pub fn new() -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .cookie_store(true)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }

    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt = 0u32;
        loop {
            match self.fetch_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_challenge() && attempt < FETCH_MAX_RETRIES => {
                    attempt += 1;
                    let backoff = Duration::from_millis(
                        FETCH_BASE_BACKOFF_MS * 2u64.pow(attempt - 1)
                            + rng().random_range(0..=250),
                    );
                    warn!(
                        %url,
                        attempt,
                        max = FETCH_MAX_RETRIES,
                        ?backoff,
                        error = %e,
                        "Challenge response; backing off before retry"
                    );
                    sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Pacing and safety knobs for one crawl.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Lower bound of the jittered inter-page delay.
    pub min_delay_ms: u64,
    /// Upper bound of the jittered inter-page delay.
    pub max_delay_ms: u64,
    /// Hard cap on pages per crawl; exceeding it is a failure, not `Done`.
    pub max_pages: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 1500,
            max_delay_ms: 3000,
            max_pages: 200,
        }
    }
}

/// Phases of one crawl, in the order they occur for each page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    Idle,
    Fetching,
    Extracting,
    Accumulating,
    Delaying,
    Done,
    Failed,
}

/// Drives repeated fetch→extract cycles over a paginated listing.
pub struct Crawler<F> {
    fetcher: F,
    schema: ExtractionSchema,
    config: CrawlConfig,
    cancel: Option<watch::Receiver<bool>>,
}

impl<F: PageFetcher> Crawler<F> {
    pub fn new(fetcher: F, schema: ExtractionSchema) -> Self {
        Self {
            fetcher,
            schema,
            config: CrawlConfig::default(),
            cancel: None,
        }
    }

    pub fn with_config(mut self, config: CrawlConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach a cancellation channel; sending `true` aborts the crawl at the
    /// next suspension point.
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Walk the listing from `base_url` + `start_path` to exhaustion.
    ///
    /// Returns every extracted record in page order, or the error that
    /// aborted the crawl. On error the accumulator is dropped: callers only
    /// persist complete traversals.
    #[instrument(level = "info", skip(self))]
    pub async fn run(
        &self,
        base_url: &str,
        start_path: &str,
    ) -> Result<Vec<Publication>, CrawlError> {
        let mut cancel = self.cancel.clone();
        let mut state = CrawlState::Idle;
        let mut accumulated: Vec<Publication> = Vec::new();

        let base = Url::parse(base_url)?;
        let mut current = base.join(start_path)?;
        let mut pages = 0usize;
        debug!(?state, seed = %current, "Crawl starting");

        loop {
            if let Some(rx) = &cancel {
                if *rx.borrow() {
                    state = CrawlState::Failed;
                    warn!(?state, pages, "Crawl cancelled before fetch");
                    return Err(CrawlError::Cancelled);
                }
            }
            if pages >= self.config.max_pages {
                state = CrawlState::Failed;
                error!(?state, pages, "Crawl exceeded page cap");
                return Err(CrawlError::PageLimit(self.config.max_pages));
            }
            pages += 1;

            state = CrawlState::Fetching;
            debug!(?state, url = %current, page = pages, "Fetching listing page");
            let fetched = match &mut cancel {
                Some(rx) => tokio::select! {
                    res = self.fetcher.fetch(current.as_str()) => res,
                    _ = cancelled(rx) => {
                        warn!(pages, "Crawl cancelled during fetch");
                        return Err(CrawlError::Cancelled);
                    }
                },
                None => self.fetcher.fetch(current.as_str()).await,
            };
            let html = match fetched {
                Ok(html) => html,
                Err(e) => {
                    state = CrawlState::Failed;
                    error!(?state, url = %current, error = %e, "Fetch failed; discarding partial crawl");
                    return Err(e.into());
                }
            };

            state = CrawlState::Extracting;
            let extracted = match extract(&html, &self.schema) {
                Ok(page) => page,
                Err(e) => {
                    state = CrawlState::Failed;
                    error!(?state, url = %current, error = %e, "Parse failed; discarding partial crawl");
                    return Err(e.into());
                }
            };

            state = CrawlState::Accumulating;
            debug!(
                ?state,
                new = extracted.publications.len(),
                total = accumulated.len() + extracted.publications.len(),
                "Accumulated page records"
            );
            accumulated.extend(extracted.publications);

            match extracted.next_page {
                Some(next) => {
                    // Resolve against the page we just fetched so both
                    // absolute-path and query-only hrefs work.
                    current = current.join(&next)?;
                    state = CrawlState::Delaying;
                    debug!(?state, next = %current, "Pausing before next page");
                    self.delay(&mut cancel).await?;
                }
                None => break,
            }
        }

        state = CrawlState::Done;
        info!(?state, pages, records = accumulated.len(), "Crawl finished");
        Ok(accumulated)
    }

    async fn delay(&self, cancel: &mut Option<watch::Receiver<bool>>) -> Result<(), CrawlError> {
        let ms = if self.config.max_delay_ms > self.config.min_delay_ms {
            rng().random_range(self.config.min_delay_ms..=self.config.max_delay_ms)
        } else {
            self.config.min_delay_ms
        };
        let pause = Duration::from_millis(ms);

        match cancel {
            Some(rx) => tokio::select! {
                _ = sleep(pause) => Ok(()),
                _ = cancelled(rx) => {
                    warn!("Crawl cancelled during inter-page delay");
                    Err(CrawlError::Cancelled)
                }
            },
            None => {
                sleep(pause).await;
                Ok(())
            }
        }
    }
}

/// Resolves when the channel observes `true`. If the sender is gone,
/// cancellation can never arrive and the future stays pending.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Serves a scripted sequence of page results and counts fetches.
    /// The counter handle survives moving the fetcher into a crawler.
    struct ScriptedFetcher {
        pages: Mutex<VecDeque<Result<String, FetchError>>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedFetcher {
        fn new(pages: Vec<Result<String, FetchError>>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let fetcher = Self {
                pages: Mutex::new(pages.into()),
                calls: Arc::clone(&calls),
            };
            (fetcher, calls)
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .expect("fetch called more times than scripted")
        }
    }

    fn listing_page(titles: &[&str], next: Option<&str>) -> String {
        let entries: String = titles
            .iter()
            .map(|t| {
                format!(
                    r#"<div class="result-container">
                         <h3 class="title"><a href="/pub/{t}">{t}</a></h3>
                         <a class="link person" href="/persons/x">X. Author</a>
                         <span class="date">2024</span>
                       </div>"#
                )
            })
            .collect();
        let next_link = next
            .map(|href| format!(r#"<a class="nextLink" href="{href}">Next ></a>"#))
            .unwrap_or_default();
        format!("<html><body>{entries}{next_link}</body></html>")
    }

    fn fast() -> CrawlConfig {
        CrawlConfig {
            min_delay_ms: 0,
            max_delay_ms: 0,
            max_pages: 200,
        }
    }

    fn status_error(status: u16) -> FetchError {
        FetchError::Status {
            url: "https://example.edu/en/publications/".to_string(),
            status,
        }
    }

    #[tokio::test]
    async fn test_three_page_crawl_accumulates_in_page_order() {
        let (fetcher, calls) = ScriptedFetcher::new(vec![
            Ok(listing_page(&["First", "Second"], Some("?page=1"))),
            Ok(listing_page(&["Third"], Some("?page=2"))),
            Ok(listing_page(&["Fourth"], None)),
        ]);

        let crawler =
            Crawler::new(fetcher, ExtractionSchema::default()).with_config(fast());
        let records = crawler
            .run("https://example.edu", "/en/publications/")
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let titles: Vec<&str> = records.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["First", "Second", "Third", "Fourth"]);
    }

    #[tokio::test]
    async fn test_fetch_failure_discards_accumulated_records() {
        let (fetcher, calls) = ScriptedFetcher::new(vec![
            Ok(listing_page(&["First"], Some("?page=1"))),
            Err(status_error(500)),
        ]);

        let crawler =
            Crawler::new(fetcher, ExtractionSchema::default()).with_config(fast());
        let err = crawler
            .run("https://example.edu", "/en/publications/")
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(matches!(
            err,
            CrawlError::Fetch(FetchError::Status { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_body_is_a_parse_failure() {
        let (fetcher, _calls) = ScriptedFetcher::new(vec![
            Ok(listing_page(&["First"], Some("?page=1"))),
            Ok(String::new()),
        ]);

        let crawler =
            Crawler::new(fetcher, ExtractionSchema::default()).with_config(fast());
        let err = crawler
            .run("https://example.edu", "/en/publications/")
            .await
            .unwrap_err();

        assert!(matches!(err, CrawlError::Parse(ParseError::EmptyDocument)));
    }

    #[tokio::test]
    async fn test_page_cap_stops_runaway_listing() {
        let (fetcher, calls) = ScriptedFetcher::new(vec![
            Ok(listing_page(&["A"], Some("?page=1"))),
            Ok(listing_page(&["B"], Some("?page=2"))),
        ]);

        let config = CrawlConfig {
            max_pages: 2,
            ..fast()
        };
        let crawler = Crawler::new(fetcher, ExtractionSchema::default()).with_config(config);
        let err = crawler
            .run("https://example.edu", "/en/publications/")
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(matches!(err, CrawlError::PageLimit(2)));
    }

    #[tokio::test]
    async fn test_pre_cancelled_crawl_never_fetches() {
        let (fetcher, calls) = ScriptedFetcher::new(vec![]);
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let crawler = Crawler::new(fetcher, ExtractionSchema::default())
            .with_config(fast())
            .with_cancellation(rx);
        let err = crawler
            .run("https://example.edu", "/en/publications/")
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(matches!(err, CrawlError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancellation_during_delay() {
        let (fetcher, calls) =
            ScriptedFetcher::new(vec![Ok(listing_page(&["A"], Some("?page=1")))]);
        let (tx, rx) = watch::channel(false);

        let config = CrawlConfig {
            min_delay_ms: 10_000,
            max_delay_ms: 10_000,
            max_pages: 200,
        };
        let crawler = Crawler::new(fetcher, ExtractionSchema::default())
            .with_config(config)
            .with_cancellation(rx);

        let handle = tokio::spawn(async move {
            crawler.run("https://example.edu", "/en/publications/").await
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, CrawlError::Cancelled));
    }
}
