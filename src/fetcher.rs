use crate::config::FeedSpec;
use crate::parser;
use crate::types::{Article, Result, WatcherError};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use chrono::Utc;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, serde::Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_seconds")]
    pub retry_delay_seconds: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_seconds: default_timeout_seconds(),
            max_retries: default_max_retries(),
            retry_delay_seconds: default_retry_delay_seconds(),
        }
    }
}

fn default_user_agent() -> String {
    "journal-watcher/0.1".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay_seconds() -> u64 {
    3
}

/// Retrieves configured RSS feeds and normalizes entries into Articles.
///
/// A failing feed is logged and skipped so a single bad source never aborts
/// the run; callers get the union of all successfully parsed articles plus
/// the per-feed error messages for the run summary.
pub struct FeedFetcher {
    client: Client,
    config: FetchConfig,
}

impl FeedFetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()?;

        Ok(Self { client, config })
    }

    /// Fetch and parse one feed, retrying transient failures with
    /// exponential backoff up to `max_retries`.
    pub async fn fetch_feed(&self, spec: &FeedSpec) -> Result<Vec<Article>> {
        debug!("Fetching feed: {} ({})", spec.name, spec.url);

        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_secs(self.config.retry_delay_seconds),
            initial_interval: Duration::from_secs(self.config.retry_delay_seconds),
            max_interval: Duration::from_secs(self.config.retry_delay_seconds * 16),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(self.config.retry_delay_seconds * 40)),
            ..Default::default()
        };

        let mut last_error: Option<WatcherError> = None;

        for attempt in 0..=self.config.max_retries {
            match self.fetch_content(&spec.url).await {
                Ok(content) => {
                    let fetched_at = Utc::now();
                    let articles = parser::parse_articles(&content, spec, fetched_at)?;
                    info!(
                        "Fetched {} articles from {} ({} bytes)",
                        articles.len(),
                        spec.name,
                        content.len()
                    );
                    return Ok(articles);
                }
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.config.max_retries {
                        if let Some(delay) = backoff.next_backoff() {
                            warn!(
                                "Attempt {} failed for {}, retrying in {:?}",
                                attempt + 1,
                                spec.url,
                                delay
                            );
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        }

        Err(WatcherError::Fetch {
            feed: spec.name.clone(),
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string()),
        })
    }

    /// Fetch every configured feed, skipping failures. Returns the union of
    /// parsed articles in feed order plus one message per failed feed.
    pub async fn fetch_all(&self, feeds: &[FeedSpec]) -> (Vec<Article>, Vec<String>) {
        let mut articles = Vec::new();
        let mut errors = Vec::new();

        for spec in feeds {
            match self.fetch_feed(spec).await {
                Ok(mut batch) => articles.append(&mut batch),
                Err(e) => {
                    warn!("Skipping feed {}: {}", spec.name, e);
                    errors.push(e.to_string());
                }
            }
        }

        (articles, errors)
    }

    async fn fetch_content(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(WatcherError::Fetch {
                feed: url.to_string(),
                message: format!(
                    "HTTP {}: {}",
                    status,
                    status.canonical_reason().unwrap_or("Unknown")
                ),
            });
        }

        Ok(response.text().await?)
    }
}
