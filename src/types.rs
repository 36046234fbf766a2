use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single normalized article pulled from a journal RSS feed.
///
/// Immutable once fetched; the identity key is derived from feed id + link
/// and is the sole deduplication handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub feed_id: String,
    pub feed_name: String,
    pub tags: Vec<String>,
    pub title: String,
    pub summary: Option<String>,
    pub link: String,
    pub doi: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
}

impl Article {
    /// Stable dedup key: `feed_id||link`. Whitespace drift in titles never
    /// changes the key, and re-fetching the same link yields the same key.
    pub fn identity_key(&self) -> String {
        format!("{}||{}", self.feed_id.trim(), self.link.trim())
    }

    /// Text handed to the scorer: abstract when present, title otherwise.
    pub fn content_snippet(&self) -> &str {
        match self.summary.as_deref() {
            Some(s) if !s.trim().is_empty() => s,
            _ => &self.title,
        }
    }
}

/// Outcome of a relevance judgment for one article.
///
/// `Unscored` is an explicit sentinel, distinct from a low score: the article
/// could not be judged (call failures, malformed replies, candidate cap).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Judgment {
    Scored { score: f64 },
    Unscored { reason: String },
}

impl Judgment {
    pub fn score(&self) -> Option<f64> {
        match self {
            Judgment::Scored { score } => Some(*score),
            Judgment::Unscored { .. } => None,
        }
    }

    pub fn is_scored(&self) -> bool {
        matches!(self, Judgment::Scored { .. })
    }
}

/// An article together with its judgment and optional translations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredArticle {
    pub article: Article,
    pub judgment: Judgment,
    pub translated_title: Option<String>,
    pub translated_summary: Option<String>,
}

impl ScoredArticle {
    pub fn unscored(article: Article, reason: impl Into<String>) -> Self {
        Self {
            article,
            judgment: Judgment::Unscored {
                reason: reason.into(),
            },
            translated_title: None,
            translated_summary: None,
        }
    }
}

/// One ledger row: identity key plus the date it was first recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenEntry {
    pub key: String,
    pub first_seen: NaiveDate,
}

/// Per-run accounting surfaced in the final log summary.
#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    pub feeds_ok: usize,
    pub feed_errors: Vec<String>,
    pub articles_fetched: usize,
    pub articles_new: usize,
    pub articles_scored: usize,
    pub articles_unscored: usize,
    pub report_path: Option<std::path::PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum WatcherError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed fetch failed for {feed}: {message}")]
    Fetch { feed: String, message: String },

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Scorer call failed: {0}")]
    ScorerCall(String),

    #[error("Scorer response malformed: {0}")]
    ScorerResponse(String),

    #[error("Seen-ledger I/O error at {path}: {source}")]
    LedgerIo {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("Report write failed at {path}: {message}")]
    ReportWrite {
        path: std::path::PathBuf,
        message: String,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl WatcherError {
    /// Fatal errors abort the run before the ledger is committed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            WatcherError::LedgerIo { .. }
                | WatcherError::ReportWrite { .. }
                | WatcherError::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, WatcherError>;
