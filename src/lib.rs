pub mod config;
pub mod fetcher;
pub mod ledger;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod scorer;
pub mod types;

pub use config::{FeedSpec, OnExisting, Personalization, Settings};
pub use fetcher::{FeedFetcher, FetchConfig};
pub use ledger::SeenLedger;
pub use report::ReportOptions;
pub use scorer::{DeepSeekScorer, MockScorer, RelevanceScorer};
pub use types::{Article, Judgment, Result, RunSummary, ScoredArticle, WatcherError};
