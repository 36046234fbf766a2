use crate::types::{Result, WatcherError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One configured journal feed from `feeds.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedSpec {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Per-feed cap on entries taken from a single fetch.
    pub max_items: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct FeedsFile {
    #[serde(default)]
    feeds: Vec<FeedSpec>,
}

/// Load the ordered feed list from `feeds.yaml`.
pub fn load_feeds(path: &Path) -> Result<Vec<FeedSpec>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| WatcherError::Config(format!("cannot read {}: {}", path.display(), e)))?;
    let file: FeedsFile = serde_yaml::from_str(&raw)?;
    if file.feeds.is_empty() {
        return Err(WatcherError::Config(format!(
            "no feeds configured in {}",
            path.display()
        )));
    }
    // Catch typoed feed URLs at startup instead of mid-run.
    for spec in &file.feeds {
        url::Url::parse(&spec.url)?;
    }
    info!("Loaded {} feeds from {}", file.feeds.len(), path.display());
    Ok(file.feeds)
}

/// Scoring / translation knobs from the `personalization` settings block.
#[derive(Debug, Clone, Deserialize)]
pub struct Personalization {
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub user_profile: String,
    #[serde(default = "default_threshold")]
    pub relevance_threshold: f64,
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,
    #[serde(default)]
    pub translate: bool,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for Personalization {
    fn default() -> Self {
        Self {
            enable: false,
            user_profile: String::new(),
            relevance_threshold: default_threshold(),
            max_candidates: default_max_candidates(),
            top_n: default_top_n(),
            max_workers: default_max_workers(),
            retry_limit: default_retry_limit(),
            translate: false,
            model: default_model(),
            base_url: default_base_url(),
        }
    }
}

/// What to do when a report for the same run date already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnExisting {
    Overwrite,
    Reject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportSettings {
    #[serde(default = "default_report_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_report_prefix")]
    pub prefix: String,
    #[serde(default = "default_on_existing")]
    pub on_existing: OnExisting,
    #[serde(default = "default_include_unscored")]
    pub include_unscored: bool,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            dir: default_report_dir(),
            prefix: default_report_prefix(),
            on_existing: default_on_existing(),
            include_unscored: default_include_unscored(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataSettings {
    #[serde(default = "default_raw_dir")]
    pub raw_dir: PathBuf,
    #[serde(default = "default_seen_path")]
    pub seen_path: PathBuf,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            raw_dir: default_raw_dir(),
            seen_path: default_seen_path(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub personalization: Personalization,
    #[serde(default)]
    pub fetch: crate::fetcher::FetchConfig,
    #[serde(default)]
    pub report: ReportSettings,
    #[serde(default)]
    pub data: DataSettings,
}

impl Settings {
    /// Load `settings.yaml`; a missing file yields defaults so a bare
    /// checkout still runs (personalization stays off until configured).
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Settings file {} missing, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| WatcherError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let settings: Settings = serde_yaml::from_str(&raw)?;
        Ok(settings)
    }
}

fn default_threshold() -> f64 {
    50.0
}

fn default_max_candidates() -> usize {
    80
}

fn default_top_n() -> usize {
    10
}

fn default_max_workers() -> usize {
    8
}

fn default_retry_limit() -> u32 {
    2
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

fn default_base_url() -> String {
    "https://api.deepseek.com".to_string()
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("data/reports")
}

fn default_report_prefix() -> String {
    "academic".to_string()
}

fn default_on_existing() -> OnExisting {
    OnExisting::Overwrite
}

fn default_include_unscored() -> bool {
    true
}

fn default_raw_dir() -> PathBuf {
    PathBuf::from("data/raw")
}

fn default_seen_path() -> PathBuf {
    PathBuf::from("data/seen_items.csv")
}
