use chrono::Utc;
use clap::Parser;
use journal_watcher::scorer::{DeepSeekScorer, RelevanceScorer};
use journal_watcher::{config, pipeline, Settings};
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Daily academic journal watcher: polls RSS feeds, detects new articles,
/// scores them against your interest profile, and writes a plain-text digest.
#[derive(Parser, Debug)]
#[command(name = "journal-watcher", version)]
struct Cli {
    /// Path to the feed list
    #[arg(long, default_value = "config/feeds.yaml")]
    feeds: PathBuf,

    /// Path to the settings file
    #[arg(long, default_value = "config/settings.yaml")]
    settings: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let feeds = config::load_feeds(&cli.feeds)?;
    let settings = Settings::load(&cli.settings)?;

    let scorer = build_scorer(&settings);
    let run_date = Utc::now().date_naive();

    info!("Starting journal watcher run for {}", run_date);
    let summary = match pipeline::run(
        &feeds,
        &settings,
        scorer.as_deref().map(|s| s as &dyn RelevanceScorer),
        run_date,
    )
    .await
    {
        Ok(summary) => summary,
        Err(e) => {
            if e.is_fatal() {
                error!("Run aborted without committing seen state: {}", e);
            } else {
                error!("Run failed: {}", e);
            }
            return Err(e.into());
        }
    };

    if let Some(path) = &summary.report_path {
        println!("Report written to {}", path.display());
    }

    Ok(())
}

/// The scorer is optional: without personalization enabled (or without an
/// API key) the run still happens, with new items flagged as unscored.
fn build_scorer(settings: &Settings) -> Option<Box<DeepSeekScorer>> {
    if !settings.personalization.enable {
        return None;
    }

    match std::env::var("DEEPSEEK_API_KEY") {
        Ok(key) if !key.trim().is_empty() => match DeepSeekScorer::new(
            key,
            settings.personalization.base_url.clone(),
            settings.personalization.model.clone(),
        ) {
            Ok(scorer) => Some(Box::new(scorer)),
            Err(e) => {
                warn!("Failed to build scorer client, scoring will be skipped: {}", e);
                None
            }
        },
        _ => {
            warn!("DEEPSEEK_API_KEY not set: personalization is enabled but scoring will be skipped");
            None
        }
    }
}
