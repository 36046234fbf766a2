use crate::config::{FeedSpec, Settings};
use crate::fetcher::FeedFetcher;
use crate::ledger::SeenLedger;
use crate::report::{self, ReportOptions};
use crate::scorer::{self, RelevanceScorer};
use crate::types::{Article, Result, RunSummary, ScoredArticle};
use chrono::NaiveDate;
use std::path::Path;
use tracing::{info, warn};

/// One end-to-end run: fetch → snapshot → dedup → score → report → commit.
///
/// The updated ledger is persisted last, only after the report has been
/// written, so an interrupted or failed run never marks articles as seen
/// without having reported them. Non-fatal problems (bad feeds, scoring
/// failures) are aggregated into the returned summary; fatal ones (ledger
/// I/O, report write) propagate as errors.
pub async fn run(
    feeds: &[FeedSpec],
    settings: &Settings,
    scorer: Option<&dyn RelevanceScorer>,
    run_date: NaiveDate,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();

    // 1. Fetch all feeds; a bad feed is skipped, not fatal.
    let fetcher = FeedFetcher::new(settings.fetch.clone())?;
    let (articles, feed_errors) = fetcher.fetch_all(feeds).await;
    summary.feeds_ok = feeds.len() - feed_errors.len();
    summary.feed_errors = feed_errors;
    summary.articles_fetched = articles.len();

    // 2. Raw snapshot for audit. Best effort: losing the snapshot loses
    // nothing the pipeline depends on.
    if let Err(e) = write_snapshot(&articles, &settings.data.raw_dir, run_date) {
        warn!("Failed to write raw snapshot: {}", e);
    }

    // 3. Reconcile against the seen ledger.
    let ledger = match SeenLedger::load(&settings.data.seen_path)? {
        Some(ledger) => ledger,
        None => {
            info!("No seen ledger yet: baseline run, every article counts as new");
            SeenLedger::new()
        }
    };
    let (new_articles, updated_ledger) = ledger.partition(&articles, run_date);
    summary.articles_new = new_articles.len();
    info!(
        "{} new articles out of {} fetched ({} previously seen keys)",
        new_articles.len(),
        articles.len(),
        ledger.len()
    );

    // 4. Relevance judgments for the new articles.
    let scored = judge_articles(new_articles, settings, scorer).await;
    summary.articles_scored = scored.iter().filter(|s| s.judgment.is_scored()).count();
    summary.articles_unscored = scored.len() - summary.articles_scored;

    // 5. Render and write the report. Zero new items still produces a
    // report; an empty run is a success, not an error.
    let opts = ReportOptions {
        relevance_threshold: settings.personalization.relevance_threshold,
        top_n: settings.personalization.top_n,
        include_unscored: settings.report.include_unscored,
    };
    let rendered = report::compile_report(&scored, run_date, &opts);
    let report_path = report::write_report(&rendered, run_date, &settings.report)?;
    summary.report_path = Some(report_path);

    // 6. Commit the ledger only now that the report exists.
    updated_ledger.persist(&settings.data.seen_path)?;

    log_summary(&summary);
    Ok(summary)
}

async fn judge_articles(
    new_articles: Vec<Article>,
    settings: &Settings,
    scorer: Option<&dyn RelevanceScorer>,
) -> Vec<ScoredArticle> {
    let personalization = &settings.personalization;

    let scorer = match scorer {
        Some(s) if personalization.enable => s,
        _ => {
            if !new_articles.is_empty() {
                info!("Scoring disabled: new articles carry the unscored sentinel");
            }
            return new_articles
                .into_iter()
                .map(|a| ScoredArticle::unscored(a, "scoring disabled"))
                .collect();
        }
    };

    if personalization.user_profile.trim().is_empty() {
        warn!("personalization.user_profile is empty, skipping scoring");
        return new_articles
            .into_iter()
            .map(|a| ScoredArticle::unscored(a, "empty interest profile"))
            .collect();
    }

    let mut scored = scorer::score_batch(scorer, new_articles, personalization).await;

    if personalization.translate {
        scorer::translate_batch(scorer, &mut scored, personalization.relevance_threshold).await;
    }

    scored
}

/// Dump the full fetch to `<raw_dir>/articles_<date>.json` for audit.
fn write_snapshot(articles: &[Article], raw_dir: &Path, run_date: NaiveDate) -> Result<()> {
    std::fs::create_dir_all(raw_dir)?;
    let path = raw_dir.join(format!("articles_{}.json", run_date.format("%Y-%m-%d")));
    let json = serde_json::to_string_pretty(articles)?;
    std::fs::write(&path, json)?;
    info!("Saved {} articles to {}", articles.len(), path.display());
    Ok(())
}

fn log_summary(summary: &RunSummary) {
    info!(
        "Run complete: {}/{} feeds ok, {} fetched, {} new, {} scored, {} unscored",
        summary.feeds_ok,
        summary.feeds_ok + summary.feed_errors.len(),
        summary.articles_fetched,
        summary.articles_new,
        summary.articles_scored,
        summary.articles_unscored
    );
    for err in &summary.feed_errors {
        warn!("Feed error this run: {}", err);
    }
    if let Some(path) = &summary.report_path {
        info!("Report artifact: {}", path.display());
    }
}
