use crate::config::{OnExisting, ReportSettings};
use crate::types::{Judgment, Result, ScoredArticle, WatcherError};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::info;

/// Rendering and selection knobs for one report.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub relevance_threshold: f64,
    pub top_n: usize,
    pub include_unscored: bool,
}

/// Deterministic artifact path: `<dir>/<prefix>_<YYYY-MM-DD>.txt`.
pub fn report_path(dir: &Path, prefix: &str, run_date: NaiveDate) -> PathBuf {
    dir.join(format!("{}_{}.txt", prefix, run_date.format("%Y-%m-%d")))
}

/// Render the plain-text report.
///
/// Selection: items scoring at or above the threshold, capped to the top
/// `top_n` by score (stable on input order). Layout: items grouped by
/// journal in order of each journal's first appearance among the selected
/// items, descending score within a journal, ties broken by fetch order.
/// Unscored sentinel items render in a trailing flagged section when
/// enabled; they are never silently dropped from the accounting either way.
/// Byte-identical output for identical inputs and run date.
pub fn compile_report(
    scored: &[ScoredArticle],
    run_date: NaiveDate,
    opts: &ReportOptions,
) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push("Academic Journal Watcher - Daily Report".to_string());
    lines.push(format!("Run date: {}", run_date.format("%Y-%m-%d")));
    lines.push(String::new());

    // Ranked selection over (input index, item).
    let mut ranked: Vec<(usize, &ScoredArticle)> = scored
        .iter()
        .enumerate()
        .filter(|(_, item)| {
            matches!(item.judgment, Judgment::Scored { score } if score >= opts.relevance_threshold)
        })
        .collect();
    // Stable sort: equal scores keep fetch order.
    ranked.sort_by(|a, b| {
        let sa = a.1.judgment.score().unwrap_or(0.0);
        let sb = b.1.judgment.score().unwrap_or(0.0);
        sb.partial_cmp(&sa).unwrap_or(std::cmp::Ordering::Equal)
    });
    let above_threshold = ranked.len();
    ranked.truncate(opts.top_n);

    let scored_total = scored
        .iter()
        .filter(|item| item.judgment.is_scored())
        .count();
    let below_threshold = scored_total - above_threshold;
    let unscored: Vec<&ScoredArticle> = scored
        .iter()
        .filter(|item| !item.judgment.is_scored())
        .collect();

    if ranked.is_empty() {
        lines.push("No new relevant articles this run.".to_string());
        lines.push(String::new());
    } else {
        lines.push("Personalized picks matching your research interests:".to_string());
        lines.push(String::new());

        // Journal order: first appearance among selected items, fetch order.
        let mut journals: Vec<&str> = Vec::new();
        let mut by_input = ranked.clone();
        by_input.sort_by_key(|(idx, _)| *idx);
        for (_, item) in &by_input {
            let journal = item.article.feed_name.as_str();
            if !journals.contains(&journal) {
                journals.push(journal);
            }
        }

        for journal in journals {
            lines.push(format!("== {} ==", journal));
            lines.push(String::new());
            for (_, item) in ranked
                .iter()
                .filter(|(_, item)| item.article.feed_name == journal)
            {
                render_item(&mut lines, item);
            }
        }
    }

    if opts.include_unscored && !unscored.is_empty() {
        lines.push("== Unscored (flagged for manual review) ==".to_string());
        lines.push(String::new());
        for item in &unscored {
            let reason = match &item.judgment {
                Judgment::Unscored { reason } => reason.as_str(),
                Judgment::Scored { .. } => unreachable!(),
            };
            lines.push(format!("- [{}] {}", item.article.feed_name, item.article.title));
            lines.push(format!("    Link: {}", item.article.link));
            lines.push(format!("    Reason: {}", reason));
            lines.push(String::new());
        }
    }

    lines.push(format!(
        "Totals: {} new articles, {} shown, {} cut by top-N, {} below threshold, {} unscored.",
        scored.len(),
        ranked.len(),
        above_threshold - ranked.len(),
        below_threshold,
        unscored.len()
    ));
    lines.push(String::new());

    lines.join("\n")
}

fn render_item(lines: &mut Vec<String>, item: &ScoredArticle) {
    let article = &item.article;
    let score = item.judgment.score().unwrap_or(0.0);

    lines.push(format!("- ({:.0} pts) {}", score, article.title));
    if let Some(translated) = &item.translated_title {
        lines.push(format!("    Title (zh): {}", translated));
    }
    if let Some(published) = article.published {
        lines.push(format!("    Published: {}", published.format("%Y-%m-%d %H:%M")));
    }
    if let Some(summary) = &article.summary {
        lines.push(format!("    Abstract: {}", summary));
    }
    if let Some(translated) = &item.translated_summary {
        lines.push(format!("    Abstract (zh): {}", translated));
    }
    if let Some(doi) = article.doi.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        lines.push(format!("    DOI: {}", doi));
        if !doi.to_lowercase().starts_with("http") {
            lines.push(format!("    DOI link: https://doi.org/{}", doi));
        }
    }
    lines.push(format!("    Link: {}", article.link));
    lines.push(String::new());
}

/// Write the rendered report to its dated path.
///
/// Same-day re-runs follow the configured policy: `Overwrite` replaces the
/// artifact, `Reject` fails before touching the existing file.
pub fn write_report(
    content: &str,
    run_date: NaiveDate,
    settings: &ReportSettings,
) -> Result<PathBuf> {
    let path = report_path(&settings.dir, &settings.prefix, run_date);

    if settings.on_existing == OnExisting::Reject && path.exists() {
        return Err(WatcherError::ReportWrite {
            path,
            message: "report for this date already exists (on_existing = reject)".to_string(),
        });
    }

    std::fs::create_dir_all(&settings.dir).map_err(|e| WatcherError::ReportWrite {
        path: path.clone(),
        message: e.to_string(),
    })?;
    std::fs::write(&path, content).map_err(|e| WatcherError::ReportWrite {
        path: path.clone(),
        message: e.to_string(),
    })?;

    info!("Wrote report to {}", path.display());
    Ok(path)
}
