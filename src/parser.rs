use crate::config::FeedSpec;
use crate::types::{Article, Result, WatcherError};
use chrono::{DateTime, Utc};
use feed_rs::parser;
use tracing::debug;

const DEFAULT_MAX_ITEMS: usize = 200;

/// Parse raw RSS/Atom content into normalized Articles for one feed.
///
/// Entries without a link are dropped (no stable identity without one).
/// The per-feed `max_items` cap bounds how many entries a single fetch can
/// contribute; entries keep the feed's publication order.
pub fn parse_articles(
    content: &str,
    spec: &FeedSpec,
    fetched_at: DateTime<Utc>,
) -> Result<Vec<Article>> {
    let feed = parser::parse(content.as_bytes())
        .map_err(|e| WatcherError::Parse(format!("{}: {}", spec.name, e)))?;

    let max_items = spec.max_items.unwrap_or(DEFAULT_MAX_ITEMS);
    let mut articles = Vec::new();

    for entry in feed.entries.into_iter().take(max_items) {
        let link = match entry.links.first() {
            Some(l) => l.href.clone(),
            None => {
                debug!("Skipping linkless entry in {}", spec.name);
                continue;
            }
        };

        let title = entry
            .title
            .map(|t| t.content)
            .unwrap_or_else(|| "Untitled".to_string());

        // Abstract falls back from summary to inline content body.
        let summary = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body))
            .filter(|s| !s.trim().is_empty());

        let doi = extract_doi(&entry.id, &link);

        let published = entry
            .published
            .or(entry.updated)
            .map(|dt| dt.with_timezone(&Utc));

        articles.push(Article {
            feed_id: spec.id.clone(),
            feed_name: spec.name.clone(),
            tags: spec.tags.clone(),
            title,
            summary,
            link,
            doi,
            published,
            fetched_at,
        });
    }

    Ok(articles)
}

/// Pull a DOI out of the entry id or link when one is embedded.
///
/// Journal feeds typically carry it as `doi:10.xxxx/...`, a bare
/// `10.xxxx/...` id, or a `https://doi.org/...` link.
fn extract_doi(entry_id: &str, link: &str) -> Option<String> {
    let id = entry_id.trim();

    if let Some(rest) = id.strip_prefix("doi:") {
        return Some(rest.trim().to_string());
    }
    if id.starts_with("10.") && id.contains('/') {
        return Some(id.to_string());
    }

    for candidate in [id, link.trim()] {
        if let Some(pos) = candidate.find("doi.org/") {
            let doi = &candidate[pos + "doi.org/".len()..];
            if !doi.is_empty() {
                return Some(doi.to_string());
            }
        }
    }

    None
}
