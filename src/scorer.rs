use crate::config::Personalization;
use crate::types::{Article, Judgment, Result, ScoredArticle, WatcherError};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Reason string used when an article falls outside the candidate cap.
pub const CAP_REASON: &str = "beyond candidate cap";

/// External judge of how well an article matches the interest profile.
///
/// Implementations score on a 0-100 scale (higher = more relevant) and may
/// translate text for the report. Both operations can fail per item; the
/// batch orchestration in [`score_batch`] handles retries and degradation.
#[async_trait]
pub trait RelevanceScorer: Send + Sync {
    fn name(&self) -> &str;

    async fn score_article(&self, article: &Article, profile: &str) -> Result<f64>;

    async fn translate(&self, text: &str) -> Result<String>;
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Scorer backed by an OpenAI-compatible chat-completions endpoint
/// (DeepSeek by default).
pub struct DeepSeekScorer {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl DeepSeekScorer {
    pub fn new(api_key: String, base_url: String, model: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }

    async fn chat(&self, system: &str, user: &str, temperature: f64) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| WatcherError::ScorerCall(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WatcherError::ScorerCall(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| WatcherError::ScorerResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| WatcherError::ScorerResponse("empty completion".to_string()))
    }

    fn scoring_prompt(article: &Article, profile: &str) -> String {
        format!(
            "You are an academic literature recommendation assistant.\n\n\
             [Researcher profile]\n{}\n\n\
             [Article]\n\
             - Journal/source: {}\n\
             - Title: {}\n\
             - Abstract or snippet: {}\n\
             - Link: {}\n\
             - DOI: {}\n\n\
             Rate how relevant this article is to the researcher's current \
             interests on a 0-100 scale:\n\
             - 0: essentially unrelated\n\
             - 50: somewhat related, worth a glance\n\
             - 80+: highly relevant, worth close attention\n\n\
             IMPORTANT: reply with a single integer between 0 and 100 and \
             nothing else.",
            profile,
            article.feed_name,
            article.title,
            article.content_snippet(),
            article.link,
            article.doi.as_deref().unwrap_or("")
        )
    }
}

#[async_trait]
impl RelevanceScorer for DeepSeekScorer {
    fn name(&self) -> &str {
        "deepseek"
    }

    async fn score_article(&self, article: &Article, profile: &str) -> Result<f64> {
        let reply = self
            .chat(
                "You are a recommendation system that replies with a single \
                 numeric score and no explanation.",
                &Self::scoring_prompt(article, profile),
                0.15,
            )
            .await?;

        parse_score(&reply).ok_or_else(|| {
            WatcherError::ScorerResponse(format!("no score found in reply: {:?}", reply))
        })
    }

    async fn translate(&self, text: &str) -> Result<String> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(String::new());
        }

        let reply = self
            .chat(
                "You are a professional academic translator. Translate the \
                 given academic title or abstract into natural Simplified \
                 Chinese. Output only the translation, with no prefix, \
                 suffix, or explanation.",
                text,
                0.2,
            )
            .await?;

        Ok(reply.trim().to_string())
    }
}

/// Extract the first integer in a model reply and clamp it to 0-100.
pub fn parse_score(reply: &str) -> Option<f64> {
    let digits: String = reply
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    digits.parse::<f64>().ok().map(|s| s.clamp(0.0, 100.0))
}

/// Score a batch of new articles with bounded parallelism.
///
/// Output preserves the input (fetch) order: results land in index-keyed
/// slots, never correlated by completion order. The newest `max_candidates`
/// articles (by published, falling back to fetched-at) are scored; the rest
/// carry the candidate-cap sentinel. Per-article failures retry up to
/// `retry_limit` times, then degrade to `Unscored` with the last error as
/// reason; no article is ever dropped here.
pub async fn score_batch(
    scorer: &dyn RelevanceScorer,
    articles: Vec<Article>,
    opts: &Personalization,
) -> Vec<ScoredArticle> {
    let candidate_indices = select_candidates(&articles, opts.max_candidates);

    info!(
        "Scoring {} of {} new articles with {} (max_workers={})",
        candidate_indices.len(),
        articles.len(),
        scorer.name(),
        opts.max_workers
    );

    let judgments: Vec<(usize, Judgment)> = stream::iter(candidate_indices.iter().copied())
        .map(|idx| {
            let article = &articles[idx];
            let profile = opts.user_profile.as_str();
            let retry_limit = opts.retry_limit;
            async move {
                (
                    idx,
                    score_with_retries(scorer, article, profile, retry_limit).await,
                )
            }
        })
        .buffer_unordered(opts.max_workers.max(1))
        .collect()
        .await;

    let mut slots: Vec<Option<Judgment>> = vec![None; articles.len()];
    for (idx, judgment) in judgments {
        slots[idx] = Some(judgment);
    }

    articles
        .into_iter()
        .zip(slots)
        .map(|(article, judgment)| ScoredArticle {
            article,
            judgment: judgment.unwrap_or(Judgment::Unscored {
                reason: CAP_REASON.to_string(),
            }),
            translated_title: None,
            translated_summary: None,
        })
        .collect()
}

async fn score_with_retries(
    scorer: &dyn RelevanceScorer,
    article: &Article,
    profile: &str,
    retry_limit: u32,
) -> Judgment {
    let mut last_error = String::new();

    for attempt in 0..=retry_limit {
        match scorer.score_article(article, profile).await {
            Ok(score) => {
                debug!("Scored {:.0}: {}", score, article.title);
                return Judgment::Scored { score };
            }
            Err(e) => {
                last_error = e.to_string();
                if attempt < retry_limit {
                    warn!(
                        "Scoring attempt {} failed for {}: {}",
                        attempt + 1,
                        article.link,
                        last_error
                    );
                    tokio::time::sleep(Duration::from_millis(500 * u64::from(attempt + 1))).await;
                }
            }
        }
    }

    warn!(
        "Giving up on {} after {} attempts: {}",
        article.link,
        retry_limit + 1,
        last_error
    );
    Judgment::Unscored { reason: last_error }
}

/// Indices of the articles to score: the newest `max_candidates` by
/// published timestamp, falling back to fetched-at.
fn select_candidates(articles: &[Article], max_candidates: usize) -> Vec<usize> {
    if articles.len() <= max_candidates {
        return (0..articles.len()).collect();
    }

    let mut by_recency: Vec<usize> = (0..articles.len()).collect();
    by_recency.sort_by_key(|&i| {
        let a = &articles[i];
        std::cmp::Reverse(a.published.unwrap_or(a.fetched_at))
    });
    by_recency.truncate(max_candidates);
    by_recency
}

/// Fill in translations for articles at or above the relevance threshold.
///
/// A failed translation falls back to the untranslated text (the field stays
/// `None`); translation problems never fail the run.
pub async fn translate_batch(
    scorer: &dyn RelevanceScorer,
    scored: &mut [ScoredArticle],
    threshold: f64,
) {
    for item in scored.iter_mut() {
        let relevant = matches!(item.judgment, Judgment::Scored { score } if score >= threshold);
        if !relevant {
            continue;
        }

        match scorer.translate(&item.article.title).await {
            Ok(t) if !t.is_empty() => item.translated_title = Some(t),
            Ok(_) => {}
            Err(e) => warn!("Title translation failed for {}: {}", item.article.link, e),
        }

        if let Some(summary) = item.article.summary.clone() {
            match scorer.translate(&summary).await {
                Ok(t) if !t.is_empty() => item.translated_summary = Some(t),
                Ok(_) => {}
                Err(e) => warn!(
                    "Summary translation failed for {}: {}",
                    item.article.link, e
                ),
            }
        }
    }
}

/// Keyword-overlap scorer for tests and offline runs (no network).
pub struct MockScorer {
    failing_links: std::collections::HashSet<String>,
}

impl MockScorer {
    pub fn new() -> Self {
        Self {
            failing_links: std::collections::HashSet::new(),
        }
    }

    /// Make scoring fail permanently for the given article link.
    pub fn fail_link(mut self, link: impl Into<String>) -> Self {
        self.failing_links.insert(link.into());
        self
    }
}

impl Default for MockScorer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RelevanceScorer for MockScorer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn score_article(&self, article: &Article, profile: &str) -> Result<f64> {
        if self.failing_links.contains(&article.link) {
            return Err(WatcherError::ScorerCall("injected failure".to_string()));
        }

        let text = format!("{} {}", article.title, article.content_snippet()).to_lowercase();
        let mut score: f64 = 0.0;
        for word in profile.to_lowercase().split_whitespace() {
            if word.len() > 3 && text.contains(word) {
                score += 20.0;
            }
        }
        Ok(score.min(100.0))
    }

    async fn translate(&self, text: &str) -> Result<String> {
        Ok(format!("[zh] {}", text.trim()))
    }
}
