use chrono::Utc;
use journal_watcher::config::FeedSpec;
use journal_watcher::parser::parse_articles;

fn spec(max_items: Option<usize>) -> FeedSpec {
    FeedSpec {
        id: "nature".to_string(),
        name: "Nature".to_string(),
        url: "https://www.nature.com/nature.rss".to_string(),
        tags: vec!["biology".to_string()],
        max_items,
    }
}

const SAMPLE_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Nature</title>
    <item>
      <title>Paper A</title>
      <link>https://x.org/a</link>
      <guid isPermaLink="false">doi:10.1000/a</guid>
      <description>Abstract A</description>
      <pubDate>Fri, 30 May 2025 09:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Paper B</title>
      <link>https://x.org/b</link>
    </item>
    <item>
      <title>Paper without a link</title>
    </item>
  </channel>
</rss>
"#;

#[test]
fn normalizes_entries_into_articles() {
    let articles = parse_articles(SAMPLE_RSS, &spec(None), Utc::now()).unwrap();

    // The linkless entry is dropped: no link, no stable identity.
    assert_eq!(articles.len(), 2);

    let a = &articles[0];
    assert_eq!(a.feed_id, "nature");
    assert_eq!(a.feed_name, "Nature");
    assert_eq!(a.title, "Paper A");
    assert_eq!(a.link, "https://x.org/a");
    assert_eq!(a.summary.as_deref(), Some("Abstract A"));
    assert_eq!(a.doi.as_deref(), Some("10.1000/a"));
    assert!(a.published.is_some());
    assert_eq!(a.identity_key(), "nature||https://x.org/a");

    let b = &articles[1];
    assert_eq!(b.summary, None);
    assert_eq!(b.doi, None);
    assert_eq!(b.published, None);
}

#[test]
fn per_feed_cap_limits_entries() {
    let articles = parse_articles(SAMPLE_RSS, &spec(Some(1)), Utc::now()).unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].title, "Paper A");
}

#[test]
fn garbage_content_is_a_parse_error() {
    let err = parse_articles("this is not xml at all", &spec(None), Utc::now()).unwrap_err();
    assert!(err.to_string().contains("parse"));
}
