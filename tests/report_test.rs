use chrono::{NaiveDate, TimeZone, Utc};
use journal_watcher::config::{OnExisting, ReportSettings};
use journal_watcher::report::{compile_report, report_path, write_report, ReportOptions};
use journal_watcher::{Article, Judgment, ScoredArticle};

fn article(feed_name: &str, link: &str, title: &str) -> Article {
    Article {
        feed_id: feed_name.to_lowercase().replace(' ', "-"),
        feed_name: feed_name.to_string(),
        tags: Vec::new(),
        title: title.to_string(),
        summary: Some(format!("Abstract of {}", title)),
        link: link.to_string(),
        doi: Some("10.1000/demo".to_string()),
        published: Some(Utc.with_ymd_and_hms(2025, 5, 30, 9, 0, 0).unwrap()),
        fetched_at: Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap(),
    }
}

fn scored(feed_name: &str, link: &str, title: &str, score: f64) -> ScoredArticle {
    ScoredArticle {
        article: article(feed_name, link, title),
        judgment: Judgment::Scored { score },
        translated_title: None,
        translated_summary: None,
    }
}

fn opts() -> ReportOptions {
    ReportOptions {
        relevance_threshold: 50.0,
        top_n: 10,
        include_unscored: true,
    }
}

fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

#[test]
fn rendering_is_deterministic() {
    let items = vec![
        scored("Nature", "https://x.org/a", "Paper A", 90.0),
        scored("Nature", "https://x.org/b", "Paper B", 40.0),
        ScoredArticle::unscored(article("Cell", "https://x.org/c", "Paper C"), "timeout"),
    ];

    let first = compile_report(&items, run_date(), &opts());
    let second = compile_report(&items, run_date(), &opts());
    assert_eq!(first, second);
}

#[test]
fn threshold_excludes_low_scores_from_ranked_body() {
    // Two articles at 90 and 40 under one journal, threshold 50: only the
    // 90-point item appears, and it appears first in its section.
    let items = vec![
        scored("Nature", "https://x.org/low", "Low relevance paper", 40.0),
        scored("Nature", "https://x.org/high", "High relevance paper", 90.0),
    ];

    let text = compile_report(&items, run_date(), &opts());
    assert!(text.contains("High relevance paper"));
    assert!(!text.contains("Low relevance paper"));
    assert!(text.contains("1 below threshold"));
}

#[test]
fn ties_keep_fetch_order() {
    let items = vec![
        scored("Nature", "https://x.org/first", "First fetched", 80.0),
        scored("Nature", "https://x.org/second", "Second fetched", 80.0),
    ];

    let text = compile_report(&items, run_date(), &opts());
    let first_pos = text.find("First fetched").unwrap();
    let second_pos = text.find("Second fetched").unwrap();
    assert!(first_pos < second_pos);
}

#[test]
fn groups_by_journal_in_first_appearance_order() {
    let items = vec![
        scored("Cell", "https://x.org/c1", "Cell alpha", 60.0),
        scored("Nature", "https://x.org/n1", "Nature paper one", 95.0),
        scored("Cell", "https://x.org/c2", "Cell beta", 70.0),
    ];

    let text = compile_report(&items, run_date(), &opts());
    let cell_pos = text.find("== Cell ==").unwrap();
    let nature_pos = text.find("== Nature ==").unwrap();
    // Cell appeared first in fetch order, so its section comes first even
    // though Nature holds the top score.
    assert!(cell_pos < nature_pos);

    // Within Cell, descending score: beta (70) before alpha (60).
    let beta = text.find("Cell beta").unwrap();
    let alpha = text.find("Cell alpha").unwrap();
    assert!(beta < alpha);
}

#[test]
fn unscored_items_land_in_flagged_section() {
    // Scenario: scoring for one article failed all retries. It must show up
    // flagged, not in the ranked list, and never be dropped silently.
    let items = vec![
        scored("Nature", "https://x.org/a", "Scored paper", 90.0),
        ScoredArticle::unscored(
            article("Nature", "https://x.org/d", "Unscorable paper"),
            "HTTP 429: Too Many Requests",
        ),
    ];

    let text = compile_report(&items, run_date(), &opts());
    let flagged_pos = text.find("== Unscored (flagged for manual review) ==").unwrap();
    let item_pos = text.rfind("Unscorable paper").unwrap();
    assert!(item_pos > flagged_pos);
    assert!(text.contains("HTTP 429"));
    assert!(text.contains("1 unscored"));
}

#[test]
fn unscored_section_can_be_disabled() {
    let items = vec![ScoredArticle::unscored(
        article("Nature", "https://x.org/d", "Unscorable paper"),
        "timeout",
    )];

    let mut options = opts();
    options.include_unscored = false;
    let text = compile_report(&items, run_date(), &options);

    assert!(!text.contains("Unscorable paper"));
    // Still visible in the accounting footer.
    assert!(text.contains("1 unscored"));
}

#[test]
fn zero_new_items_is_an_empty_success() {
    let text = compile_report(&[], run_date(), &opts());
    assert!(text.contains("No new relevant articles this run."));
    assert!(text.contains("Totals: 0 new articles"));
}

#[test]
fn top_n_caps_the_ranked_list() {
    let items: Vec<ScoredArticle> = (0..5)
        .map(|i| {
            scored(
                "Nature",
                &format!("https://x.org/{}", i),
                &format!("Paper {}", i),
                60.0 + i as f64,
            )
        })
        .collect();

    let mut options = opts();
    options.top_n = 2;
    let text = compile_report(&items, run_date(), &options);

    assert!(text.contains("Paper 4"));
    assert!(text.contains("Paper 3"));
    assert!(!text.contains("Paper 0"));
    // 5 passed the threshold, 2 rendered, so the footer accounts for the
    // other 3 explicitly.
    assert!(text.contains("2 shown"));
    assert!(text.contains("3 cut by top-N"));
}

#[test]
fn doi_link_is_derived_when_doi_is_bare() {
    let items = vec![scored("Nature", "https://x.org/a", "Paper A", 90.0)];
    let text = compile_report(&items, run_date(), &opts());
    assert!(text.contains("DOI: 10.1000/demo"));
    assert!(text.contains("DOI link: https://doi.org/10.1000/demo"));
}

#[test]
fn translations_render_alongside_originals() {
    let mut item = scored("Nature", "https://x.org/a", "Paper A", 90.0);
    item.translated_title = Some("论文A".to_string());
    item.translated_summary = Some("摘要A".to_string());

    let text = compile_report(&[item], run_date(), &opts());
    assert!(text.contains("Paper A"));
    assert!(text.contains("Title (zh): 论文A"));
    assert!(text.contains("Abstract (zh): 摘要A"));
}

#[test]
fn artifact_path_is_dated() {
    let path = report_path(std::path::Path::new("data/reports"), "academic", run_date());
    assert_eq!(
        path,
        std::path::PathBuf::from("data/reports/academic_2025-06-01.txt")
    );
}

#[test]
fn same_day_rerun_overwrites_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let settings = ReportSettings {
        dir: dir.path().to_path_buf(),
        prefix: "academic".to_string(),
        on_existing: OnExisting::Overwrite,
        include_unscored: true,
    };

    write_report("first body", run_date(), &settings).unwrap();
    let path = write_report("second body", run_date(), &settings).unwrap();

    assert_eq!(std::fs::read_to_string(path).unwrap(), "second body");
}

#[test]
fn same_day_rerun_can_be_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let settings = ReportSettings {
        dir: dir.path().to_path_buf(),
        prefix: "academic".to_string(),
        on_existing: OnExisting::Reject,
        include_unscored: true,
    };

    let path = write_report("first body", run_date(), &settings).unwrap();
    let err = write_report("second body", run_date(), &settings).unwrap_err();

    assert!(err.to_string().contains("already exists"));
    // Existing artifact untouched.
    assert_eq!(std::fs::read_to_string(path).unwrap(), "first body");
}
