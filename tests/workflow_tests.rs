//! End-to-end workflow tests against stored fixture pages

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tender_watch::config::{
    Config, CrawlLimits, HttpConfig, RunConfig, SiteConfig, StoreConfig, ThrottleConfig,
};
use tender_watch::dates::civil_today;
use tender_watch::storage::{SqliteStore, Store};
use tender_watch::{run_once, AnnouncementStatus, DedupeStrategy, RunStatus};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture_config(db_path: &Path, days_lookback: u32, dry_run: bool) -> Config {
    Config {
        site: SiteConfig {
            list_url: "https://announce.example.com/list.html".to_string(),
            base_url: "https://announce.example.com".to_string(),
            user_agent: "test-agent".to_string(),
            keyword_regex: "(系统|软件|平台|大数据|AI|采购|招标)".to_string(),
            keywords_label: None,
        },
        store: StoreConfig {
            database_path: db_path.to_string_lossy().into_owned(),
            dedupe_strategy: DedupeStrategy::Title,
        },
        run: RunConfig {
            days_lookback,
            max_items_per_run: 0,
            loop_delay_seconds: 0.0,
            dry_run,
            run_id_override: None,
            fixtures_dir: Some(fixtures_dir()),
        },
        http: HttpConfig {
            timeout_ms: 1_000,
            retry_count: 1,
            retry_interval_ms: 0,
            relay: None,
        },
        crawl: CrawlLimits::default(),
        throttle: ThrottleConfig::default(),
        ai: None,
        webhook: None,
        extra: HashMap::new(),
    }
}

// The fixture list page carries five rows: three keyword matches dated
// 2025-03-10/2025-03-09, one keyword match dated 2025-03-05, and one row
// whose title matches no keyword. The filter reference date anchors on the
// newest row, 2025-03-10.

#[tokio::test]
async fn test_dry_run_counts_without_persisting() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("tender.db");
    let cfg = fixture_config(&db_path, 2, true);

    let report = run_once(&cfg).await.unwrap();
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.total_processed, 3);
    assert_eq!(report.total_new, 3);
    assert_eq!(report.total_duplicate, 0);

    let store = SqliteStore::open(&db_path, DedupeStrategy::Title).unwrap();
    assert_eq!(store.count_announcements().unwrap(), 0);

    // Nothing was persisted, so a second dry run repeats the counts.
    let report = run_once(&cfg).await.unwrap();
    assert_eq!(report.total_new, 3);
    assert_eq!(report.total_duplicate, 0);
}

#[tokio::test]
async fn test_run_persists_and_summarizes() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("tender.db");
    let cfg = fixture_config(&db_path, 2, false);

    let report = run_once(&cfg).await.unwrap();
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.total_new, 3);

    let store = SqliteStore::open(&db_path, DedupeStrategy::Title).unwrap();
    assert_eq!(store.count_announcements().unwrap(), 3);

    let record = store.get_announcement("软件采购公告甲").unwrap().unwrap();
    assert_eq!(record.status, AnnouncementStatus::Processed);
    assert_eq!(record.url, "https://announce.example.com/notice/1.html");
    assert_eq!(record.date, "2025-03-10");
    assert!(record.content.unwrap().contains("预算金额：120.5万元"));

    // No AI backend is configured, so the stored summary is the regex
    // fallback built from the detail page.
    let summary = record.ai_summary.unwrap();
    assert!(summary.starts_with("项目名称：软件采购公告甲"));
    assert!(summary.contains("预算金额：120.5万元"));
    assert!(summary.contains("联系人：王强"));
}

#[tokio::test]
async fn test_second_run_reports_duplicates() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("tender.db");
    let cfg = fixture_config(&db_path, 2, false);

    let first = run_once(&cfg).await.unwrap();
    assert_eq!(first.total_new, 3);
    assert_eq!(first.total_duplicate, 0);

    let second = run_once(&cfg).await.unwrap();
    assert_eq!(second.status, RunStatus::Completed);
    assert_eq!(second.total_processed, 3);
    assert_eq!(second.total_new, 0);
    assert_eq!(second.total_duplicate, 3);

    for report in [&first, &second] {
        assert_eq!(
            report.total_new + report.total_duplicate,
            report.total_processed
        );
    }

    let store = SqliteStore::open(&db_path, DedupeStrategy::Title).unwrap();
    assert_eq!(store.count_announcements().unwrap(), 3);
}

#[tokio::test]
async fn test_wider_lookback_includes_older_item() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("tender.db");
    let cfg = fixture_config(&db_path, 7, false);

    let report = run_once(&cfg).await.unwrap();
    assert_eq!(report.total_new, 4);

    let store = SqliteStore::open(&db_path, DedupeStrategy::Title).unwrap();
    let record = store.get_announcement("AI平台历史公告丁").unwrap().unwrap();
    assert_eq!(record.date, "2025-03-05");
}

#[tokio::test]
async fn test_run_row_recorded() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("tender.db");
    let cfg = fixture_config(&db_path, 2, false);

    let report = run_once(&cfg).await.unwrap();

    let store = SqliteStore::open(&db_path, DedupeStrategy::Title).unwrap();
    let run = store.get_run(&report.run_id).unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.total_processed, 3);
    assert_eq!(run.total_new, 3);
    assert!(run.finished_at.is_some());
    assert!(run.error.is_none());
}

#[tokio::test]
async fn test_run_id_override_used() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("tender.db");
    let mut cfg = fixture_config(&db_path, 2, false);
    cfg.run.run_id_override = Some("scheduled-0310".to_string());

    let report = run_once(&cfg).await.unwrap();
    assert_eq!(report.run_id, "scheduled-0310");
}

#[tokio::test]
async fn test_max_items_cap() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("tender.db");
    let mut cfg = fixture_config(&db_path, 2, false);
    cfg.run.max_items_per_run = 2;

    let report = run_once(&cfg).await.unwrap();
    assert_eq!(report.total_processed, 2);
    assert_eq!(report.total_new, 2);
}

#[tokio::test]
async fn test_unreachable_start_page_fails_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("tender.db");
    let mut cfg = fixture_config(&db_path, 2, false);
    cfg.run.fixtures_dir = None;
    cfg.site.list_url = format!("{}/", server.uri());
    cfg.site.base_url = server.uri();

    let report = run_once(&cfg).await.unwrap();
    assert_eq!(report.status, RunStatus::Failed);
    assert!(report.error.is_some());
    assert_eq!(report.total_processed, 0);

    let store = SqliteStore::open(&db_path, DedupeStrategy::Title).unwrap();
    let run = store.get_run(&report.run_id).unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.error.is_some());
}

#[tokio::test]
async fn test_unextractable_detail_stores_failure_sentinel() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("tender.db");
    let mut cfg = fixture_config(&db_path, 2, false);
    cfg.run.fixtures_dir = Some(fixtures_dir().join("bare"));

    let report = run_once(&cfg).await.unwrap();
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.total_new, 1);

    // An empty extraction keeps the item PROCESSED with the bare failure
    // marker, not a title-only fallback summary.
    let store = SqliteStore::open(&db_path, DedupeStrategy::Title).unwrap();
    let record = store.get_announcement("软件维护采购公告").unwrap().unwrap();
    assert_eq!(record.status, AnnouncementStatus::Processed);
    assert_eq!(record.content.as_deref(), Some(""));
    assert_eq!(record.ai_summary.as_deref(), Some("AI 总结失败"));
}

#[tokio::test]
async fn test_duplicates_do_not_raise_adaptive_delay() {
    let server = MockServer::start().await;
    let today = civil_today().format("%Y-%m-%d").to_string();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<ul class="list-se"><a href="/cat/list/">采购公告</a></ul>"#,
        ))
        .mount(&server)
        .await;
    let rows: String = [("/notice/d1.html", "维护采购公告一"), ("/notice/d2.html", "维护采购公告二")]
        .iter()
        .map(|(href, title)| {
            format!(r#"<li><a href="{href}">{title}</a><span>{today}</span></li>"#)
        })
        .collect();
    let page1 = format!(
        r#"<div class="list"><ul>{rows}</ul></div><div class="fenye"><a href="page2.html">下一页</a></div>"#,
    );
    Mock::given(method("GET"))
        .and(path("/cat/list/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page1))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cat/list/page2.html"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<div class="list"><ul></ul></div>"#),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("tender.db");
    let mut cfg = fixture_config(&db_path, 2, false);
    cfg.run.fixtures_dir = None;
    cfg.site.list_url = format!("{}/", server.uri());
    cfg.site.base_url = server.uri();
    cfg.throttle = ThrottleConfig {
        adaptive_threshold_pages: 0,
        batch_size: 1,
        delay_increment_seconds: 10.0,
        max_delay_seconds: 10.0,
    };

    // Both list rows are already stored, so the run sees only duplicates.
    {
        let mut store = SqliteStore::open(&db_path, DedupeStrategy::Title).unwrap();
        store
            .insert_stub("维护采购公告一", "/notice/d1.html", &today)
            .unwrap();
        store
            .insert_stub("维护采购公告二", "/notice/d2.html", &today)
            .unwrap();
    }

    let started = Instant::now();
    let report = run_once(&cfg).await.unwrap();
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.total_duplicate, 2);
    assert_eq!(report.total_new, 0);

    // Duplicates never step the adaptive delay, so the run finishes without
    // a 10-second inter-item sleep.
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_report_serialization_shape() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("tender.db");
    let cfg = fixture_config(&db_path, 2, false);

    let report = run_once(&cfg).await.unwrap();
    let value = serde_json::to_value(&report).unwrap();

    assert_eq!(value["status"], "COMPLETED");
    assert_eq!(value["total_processed"], 3);
    assert!(value.get("error").is_none());
    assert!(value["run_id"].is_string());
    assert!(value["duration_seconds"].is_number());
}
