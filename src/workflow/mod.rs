//! Run orchestration
//!
//! One call to [`run_once`] is one complete pipeline execution: crawl the
//! list pages, filter by date window and keyword, dedupe against the store,
//! fetch and summarize each new announcement, and notify. Every run leaves a
//! row in the `runs` table with its counters, and those counters always
//! satisfy `total_new + total_duplicate == total_processed`.
//!
//! Failure handling is tiered. A setup failure (client build, database open,
//! run-row insert) is returned as an error. A failure while a run is under
//! way finalizes the run as FAILED with the partial counters and is reported
//! in the returned [`RunReport`] instead of as an error. A failure on a
//! single item marks that item FAILED and the run keeps going.

use crate::config::{Config, NotifyMode};
use crate::crawl::collect_list_items;
use crate::dates::{civil_now, civil_today, normalize_date, now_iso};
use crate::fetch::HttpClient;
use crate::notify::{
    build_digest_card, build_error_card, build_new_item_card, build_summary_card, DigestChunk,
    DigestItem, Notifier, RunSummaryInfo,
};
use crate::parse::{extract_detail_content, ListItem};
use crate::storage::{AnnouncementStatus, RunStatus, SqliteStore, Store};
use crate::summarize::{build_fallback_summary, AiClient, SUMMARY_FAILURE_SENTINEL};
use crate::{ConfigError, Result, WatchError};
use chrono::{Duration as ChronoDuration, NaiveDate};
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, Instant};
use url::Url;

/// Items per digest card
const DIGEST_CHUNK_SIZE: usize = 10;
/// Longest error string persisted or sent in a card
const MAX_ERROR_CHARS: usize = 4_000;

/// Final outcome of one pipeline execution
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub run_id: String,
    pub execution_time: String,
    pub duration_seconds: i64,
    pub total_processed: u32,
    pub total_new: u32,
    pub total_duplicate: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct RunStats {
    processed: u32,
    new: u32,
    duplicate: u32,
}

/// Executes one complete run
///
/// Returns `Err` only when the run could not be started at all. Once a run
/// row exists, failures finalize it as FAILED and surface through the
/// report's `status` and `error` fields.
pub async fn run_once(cfg: &Config) -> Result<RunReport> {
    let http = HttpClient::new(&cfg.site.user_agent, cfg.http.clone())?;
    let mut store = SqliteStore::open(Path::new(&cfg.store.database_path), cfg.store.dedupe_strategy)?;
    let run = store.start_run(cfg.run.run_id_override.as_deref())?;

    let execution_time = civil_now().format("%Y-%m-%d %H:%M:%S").to_string();
    let started = Instant::now();
    tracing::info!(run_id = %run.run_id, "run started");

    let mut stats = RunStats::default();
    let mut digest_items: Vec<DigestItem> = Vec::new();
    let outcome = execute(cfg, &http, &mut store, &mut stats, &mut digest_items).await;

    let duration_seconds = started.elapsed().as_secs_f64().round() as i64;
    let info = RunSummaryInfo {
        execution_time: &execution_time,
        keyword_label: keyword_label(cfg),
        total_processed: stats.processed,
        total_new: stats.new,
        total_duplicate: stats.duplicate,
        days_lookback: cfg.run.days_lookback,
    };

    match outcome {
        Ok(item_errors) => {
            // Item-level errors do not fail the run, but their joined text
            // is kept on the run row for later inspection.
            let joined = if item_errors.is_empty() {
                None
            } else {
                Some(truncate_error(&item_errors.join("; ")))
            };
            store.finish_run(
                &run.run_id,
                RunStatus::Completed,
                &now_iso(),
                duration_seconds,
                stats.processed,
                stats.new,
                stats.duplicate,
                joined.as_deref(),
            )?;
            tracing::info!(
                run_id = %run.run_id,
                processed = stats.processed,
                new = stats.new,
                duplicate = stats.duplicate,
                item_errors = item_errors.len(),
                "run completed"
            );

            notify_completion(cfg, &http, &info, &digest_items).await;

            Ok(RunReport {
                status: RunStatus::Completed,
                run_id: run.run_id,
                execution_time,
                duration_seconds,
                total_processed: stats.processed,
                total_new: stats.new,
                total_duplicate: stats.duplicate,
                error: None,
            })
        }
        Err(e) => {
            let error = truncate_error(&e.to_string());
            store.finish_run(
                &run.run_id,
                RunStatus::Failed,
                &now_iso(),
                duration_seconds,
                stats.processed,
                stats.new,
                stats.duplicate,
                Some(&error),
            )?;
            tracing::error!(run_id = %run.run_id, error = %error, "run failed");

            if let Some(webhook) = &cfg.webhook {
                let notifier = Notifier::new(&http, webhook);
                let card = build_error_card(&run.run_id, &execution_time, &error);
                if let Err(send_err) = notifier.send(&card).await {
                    tracing::warn!(error = %send_err, "error card delivery failed");
                }
            }

            Ok(RunReport {
                status: RunStatus::Failed,
                run_id: run.run_id,
                execution_time,
                duration_seconds,
                total_processed: stats.processed,
                total_new: stats.new,
                total_duplicate: stats.duplicate,
                error: Some(error),
            })
        }
    }
}

/// The pipeline body; returns descriptions of non-fatal item-level errors
async fn execute(
    cfg: &Config,
    http: &HttpClient,
    store: &mut SqliteStore,
    stats: &mut RunStats,
    digest_items: &mut Vec<DigestItem>,
) -> Result<Vec<String>> {
    let keyword_re = Regex::new(&cfg.site.keyword_regex)
        .map_err(|e| WatchError::Config(ConfigError::InvalidPattern(e.to_string())))?;
    let base = Url::parse(&cfg.site.base_url)?;

    let today = civil_today();
    let provisional_earliest = earliest_keep(today, cfg.run.days_lookback);
    let collected = collect_list_items(cfg, http, today, provisional_earliest).await?;

    // Stored fixture pages have fixed dates, so the window anchors on the
    // newest date they contain rather than on the wall clock.
    let reference = if cfg.run.fixtures_dir.is_some() {
        collected
            .items
            .iter()
            .filter_map(|item| normalize_date(&item.date_raw, today))
            .max()
            .unwrap_or(today)
    } else {
        today
    };
    let allowed = allowed_dates(reference, cfg.run.days_lookback);

    let mut candidates = filter_candidates(&collected.items, reference, &allowed, &keyword_re);
    if cfg.run.max_items_per_run > 0 {
        candidates.truncate(cfg.run.max_items_per_run as usize);
    }
    tracing::info!(
        collected = collected.items.len(),
        candidates = candidates.len(),
        "filtered list items"
    );

    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let notifier = cfg.webhook.as_ref().map(|w| Notifier::new(http, w));
    let ai = cfg
        .ai
        .as_ref()
        .filter(|a| !a.disabled)
        .map(|a| AiClient::new(http, a));

    let mut item_errors: Vec<String> = Vec::new();
    let mut delay = cfg.run.loop_delay_seconds;
    let adaptive = collected.page_turns > cfg.throttle.adaptive_threshold_pages;
    if adaptive {
        tracing::info!(
            page_turns = collected.page_turns,
            "heavy pagination detected, adaptive throttling enabled"
        );
    }

    for (index, (item, date)) in candidates.iter().enumerate() {
        if index > 0 && delay > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(delay)).await;
        }

        let absolute_url = if item.link.starts_with("http") {
            item.link.clone()
        } else {
            base.join(&item.link)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| item.link.clone())
        };
        let date_str = date.format("%Y-%m-%d").to_string();

        if store.is_duplicate(&item.title, &absolute_url, &date_str)? {
            stats.duplicate += 1;
            stats.processed += 1;
            tracing::debug!(title = %item.title, "duplicate, skipping");
        } else {
            stats.new += 1;
            stats.processed += 1;

            if cfg.run.dry_run {
                tracing::info!(title = %item.title, "dry run, not persisting");
            } else if !store.insert_stub(&item.title, &absolute_url, &date_str)? {
                // Another run inserted the same key between the duplicate
                // check and the insert.
                stats.new -= 1;
                stats.duplicate += 1;
                tracing::debug!(title = %item.title, "lost insert race, counting as duplicate");
            } else {
                match process_item(cfg, http, ai.as_ref(), item, &absolute_url).await {
                    Ok((content, summary)) => {
                        store.update_detail(
                            &item.title,
                            &content,
                            &summary,
                            AnnouncementStatus::Processed,
                        )?;

                        match (&notifier, cfg.webhook.as_ref().map(|w| w.notify_mode)) {
                            (Some(notifier), Some(NotifyMode::PerItem)) => {
                                let digest_item = DigestItem {
                                    title: item.title.clone(),
                                    date: date_str.clone(),
                                    ai_summary: summary,
                                    url: absolute_url.clone(),
                                };
                                let card = build_new_item_card(
                                    &digest_item,
                                    cfg.webhook.as_ref().and_then(|w| w.card_image_url.as_deref()),
                                );
                                if let Err(e) = notifier.send(&card).await {
                                    item_errors.push(format!("{}: notify: {e}", item.title));
                                    tracing::warn!(title = %item.title, error = %e, "item card delivery failed");
                                }
                            }
                            (Some(_), Some(NotifyMode::Digest)) => {
                                digest_items.push(DigestItem {
                                    title: item.title.clone(),
                                    date: date_str.clone(),
                                    ai_summary: summary,
                                    url: absolute_url.clone(),
                                });
                            }
                            _ => {}
                        }

                        // Throttle stepping counts fully processed items
                        // only; duplicates, dry runs, lost races, and failed
                        // items never raise the delay.
                        if adaptive
                            && cfg.throttle.batch_size > 0
                            && stats.processed % cfg.throttle.batch_size == 0
                        {
                            let raised = (delay + cfg.throttle.delay_increment_seconds.max(0.0))
                                .min(cfg.throttle.max_delay_seconds);
                            if raised > delay {
                                delay = raised;
                                tracing::info!(delay_seconds = delay, "raising inter-item delay");
                            }
                        }
                    }
                    Err(e) => {
                        item_errors.push(format!("{}: {e}", item.title));
                        tracing::warn!(title = %item.title, error = %e, "item processing failed");
                        store.update_detail(
                            &item.title,
                            "",
                            SUMMARY_FAILURE_SENTINEL,
                            AnnouncementStatus::Failed,
                        )?;
                    }
                }
            }
        }
    }

    Ok(item_errors)
}

/// Fetches one detail page and produces its content and summary
async fn process_item(
    cfg: &Config,
    http: &HttpClient,
    ai: Option<&AiClient<'_>>,
    item: &ListItem,
    absolute_url: &str,
) -> Result<(String, String)> {
    let html = match &cfg.run.fixtures_dir {
        Some(dir) => std::fs::read_to_string(dir.join("sample_detail.html"))?,
        None => http.get_text(absolute_url).await?,
    };
    let content = extract_detail_content(&html);

    // An empty extraction stores the bare failure marker; the regex fallback
    // only steps in for pages that actually yielded text.
    let summary = if content.is_empty() {
        SUMMARY_FAILURE_SENTINEL.to_string()
    } else {
        let raw = match ai {
            Some(ai) => ai.summarize(&item.title, &content).await,
            None => SUMMARY_FAILURE_SENTINEL.to_string(),
        };
        if raw == SUMMARY_FAILURE_SENTINEL {
            build_fallback_summary(&item.title, &content)
        } else {
            raw
        }
    };

    Ok((content, summary))
}

/// Post-run notification: digest chunks or a per-item-mode summary card
///
/// Delivery failures are logged and swallowed; the run is already COMPLETED.
async fn notify_completion(
    cfg: &Config,
    http: &HttpClient,
    info: &RunSummaryInfo<'_>,
    digest_items: &[DigestItem],
) {
    let Some(webhook) = &cfg.webhook else {
        return;
    };
    if info.total_new == 0 {
        return;
    }
    let notifier = Notifier::new(http, webhook);

    match webhook.notify_mode {
        NotifyMode::Digest => {
            if digest_items.is_empty() {
                return;
            }
            let total = digest_items.len();
            for (chunk_index, chunk) in digest_items.chunks(DIGEST_CHUNK_SIZE).enumerate() {
                let card = build_digest_card(
                    info,
                    &DigestChunk {
                        items: chunk,
                        start_index: chunk_index * DIGEST_CHUNK_SIZE + 1,
                        total,
                    },
                    webhook.public_url.as_deref(),
                );
                if let Err(e) = notifier.send(&card).await {
                    tracing::warn!(chunk = chunk_index, error = %e, "digest card delivery failed");
                }
            }
        }
        NotifyMode::PerItem => {
            let card = build_summary_card(info);
            if let Err(e) = notifier.send(&card).await {
                tracing::warn!(error = %e, "summary card delivery failed");
            }
        }
    }
}

fn keyword_label(cfg: &Config) -> &str {
    cfg.site
        .keywords_label
        .as_deref()
        .unwrap_or(&cfg.site.keyword_regex)
}

fn truncate_error(error: &str) -> String {
    error.chars().take(MAX_ERROR_CHARS).collect()
}

/// Oldest date still inside the lookback window
fn earliest_keep(reference: NaiveDate, days_lookback: u32) -> NaiveDate {
    reference - ChronoDuration::days(i64::from(days_lookback.saturating_sub(1)))
}

/// The window itself: `days_lookback` consecutive days ending at `reference`
fn allowed_dates(reference: NaiveDate, days_lookback: u32) -> HashSet<NaiveDate> {
    (0..days_lookback)
        .map(|offset| reference - ChronoDuration::days(i64::from(offset)))
        .collect()
}

/// Keeps items whose date normalizes into the window and whose title matches
/// the keyword pattern, in list order
fn filter_candidates(
    items: &[ListItem],
    reference: NaiveDate,
    allowed: &HashSet<NaiveDate>,
    keyword_re: &Regex,
) -> Vec<(ListItem, NaiveDate)> {
    items
        .iter()
        .filter_map(|item| {
            let date = normalize_date(&item.date_raw, reference)?;
            if !allowed.contains(&date) || !keyword_re.is_match(&item.title) {
                return None;
            }
            Some((item.clone(), date))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn item(title: &str, date_raw: &str) -> ListItem {
        ListItem {
            title: title.to_string(),
            link: format!("/n/{title}.html"),
            date_raw: date_raw.to_string(),
        }
    }

    #[test]
    fn test_allowed_dates_window() {
        let allowed = allowed_dates(date("2025-03-10"), 2);
        assert_eq!(allowed.len(), 2);
        assert!(allowed.contains(&date("2025-03-10")));
        assert!(allowed.contains(&date("2025-03-09")));
        assert!(!allowed.contains(&date("2025-03-08")));
    }

    #[test]
    fn test_allowed_dates_single_day() {
        let allowed = allowed_dates(date("2025-03-10"), 1);
        assert_eq!(allowed.len(), 1);
        assert!(allowed.contains(&date("2025-03-10")));
    }

    #[test]
    fn test_wider_lookback_is_superset() {
        let narrow = allowed_dates(date("2025-03-10"), 2);
        let wide = allowed_dates(date("2025-03-10"), 7);
        assert!(narrow.is_subset(&wide));
    }

    #[test]
    fn test_filter_candidates_date_and_keyword() {
        let reference = date("2025-03-10");
        let allowed = allowed_dates(reference, 2);
        let keyword_re = Regex::new("(系统|软件|平台)").unwrap();
        let items = vec![
            item("软件采购公告", "2025-03-10"),
            item("绿化养护公告", "2025-03-10"),
            item("平台招标公告", "2025-03-05"),
            item("系统建设公告", "[2025-03-09]"),
            item("软件更新公告", "не дата"),
        ];

        let kept = filter_candidates(&items, reference, &allowed, &keyword_re);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].0.title, "软件采购公告");
        assert_eq!(kept[1].0.title, "系统建设公告");
        assert_eq!(kept[1].1, date("2025-03-09"));
    }

    #[test]
    fn test_earliest_keep() {
        assert_eq!(earliest_keep(date("2025-03-10"), 1), date("2025-03-10"));
        assert_eq!(earliest_keep(date("2025-03-10"), 2), date("2025-03-09"));
        assert_eq!(earliest_keep(date("2025-03-10"), 7), date("2025-03-04"));
    }

    #[test]
    fn test_truncate_error_char_based() {
        let long = "错".repeat(5_000);
        assert_eq!(truncate_error(&long).chars().count(), MAX_ERROR_CHARS);
    }
}
