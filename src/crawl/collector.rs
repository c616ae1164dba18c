//! List collection across the category tree

use crate::config::Config;
use crate::dates::normalize_date;
use crate::fetch::HttpClient;
use crate::parse::{
    parse_category_links, parse_list_page, parse_next_page_url, parse_notice_list_page,
    parse_zcpt_list_page, ListItem,
};
use crate::Result;
use chrono::NaiveDate;
use regex::Regex;
use std::collections::{HashSet, VecDeque};
use std::sync::OnceLock;
use url::Url;

/// Everything the crawl produced, with the page accounting the adaptive
/// throttle keys off
#[derive(Debug, Default)]
pub struct CollectedList {
    pub items: Vec<ListItem>,
    pub pages_seen: usize,
    pub page_turns: u32,
}

fn zcpt_total_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"var\s+total\s*=\s*(\d+)").unwrap())
}

fn zcpt_page_size_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"pageSize\s*:\s*(\d+)").unwrap())
}

/// Collects announcement rows from the start page and the category tree
///
/// The start page is fetched exactly once and parsed with every list shape;
/// a failure there fails the whole run, since nothing can be collected
/// without it. Category pages discovered from the start page are then walked
/// breadth-first, paginating each branch until its items fall out of the
/// date window or a budget is hit; failures inside a branch abandon only
/// that branch. Items are deduplicated on the exact (title, link, date text)
/// triple, first occurrence kept.
///
/// When a fixtures directory is configured the network is bypassed entirely
/// and a single stored list page is parsed instead.
pub async fn collect_list_items(
    cfg: &Config,
    http: &HttpClient,
    reference: NaiveDate,
    earliest_keep: NaiveDate,
) -> Result<CollectedList> {
    if let Some(dir) = &cfg.run.fixtures_dir {
        let html = std::fs::read_to_string(dir.join("sample_list.html"))?;
        tracing::info!("using stored list page instead of the live site");
        return Ok(CollectedList {
            items: parse_list_page(&html),
            pages_seen: 1,
            page_turns: 0,
        });
    }

    let start_html = http.get_text(&cfg.site.list_url).await?;
    tracing::info!(url = %cfg.site.list_url, "fetched start page");

    let mut collected = CollectedList {
        pages_seen: 1,
        ..CollectedList::default()
    };
    let mut seen_triples: HashSet<(String, String, String)> = HashSet::new();
    absorb_items(
        parse_list_page(&start_html)
            .into_iter()
            .chain(parse_notice_list_page(&start_html))
            .chain(parse_zcpt_list_page(&start_html)),
        &mut collected,
        &mut seen_triples,
    );

    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(cfg.site.list_url.clone());
    let mut queue: VecDeque<String> = VecDeque::new();
    for link in parse_category_links(&start_html, &cfg.site.base_url) {
        if visited.insert(link.clone()) {
            queue.push_back(link);
        }
    }
    tracing::debug!(categories = queue.len(), "discovered categories");

    while let Some(category_url) = queue.pop_front() {
        if collected.pages_seen >= cfg.crawl.max_pages_total as usize {
            tracing::warn!(
                budget = cfg.crawl.max_pages_total,
                "total page budget reached, stopping crawl"
            );
            break;
        }

        crawl_branch(
            cfg,
            http,
            &category_url,
            reference,
            earliest_keep,
            &mut collected,
            &mut seen_triples,
            &mut visited,
        )
        .await;

        // A second look at the branch root picks up category links for
        // deeper levels of the tree. Failures here cost nothing but depth.
        if let Ok(html) = http.get_text(&category_url).await {
            for link in parse_category_links(&html, &cfg.site.base_url) {
                if visited.insert(link.clone()) {
                    queue.push_back(link);
                }
            }
        }
    }

    tracing::info!(
        items = collected.items.len(),
        pages_seen = collected.pages_seen,
        page_turns = collected.page_turns,
        "crawl finished"
    );
    Ok(collected)
}

/// Appends items not yet seen under the exact-triple key, in order
fn absorb_items(
    items: impl IntoIterator<Item = ListItem>,
    collected: &mut CollectedList,
    seen_triples: &mut HashSet<(String, String, String)>,
) {
    for item in items {
        let key = (
            item.title.clone(),
            item.link.clone(),
            item.date_raw.clone(),
        );
        if seen_triples.insert(key) {
            collected.items.push(item);
        }
    }
}

/// Pages through one category branch
///
/// A fetch failure ends this branch only; the caller continues with the
/// next queued category.
#[allow(clippy::too_many_arguments)]
async fn crawl_branch(
    cfg: &Config,
    http: &HttpClient,
    category_url: &str,
    reference: NaiveDate,
    earliest_keep: NaiveDate,
    collected: &mut CollectedList,
    seen_triples: &mut HashSet<(String, String, String)>,
    visited: &mut HashSet<String>,
) {
    let mut current_url = category_url.to_string();
    let mut pages_in_branch = 0usize;

    loop {
        if collected.pages_seen >= cfg.crawl.max_pages_total as usize
            || pages_in_branch >= cfg.crawl.max_pages_per_category as usize
        {
            break;
        }

        let html = match http.get_text(&current_url).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(url = %current_url, error = %e, "branch fetch failed, abandoning branch");
                break;
            }
        };
        collected.pages_seen += 1;
        pages_in_branch += 1;

        let legacy = parse_list_page(&html);
        let notice = parse_notice_list_page(&html);
        let zcpt = parse_zcpt_list_page(&html);

        // The stop decision keys on the shape that yielded items: zcpt pages
        // are not date-sorted, so only an entirely stale page stops paging;
        // notice pages are sorted descending, so the oldest row decides.
        // Legacy rows never stop a branch, they may be stale sidebar links.
        let stop = if !zcpt.is_empty() {
            zcpt_should_stop(&page_dates(&zcpt, reference), earliest_keep)
        } else if !notice.is_empty() {
            ordered_should_stop(&page_dates(&notice, reference), earliest_keep)
        } else {
            false
        };

        absorb_items(
            legacy.into_iter().chain(notice).chain(zcpt),
            collected,
            seen_triples,
        );

        if stop {
            tracing::debug!(url = %current_url, "page fell out of the date window, stopping branch");
            break;
        }

        let next = parse_next_page_url(&html, &current_url)
            .or_else(|| zcpt_next_page_url(&html, &current_url));
        match next {
            Some(next_url) if visited.insert(next_url.clone()) => {
                collected.page_turns += 1;
                current_url = next_url;
            }
            _ => break,
        }
    }
}

fn page_dates(items: &[ListItem], reference: NaiveDate) -> Vec<Option<NaiveDate>> {
    items
        .iter()
        .map(|item| normalize_date(&item.date_raw, reference))
        .collect()
}

/// Stop rule for date-sorted layouts: stop once the oldest date on the page
/// precedes the window. Skipped entirely when any date fails to parse.
fn ordered_should_stop(dates: &[Option<NaiveDate>], earliest_keep: NaiveDate) -> bool {
    if dates.is_empty() || dates.iter().any(Option::is_none) {
        return false;
    }
    dates
        .iter()
        .flatten()
        .min()
        .map(|d| *d < earliest_keep)
        .unwrap_or(false)
}

/// Stop rule for unsorted zcpt layouts: stop only when even the newest date
/// on the page precedes the window
fn zcpt_should_stop(dates: &[Option<NaiveDate>], earliest_keep: NaiveDate) -> bool {
    dates
        .iter()
        .flatten()
        .max()
        .map(|d| *d < earliest_keep)
        .unwrap_or(false)
}

/// Computes the next zcpt page URL from the inline pagination script
///
/// zcpt pages carry `var total = N` and `pageSize: M` in script text and
/// paginate via a `pageIndex` query parameter (1-based, absent on the first
/// page).
fn zcpt_next_page_url(html: &str, current_url: &str) -> Option<String> {
    let total: u64 = zcpt_total_re().captures(html)?[1].parse().ok()?;
    let page_size: u64 = zcpt_page_size_re().captures(html)?[1].parse().ok()?;
    if page_size == 0 {
        return None;
    }
    let total_pages = total.div_ceil(page_size);

    let url = Url::parse(current_url).ok()?;
    let current_index: u64 = url
        .query_pairs()
        .find(|(k, _)| k == "pageIndex")
        .and_then(|(_, v)| v.parse().ok())
        .unwrap_or(1);
    if current_index >= total_pages {
        return None;
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "pageIndex")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let mut next = url.clone();
    next.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("pageIndex", &(current_index + 1).to_string());
    Some(next.to_string())
}
