//! Detail-page content extraction

use scraper::{ElementRef, Html, Selector};

/// Known content containers across the site's layout generations, tried in
/// order.
const CONTENT_SELECTORS: &[&str] = &[
    ".article-content",
    "div.article-content",
    ".ewb-article",
    "div.ewb-article",
    ".Content",
    "div.Content",
    "#content",
    "div#content",
    ".content",
    "div.content",
];

fn block_text(el: ElementRef) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extracts the textual content of an announcement detail page
///
/// Tries the known content-container selectors first; when none matches,
/// falls back to the largest `<div>` that carries the publish-time marker.
/// Returns an empty string when nothing is found; the caller substitutes a
/// sentinel summary in that case rather than failing.
pub fn extract_detail_content(html: &str) -> String {
    let document = Html::parse_document(html);

    for selector in CONTENT_SELECTORS {
        let Ok(sel) = Selector::parse(selector) else {
            continue;
        };
        if let Some(node) = document.select(&sel).next() {
            let text = block_text(node);
            if !text.is_empty() {
                return text;
            }
        }
    }

    // Heuristic fallback: largest div that mentions the publish marker.
    let Ok(div_selector) = Selector::parse("div") else {
        return String::new();
    };
    let mut best = String::new();
    for div in document.select(&div_selector) {
        let text = block_text(div);
        if text.is_empty() || !text.contains("发布时间") {
            continue;
        }
        if text.len() > best.len() {
            best = text;
        }
    }
    best
}
