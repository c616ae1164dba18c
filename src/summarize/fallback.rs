//! Regex fallback summary
//!
//! A deterministic stand-in for the AI summary: pulls the budget, bid
//! deadline, contact name, and phone number out of the body text with fixed
//! patterns. Always succeeds; absent fields are simply omitted.

use super::truncate_chars;
use regex::Regex;
use std::sync::OnceLock;

const MAX_SUMMARY_CHARS: usize = 200;

fn budget_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"预算(?:金额)?[:：\s]*([0-9]+(?:\.[0-9]+)?\s*(?:万元|万|元|人民币|RMB)?)")
            .unwrap()
    })
}

fn deadline_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?:投标|报名)?截止(?:日期|时间)?[:：\s]*([0-9]{4}年[0-9]{1,2}月[0-9]{1,2}日\s*[0-9]{1,2}:[0-9]{2})",
        )
        .unwrap()
    })
}

fn contact_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"联系人[:：\s]*([\x{4e00}-\x{9fff}]{1,6})").unwrap())
}

fn phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{3,4}-\d{7,8}|1\d{10})").unwrap())
}

/// Builds a summary from the title and whatever key fields the body text
/// yields, one labelled line per field
///
/// The body is whitespace-collapsed first so fields split across lines still
/// match. The result never exceeds 200 characters.
pub fn build_fallback_summary(title: &str, content: &str) -> String {
    let text = content.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut parts = vec![format!("项目名称：{title}")];
    if let Some(captures) = budget_re().captures(&text) {
        parts.push(format!("预算金额：{}", captures[1].trim()));
    }
    if let Some(captures) = deadline_re().captures(&text) {
        parts.push(format!("截止日期：{}", captures[1].trim()));
    }
    if let Some(captures) = contact_re().captures(&text) {
        parts.push(format!("联系人：{}", captures[1].trim()));
    }
    if let Some(captures) = phone_re().captures(&text) {
        parts.push(format!("电话：{}", captures[1].trim()));
    }

    let summary = parts.join("\n");
    if summary.chars().count() > MAX_SUMMARY_CHARS {
        let mut truncated = truncate_chars(&summary, MAX_SUMMARY_CHARS - 1);
        truncated.push('…');
        truncated
    } else {
        summary
    }
}
