//! Announcement summarization
//!
//! Two summarizers share one contract: given a title and the extracted body
//! text, produce a short Chinese digest line. The AI path calls an
//! OpenAI-compatible chat endpoint and degrades to a sentinel string on any
//! failure; the fallback path extracts key fields with regexes and never
//! fails. For pages that yielded any text the workflow substitutes the
//! fallback whenever the AI path is disabled, unconfigured, or returns the
//! sentinel; an empty extraction stores the sentinel itself.

mod ai;
mod fallback;

pub use ai::AiClient;
pub use fallback::build_fallback_summary;

/// Marker stored in place of a summary when summarization failed outright
pub const SUMMARY_FAILURE_SENTINEL: &str = "AI 总结失败";

/// Truncates to a maximum number of characters, not bytes
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
