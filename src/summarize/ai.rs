//! AI summarization via an OpenAI-compatible chat endpoint

use super::{truncate_chars, SUMMARY_FAILURE_SENTINEL};
use crate::config::AiConfig;
use crate::fetch::HttpClient;
use serde_json::json;

const SYSTEM_PROMPT: &str = "你是采购公告摘要助手。请用不超过200字的中文总结公告要点，\
优先包含：项目名称、预算金额、投标截止时间、联系人及联系方式。只输出摘要正文。";

/// Upper bound on body text sent in the prompt and on the returned summary
const MAX_CHARS: usize = 4_000;

/// Client for the configured chat-completions backend
pub struct AiClient<'a> {
    http: &'a HttpClient,
    cfg: &'a AiConfig,
}

impl<'a> AiClient<'a> {
    pub fn new(http: &'a HttpClient, cfg: &'a AiConfig) -> Self {
        Self { http, cfg }
    }

    /// Summarizes one announcement, returning the failure sentinel instead
    /// of an error
    ///
    /// Summarization is best-effort: a run never fails because the AI
    /// backend is down, and the caller swaps the sentinel for a regex
    /// fallback summary.
    pub async fn summarize(&self, title: &str, content: &str) -> String {
        let url = format!(
            "{}/chat/completions",
            self.cfg.base_url.trim_end_matches('/')
        );
        let payload = json!({
            "model": self.cfg.model,
            "temperature": self.cfg.temperature,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {
                    "role": "user",
                    "content": format!(
                        "标题：{title}\n\n正文：{}",
                        truncate_chars(content, MAX_CHARS)
                    ),
                },
            ],
        });

        let response = match self
            .http
            .post_json(
                &url,
                Some(&self.cfg.api_key),
                &payload,
                self.cfg.timeout_ms,
                self.cfg.retry_count,
                self.cfg.retry_interval_ms,
            )
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(title = %title, error = %e, "ai summarization failed");
                return SUMMARY_FAILURE_SENTINEL.to_string();
            }
        };

        let Some(text) = response["choices"][0]["message"]["content"].as_str() else {
            tracing::warn!(title = %title, "ai response missing message content");
            return SUMMARY_FAILURE_SENTINEL.to_string();
        };

        let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if cleaned.is_empty() {
            return SUMMARY_FAILURE_SENTINEL.to_string();
        }
        truncate_chars(&cleaned, MAX_CHARS)
    }
}
