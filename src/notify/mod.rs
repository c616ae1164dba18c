//! Webhook notifications
//!
//! Sends interactive cards to a configured webhook. Card layout lives in
//! [`cards`]; this module only carries the transport. Notification failures
//! are surfaced as errors to the caller, which treats them as non-fatal for
//! the run.

mod cards;

pub use cards::{
    build_digest_card, build_error_card, build_new_item_card, build_summary_card, DigestChunk,
    DigestItem, RunSummaryInfo,
};

use crate::config::WebhookConfig;
use crate::fetch::HttpClient;
use crate::Result;
use serde_json::Value;

const WEBHOOK_TIMEOUT_MS: u64 = 10_000;
const WEBHOOK_RETRY_COUNT: u32 = 2;
const WEBHOOK_RETRY_INTERVAL_MS: u64 = 1_000;

/// Sends cards to the configured webhook
pub struct Notifier<'a> {
    http: &'a HttpClient,
    cfg: &'a WebhookConfig,
}

impl<'a> Notifier<'a> {
    pub fn new(http: &'a HttpClient, cfg: &'a WebhookConfig) -> Self {
        Self { http, cfg }
    }

    /// Posts one card, retrying on failure
    pub async fn send(&self, card: &Value) -> Result<()> {
        self.http
            .post_json(
                &self.cfg.url,
                None,
                card,
                WEBHOOK_TIMEOUT_MS,
                WEBHOOK_RETRY_COUNT,
                WEBHOOK_RETRY_INTERVAL_MS,
            )
            .await?;
        Ok(())
    }
}
