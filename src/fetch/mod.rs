//! HTTP fetcher
//!
//! All outbound requests go through [`HttpClient`]: text GETs for list and
//! detail pages, and JSON POSTs for the summarizer and webhook backends.
//! Every call retries up to a configured count with a fixed inter-attempt
//! delay. A configured relay reroutes one designated origin through an
//! indirection service, so the same workflow runs from networks with or
//! without direct access to the target site.

use crate::config::{HttpConfig, RelayConfig};
use crate::{Result, WatchError};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

/// HTTP client wrapping reqwest with retry and relay behavior
pub struct HttpClient {
    client: Client,
    cfg: HttpConfig,
}

impl HttpClient {
    /// Builds a client with the configured user agent and timeout
    pub fn new(user_agent: &str, cfg: HttpConfig) -> std::result::Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client, cfg })
    }

    /// Fetches a URL as text, retrying on failure
    ///
    /// If a relay is configured and the URL's host matches the relay's
    /// designated host, the page is fetched through the relay endpoint
    /// instead of directly. Returns the last error once retries are
    /// exhausted.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let relay_payload = self.relay_payload(url);

        let retry_count = self.cfg.retry_count.max(1);
        let mut last_err: Option<reqwest::Error> = None;
        for attempt in 1..=retry_count {
            let result = match (&relay_payload, &self.cfg.relay) {
                (Some(payload), Some(relay)) => self.fetch_via_relay(relay, payload).await,
                _ => self.fetch_direct(url).await,
            };

            match result {
                Ok(body) => return Ok(body),
                Err(e) => {
                    tracing::debug!(url = %url, attempt, error = %e, "fetch attempt failed");
                    last_err = Some(e);
                    if attempt < retry_count {
                        tokio::time::sleep(Duration::from_millis(self.cfg.retry_interval_ms)).await;
                    }
                }
            }
        }

        Err(WatchError::Http {
            url: url.to_string(),
            // retry_count >= 1 is enforced by config validation
            source: last_err.expect("at least one attempt"),
        })
    }

    /// POSTs a JSON payload and parses the JSON response, retrying on failure
    ///
    /// Timeout and retry shape are supplied per call because the summarizer
    /// and notifier backends carry their own budgets.
    pub async fn post_json(
        &self,
        url: &str,
        bearer: Option<&str>,
        payload: &Value,
        timeout_ms: u64,
        retry_count: u32,
        retry_interval_ms: u64,
    ) -> Result<Value> {
        let mut last_err: Option<reqwest::Error> = None;
        for attempt in 1..=retry_count.max(1) {
            let mut req = self
                .client
                .post(url)
                .timeout(Duration::from_millis(timeout_ms))
                .json(payload);
            if let Some(token) = bearer {
                req = req.bearer_auth(token);
            }

            let result = async { req.send().await?.error_for_status()?.json::<Value>().await }.await;

            match result {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::debug!(url = %url, attempt, error = %e, "post attempt failed");
                    last_err = Some(e);
                    if attempt < retry_count {
                        tokio::time::sleep(Duration::from_millis(retry_interval_ms)).await;
                    }
                }
            }
        }

        Err(WatchError::Http {
            url: url.to_string(),
            source: last_err.expect("at least one attempt"),
        })
    }

    async fn fetch_direct(&self, url: &str) -> std::result::Result<String, reqwest::Error> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }

    async fn fetch_via_relay(
        &self,
        relay: &RelayConfig,
        payload: &Value,
    ) -> std::result::Result<String, reqwest::Error> {
        self.client
            .post(&relay.endpoint_url)
            .bearer_auth(&relay.token)
            .json(payload)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }

    /// Builds the relay request payload when the URL targets the relay host
    fn relay_payload(&self, url: &str) -> Option<Value> {
        let relay = self.cfg.relay.as_ref()?;
        let parsed = Url::parse(url).ok()?;
        if parsed.host_str() != Some(relay.host.as_str()) {
            return None;
        }
        Some(json!({
            "path": parsed.path(),
            "query": parsed.query().unwrap_or(""),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with_relay() -> HttpClient {
        HttpClient::new(
            "test-agent",
            HttpConfig {
                timeout_ms: 1_000,
                retry_count: 1,
                retry_interval_ms: 0,
                relay: Some(RelayConfig {
                    host: "restricted.example.com".to_string(),
                    endpoint_url: "https://relay.example.com/relay/fetch".to_string(),
                    token: "tok".to_string(),
                }),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_relay_payload_for_designated_host() {
        let client = client_with_relay();
        let payload = client
            .relay_payload("https://restricted.example.com/jyxx/list.html?pageIndex=2")
            .unwrap();
        assert_eq!(payload["path"], "/jyxx/list.html");
        assert_eq!(payload["query"], "pageIndex=2");
    }

    #[test]
    fn test_no_relay_payload_for_other_hosts() {
        let client = client_with_relay();
        assert!(client.relay_payload("https://example.com/").is_none());
    }

    #[test]
    fn test_no_relay_payload_without_relay_config() {
        let client = HttpClient::new("test-agent", HttpConfig::default()).unwrap();
        assert!(client
            .relay_payload("https://restricted.example.com/x")
            .is_none());
    }
}
