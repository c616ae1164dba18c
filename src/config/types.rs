use crate::storage::DedupeStrategy;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Main configuration structure for Tender-Watch
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub crawl: CrawlLimits,
    #[serde(default)]
    pub throttle: ThrottleConfig,
    #[serde(default)]
    pub ai: Option<AiConfig>,
    #[serde(default)]
    pub webhook: Option<WebhookConfig>,

    /// Unknown top-level keys, kept for forward compatibility
    #[serde(flatten)]
    pub extra: HashMap<String, toml::Value>,
}

/// Target site configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// URL of the announcement listing start page
    #[serde(rename = "list-url")]
    pub list_url: String,

    /// Base origin for resolving relative announcement links
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// User agent sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Title keyword pattern (regex, substring search semantics)
    #[serde(rename = "keyword-regex", default = "default_keyword_regex")]
    pub keyword_regex: String,

    /// Human-readable label for the keyword set, used in digest headers
    #[serde(rename = "keywords-label", default)]
    pub keywords_label: Option<String>,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Active uniqueness key for announcements
    #[serde(rename = "dedupe-strategy")]
    pub dedupe_strategy: DedupeStrategy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: "data/tender.db".to_string(),
            dedupe_strategy: DedupeStrategy::Title,
        }
    }
}

/// Per-run behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Lookback window in days, inclusive of the reference date
    #[serde(rename = "days-lookback")]
    pub days_lookback: u32,

    /// Cap on items ingested per run (0 = unlimited)
    #[serde(rename = "max-items-per-run")]
    pub max_items_per_run: u32,

    /// Base inter-item delay in seconds
    #[serde(rename = "loop-delay-seconds")]
    pub loop_delay_seconds: f64,

    /// Classify and count items without persisting or fetching details
    #[serde(rename = "dry-run")]
    pub dry_run: bool,

    /// Force the run id instead of generating one (used by external schedulers)
    #[serde(rename = "run-id-override")]
    pub run_id_override: Option<String>,

    /// When set, list/detail pages are read from this directory instead of the
    /// network, and the filter reference date becomes the newest item date
    #[serde(rename = "fixtures-dir")]
    pub fixtures_dir: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            days_lookback: 2,
            max_items_per_run: 50,
            loop_delay_seconds: 1.0,
            dry_run: false,
            run_id_override: None,
            fixtures_dir: None,
        }
    }
}

/// HTTP transport configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    #[serde(rename = "retry-count")]
    pub retry_count: u32,

    #[serde(rename = "retry-interval-ms")]
    pub retry_interval_ms: u64,

    /// Optional relay indirection for one restricted origin
    pub relay: Option<RelayConfig>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            retry_count: 3,
            retry_interval_ms: 2_000,
            relay: None,
        }
    }
}

/// Relay indirection: requests to `host` are sent as a payload to
/// `endpoint-url` with a bearer credential instead of going direct.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    pub host: String,

    #[serde(rename = "endpoint-url")]
    pub endpoint_url: String,

    pub token: String,
}

/// Crawl page budgets
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlLimits {
    /// Global budget on pages visited across all categories
    #[serde(rename = "max-pages-total")]
    pub max_pages_total: u32,

    /// Pagination budget within a single category branch
    #[serde(rename = "max-pages-per-category")]
    pub max_pages_per_category: u32,
}

impl Default for CrawlLimits {
    fn default() -> Self {
        Self {
            max_pages_total: 200,
            max_pages_per_category: 50,
        }
    }
}

/// Adaptive throttling for large runs
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Page-turn count above which adaptive throttling kicks in
    #[serde(rename = "adaptive-threshold-pages")]
    pub adaptive_threshold_pages: u32,

    /// Processed-item count between delay increases
    #[serde(rename = "batch-size")]
    pub batch_size: u32,

    #[serde(rename = "delay-increment-seconds")]
    pub delay_increment_seconds: f64,

    #[serde(rename = "max-delay-seconds")]
    pub max_delay_seconds: f64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            adaptive_threshold_pages: 10,
            batch_size: 50,
            delay_increment_seconds: 1.0,
            max_delay_seconds: 10.0,
        }
    }
}

/// Summarizer backend configuration (OpenAI-style chat completions)
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    #[serde(rename = "api-key")]
    pub api_key: String,

    #[serde(rename = "base-url", default = "default_ai_base_url")]
    pub base_url: String,

    #[serde(default = "default_ai_model")]
    pub model: String,

    #[serde(default = "default_ai_temperature")]
    pub temperature: f64,

    #[serde(rename = "timeout-ms", default = "default_ai_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(rename = "retry-count", default = "default_ai_retry_count")]
    pub retry_count: u32,

    #[serde(rename = "retry-interval-ms", default = "default_ai_retry_interval_ms")]
    pub retry_interval_ms: u64,

    /// Keep the section but skip summarization (fallback summaries only)
    #[serde(default)]
    pub disabled: bool,
}

/// Chat webhook configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    pub url: String,

    #[serde(rename = "notify-mode", default)]
    pub notify_mode: NotifyMode,

    /// Optional banner image shown at the top of digest cards
    #[serde(rename = "card-image-url", default)]
    pub card_image_url: Option<String>,

    /// Public dashboard URL used for "view all" links in digest cards
    #[serde(rename = "public-url", default)]
    pub public_url: Option<String>,
}

/// Notification delivery mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotifyMode {
    /// Buffer new items and send chunked digest cards at end of run
    #[default]
    Digest,
    /// Send one card per new item as it is processed
    PerItem,
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/120.0.0.0 Safari/537.36".to_string()
}

fn default_keyword_regex() -> String {
    "(系统|软件|平台|大数据|AI|采购|招标)".to_string()
}

fn default_ai_base_url() -> String {
    "https://api.yuweixun.site/v1".to_string()
}

fn default_ai_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_ai_temperature() -> f64 {
    0.5
}

fn default_ai_timeout_ms() -> u64 {
    60_000
}

fn default_ai_retry_count() -> u32 {
    2
}

fn default_ai_retry_interval_ms() -> u64 {
    3_000
}
