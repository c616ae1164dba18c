//! Tender-Watch: a procurement-announcement scraping and notification pipeline
//!
//! This crate crawls a procurement listing site (start page plus a category
//! tree), filters new announcements by recency and keyword, deduplicates them
//! against a SQLite store, fetches and summarizes detail pages, and pushes
//! digest cards to a chat webhook. One invocation of the workflow is one run.

pub mod config;
pub mod crawl;
pub mod dates;
pub mod fetch;
pub mod notify;
pub mod parse;
pub mod storage;
pub mod summarize;
pub mod workflow;

use thiserror::Error;

/// Main error type for Tender-Watch operations
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid keyword pattern: {0}")]
    InvalidPattern(String),
}

/// Result type alias for Tender-Watch operations
pub type Result<T> = std::result::Result<T, WatchError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use storage::{AnnouncementStatus, DedupeStrategy, RunStatus};
pub use workflow::{run_once, RunReport};
