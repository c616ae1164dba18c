//! Configuration loading and validation
//!
//! Configuration is a TOML file with typed sections. Unknown top-level keys
//! are collected into a residual map (and logged at load time) instead of
//! being rejected, so older config files keep working across releases.

mod parser;
mod types;
mod validation;

pub use parser::load_config;
pub use types::{
    AiConfig, Config, CrawlLimits, HttpConfig, NotifyMode, RelayConfig, RunConfig, SiteConfig,
    StoreConfig, ThrottleConfig, WebhookConfig,
};
pub use validation::validate;
