use crate::config::types::{AiConfig, Config, HttpConfig, RelayConfig, WebhookConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site(config)?;
    validate_run(config)?;
    validate_http(&config.http)?;
    validate_crawl(config)?;
    validate_throttle(config)?;
    if let Some(ai) = &config.ai {
        validate_ai(ai)?;
    }
    if let Some(webhook) = &config.webhook {
        validate_webhook(webhook)?;
    }
    Ok(())
}

fn validate_site(config: &Config) -> Result<(), ConfigError> {
    Url::parse(&config.site.list_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid list-url: {}", e)))?;
    Url::parse(&config.site.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    regex::Regex::new(&config.site.keyword_regex)
        .map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;

    if config.site.user_agent.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_run(config: &Config) -> Result<(), ConfigError> {
    if config.run.days_lookback < 1 {
        return Err(ConfigError::Validation(format!(
            "days-lookback must be >= 1, got {}",
            config.run.days_lookback
        )));
    }

    if config.run.loop_delay_seconds < 0.0 {
        return Err(ConfigError::Validation(
            "loop-delay-seconds cannot be negative".to_string(),
        ));
    }

    if config.store.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_http(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.retry_count < 1 {
        return Err(ConfigError::Validation(format!(
            "retry-count must be >= 1, got {}",
            config.retry_count
        )));
    }

    if config.timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "timeout-ms must be >= 1".to_string(),
        ));
    }

    if let Some(relay) = &config.relay {
        validate_relay(relay)?;
    }

    Ok(())
}

fn validate_relay(relay: &RelayConfig) -> Result<(), ConfigError> {
    if relay.host.is_empty() {
        return Err(ConfigError::Validation(
            "relay host cannot be empty".to_string(),
        ));
    }
    if relay.token.is_empty() {
        return Err(ConfigError::Validation(
            "relay token cannot be empty".to_string(),
        ));
    }
    Url::parse(&relay.endpoint_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid relay endpoint-url: {}", e)))?;
    Ok(())
}

fn validate_crawl(config: &Config) -> Result<(), ConfigError> {
    if config.crawl.max_pages_total < 1 {
        return Err(ConfigError::Validation(
            "max-pages-total must be >= 1".to_string(),
        ));
    }
    if config.crawl.max_pages_per_category < 1 {
        return Err(ConfigError::Validation(
            "max-pages-per-category must be >= 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_throttle(config: &Config) -> Result<(), ConfigError> {
    if config.throttle.batch_size < 1 {
        return Err(ConfigError::Validation(
            "batch-size must be >= 1".to_string(),
        ));
    }
    if config.throttle.delay_increment_seconds < 0.0 || config.throttle.max_delay_seconds < 0.0 {
        return Err(ConfigError::Validation(
            "throttle delays cannot be negative".to_string(),
        ));
    }
    Ok(())
}

fn validate_ai(ai: &AiConfig) -> Result<(), ConfigError> {
    if !ai.disabled && ai.api_key.trim().is_empty() {
        return Err(ConfigError::Validation(
            "ai api-key is required unless the section is disabled".to_string(),
        ));
    }
    Url::parse(&ai.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid ai base-url: {}", e)))?;
    Ok(())
}

fn validate_webhook(webhook: &WebhookConfig) -> Result<(), ConfigError> {
    Url::parse(&webhook.url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid webhook url: {}", e)))?;
    Ok(())
}
