use crate::config::types::{Config, CrawlerConfig, FetchConfig, OutputConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fetch_config(&config.fetch)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_http_url("base-url", &config.base_url)?;

    if let Some(seed) = &config.seed {
        validate_http_url("seed", seed)?;
    }

    if config.worker_count < 1 || config.worker_count > 256 {
        return Err(ConfigError::Validation(format!(
            "worker-count must be between 1 and 256, got {}",
            config.worker_count
        )));
    }

    if config.dequeue_timeout == 0 {
        return Err(ConfigError::Validation(
            "dequeue-timeout must be > 0ms".to_string(),
        ));
    }

    if config.min_delay > config.max_delay {
        return Err(ConfigError::Validation(format!(
            "min-delay ({}ms) cannot exceed max-delay ({}ms)",
            config.min_delay, config.max_delay
        )));
    }

    Ok(())
}

/// Validates fetch and retry configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.timeout == 0 {
        return Err(ConfigError::Validation("timeout must be > 0ms".to_string()));
    }

    if config.connect_timeout == 0 {
        return Err(ConfigError::Validation(
            "connect-timeout must be > 0ms".to_string(),
        ));
    }

    if config.backoff_base > config.backoff_cap {
        return Err(ConfigError::Validation(format!(
            "backoff-base ({}ms) cannot exceed backoff-cap ({}ms)",
            config.backoff_base, config.backoff_cap
        )));
    }

    if config.default_retry_after > config.max_retry_after {
        return Err(ConfigError::Validation(format!(
            "default-retry-after ({}ms) cannot exceed max-retry-after ({}ms)",
            config.default_retry_after, config.max_retry_after
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if let Some(contact_url) = &config.contact_url {
        Url::parse(contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.results_path.is_empty() {
        return Err(ConfigError::Validation(
            "results-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates that a URL parses and uses an HTTP(S) scheme
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use HTTP or HTTPS",
            field, value
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' has no host",
            field, value
        )));
    }

    Ok(())
}
