use crate::config::types::{
    Config, CrawlerConfig, EntitiesConfig, OutputConfig, RateConfig, RemoteConfig, SeedEntry,
};
use crate::entity::is_valid_entity_type;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_remote_config(&config.remote)?;
    validate_output_config(&config.output)?;
    validate_rate_config(&config.rate)?;
    validate_crawler_config(&config.crawler)?;
    validate_entities_config(&config.entities)?;
    validate_seeds(&config.seeds)?;
    Ok(())
}

/// Validates remote API configuration
fn validate_remote_config(config: &RemoteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must not carry a query or fragment",
            config.base_url
        )));
    }

    // listing-path must join onto the base URL
    config.listing_url()?;

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.root.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output root cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Slowest accepted rate: one request every 1000 seconds
const MIN_RATE_PER_SECOND: f64 = 1e-3;

/// Validates rate budgets
fn validate_rate_config(config: &RateConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("global-per-second", config.global_per_second),
        ("listing-per-second", config.listing_per_second),
    ] {
        if !value.is_finite() || value < MIN_RATE_PER_SECOND {
            return Err(ConfigError::Validation(format!(
                "{} must be a number >= {}, got {}",
                name, MIN_RATE_PER_SECOND, value
            )));
        }
    }

    if config.burst < 1 {
        return Err(ConfigError::Validation(format!(
            "burst must be >= 1, got {}",
            config.burst
        )));
    }

    if config.max_in_flight == Some(0) {
        return Err(ConfigError::Validation(
            "max-in-flight must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler pool sizes and queue bounds
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.fetch_workers < 1 || config.fetch_workers > 64 {
        return Err(ConfigError::Validation(format!(
            "fetch-workers must be between 1 and 64, got {}",
            config.fetch_workers
        )));
    }

    if config.writer_workers < 1 || config.writer_workers > 16 {
        return Err(ConfigError::Validation(format!(
            "writer-workers must be between 1 and 16, got {}",
            config.writer_workers
        )));
    }

    if config.frontier_capacity == 0 {
        return Err(ConfigError::Validation(
            "frontier-capacity must be >= 1".to_string(),
        ));
    }

    if config.max_backlog == 0 || config.max_backlog > config.frontier_capacity {
        return Err(ConfigError::Validation(format!(
            "max-backlog must be between 1 and frontier-capacity ({}), got {}",
            config.frontier_capacity, config.max_backlog
        )));
    }

    Ok(())
}

/// Validates excluded and follow-only entity type lists
fn validate_entities_config(config: &EntitiesConfig) -> Result<(), ConfigError> {
    for entity_type in config.excluded.iter().chain(config.follow_only.iter()) {
        if !is_valid_entity_type(entity_type) {
            return Err(ConfigError::InvalidEntityType(entity_type.clone()));
        }
    }

    if let Some(both) = config
        .excluded
        .iter()
        .find(|t| config.follow_only.contains(t))
    {
        return Err(ConfigError::Validation(format!(
            "Entity type '{}' cannot be both excluded and follow-only",
            both
        )));
    }

    Ok(())
}

/// Validates configured seed items
fn validate_seeds(seeds: &[SeedEntry]) -> Result<(), ConfigError> {
    for seed in seeds {
        seed.to_work_item()
            .map_err(|e| ConfigError::Validation(format!("Invalid seed: {}", e)))?;
    }
    Ok(())
}
