use crate::config::types::{
    Config, CrawlerConfig, DatabaseConfig, FeedsConfig, SelectorConfig, WebsiteConfig,
};
use crate::config::DateFormat;
use crate::url::UrlFilters;
use crate::ConfigError;
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

/// Storage drivers this build can open
pub(crate) const SUPPORTED_DRIVERS: &[&str] = &["sqlite"];

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_websites(&config.websites)?;
    validate_database_config(&config.database)?;
    validate_feeds_config(&config.feeds)?;
    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler.user-agent cannot be empty".to_string(),
        ));
    }

    if config.robot_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler.robot-agent cannot be empty".to_string(),
        ));
    }

    if config.request_timeout == 0 {
        return Err(ConfigError::Validation(
            "crawler.request-timeout must be >= 1s".to_string(),
        ));
    }

    if config.max_consecutive_failures == 0 {
        return Err(ConfigError::Validation(
            "crawler.max-consecutive-failures must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_websites(websites: &[WebsiteConfig]) -> Result<(), ConfigError> {
    let mut identifiers = HashSet::new();

    for website in websites {
        if website.identifier.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Website identifier cannot be empty".to_string(),
            ));
        }

        if !identifiers.insert(website.identifier.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate website identifier '{}'",
                website.identifier
            )));
        }

        validate_website(website)?;
    }

    Ok(())
}

fn validate_website(website: &WebsiteConfig) -> Result<(), ConfigError> {
    let start = Url::parse(&website.start_url).map_err(|e| {
        ConfigError::InvalidUrl(format!(
            "Invalid start-url '{}' for {}: {}",
            website.start_url, website.identifier, e
        ))
    })?;

    if start.scheme() != "http" && start.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "start-url '{}' for {} must use HTTP or HTTPS",
            website.start_url, website.identifier
        )));
    }

    if start.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "start-url '{}' for {} has no host",
            website.start_url, website.identifier
        )));
    }

    validate_selectors(&website.identifier, &website.selectors)?;
    DateFormat::new(&website.date_format)?;

    if let Some(filters) = &website.filters {
        UrlFilters::from_config(filters)?;
    }

    Ok(())
}

fn validate_selectors(website: &str, selectors: &SelectorConfig) -> Result<(), ConfigError> {
    let required = [
        ("title", &selectors.title),
        ("content", &selectors.content),
        ("date", &selectors.date),
    ];
    for (field, selector) in required {
        if selector.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Selector {}.{} cannot be empty",
                website, field
            )));
        }
        compile_selector(website, field, selector)?;
    }

    let optional = [
        ("description", &selectors.description),
        ("author", &selectors.author),
        ("thumbnail", &selectors.thumbnail),
    ];
    for (field, selector) in optional {
        if let Some(selector) = selector {
            compile_selector(website, field, selector)?;
        }
    }

    Ok(())
}

/// Compiles a CSS selector, naming the offending website field on failure
pub(crate) fn compile_selector(
    website: &str,
    field: &'static str,
    selector: &str,
) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|_| ConfigError::InvalidSelector {
        website: website.to_string(),
        field,
        selector: selector.to_string(),
    })
}

fn validate_database_config(config: &DatabaseConfig) -> Result<(), ConfigError> {
    if !SUPPORTED_DRIVERS.contains(&config.driver.as_str()) {
        return Err(ConfigError::Validation(format!(
            "Unsupported database driver '{}' (supported: {})",
            config.driver,
            SUPPORTED_DRIVERS.join(", ")
        )));
    }

    if config.connection.trim().is_empty() {
        return Err(ConfigError::Validation(
            "database.connection cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_feeds_config(config: &FeedsConfig) -> Result<(), ConfigError> {
    if config.nb_items == 0 {
        return Err(ConfigError::Validation(
            "feeds.nb-items must be >= 1".to_string(),
        ));
    }

    if config.port == 0 {
        return Err(ConfigError::Validation(
            "feeds.port cannot be 0".to_string(),
        ));
    }

    if config.interface.trim().is_empty() {
        return Err(ConfigError::Validation(
            "feeds.interface cannot be empty".to_string(),
        ));
    }

    Ok(())
}
