//! Newswire: a per-website news crawler
//!
//! This crate discovers pages on configured news websites, decides which of them
//! are worth visiting, extracts structured article data with per-website CSS
//! selectors, sanitizes the extracted content and stores every new article
//! exactly once. Each website is crawled by its own independent worker.

pub mod config;
pub mod crawler;
pub mod output;
pub mod robots;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Newswire operations
#[derive(Debug, Error)]
pub enum NewswireError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
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

    #[error("Invalid selector for {website}.{field}: {selector}")]
    InvalidSelector {
        website: String,
        field: &'static str,
        selector: String,
    },

    #[error("Invalid regular expression: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("Invalid date format: {0}")]
    DateFormat(#[from] config::DateFormatError),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Newswire operations
pub type Result<T> = std::result::Result<T, NewswireError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlFailure, FailureKind, WorkerOutcome};
pub use storage::Article;
pub use url::{canonicalize, QueryPolicy, UrlFilters};
