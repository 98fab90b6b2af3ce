//! Configuration module for Newswire
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use newswire::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("newswire.toml")).unwrap();
//! println!("Crawling {} websites", config.websites.len());
//! ```

mod date_format;
mod parser;
mod types;
mod validation;

// Re-export types
pub use date_format::{DateFormat, DateFormatError};
pub use types::{
    Config, CrawlerConfig, DatabaseConfig, FeedKind, FeedsConfig, FiltersConfig, LoggingConfig,
    QueryPolicy, SelectorConfig, WebsiteConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
pub(crate) use validation::compile_selector;
