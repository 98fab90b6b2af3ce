use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Newswire
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub websites: Vec<WebsiteConfig>,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub feeds: FeedsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Looks up a website by its identifier
    pub fn website(&self, identifier: &str) -> Option<&WebsiteConfig> {
        self.websites.iter().find(|w| w.identifier == identifier)
    }
}

/// Global crawler settings, used as defaults for every website
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// User agent sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Agent name matched against robots.txt groups
    #[serde(rename = "robot-agent")]
    pub robot_agent: String,

    /// Default minimum time between two requests to a website (milliseconds)
    #[serde(rename = "crawl-delay")]
    pub crawl_delay: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Consecutive storage failures after which a worker gives up
    #[serde(
        rename = "max-consecutive-failures",
        default = "default_max_consecutive_failures"
    )]
    pub max_consecutive_failures: u32,
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_consecutive_failures() -> u32 {
    5
}

/// Configuration of a single crawled website
#[derive(Debug, Clone, Deserialize)]
pub struct WebsiteConfig {
    /// Unique identifier, stored alongside every article
    pub identifier: String,

    /// Page the crawl starts from
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Overrides the global user agent
    #[serde(rename = "user-agent", default)]
    pub user_agent: Option<String>,

    /// Overrides the global robot agent
    #[serde(rename = "robot-agent", default)]
    pub robot_agent: Option<String>,

    /// Overrides the global crawl delay (milliseconds)
    #[serde(rename = "crawl-delay", default)]
    pub crawl_delay: Option<u64>,

    /// CSS selectors locating the article fields
    pub selectors: SelectorConfig,

    /// Date layout, written with the `{TOKEN}` placeholders of [`DateFormat`]
    ///
    /// [`DateFormat`]: crate::config::DateFormat
    #[serde(rename = "date-format")]
    pub date_format: String,

    /// Maximum number of pages fetched per run (0 means unbounded)
    #[serde(rename = "max-visits", default)]
    pub max_visits: u32,

    /// How the query string takes part in URL canonicalization
    #[serde(default)]
    pub query: Option<QueryPolicy>,

    /// Regular expressions restricting which URLs get enqueued
    #[serde(default)]
    pub filters: Option<FiltersConfig>,
}

impl WebsiteConfig {
    pub fn effective_user_agent<'a>(&'a self, crawler: &'a CrawlerConfig) -> &'a str {
        self.user_agent.as_deref().unwrap_or(&crawler.user_agent)
    }

    pub fn effective_robot_agent<'a>(&'a self, crawler: &'a CrawlerConfig) -> &'a str {
        self.robot_agent.as_deref().unwrap_or(&crawler.robot_agent)
    }

    pub fn effective_crawl_delay(&self, crawler: &CrawlerConfig) -> Duration {
        Duration::from_millis(self.crawl_delay.unwrap_or(crawler.crawl_delay))
    }
}

/// Named CSS selectors for the fields of an article
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    pub title: String,
    pub content: String,
    pub date: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

/// Query string handling policy
///
/// A query key is dropped when `ignore_all` is set and the key is not listed in
/// `except`, or when `ignore_all` is unset and the key is listed in `except`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QueryPolicy {
    #[serde(rename = "ignore-all", default)]
    pub ignore_all: bool,

    #[serde(default)]
    pub except: Vec<String>,
}

impl QueryPolicy {
    /// Returns true if the given query key must be removed from the URL
    pub fn drops(&self, key: &str) -> bool {
        let excepted = self.except.iter().any(|e| e == key);
        self.ignore_all != excepted
    }
}

/// Raw restrict/exclude regular expressions, compiled into [`UrlFilters`]
///
/// [`UrlFilters`]: crate::url::UrlFilters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FiltersConfig {
    #[serde(default)]
    pub restrict: Option<String>,
    #[serde(default)]
    pub exclude: Option<String>,
}

/// Persistence backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Storage driver name; only "sqlite" is supported
    pub driver: String,

    /// Driver-specific connection string (the database file path for SQLite)
    pub connection: String,
}

/// Kind of feed served by the feed generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    Rss,
    Atom,
}

/// Feed generator settings, consumed by the external feed server
#[derive(Debug, Clone, Deserialize)]
pub struct FeedsConfig {
    pub kind: FeedKind,

    /// Maximum number of items per feed
    #[serde(rename = "nb-items")]
    pub nb_items: u32,

    pub interface: String,
    pub port: u16,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            kind: FeedKind::Rss,
            nb_items: 20,
            interface: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Log formatting options
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Enables debug-level output for this crate
    #[serde(default)]
    pub debug: bool,

    /// Renders timestamps in UTC with nanosecond precision
    #[serde(rename = "utc-timestamps", default = "default_true")]
    pub utc_timestamps: bool,

    /// Colored output
    #[serde(default = "default_true")]
    pub ansi: bool,
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            debug: false,
            utc_timestamps: true,
            ansi: true,
        }
    }
}
