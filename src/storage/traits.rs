//! Storage traits and error types
//!
//! This module defines the trait interface for article stores and
//! associated error types.

use crate::storage::{Article, RunRecord, RunStatus};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Unsupported storage driver: {0}")]
    UnsupportedDriver(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Invalid stored date '{value}': {source}")]
    InvalidDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence gateway used by crawl workers
///
/// Every worker owns its own store handle; implementations must tolerate
/// independent handles writing to the same backend concurrently.
pub trait ArticleStore {
    // ===== Articles =====

    /// Returns the URLs of every article already stored for a website
    fn retrieve_article_urls_for_website(&self, website: &str) -> StorageResult<HashSet<String>>;

    /// Stores one article
    ///
    /// Returns `false` when an article with the same website and URL already
    /// exists, in which case nothing is written.
    fn save_article(&mut self, article: &Article) -> StorageResult<bool>;

    /// Gets an article by website and URL
    fn get_article(&self, website: &str, url: &str) -> StorageResult<Option<Article>>;

    /// Counts the articles stored for a website
    fn count_articles(&self, website: &str) -> StorageResult<u64>;

    /// Lists every website that has at least one article or run
    fn list_websites(&self) -> StorageResult<Vec<String>>;

    // ===== Run Management =====

    /// Creates a new crawl run for a website and returns its ID
    fn create_run(&mut self, website: &str, config_hash: &str) -> StorageResult<i64>;

    /// Closes a run with its final status and counters
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        articles_saved: u64,
        failures: u64,
    ) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run of a website
    fn get_latest_run(&self, website: &str) -> StorageResult<Option<RunRecord>>;
}
