//! Storage module for persisting articles
//!
//! This module implements the persistence gateway consumed by crawl workers:
//! - SQLite database initialization and schema management
//! - Loading the URLs of already stored articles for a website
//! - Saving articles exactly once per website and URL
//! - Run tracking for reporting

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{ArticleStore, StorageError, StorageResult};

use crate::config::DatabaseConfig;
use chrono::NaiveDateTime;
use std::path::Path;

/// Text layout used to store article dates
pub const DATE_STORAGE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Opens the store described by the database configuration
///
/// Every call returns an independent handle, so each worker can own one.
pub fn open_store(config: &DatabaseConfig) -> Result<SqliteStorage, StorageError> {
    match config.driver.as_str() {
        "sqlite" => SqliteStorage::new(Path::new(&config.connection)),
        other => Err(StorageError::UnsupportedDriver(other.to_string())),
    }
}

/// A news article extracted from a website
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub website: String,
    /// Canonical URL of the article page
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    /// Sanitized HTML content
    pub content: String,
    pub author: Option<String>,
    pub date: NaiveDateTime,
}

/// Represents a crawl run of one website
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub website: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub articles_saved: u64,
    pub failures: u64,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Aborted,
    Interrupted,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
            Self::Interrupted => "interrupted",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "aborted" => Some(Self::Aborted),
            "interrupted" => Some(Self::Interrupted),
            _ => None,
        }
    }
}
