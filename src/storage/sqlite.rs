//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ArticleStore trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ArticleStore, StorageError, StorageResult};
use crate::storage::{Article, RunRecord, RunStatus, DATE_STORAGE_FORMAT};
use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// How long a writer waits for another connection's lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates a database file
    ///
    /// Several handles may be opened on the same file; WAL journaling plus a
    /// busy timeout lets them write concurrently.
    pub fn new(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;

        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn parse_stored_date(value: String) -> StorageResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&value, DATE_STORAGE_FORMAT)
        .map_err(|source| StorageError::InvalidDate { value, source })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        website: row.get(1)?,
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        config_hash: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(RunStatus::Running),
        articles_saved: row.get(6)?,
        failures: row.get(7)?,
    })
}

const RUN_COLUMNS: &str =
    "id, website, started_at, finished_at, config_hash, status, articles_saved, failures";

impl ArticleStore for SqliteStorage {
    // ===== Articles =====

    fn retrieve_article_urls_for_website(&self, website: &str) -> StorageResult<HashSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT url FROM articles WHERE website = ?1")?;

        let urls = stmt
            .query_map(params![website], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;

        Ok(urls)
    }

    fn save_article(&mut self, article: &Article) -> StorageResult<bool> {
        let now = Utc::now().to_rfc3339();
        let inserted = self.conn.execute(
            "INSERT INTO articles (website, url, title, description, content, author, date, discovered_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(website, url) DO NOTHING",
            params![
                article.website,
                article.url,
                article.title,
                article.description,
                article.content,
                article.author,
                article.date.format(DATE_STORAGE_FORMAT).to_string(),
                now
            ],
        )?;

        Ok(inserted > 0)
    }

    fn get_article(&self, website: &str, url: &str) -> StorageResult<Option<Article>> {
        let row = self
            .conn
            .query_row(
                "SELECT website, url, title, description, content, author, date
                 FROM articles WHERE website = ?1 AND url = ?2",
                params![website, url],
                |row| {
                    Ok((
                        Article {
                            website: row.get(0)?,
                            url: row.get(1)?,
                            title: row.get(2)?,
                            description: row.get(3)?,
                            content: row.get(4)?,
                            author: row.get(5)?,
                            date: NaiveDateTime::default(),
                        },
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((mut article, date)) => {
                article.date = parse_stored_date(date)?;
                Ok(Some(article))
            }
            None => Ok(None),
        }
    }

    fn count_articles(&self, website: &str) -> StorageResult<u64> {
        let count: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM articles WHERE website = ?1",
            params![website],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn list_websites(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT website FROM articles
             UNION
             SELECT website FROM runs
             ORDER BY website",
        )?;

        let websites = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(websites)
    }

    // ===== Run Management =====

    fn create_run(&mut self, website: &str, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (website, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![website, now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        articles_saved: u64,
        failures: u64,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, articles_saved = ?3, failures = ?4
             WHERE id = ?5",
            params![status.to_db_string(), now, articles_saved, failures, run_id],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let query = format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS);
        self.conn
            .query_row(&query, params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self, website: &str) -> StorageResult<Option<RunRecord>> {
        let query = format!(
            "SELECT {} FROM runs WHERE website = ?1 ORDER BY id DESC LIMIT 1",
            RUN_COLUMNS
        );
        let run = self
            .conn
            .query_row(&query, params![website], run_from_row)
            .optional()?;
        Ok(run)
    }
}
