//! Statistics generation from the article database
//!
//! This module provides functionality for extracting and displaying
//! per-website article counts and run history from the storage layer.

use crate::storage::{ArticleStore, RunRecord, StorageResult};

/// Statistics of one website
#[derive(Debug, Clone)]
pub struct WebsiteStatistics {
    pub website: String,

    /// Number of articles stored for the website
    pub articles: u64,

    /// Most recent crawl run, if the website was ever crawled
    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from storage
///
/// Websites are reported in the given order, followed by any website that
/// only exists in the database.
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `websites` - Website identifiers from the configuration
pub fn load_statistics(
    storage: &dyn ArticleStore,
    websites: &[&str],
) -> StorageResult<Vec<WebsiteStatistics>> {
    let mut ids: Vec<String> = websites.iter().map(|w| w.to_string()).collect();
    for stored in storage.list_websites()? {
        if !ids.contains(&stored) {
            ids.push(stored);
        }
    }

    ids.into_iter()
        .map(|website| {
            Ok(WebsiteStatistics {
                articles: storage.count_articles(&website)?,
                latest_run: storage.get_latest_run(&website)?,
                website,
            })
        })
        .collect()
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &[WebsiteStatistics]) {
    println!("=== Article Statistics ===\n");

    let total: u64 = stats.iter().map(|s| s.articles).sum();
    println!("Overview:");
    println!("  Websites: {}", stats.len());
    println!("  Total articles: {}", total);
    println!();

    for website in stats {
        println!("{}:", website.website);
        println!("  Articles: {}", website.articles);

        match &website.latest_run {
            Some(run) => {
                println!(
                    "  Last run: #{} {} ({})",
                    run.id,
                    run.status.to_db_string(),
                    run.started_at
                );
                if let Some(finished) = &run.finished_at {
                    println!("  Finished: {}", finished);
                }
                println!(
                    "  Saved: {}, failures: {}",
                    run.articles_saved, run.failures
                );
            }
            None => println!("  Never crawled"),
        }
        println!();
    }
}
