//! Newswire main entry point
//!
//! This is the command-line interface for the Newswire news crawler.

use anyhow::Context;
use clap::Parser;
use newswire::config::{load_config_with_hash, Config, LoggingConfig};
use newswire::crawler::Orchestrator;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::EnvFilter;

/// Newswire: a per-website news crawler
///
/// Newswire crawls the configured news websites, extracts articles with
/// per-website CSS selectors and stores every new article exactly once.
#[derive(Parser, Debug)]
#[command(name = "newswire")]
#[command(version)]
#[command(about = "A per-website news crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show article statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Only crawl the websites with these identifiers
    #[arg(long, value_name = "IDENTIFIER", num_args = 1..)]
    only: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging options live in the config, so it is loaded first
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("cannot load configuration {}", cli.config.display()))?;

    setup_logging(&config.logging, cli.verbose, cli.quiet);
    tracing::info!(path = %cli.config.display(), hash = %config_hash, "Configuration loaded");

    if cli.dry_run {
        handle_dry_run(&config, &cli.only)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(config, config_hash, cli.only).await
    }
}

/// Sets up the logging/tracing subscriber from the config and verbosity level
fn setup_logging(logging: &LoggingConfig, verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match (verbose, logging.debug) {
            (0, false) => EnvFilter::new("newswire=info,warn"),
            (0, true) | (1, _) => EnvFilter::new("newswire=debug,info"),
            (2, _) => EnvFilter::new("newswire=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(logging.ansi);

    if logging.utc_timestamps {
        builder
            .with_timer(ChronoUtc::new("%Y-%m-%dT%H:%M:%S%.9fZ".to_string()))
            .init();
    } else {
        builder.init();
    }
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, only: &[String]) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new(Arc::new(config.clone()), "").with_only(only.to_vec());
    let websites = orchestrator.selected_websites()?;

    println!("=== Newswire Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  User agent: {}", config.crawler.user_agent);
    println!("  Robot agent: {}", config.crawler.robot_agent);
    println!("  Crawl delay: {}ms", config.crawler.crawl_delay);
    println!("  Request timeout: {}s", config.crawler.request_timeout);
    println!(
        "  Max consecutive failures: {}",
        config.crawler.max_consecutive_failures
    );

    println!("\nDatabase:");
    println!("  Driver: {}", config.database.driver);
    println!("  Connection: {}", config.database.connection);

    println!("\nWebsites ({}):", websites.len());
    for website in &websites {
        println!("  - {} ({})", website.identifier, website.start_url);
        println!(
            "    delay: {}ms, max visits: {}",
            website.effective_crawl_delay(&config.crawler).as_millis(),
            match website.max_visits {
                0 => "unbounded".to_string(),
                n => n.to_string(),
            }
        );
        if let Some(filters) = &website.filters {
            if let Some(restrict) = &filters.restrict {
                println!("    restrict: {}", restrict);
            }
            if let Some(exclude) = &filters.exclude {
                println!("    exclude: {}", exclude);
            }
        }
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start {} crawl workers", websites.len());

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use newswire::output::{load_statistics, print_statistics};
    use newswire::storage::open_store;

    println!("Database: {}\n", config.database.connection);

    let storage = open_store(&config.database).context("cannot open the article database")?;

    let websites: Vec<&str> = config
        .websites
        .iter()
        .map(|w| w.identifier.as_str())
        .collect();
    let stats = load_statistics(&storage, &websites)?;

    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String, only: Vec<String>) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new(Arc::new(config), config_hash).with_only(only);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping workers");
            let _ = shutdown_tx.send(true);
        }
    });

    let report = orchestrator.run(shutdown_rx).await?;

    for (website, outcome) in &report.outcomes {
        println!("{}: {}", website, outcome);
        for failure in report.failures_for(website) {
            println!("  - {}", failure);
        }
        let omitted = report.failure_count(website) - report.failures_for(website).len();
        if omitted > 0 {
            println!("  ... and {} more failures", omitted);
        }
    }

    let aborted = report.aborted();
    if aborted.is_empty() {
        tracing::info!(
            articles_saved = report.total_articles_saved(),
            "Crawl completed"
        );
        Ok(())
    } else {
        anyhow::bail!("crawl aborted for: {}", aborted.join(", "))
    }
}
