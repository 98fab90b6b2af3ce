//! Runs one worker per configured website and gathers their results
//!
//! Workers are fully independent: each gets its own store handle and its own
//! failure channel. A worker that aborts or fails to start never affects the
//! others.

use crate::config::{Config, WebsiteConfig};
use crate::crawler::failure::{WorkerOutcome, WorkerStats};
use crate::crawler::worker::{spawn_worker, Worker, WorkerHandle};
use crate::storage::open_store;
use crate::ConfigError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Failure messages kept per website; later ones are only counted
pub const MAX_KEPT_FAILURES: usize = 100;

/// Failures received from one website's worker
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FailureLog {
    /// Every failure received, kept or not
    pub total: usize,
    /// The first [`MAX_KEPT_FAILURES`] messages
    pub messages: Vec<String>,
}

impl FailureLog {
    pub fn record(&mut self, message: String) {
        self.total += 1;
        if self.messages.len() < MAX_KEPT_FAILURES {
            self.messages.push(message);
        }
    }

    /// Number of failures counted but not kept
    pub fn omitted(&self) -> usize {
        self.total - self.messages.len()
    }
}

/// Results of crawling every selected website
#[derive(Debug, Default)]
pub struct RunReport {
    /// Outcome per website, in configuration order
    pub outcomes: Vec<(String, WorkerOutcome)>,
    /// Failures received from each website's worker
    pub failures: HashMap<String, FailureLog>,
}

impl RunReport {
    pub fn outcome(&self, website: &str) -> Option<&WorkerOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| id == website)
            .map(|(_, outcome)| outcome)
    }

    /// Websites whose worker aborted
    pub fn aborted(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_aborted())
            .map(|(id, _)| id.as_str())
            .collect()
    }

    pub fn total_articles_saved(&self) -> u64 {
        self.outcomes
            .iter()
            .map(|(_, outcome)| outcome.stats().articles_saved)
            .sum()
    }

    /// Kept failure messages of a website
    pub fn failures_for(&self, website: &str) -> &[String] {
        self.failures
            .get(website)
            .map(|log| log.messages.as_slice())
            .unwrap_or_default()
    }

    /// Failures received from a website, including the ones not kept
    pub fn failure_count(&self, website: &str) -> usize {
        self.failures.get(website).map_or(0, |log| log.total)
    }
}

/// Starts and supervises the website workers
pub struct Orchestrator {
    config: Arc<Config>,
    config_hash: String,
    only: Vec<String>,
}

/// Worker together with the task draining its failure channel
struct Running {
    website: String,
    outcome: JoinHandle<WorkerOutcome>,
    drain: JoinHandle<FailureLog>,
}

impl Orchestrator {
    pub fn new(config: Arc<Config>, config_hash: impl Into<String>) -> Self {
        Self {
            config,
            config_hash: config_hash.into(),
            only: Vec::new(),
        }
    }

    /// Limits the run to the given website identifiers
    pub fn with_only(mut self, only: Vec<String>) -> Self {
        self.only = only;
        self
    }

    /// Websites this orchestrator will crawl
    pub fn selected_websites(&self) -> Result<Vec<&WebsiteConfig>, ConfigError> {
        if self.only.is_empty() {
            return Ok(self.config.websites.iter().collect());
        }

        self.only
            .iter()
            .map(|id| {
                self.config
                    .website(id)
                    .ok_or_else(|| ConfigError::Validation(format!("unknown website '{}'", id)))
            })
            .collect()
    }

    /// Crawls every selected website concurrently until all workers end
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> crate::Result<RunReport> {
        let websites = self.selected_websites()?;
        info!(websites = websites.len(), "Starting crawl workers");

        let mut report = RunReport::default();
        let mut running = Vec::with_capacity(websites.len());

        for website in websites {
            let store = match open_store(&self.config.database) {
                Ok(store) => store,
                Err(e) => {
                    error!(website = %website.identifier, error = %e, "Cannot open store");
                    let reason = format!("cannot open store: {}", e);
                    let mut log = FailureLog::default();
                    log.record(format!("storage error: {}", e));
                    report.failures.insert(website.identifier.clone(), log);
                    running.push(Err((
                        website.identifier.clone(),
                        WorkerOutcome::Aborted {
                            reason,
                            stats: WorkerStats {
                                failures: 1,
                                ..WorkerStats::default()
                            },
                        },
                    )));
                    continue;
                }
            };

            let worker = Worker::new(
                website.clone(),
                self.config.crawler.clone(),
                self.config_hash.clone(),
                store,
            );
            running.push(Ok(start(spawn_worker(worker, shutdown.clone()))));
        }

        for entry in running {
            let (website, outcome) = match entry {
                Err(failed) => failed,
                Ok(Running {
                    website,
                    outcome,
                    drain,
                }) => {
                    let outcome = match outcome.await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            error!(website = %website, error = %e, "Worker task failed");
                            WorkerOutcome::Aborted {
                                reason: format!("worker task failed: {}", e),
                                stats: WorkerStats::default(),
                            }
                        }
                    };
                    // The worker dropped its sender, so the drain ends on its own
                    let log = drain.await.unwrap_or_default();
                    report.failures.insert(website.clone(), log);
                    (website, outcome)
                }
            };
            report.outcomes.push((website, outcome));
        }

        info!(
            articles_saved = report.total_articles_saved(),
            aborted = report.aborted().len(),
            "All workers finished"
        );
        Ok(report)
    }
}

/// Spawns the task that logs and records a worker's failures
fn start(handle: WorkerHandle) -> Running {
    let WorkerHandle {
        website,
        mut failures,
        outcome,
    } = handle;

    let id = website.clone();
    let drain = tokio::spawn(async move {
        let mut log = FailureLog::default();
        while let Some(failure) = failures.recv().await {
            warn!(website = %id, kind = %failure.kind, "{}", failure);
            log.record(failure.to_string());
        }
        log
    });

    Running {
        website,
        outcome,
        drain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::crawler::failure::{CrawlFailure, FailureKind};

    fn config(db: &str) -> Config {
        parse_config(&format!(
            r#"
            [crawler]
            user-agent = "TestCrawler/1.0"
            robot-agent = "TestCrawler"
            crawl-delay = 0

            [database]
            driver = "sqlite"
            connection = "{}"

            [[websites]]
            identifier = "alpha"
            start-url = "http://127.0.0.1:9/"
            date-format = "{{YEAR_LONG}}"
            [websites.selectors]
            title = "h1"
            content = "article"
            date = "time"

            [[websites]]
            identifier = "beta"
            start-url = "http://127.0.0.1:9/"
            date-format = "{{YEAR_LONG}}"
            [websites.selectors]
            title = "h1"
            content = "article"
            date = "time"
            "#,
            db
        ))
        .unwrap()
    }

    #[test]
    fn test_selected_websites() {
        let orchestrator = Orchestrator::new(Arc::new(config("news.db")), "hash");
        let all: Vec<_> = orchestrator
            .selected_websites()
            .unwrap()
            .iter()
            .map(|w| w.identifier.as_str())
            .collect();
        assert_eq!(all, vec!["alpha", "beta"]);

        let beta = orchestrator.with_only(vec!["beta".to_string()]);
        assert_eq!(beta.selected_websites().unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_website_is_rejected() {
        let orchestrator = Orchestrator::new(Arc::new(config("news.db")), "hash")
            .with_only(vec!["gamma".to_string()]);
        assert!(matches!(
            orchestrator.selected_websites(),
            Err(ConfigError::Validation(msg)) if msg.contains("gamma")
        ));
    }

    #[tokio::test]
    async fn test_run_with_unknown_website_fails_before_starting() {
        let orchestrator = Orchestrator::new(Arc::new(config("news.db")), "hash")
            .with_only(vec!["gamma".to_string()]);
        let (_tx, rx) = watch::channel(false);

        let result = orchestrator.run(rx).await;

        assert!(matches!(
            result,
            Err(crate::NewswireError::Config(ConfigError::Validation(_)))
        ));
    }

    #[tokio::test]
    async fn test_store_open_failure_aborts_every_worker_without_panicking() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir
            .path()
            .join("missing")
            .join("news.db")
            .to_string_lossy()
            .into_owned();
        let orchestrator = Orchestrator::new(Arc::new(config(&db)), "hash");
        let (_tx, rx) = watch::channel(false);

        let report = orchestrator.run(rx).await.unwrap();

        assert_eq!(report.aborted(), vec!["alpha", "beta"]);
        assert!(report.failures_for("alpha")[0].starts_with("storage error"));
    }

    #[test]
    fn test_report_helpers() {
        let stats = WorkerStats {
            pages_visited: 3,
            articles_saved: 2,
            failures: 0,
        };
        let report = RunReport {
            outcomes: vec![
                ("a".to_string(), WorkerOutcome::Completed(stats)),
                (
                    "b".to_string(),
                    WorkerOutcome::Aborted {
                        reason: "x".to_string(),
                        stats,
                    },
                ),
            ],
            failures: HashMap::new(),
        };

        assert_eq!(report.total_articles_saved(), 4);
        assert_eq!(report.aborted(), vec!["b"]);
        assert!(report.outcome("a").is_some());
        assert!(report.failures_for("a").is_empty());
        assert_eq!(report.failure_count("a"), 0);
    }

    #[tokio::test]
    async fn test_failure_drain_keeps_bounded_messages() {
        let (sender, failures) = tokio::sync::mpsc::unbounded_channel();
        let running = start(WorkerHandle {
            website: "alpha".to_string(),
            failures,
            outcome: tokio::spawn(async { WorkerOutcome::Completed(WorkerStats::default()) }),
        });

        for i in 0..MAX_KEPT_FAILURES + 5 {
            let failure = CrawlFailure::new(FailureKind::Fetch).with_cause(format!("page {}", i));
            sender.send(failure).unwrap();
        }
        drop(sender);

        let log = running.drain.await.unwrap();
        assert_eq!(log.total, MAX_KEPT_FAILURES + 5);
        assert_eq!(log.messages.len(), MAX_KEPT_FAILURES);
        assert_eq!(log.omitted(), 5);
        assert_eq!(log.messages[0], "fetch error: page 0");
    }
}
