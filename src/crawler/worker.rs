//! Per-website crawl worker
//!
//! A worker owns everything one website needs: its configuration, its own
//! store handle and its own failure channel. Workers share no mutable state.

use crate::config::{CrawlerConfig, DateFormat, WebsiteConfig};
use crate::crawler::engine::{CrawlEngine, EngineSettings, EngineStop};
use crate::crawler::enqueue::{EnqueueFilter, VisitedSet};
use crate::crawler::extractor::ArticleExtractor;
use crate::crawler::failure::{
    CrawlFailure, FailureKind, FailureReporter, WorkerOutcome, WorkerStats,
};
use crate::crawler::pipeline::ArticlePolicy;
use crate::storage::{ArticleStore, RunStatus};
use crate::url::UrlFilters;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, info_span, warn, Instrument, Span};

/// Crawler of a single website
pub struct Worker<S> {
    website: WebsiteConfig,
    crawler: CrawlerConfig,
    config_hash: String,
    store: S,
    /// Every log line of this worker is emitted inside this span
    span: Span,
}

/// Running worker: its failure stream and its final outcome
pub struct WorkerHandle {
    pub website: String,
    pub failures: mpsc::UnboundedReceiver<CrawlFailure>,
    pub outcome: JoinHandle<WorkerOutcome>,
}

impl<S: ArticleStore + Send + 'static> Worker<S> {
    pub fn new(
        website: WebsiteConfig,
        crawler: CrawlerConfig,
        config_hash: impl Into<String>,
        store: S,
    ) -> Self {
        let span = info_span!("worker", website = %website.identifier);
        Self {
            website,
            crawler,
            config_hash: config_hash.into(),
            store,
            span,
        }
    }

    /// Crawls the website until done, aborted or interrupted
    pub async fn run(
        self,
        reporter: FailureReporter,
        shutdown: watch::Receiver<bool>,
    ) -> WorkerOutcome {
        let span = self.span.clone();
        self.crawl(reporter, shutdown).instrument(span).await
    }

    async fn crawl(
        self,
        mut reporter: FailureReporter,
        shutdown: watch::Receiver<bool>,
    ) -> WorkerOutcome {
        let Self {
            website,
            crawler,
            config_hash,
            mut store,
            ..
        } = self;
        let identifier = website.identifier.clone();
        info!(start_url = %website.start_url, "Starting crawl");

        let visited = match VisitedSet::load(&store, &identifier, website.query.as_ref()) {
            Ok(visited) => visited,
            Err(e) => {
                let reason = format!("cannot load visited URLs: {}", e);
                reporter.report(CrawlFailure::new(FailureKind::Storage).with_cause(e));
                return abort(reason, &reporter, WorkerStats::default());
            }
        };

        let run_id = match store.create_run(&identifier, &config_hash) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "Cannot record crawl run");
                reporter.report(CrawlFailure::new(FailureKind::Storage).with_cause(e));
                None
            }
        };

        let (engine, mut policy) = match build_policy(&website, &crawler, visited, store, reporter)
        {
            Ok(built) => built,
            Err((reason, mut store, reporter)) => {
                let outcome = abort(reason, &reporter, WorkerStats::default());
                close_run(&mut store, run_id, &outcome);
                return outcome;
            }
        };

        let run = engine.run(&mut policy, shutdown).await;
        let (mut store, _reporter, mut stats) = policy.finish();
        stats.pages_visited = run.pages_visited;

        let outcome = match run.stop {
            EngineStop::Exhausted | EngineStop::BudgetReached => WorkerOutcome::Completed(stats),
            EngineStop::Interrupted => WorkerOutcome::Interrupted(stats),
            EngineStop::Aborted(reason) => WorkerOutcome::Aborted { reason, stats },
        };

        close_run(&mut store, run_id, &outcome);
        if outcome.is_aborted() {
            error!(outcome = %outcome, "Crawl aborted");
        } else {
            info!(outcome = %outcome, "Crawl finished");
        }
        outcome
    }
}

type Built<S> = (CrawlEngine, ArticlePolicy<S>);
type BuildFailure<S> = (String, S, FailureReporter);

/// Assembles the engine and the article pipeline of a website
///
/// On failure the store and reporter are handed back with the abort reason.
fn build_policy<S: ArticleStore>(
    website: &WebsiteConfig,
    crawler: &CrawlerConfig,
    visited: VisitedSet,
    store: S,
    reporter: FailureReporter,
) -> Result<Built<S>, BuildFailure<S>> {
    let engine = match EngineSettings::from_config(website, crawler)
        .map_err(|e| e.to_string())
        .and_then(|settings| CrawlEngine::new(settings).map_err(|e| e.to_string()))
    {
        Ok(engine) => engine,
        Err(e) => return Err((format!("cannot set up crawl engine: {}", e), store, reporter)),
    };

    let filters = match UrlFilters::from_optional(website.filters.as_ref()) {
        Ok(filters) => filters,
        Err(e) => return Err((format!("invalid URL filters: {}", e), store, reporter)),
    };

    let extractor = match DateFormat::new(&website.date_format)
        .map_err(|e| e.to_string())
        .and_then(|format| {
            ArticleExtractor::new(&website.identifier, &website.selectors, format)
                .map_err(|e| e.to_string())
        }) {
        Ok(extractor) => extractor,
        Err(e) => return Err((format!("invalid extraction settings: {}", e), store, reporter)),
    };

    let filter = EnqueueFilter::new(website.query.clone(), visited, filters);
    let policy = ArticlePolicy::new(
        website.identifier.clone(),
        filter,
        extractor,
        store,
        reporter,
        crawler.max_consecutive_failures,
    );
    Ok((engine, policy))
}

fn abort(reason: String, reporter: &FailureReporter, mut stats: WorkerStats) -> WorkerOutcome {
    stats.failures = reporter.reported();
    error!(reason = %reason, "Crawl aborted");
    WorkerOutcome::Aborted { reason, stats }
}

fn close_run<S: ArticleStore>(store: &mut S, run_id: Option<i64>, outcome: &WorkerOutcome) {
    let Some(run_id) = run_id else {
        return;
    };

    let status = match outcome {
        WorkerOutcome::Completed(_) => RunStatus::Completed,
        WorkerOutcome::Interrupted(_) => RunStatus::Interrupted,
        WorkerOutcome::Aborted { .. } => RunStatus::Aborted,
    };
    let stats = outcome.stats();

    if let Err(e) = store.finish_run(run_id, status, stats.articles_saved, stats.failures) {
        warn!(run_id, error = %e, "Cannot close crawl run");
    }
}

/// Starts a worker on the runtime and returns its handle
pub fn spawn_worker<S: ArticleStore + Send + 'static>(
    worker: Worker<S>,
    shutdown: watch::Receiver<bool>,
) -> WorkerHandle {
    let (sender, failures) = mpsc::unbounded_channel();
    let website = worker.website.identifier.clone();
    let outcome = tokio::spawn(worker.run(FailureReporter::new(sender), shutdown));

    WorkerHandle {
        website,
        failures,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn crawler() -> CrawlerConfig {
        CrawlerConfig {
            user_agent: "TestCrawler/1.0".to_string(),
            robot_agent: "TestCrawler".to_string(),
            crawl_delay: 0,
            request_timeout: 5,
            max_consecutive_failures: 3,
        }
    }

    fn website(start_url: &str, extra: &str) -> WebsiteConfig {
        toml::from_str(&format!(
            r#"
            identifier = "site"
            start-url = "{}"
            date-format = "{{YEAR_LONG}}-{{MONTH_NUM}}-{{DAY_NUM}}"
            {}

            [selectors]
            title = "h1"
            content = "div.story"
            date = "time"
            "#,
            start_url, extra
        ))
        .unwrap()
    }

    async fn news_site() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(r#"<a href="/story">story</a>"#, "text/html"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/story"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(
                        r#"<h1>Headline</h1><time>2022-01-15</time><div class="story"><p>Text</p></div>"#,
                        "text/html",
                    ),
            )
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_worker_saves_articles_and_records_run() {
        let server = news_site().await;
        let store = SqliteStorage::new_in_memory().unwrap();
        let (_tx, rx) = watch::channel(false);
        let (sender, mut failures) = mpsc::unbounded_channel();

        let worker = Worker::new(website(&server.uri(), ""), crawler(), "hash", store);
        let outcome = worker.run(FailureReporter::new(sender), rx).await;

        assert_eq!(
            outcome,
            WorkerOutcome::Completed(WorkerStats {
                pages_visited: 2,
                articles_saved: 1,
                failures: 0,
            })
        );
        assert!(failures.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_invalid_date_format_aborts() {
        let server = news_site().await;
        let store = SqliteStorage::new_in_memory().unwrap();
        let (_tx, rx) = watch::channel(false);
        let (sender, _failures) = mpsc::unbounded_channel();

        let mut config = website(&server.uri(), "");
        config.date_format = "{NOT_A_TOKEN}".to_string();
        let outcome = Worker::new(config, crawler(), "hash", store)
            .run(FailureReporter::new(sender), rx)
            .await;

        assert!(outcome.is_aborted());
        assert!(outcome
            .abort_reason()
            .unwrap()
            .starts_with("invalid extraction settings"));
        assert_eq!(outcome.stats().pages_visited, 0);
    }

    #[tokio::test]
    async fn test_spawned_worker_skips_stored_articles() {
        let server = news_site().await;
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("news.db");

        for expected_saved in [1, 0] {
            let store = SqliteStorage::new(&db).unwrap();
            let (_tx, rx) = watch::channel(false);
            let handle = spawn_worker(
                Worker::new(website(&server.uri(), ""), crawler(), "hash", store),
                rx,
            );
            assert_eq!(handle.website, "site");

            let outcome = handle.outcome.await.unwrap();
            assert_eq!(outcome.stats().articles_saved, expected_saved);
        }

        let store = SqliteStorage::new(&db).unwrap();
        assert_eq!(store.count_articles("site").unwrap(), 1);
        let run = store.get_latest_run("site").unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.articles_saved, 0);
    }
}
