//! Crawl engine for a single website
//!
//! The engine owns the mechanics of a crawl:
//! - Fetching robots.txt once and honoring it
//! - Seeding the frontier with the start URL
//! - Fetching pages at the scheduler's pace
//! - Discovering same-host links and offering them to the policy
//!
//! Every decision about what to fetch and what to do with a page is delegated
//! to a [`CrawlPolicy`].

use crate::config::{CrawlerConfig, WebsiteConfig};
use crate::crawler::failure::{CrawlFailure, FailureKind};
use crate::crawler::fetcher::{build_http_client, fetch_url, FetchResult};
use crate::crawler::parser::{document_base_url, extract_links};
use crate::crawler::policy::{CrawlPolicy, Page, Visit};
use crate::crawler::scheduler::{effective_delay, Scheduler};
use crate::robots::{fetch_robots, RobotsRules};
use crate::url::same_host;
use crate::UrlError;
use reqwest::Client;
use scraper::Html;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, trace};
use url::Url;

/// Fetching parameters of one website
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub start_url: Url,
    pub user_agent: String,
    pub robot_agent: String,
    pub crawl_delay: Duration,
    /// Maximum number of fetched pages, 0 for unbounded
    pub max_visits: u32,
    pub request_timeout: Duration,
}

impl EngineSettings {
    /// Resolves per-website overrides against the global crawler settings
    pub fn from_config(website: &WebsiteConfig, crawler: &CrawlerConfig) -> Result<Self, UrlError> {
        let start_url =
            Url::parse(&website.start_url).map_err(|e| UrlError::Parse(e.to_string()))?;

        Ok(Self {
            start_url,
            user_agent: website.effective_user_agent(crawler).to_string(),
            robot_agent: website.effective_robot_agent(crawler).to_string(),
            crawl_delay: website.effective_crawl_delay(crawler),
            max_visits: website.max_visits,
            request_timeout: Duration::from_secs(crawler.request_timeout),
        })
    }
}

/// Why an engine run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineStop {
    /// Nothing left to fetch
    Exhausted,
    /// The visit budget was spent
    BudgetReached,
    /// A shutdown was requested
    Interrupted,
    /// The policy asked to stop
    Aborted(String),
}

/// Summary of an engine run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineRun {
    pub stop: EngineStop,
    pub pages_visited: u64,
}

/// Crawl engine for one website
pub struct CrawlEngine {
    settings: EngineSettings,
    client: Client,
}

/// Per-run crawl state
struct Frontier {
    scheduler: Scheduler,
    robots: RobotsRules,
    /// Every URL enqueued so far, in the form it was enqueued
    enqueued: HashSet<String>,
}

impl CrawlEngine {
    pub fn new(settings: EngineSettings) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&settings.user_agent, settings.request_timeout)?;
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Crawls the website until the frontier is empty, the budget is spent,
    /// the policy aborts or `shutdown` turns true
    pub async fn run<P: CrawlPolicy>(
        &self,
        policy: &mut P,
        mut shutdown: watch::Receiver<bool>,
    ) -> EngineRun {
        let robots = fetch_robots(&self.client, &self.settings.start_url).await;
        let delay = effective_delay(
            self.settings.crawl_delay,
            robots.crawl_delay(&self.settings.robot_agent),
        );
        debug!(delay = ?delay, "Effective crawl delay");

        let mut frontier = Frontier {
            scheduler: Scheduler::new(delay, self.settings.max_visits),
            robots,
            enqueued: HashSet::new(),
        };
        self.offer(self.settings.start_url.clone(), policy, &mut frontier);

        let mut pages_visited = 0;
        let mut listening = true;

        let stop = loop {
            if *shutdown.borrow() {
                break EngineStop::Interrupted;
            }

            let next = tokio::select! {
                next = frontier.scheduler.next_url() => next,
                changed = shutdown.changed(), if listening => {
                    if changed.is_err() {
                        // Sender gone: no shutdown can come anymore
                        listening = false;
                    }
                    continue;
                }
            };

            let Some(url) = next else {
                if frontier.scheduler.budget_exhausted() {
                    info!(visits = frontier.scheduler.visits(), "Visit budget reached");
                    break EngineStop::BudgetReached;
                }
                break EngineStop::Exhausted;
            };

            frontier.scheduler.record_request();
            pages_visited += 1;
            debug!(url = %url, "Fetching page");
            if pages_visited % 10 == 0 {
                info!(
                    pages = pages_visited,
                    frontier = frontier.scheduler.frontier_size(),
                    "Crawl progress"
                );
            }

            match fetch_url(&self.client, &url).await {
                FetchResult::Success {
                    final_url, body, ..
                } => {
                    let page = Page {
                        url: &url,
                        final_url: &final_url,
                        body: &body,
                    };
                    if let Visit::Abort(reason) = policy.extract_article(&page) {
                        break EngineStop::Aborted(reason);
                    }

                    for link in discover_links(&body, &final_url) {
                        self.offer(link, policy, &mut frontier);
                    }
                }
                FetchResult::ContentMismatch { content_type } => {
                    debug!(url = %url, content_type = %content_type, "Skipping non-HTML page");
                }
                FetchResult::HttpError { status_code } => {
                    policy.on_failure(
                        CrawlFailure::new(FailureKind::Fetch)
                            .with_url(&url)
                            .with_cause(format!("HTTP status {}", status_code)),
                    );
                }
                FetchResult::NetworkError { error } => {
                    policy.on_failure(
                        CrawlFailure::new(FailureKind::Fetch)
                            .with_url(&url)
                            .with_cause(error),
                    );
                }
            }
        };

        EngineRun {
            stop,
            pages_visited,
        }
    }

    /// Offers a discovered URL to the policy and enqueues it if accepted
    fn offer<P: CrawlPolicy>(&self, mut url: Url, policy: &P, frontier: &mut Frontier) {
        if !same_host(&url, &self.settings.start_url) {
            trace!(url = %url, "Ignoring off-site link");
            return;
        }

        url.set_fragment(None);
        let already_visited = frontier.enqueued.contains(url.as_str());

        if !policy.should_enqueue(&mut url, already_visited) {
            trace!(url = %url, "Filtered out");
            return;
        }

        // The policy may have rewritten the URL into an already known form
        if !frontier.enqueued.insert(url.to_string()) {
            return;
        }

        if !frontier
            .robots
            .is_allowed(url.as_str(), &self.settings.robot_agent)
        {
            debug!(url = %url, "Disallowed by robots.txt");
            return;
        }

        trace!(url = %url, "Enqueued");
        frontier.scheduler.add_to_frontier(url);
    }
}

/// Extracts followable links; the parsed document does not escape this call
fn discover_links(body: &str, page_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(body);
    let base = document_base_url(&document, page_url);
    extract_links(&document, &base)
}
