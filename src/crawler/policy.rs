//! Strategy interface between a crawl engine and the article pipeline

use crate::crawler::failure::CrawlFailure;
use url::Url;

/// A fetched HTML page handed to a [`CrawlPolicy`]
#[derive(Debug, Clone, Copy)]
pub struct Page<'a> {
    /// Canonical URL the page was enqueued under
    pub url: &'a Url,
    /// URL the page was served from, after redirects
    pub final_url: &'a Url,
    pub body: &'a str,
}

/// What the engine should do after a page was processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visit {
    Continue,
    /// Stop crawling this website for the given reason
    Abort(String),
}

/// Decisions a crawl engine delegates to its owner
pub trait CrawlPolicy {
    /// Decides whether a discovered URL should be fetched
    ///
    /// The policy may rewrite `url` in place; the engine then tracks and
    /// fetches the rewritten form. `already_visited` tells whether the engine
    /// has already enqueued this URL during the current run.
    fn should_enqueue(&self, url: &mut Url, already_visited: bool) -> bool;

    /// Processes a fetched page
    fn extract_article(&mut self, page: &Page<'_>) -> Visit;

    /// Receives failures detected by the engine itself
    fn on_failure(&mut self, failure: CrawlFailure);
}
