//! The article pipeline of one website: enqueue filter, extraction,
//! sanitization and persistence behind the [`CrawlPolicy`] interface

use crate::crawler::enqueue::EnqueueFilter;
use crate::crawler::extractor::{ArticleExtractor, Extraction, ExtractionError};
use crate::crawler::failure::{CrawlFailure, FailureKind, FailureReporter, WorkerStats};
use crate::crawler::parser::document_base_url;
use crate::crawler::policy::{CrawlPolicy, Page, Visit};
use crate::storage::{Article, ArticleStore};
use scraper::Html;
use tracing::{debug, info, warn};
use url::Url;

/// [`CrawlPolicy`] that stores every new article of a website
pub struct ArticlePolicy<S> {
    website: String,
    filter: EnqueueFilter,
    extractor: ArticleExtractor,
    store: S,
    reporter: FailureReporter,
    /// Consecutive failed saves after which the worker aborts
    max_consecutive_failures: u32,
    consecutive_failures: u32,
    articles_saved: u64,
}

impl<S: ArticleStore> ArticlePolicy<S> {
    pub fn new(
        website: impl Into<String>,
        filter: EnqueueFilter,
        extractor: ArticleExtractor,
        store: S,
        reporter: FailureReporter,
        max_consecutive_failures: u32,
    ) -> Self {
        Self {
            website: website.into(),
            filter,
            extractor,
            store,
            reporter,
            max_consecutive_failures,
            consecutive_failures: 0,
            articles_saved: 0,
        }
    }

    /// Gives back the store, the reporter and the counters of this run
    ///
    /// `pages_visited` is left at zero; only the engine knows it.
    pub fn finish(self) -> (S, FailureReporter, WorkerStats) {
        let stats = WorkerStats {
            pages_visited: 0,
            articles_saved: self.articles_saved,
            failures: self.reporter.reported(),
        };
        (self.store, self.reporter, stats)
    }

    fn report(&mut self, failure: CrawlFailure) {
        self.reporter.report(failure);
    }

    /// Parses the page and runs the extractor
    ///
    /// The parsed document never outlives this call.
    fn run_extractor(&self, page: &Page<'_>) -> Result<Extraction, ExtractionError> {
        let document = Html::parse_document(page.body);
        let base = document_base_url(&document, page.final_url);
        self.extractor.extract(&document, &base)
    }

    fn save(&mut self, url: &Url, article: Article) -> Visit {
        match self.store.save_article(&article) {
            Ok(inserted) => {
                self.consecutive_failures = 0;
                if inserted {
                    self.articles_saved += 1;
                } else {
                    debug!(url = %url, "Article already stored");
                }
                Visit::Continue
            }
            Err(e) => {
                self.consecutive_failures += 1;
                warn!(
                    url = %url,
                    error = %e,
                    consecutive = self.consecutive_failures,
                    "Failed to save article"
                );
                let reason = format!(
                    "{} consecutive storage failures, last one: {}",
                    self.consecutive_failures, e
                );
                self.report(
                    CrawlFailure::new(FailureKind::Storage)
                        .with_url(url)
                        .with_cause(e),
                );

                if self.consecutive_failures >= self.max_consecutive_failures {
                    Visit::Abort(reason)
                } else {
                    Visit::Continue
                }
            }
        }
    }
}

impl<S: ArticleStore> CrawlPolicy for ArticlePolicy<S> {
    fn should_enqueue(&self, url: &mut Url, already_visited: bool) -> bool {
        self.filter.should_enqueue(url, already_visited)
    }

    fn extract_article(&mut self, page: &Page<'_>) -> Visit {
        let extracted = match self.run_extractor(page) {
            Ok(Extraction::Article(article)) => article,
            Ok(Extraction::NotAnArticle(counts)) => {
                debug!(
                    content_matches = counts.content,
                    title_matches = counts.title,
                    date_matches = counts.date,
                    page_url = %page.url,
                    "Current page isn't an article"
                );
                return Visit::Continue;
            }
            Err(e) => {
                self.report(
                    CrawlFailure::new(FailureKind::FieldExtraction)
                        .with_url(page.url)
                        .with_cause(e),
                );
                return Visit::Continue;
            }
        };

        for failure in &extracted.rewrite_failures {
            self.report(
                CrawlFailure::new(FailureKind::ContentRewrite)
                    .with_url(page.url)
                    .with_cause(failure),
            );
        }

        info!(title = %extracted.title, date = %extracted.date, "Saving article");

        let article = Article {
            website: self.website.clone(),
            url: page.url.to_string(),
            title: extracted.title,
            description: extracted.description,
            content: extracted.content,
            author: extracted.author,
            date: extracted.date,
        };
        self.save(page.url, article)
    }

    fn on_failure(&mut self, failure: CrawlFailure) {
        self.report(failure);
    }
}
