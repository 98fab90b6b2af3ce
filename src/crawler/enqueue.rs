//! Enqueue filter and the set of already stored article URLs

use crate::config::QueryPolicy;
use crate::storage::{ArticleStore, StorageResult};
use crate::url::{canonicalize, UrlFilters};
use std::collections::HashSet;
use tracing::info;
use url::Url;

/// Canonical URLs of the articles already stored for one website
///
/// Loaded once when a worker starts and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct VisitedSet {
    urls: HashSet<String>,
}

impl VisitedSet {
    /// Loads the stored article URLs of `website`, canonicalized with `query`
    pub fn load<S: ArticleStore + ?Sized>(
        store: &S,
        website: &str,
        query: Option<&QueryPolicy>,
    ) -> StorageResult<Self> {
        let stored = store.retrieve_article_urls_for_website(website)?;
        let visited = Self::from_urls(stored, query);
        info!(count = visited.len(), "Loaded visited URLs for this website");
        Ok(visited)
    }

    /// Builds a set from raw URLs; URLs that fail to parse are kept verbatim
    pub fn from_urls<I>(urls: I, query: Option<&QueryPolicy>) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let urls = urls
            .into_iter()
            .map(|raw| match Url::parse(&raw) {
                Ok(mut url) => {
                    canonicalize(&mut url, query);
                    url.into()
                }
                Err(_) => raw,
            })
            .collect();
        Self { urls }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Decides which discovered URLs of a website get fetched
#[derive(Debug, Clone)]
pub struct EnqueueFilter {
    query: Option<QueryPolicy>,
    visited: VisitedSet,
    filters: UrlFilters,
}

impl EnqueueFilter {
    pub fn new(query: Option<QueryPolicy>, visited: VisitedSet, filters: UrlFilters) -> Self {
        Self {
            query,
            visited,
            filters,
        }
    }

    /// Canonicalizes `url` in place, then accepts it only if it was not
    /// visited this run, is not a stored article, matches the restrict filter
    /// and does not match the exclude filter
    pub fn should_enqueue(&self, url: &mut Url, already_visited: bool) -> bool {
        canonicalize(url, self.query.as_ref());

        if already_visited {
            return false;
        }

        let canonical = url.as_str();
        if self.visited.contains(canonical) {
            return false;
        }

        self.filters.matches_restrict(canonical) && !self.filters.matches_exclude(canonical)
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }
}
