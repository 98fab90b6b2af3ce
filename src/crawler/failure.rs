//! Failure reporting and worker outcomes
//!
//! A worker reports every per-page problem as a [`CrawlFailure`] on its
//! failure channel and finishes with a single [`WorkerOutcome`]. An aborted
//! outcome is the worker's own decision to stop; the orchestrator never
//! escalates a failure into an abort.

use std::fmt;
use tokio::sync::mpsc::UnboundedSender;
use tracing::trace;
use url::Url;

/// Kind of a reported crawl failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// A matched field could not be read or parsed (e.g. the date)
    FieldExtraction,
    /// A link or image URL in the content could not be made absolute
    ContentRewrite,
    /// The article store could not be read or written
    Storage,
    /// A page could not be fetched
    Fetch,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FieldExtraction => "field extraction",
            Self::ContentRewrite => "content rewrite",
            Self::Storage => "storage",
            Self::Fetch => "fetch",
        };
        f.write_str(name)
    }
}

/// A single reported failure with optional URL context and cause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlFailure {
    pub kind: FailureKind,
    pub url: Option<String>,
    pub cause: Option<String>,
}

impl CrawlFailure {
    pub fn new(kind: FailureKind) -> Self {
        Self {
            kind,
            url: None,
            cause: None,
        }
    }

    pub fn with_url(mut self, url: &Url) -> Self {
        self.url = Some(url.to_string());
        self
    }

    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }
}

impl fmt::Display for CrawlFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.url, &self.cause) {
            (None, None) => write!(f, "unknown {} error", self.kind),
            (None, Some(cause)) => write!(f, "{} error: {}", self.kind, cause),
            (Some(url), None) => write!(f, "unknown {} error on {}", self.kind, url),
            (Some(url), Some(cause)) => write!(f, "{} error on {}: {}", self.kind, url, cause),
        }
    }
}

impl std::error::Error for CrawlFailure {}

/// Sending half of a worker's failure channel
///
/// Reports never block. Once the receiving side is gone, failures are only
/// counted.
#[derive(Debug)]
pub struct FailureReporter {
    sender: UnboundedSender<CrawlFailure>,
    reported: u64,
}

impl FailureReporter {
    pub fn new(sender: UnboundedSender<CrawlFailure>) -> Self {
        Self {
            sender,
            reported: 0,
        }
    }

    pub fn report(&mut self, failure: CrawlFailure) {
        self.reported += 1;
        trace!(failure = %failure, "Reporting failure");
        // A closed channel means nobody aggregates failures anymore
        let _ = self.sender.send(failure);
    }

    /// Number of failures reported so far
    pub fn reported(&self) -> u64 {
        self.reported
    }
}

/// Counters accumulated by a worker during one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub pages_visited: u64,
    pub articles_saved: u64,
    pub failures: u64,
}

/// Final result of a website worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// The frontier was exhausted or the visit budget was spent
    Completed(WorkerStats),
    /// A shutdown was requested before the crawl ended
    Interrupted(WorkerStats),
    /// The worker decided it cannot continue
    Aborted { reason: String, stats: WorkerStats },
}

impl WorkerOutcome {
    pub fn stats(&self) -> &WorkerStats {
        match self {
            Self::Completed(stats) | Self::Interrupted(stats) => stats,
            Self::Aborted { stats, .. } => stats,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }

    pub fn abort_reason(&self) -> Option<&str> {
        match self {
            Self::Aborted { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for WorkerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        match self {
            Self::Completed(_) => write!(f, "completed")?,
            Self::Interrupted(_) => write!(f, "interrupted")?,
            Self::Aborted { reason, .. } => write!(f, "aborted ({})", reason)?,
        }
        write!(
            f,
            ": {} pages visited, {} articles saved, {} failures",
            stats.pages_visited, stats.articles_saved, stats.failures
        )
    }
}
