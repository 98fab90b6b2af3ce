//! Crawler module for discovering and storing articles
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching and link discovery
//! - Request scheduling and rate limiting
//! - The enqueue filter, article extraction and content sanitization
//! - Per-website workers and their orchestration

mod engine;
mod enqueue;
mod extractor;
mod failure;
mod fetcher;
mod orchestrator;
mod parser;
mod pipeline;
mod policy;
mod sanitizer;
mod scheduler;
mod worker;

pub use engine::{CrawlEngine, EngineRun, EngineSettings, EngineStop};
pub use enqueue::{EnqueueFilter, VisitedSet};
pub use extractor::{ArticleExtractor, ExtractedArticle, Extraction, ExtractionError, MatchCounts};
pub use failure::{CrawlFailure, FailureKind, FailureReporter, WorkerOutcome, WorkerStats};
pub use fetcher::{build_http_client, fetch_url, FetchResult};
pub use orchestrator::{FailureLog, Orchestrator, RunReport, MAX_KEPT_FAILURES};
pub use parser::{document_base_url, extract_links};
pub use pipeline::ArticlePolicy;
pub use policy::{CrawlPolicy, Page, Visit};
pub use sanitizer::{sanitize, RewriteFailure, SanitizedContent};
pub use scheduler::{effective_delay, Scheduler};
pub use worker::{spawn_worker, Worker, WorkerHandle};
