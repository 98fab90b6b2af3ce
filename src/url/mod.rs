//! URL handling module for Newswire
//!
//! This module provides the URL canonicalization used for deduplication and
//! storage, the per-website restrict/exclude filters, and host helpers used by
//! the crawl engine to stay on a website.

mod domain;
mod filter;
mod normalize;

pub use crate::config::QueryPolicy;
pub use domain::{extract_host, same_host};
pub use filter::UrlFilters;
pub use normalize::{canonical_url, canonicalize};
