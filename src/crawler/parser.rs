//! Link discovery
//!
//! Extracts the links a crawl engine may follow from a fetched page:
//! - `<a href="...">` tags
//! - `<link rel="canonical" href="...">`
//!
//! Excluded are `download` anchors, fragment-only links, and `javascript:`,
//! `mailto:`, `tel:` and `data:` targets.

use scraper::{Html, Selector};
use url::Url;

/// Extracts every followable link of a document as an absolute URL
///
/// Links are returned in document order, anchors first.
pub fn extract_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let mut links = Vec::new();

    if let Ok(anchors) = Selector::parse("a[href]") {
        for element in document.select(&anchors) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(url) = element.value().attr("href").and_then(|h| resolve_link(h, base_url)) {
                links.push(url);
            }
        }
    }

    if let Ok(canonical) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical) {
            if let Some(url) = element.value().attr("href").and_then(|h| resolve_link(h, base_url)) {
                links.push(url);
            }
        }
    }

    links
}

/// Returns the base URL of a document: its `<base href>` if any, else the page URL
pub fn document_base_url(document: &Html, page_url: &Url) -> Url {
    Selector::parse("base[href]")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .and_then(|base| base.value().attr("href"))
                .and_then(|href| page_url.join(href.trim()).ok())
        })
        .unwrap_or_else(|| page_url.clone())
}

/// Resolves a link href to an absolute HTTP(S) URL
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    base_url
        .join(href)
        .ok()
        .filter(|url| url.scheme() == "http" || url.scheme() == "https")
}
