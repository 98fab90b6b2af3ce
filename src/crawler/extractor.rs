//! Article detection and field extraction
//!
//! A page is an article only when the website's selectors match exactly one
//! content element, exactly one title element and at least one date element.
//! Any other combination is a normal "not an article" outcome, not an error.

use crate::config::{compile_selector, DateFormat, SelectorConfig};
use crate::crawler::sanitizer::{sanitize, RewriteFailure};
use crate::ConfigError;
use chrono::NaiveDateTime;
use scraper::{ElementRef, Html, Node, Selector};
use thiserror::Error;
use url::Url;

/// Characters trimmed around extracted text
const TRIMMED: &[char] = &[' ', '\t', '\n', '\r'];

/// Errors that prevent an article page from being stored
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("no text found in {field} element")]
    MissingText { field: &'static str },

    #[error("cannot parse date '{text}': {source}")]
    DateParse {
        text: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// How many elements each required selector matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchCounts {
    pub content: usize,
    pub title: usize,
    pub date: usize,
}

impl MatchCounts {
    pub fn is_article(&self) -> bool {
        self.content == 1 && self.title == 1 && self.date >= 1
    }
}

/// Fields of a detected article, content already sanitized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedArticle {
    pub title: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub content: String,
    pub date: NaiveDateTime,
    pub rewrite_failures: Vec<RewriteFailure>,
}

/// Outcome of running the extractor on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    NotAnArticle(MatchCounts),
    Article(ExtractedArticle),
}

/// Compiled selectors and date layout of one website
#[derive(Debug, Clone)]
pub struct ArticleExtractor {
    title: Selector,
    content: Selector,
    date: Selector,
    description: Option<Selector>,
    author: Option<Selector>,
    thumbnail: Option<Selector>,
    date_format: DateFormat,
}

impl ArticleExtractor {
    pub fn new(
        website: &str,
        selectors: &SelectorConfig,
        date_format: DateFormat,
    ) -> Result<Self, ConfigError> {
        let optional = |field, selector: &Option<String>| {
            selector
                .as_deref()
                .map(|s| compile_selector(website, field, s))
                .transpose()
        };

        Ok(Self {
            title: compile_selector(website, "title", &selectors.title)?,
            content: compile_selector(website, "content", &selectors.content)?,
            date: compile_selector(website, "date", &selectors.date)?,
            description: optional("description", &selectors.description)?,
            author: optional("author", &selectors.author)?,
            thumbnail: optional("thumbnail", &selectors.thumbnail)?,
            date_format,
        })
    }

    /// Extracts an article from `document`, resolving content URLs against `base`
    pub fn extract(&self, document: &Html, base: &Url) -> Result<Extraction, ExtractionError> {
        let content: Vec<ElementRef<'_>> = document.select(&self.content).collect();
        let titles: Vec<ElementRef<'_>> = document.select(&self.title).collect();
        let dates: Vec<ElementRef<'_>> = document.select(&self.date).collect();

        let counts = MatchCounts {
            content: content.len(),
            title: titles.len(),
            date: dates.len(),
        };
        if !counts.is_article() {
            return Ok(Extraction::NotAnArticle(counts));
        }

        let title = first_text(titles[0]).ok_or(ExtractionError::MissingText { field: "title" })?;
        let date_text = first_text(dates[0]).ok_or(ExtractionError::MissingText { field: "date" })?;
        let date = self
            .date_format
            .parse(&date_text)
            .map_err(|source| ExtractionError::DateParse {
                text: date_text.clone(),
                source,
            })?;

        let description = self
            .first_match(document, self.description.as_ref())
            .and_then(first_text);
        let author = self
            .first_match(document, self.author.as_ref())
            .and_then(author_text);
        let thumbnail = self
            .first_match(document, self.thumbnail.as_ref())
            .filter(|el| el.value().name() == "img");

        let sanitized = sanitize(content[0], thumbnail, base);

        Ok(Extraction::Article(ExtractedArticle {
            title,
            description,
            author,
            content: sanitized.html,
            date,
            rewrite_failures: sanitized.rewrite_failures,
        }))
    }

    fn first_match<'a>(&self, document: &'a Html, selector: Option<&Selector>) -> Option<ElementRef<'a>> {
        selector.and_then(|s| document.select(s).next())
    }
}

fn trim_text(text: &str) -> &str {
    text.trim_matches(TRIMMED)
}

/// First non-blank text node under `element`, trimmed
fn first_text(element: ElementRef<'_>) -> Option<String> {
    element
        .text()
        .map(trim_text)
        .find(|t| !t.is_empty())
        .map(str::to_string)
}

/// Author name, looking inside a link when the name is wrapped in one
fn author_text(element: ElementRef<'_>) -> Option<String> {
    let first_child = element.children().find(|child| match child.value() {
        Node::Text(text) => !trim_text(text).is_empty(),
        Node::Comment(_) => false,
        _ => true,
    });

    let target = first_child
        .and_then(ElementRef::wrap)
        .filter(|child| child.value().name() == "a")
        .unwrap_or(element);

    first_text(target)
}
