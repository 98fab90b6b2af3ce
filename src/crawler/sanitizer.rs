//! Content sanitization
//!
//! Produces the inner HTML of an article's content element with:
//! - the thumbnail image, if any, moved in as first child
//! - every `aside` and `script` subtree removed
//! - `a[href]` and `img[src]` rewritten to absolute URLs
//!
//! The rules are applied to a copy of the document tree, which scraper then
//! serializes. The parsed page itself is left untouched.

use ego_tree::{NodeId, Tree};
use scraper::node::Element;
use scraper::{ElementRef, Node};
use url::Url;

/// Elements dropped together with their subtree
const STRIPPED_ELEMENTS: &[&str] = &["aside", "script"];

/// A URL attribute that could not be made absolute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteFailure {
    pub attribute: &'static str,
    pub value: String,
    pub error: url::ParseError,
}

impl std::fmt::Display for RewriteFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cannot resolve {}=\"{}\": {}",
            self.attribute, self.value, self.error
        )
    }
}

/// Result of sanitizing an article's content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedContent {
    pub html: String,
    /// Attributes left untouched because they could not be resolved
    pub rewrite_failures: Vec<RewriteFailure>,
}

/// Sanitizes `content` for storage, resolving URLs against `base`
///
/// `thumbnail` must come from the same document as `content`.
pub fn sanitize(
    content: ElementRef<'_>,
    thumbnail: Option<ElementRef<'_>>,
    base: &Url,
) -> SanitizedContent {
    let mut tree = content.tree().clone();
    let root = content.id();

    if let Some(thumbnail) = thumbnail {
        // A thumbnail enclosing the content cannot become its child
        let encloses =
            thumbnail.id() == root || content.ancestors().any(|a| a.id() == thumbnail.id());
        if !encloses {
            if let Some(mut node) = tree.get_mut(root) {
                node.prepend_id(thumbnail.id());
            }
        }
    }

    for id in matching_descendants(&tree, root, |name| STRIPPED_ELEMENTS.contains(&name)) {
        if let Some(mut node) = tree.get_mut(id) {
            node.detach();
        }
    }

    let mut failures = Vec::new();
    for id in matching_descendants(&tree, root, |name| url_attribute(name).is_some()) {
        if let Some(mut node) = tree.get_mut(id) {
            if let Node::Element(element) = node.value() {
                rewrite_url(element, base, &mut failures);
            }
        }
    }

    let html = tree
        .get(root)
        .and_then(ElementRef::wrap)
        .map(|element| element.inner_html())
        .unwrap_or_default();

    SanitizedContent {
        html,
        rewrite_failures: failures,
    }
}

/// Returns the attribute holding a URL that must be made absolute, if any
fn url_attribute(element: &str) -> Option<&'static str> {
    match element {
        "a" => Some("href"),
        "img" => Some("src"),
        _ => None,
    }
}

/// Collects the elements below `root` whose name matches
fn matching_descendants(
    tree: &Tree<Node>,
    root: NodeId,
    matches: impl Fn(&str) -> bool,
) -> Vec<NodeId> {
    let Some(root) = tree.get(root) else {
        return Vec::new();
    };

    root.descendants()
        .skip(1)
        .filter(|node| match node.value() {
            Node::Element(element) => matches(element.name()),
            _ => false,
        })
        .map(|node| node.id())
        .collect()
}

fn rewrite_url(element: &mut Element, base: &Url, failures: &mut Vec<RewriteFailure>) {
    let Some(attribute) = url_attribute(element.name()) else {
        return;
    };

    for (name, value) in element.attrs.iter_mut() {
        if name.prefix.is_some() || &*name.local != attribute {
            continue;
        }
        match base.join(value.trim()) {
            Ok(absolute) => *value = String::from(absolute).into(),
            Err(error) => failures.push(RewriteFailure {
                attribute,
                value: value.to_string(),
                error,
            }),
        }
    }
}
