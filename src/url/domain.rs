use url::Url;

/// Extracts the lowercase host of a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use newswire::url::extract_host;
///
/// let url = Url::parse("https://NEWS.Example.com/path").unwrap();
/// assert_eq!(extract_host(&url), Some("news.example.com".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true if both URLs point at the same host
///
/// Scheme and port are ignored, so an `http://` website that links to (or
/// redirects to) its `https://` pages is still one website. The crawl engine
/// only follows links that stay on the website being crawled.
pub fn same_host(a: &Url, b: &Url) -> bool {
    match (extract_host(a), extract_host(b)) {
        (Some(ha), Some(hb)) => ha == hb,
        _ => false,
    }
}
