use crate::config::QueryPolicy;
use crate::UrlError;
use url::form_urlencoded;
use url::Url;

/// Canonicalizes a URL in place for deduplication and storage
///
/// # Canonicalization Steps
///
/// 1. Remove the fragment (everything after #)
/// 2. If a query policy is configured:
///    - with exceptions: drop every key the policy rejects, then re-encode the
///      surviving pairs sorted by key
///    - without exceptions and `ignore_all` set: remove the whole query string
///    - otherwise leave the query string untouched
///
/// The operation is idempotent.
///
/// # Examples
///
/// ```
/// use newswire::url::canonicalize;
/// use newswire::QueryPolicy;
/// use url::Url;
///
/// let policy = QueryPolicy { ignore_all: true, except: vec!["item".to_string()] };
/// let mut url = Url::parse("http://x/news?item=1&ref=2#top").unwrap();
/// canonicalize(&mut url, Some(&policy));
/// assert_eq!(url.as_str(), "http://x/news?item=1");
/// ```
pub fn canonicalize(url: &mut Url, policy: Option<&QueryPolicy>) {
    url.set_fragment(None);

    let Some(policy) = policy else {
        return;
    };

    if !policy.except.is_empty() {
        if url.query().is_none() {
            return;
        }

        let mut kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !policy.drops(key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        // Stable sort: values of a repeated key keep their relative order
        kept.sort_by(|a, b| a.0.cmp(&b.0));

        if kept.is_empty() {
            url.set_query(None);
        } else {
            let encoded = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(kept.iter())
                .finish();
            url.set_query(Some(&encoded));
        }
    } else if policy.ignore_all {
        url.set_query(None);
    }
}

/// Parses and canonicalizes a URL string
///
/// Only HTTP(S) URLs are accepted.
pub fn canonical_url(url_str: &str, policy: Option<&QueryPolicy>) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    canonicalize(&mut url, policy);
    Ok(url)
}
