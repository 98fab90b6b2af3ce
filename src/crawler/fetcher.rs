//! HTTP fetcher implementation
//!
//! This module handles the HTTP requests made by a crawl engine:
//! - Building one HTTP client per website with its user agent
//! - GET requests, following redirects
//! - Classifying responses into fetched pages and failures

use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// Maximum redirect hops followed for a single page
const MAX_REDIRECTS: usize = 10;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched an HTML page
    Success {
        /// Final URL after redirects
        final_url: Url,
        status_code: u16,
        content_type: String,
        body: String,
    },

    /// Page is not HTML
    ContentMismatch { content_type: String },

    /// Non-success HTTP status
    HttpError { status_code: u16 },

    /// Network error (connection refused, timeout, body read failure)
    NetworkError { error: String },
}

/// Builds the HTTP client used by one website's engine
///
/// # Example
///
/// ```
/// use newswire::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client("Newswire/0.1", Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10).min(timeout))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

fn is_html(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}

/// Fetches a page
///
/// A missing Content-Type header is treated as HTML.
pub async fn fetch_url(client: &Client, url: &Url) -> FetchResult {
    let response = match client.get(url.clone()).send().await {
        Ok(response) => response,
        Err(e) => {
            let error = if e.is_timeout() {
                "Request timeout".to_string()
            } else if e.is_connect() {
                format!("Connection failed: {}", e)
            } else if e.is_redirect() {
                format!("Redirect error: {}", e)
            } else {
                e.to_string()
            };
            return FetchResult::NetworkError { error };
        }
    };

    let status = response.status();
    if !status.is_success() {
        return FetchResult::HttpError {
            status_code: status.as_u16(),
        };
    }

    let final_url = response.url().clone();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !content_type.is_empty() && !is_html(&content_type) {
        return FetchResult::ContentMismatch { content_type };
    }

    match response.text().await {
        Ok(body) => FetchResult::Success {
            final_url,
            status_code: status.as_u16(),
            content_type,
            body,
        },
        Err(e) => FetchResult::NetworkError {
            error: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> Client {
        build_http_client("TestCrawler/1.0", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client("TestCrawler/1.0", Duration::from_secs(30)).is_ok());
    }

    #[test]
    fn test_is_html() {
        assert!(is_html("text/html"));
        assert!(is_html("text/html; charset=utf-8"));
        assert!(is_html("TEXT/HTML"));
        assert!(is_html("application/xhtml+xml"));
        assert!(!is_html("application/json"));
        assert!(!is_html("image/png"));
    }

    #[tokio::test]
    async fn test_fetch_html() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/news/1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html><body>hi</body></html>", "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/news/1", server.uri())).unwrap();
        match fetch_url(&client(), &url).await {
            FetchResult::Success {
                final_url,
                status_code,
                body,
                ..
            } => {
                assert_eq!(final_url, url);
                assert_eq!(status_code, 200);
                assert!(body.contains("hi"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();
        assert!(matches!(
            fetch_url(&client(), &url).await,
            FetchResult::HttpError { status_code: 404 }
        ));
    }

    #[tokio::test]
    async fn test_fetch_non_html() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(vec![0u8; 4], "application/pdf"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/file.pdf", server.uri())).unwrap();
        assert!(matches!(
            fetch_url(&client(), &url).await,
            FetchResult::ContentMismatch { .. }
        ));
    }

    #[tokio::test]
    async fn test_fetch_follows_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(301).insert_header("location", "/new"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<p>moved</p>", "text/html"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/old", server.uri())).unwrap();
        match fetch_url(&client(), &url).await {
            FetchResult::Success { final_url, .. } => assert_eq!(final_url.path(), "/new"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let url = Url::parse("http://127.0.0.1:1/").unwrap();
        assert!(matches!(
            fetch_url(&client(), &url).await,
            FetchResult::NetworkError { .. }
        ));
    }
}
