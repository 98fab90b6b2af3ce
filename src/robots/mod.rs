//! Robots.txt handling module
//!
//! Each worker fetches the robots.txt of its website once, before crawling,
//! and consults it for every URL it is about to enqueue.

mod parser;

pub use parser::RobotsRules;

use tracing::{debug, warn};
use url::Url;

/// Fetches and parses the robots.txt served at the origin of `site`
///
/// A missing file, a non-success status or a network error all yield rules
/// that allow everything.
pub async fn fetch_robots(client: &reqwest::Client, site: &Url) -> RobotsRules {
    let robots_url = match site.join("/robots.txt") {
        Ok(url) => url,
        Err(e) => {
            warn!(url = %site, error = %e, "Cannot build robots.txt URL");
            return RobotsRules::allow_all();
        }
    };

    let response = match client.get(robots_url.clone()).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!(url = %robots_url, error = %e, "Failed to fetch robots.txt, allowing all");
            return RobotsRules::allow_all();
        }
    };

    if !response.status().is_success() {
        debug!(
            url = %robots_url,
            status = response.status().as_u16(),
            "No robots.txt, allowing all"
        );
        return RobotsRules::allow_all();
    }

    match response.text().await {
        Ok(body) => {
            debug!(url = %robots_url, bytes = body.len(), "Fetched robots.txt");
            RobotsRules::from_content(&body)
        }
        Err(e) => {
            warn!(url = %robots_url, error = %e, "Failed to read robots.txt, allowing all");
            RobotsRules::allow_all()
        }
    }
}
