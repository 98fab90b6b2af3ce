//! Scheduler for one website's crawl frontier
//!
//! This module handles:
//! - FIFO frontier management
//! - Enforcing the delay between two requests
//! - Enforcing the max-visit budget

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

/// Frontier and pacing of a single website crawl
#[derive(Debug)]
pub struct Scheduler {
    frontier: VecDeque<Url>,

    /// Minimum time between two requests
    delay: Duration,

    /// Maximum number of requests, 0 for unbounded
    max_visits: u32,

    visits: u32,

    last_request: Option<Instant>,
}

impl Scheduler {
    pub fn new(delay: Duration, max_visits: u32) -> Self {
        Self {
            frontier: VecDeque::new(),
            delay,
            max_visits,
            visits: 0,
            last_request: None,
        }
    }

    /// Appends a URL to the frontier
    pub fn add_to_frontier(&mut self, url: Url) {
        self.frontier.push_back(url);
    }

    /// Waits until the next request is allowed, then pops the next URL
    ///
    /// Returns `None` when the frontier is empty or the budget is spent.
    /// Cancel-safe: the frontier is only touched after the wait completes.
    pub async fn next_url(&mut self) -> Option<Url> {
        if self.frontier.is_empty() || self.budget_exhausted() {
            return None;
        }

        if let Some(last) = self.last_request {
            let ready_at = last + self.delay;
            if ready_at > Instant::now() {
                tracing::trace!(wait = ?(ready_at - Instant::now()), "Waiting for crawl delay");
                tokio::time::sleep_until(ready_at).await;
            }
        }

        self.frontier.pop_front()
    }

    /// Records that a request is being made now
    pub fn record_request(&mut self) {
        self.visits += 1;
        self.last_request = Some(Instant::now());
    }

    /// Returns true once `max_visits` requests have been made
    pub fn budget_exhausted(&self) -> bool {
        self.max_visits > 0 && self.visits >= self.max_visits
    }

    pub fn visits(&self) -> u32 {
        self.visits
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns the number of URLs in the frontier
    pub fn frontier_size(&self) -> usize {
        self.frontier.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frontier.is_empty()
    }
}

/// Longest `Crawl-delay` honored from robots.txt
pub const MAX_ROBOTS_DELAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Calculates the effective delay for a website
///
/// This takes the maximum of the configured delay and the robots.txt
/// `Crawl-delay` (in seconds), if the website publishes one. A delay too
/// large for a `Duration` is capped at [`MAX_ROBOTS_DELAY`].
pub fn effective_delay(configured: Duration, robots_delay: Option<f64>) -> Duration {
    let robots = robots_delay
        .filter(|s| s.is_finite() && *s > 0.0)
        .map(|s| {
            Duration::try_from_secs_f64(s)
                .unwrap_or(MAX_ROBOTS_DELAY)
                .min(MAX_ROBOTS_DELAY)
        })
        .unwrap_or(Duration::ZERO);

    std::cmp::max(configured, robots)
}
