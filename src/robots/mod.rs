//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching robots.txt files.

mod cache;
mod parser;

pub use cache::{CachedRobots, RobotsCache};
pub use parser::ParsedRobots;

use reqwest::Client;
use url::Url;

/// Returns the robots.txt URL for the origin of `url`
pub fn robots_url(url: &Url) -> Option<Url> {
    url.join("/robots.txt").ok()
}

/// Fetches and parses robots.txt for the origin of `url`
///
/// Missing files (4xx) and unreachable hosts both mean "allow everything";
/// the latter is logged. A 5xx answer is treated the same way.
///
/// # Arguments
///
/// * `client` - The HTTP client (carries the crawler's User-Agent)
/// * `url` - Any URL on the origin
pub async fn fetch_robots(client: &Client, url: &Url) -> ParsedRobots {
    let Some(robots_url) = robots_url(url) else {
        return ParsedRobots::allow_all();
    };

    let response = match client.get(robots_url.as_str()).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(url = %robots_url, error = %e, "robots.txt unreachable; allowing all");
            return ParsedRobots::allow_all();
        }
    };

    let status = response.status();
    if !status.is_success() {
        tracing::debug!(url = %robots_url, status = status.as_u16(), "no robots.txt; allowing all");
        return ParsedRobots::allow_all();
    }

    match response.text().await {
        Ok(body) => ParsedRobots::from_content(&body),
        Err(e) => {
            tracing::warn!(url = %robots_url, error = %e, "failed to read robots.txt; allowing all");
            ParsedRobots::allow_all()
        }
    }
}
