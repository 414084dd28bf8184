//! robots.txt caching
//!
//! One entry per origin (scheme, host and port), fetched on first use and
//! reused until it is a day old.

use crate::robots::{fetch_robots, ParsedRobots};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use url::Url;

/// Cached robots.txt data for an origin
#[derive(Debug, Clone)]
pub struct CachedRobots {
    pub robots: Arc<ParsedRobots>,
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    pub fn new(robots: ParsedRobots) -> Self {
        Self {
            robots: Arc::new(robots),
            fetched_at: Utc::now(),
        }
    }

    /// Checks if the cached entry is older than 24 hours
    pub fn is_stale(&self) -> bool {
        Utc::now() - self.fetched_at > Duration::hours(24)
    }
}

/// Per-origin robots.txt cache shared by all fetch workers
#[derive(Debug, Default)]
pub struct RobotsCache {
    entries: Mutex<HashMap<String, CachedRobots>>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the robots.txt rules for the origin of `url`, fetching them once
    ///
    /// The lock is held across the fetch so concurrent workers hitting the
    /// same new origin wait for a single request.
    pub async fn get_or_fetch(&self, client: &Client, url: &Url) -> Arc<ParsedRobots> {
        let origin = url.origin().ascii_serialization();
        let mut entries = self.entries.lock().await;

        if let Some(cached) = entries.get(&origin) {
            if !cached.is_stale() {
                return Arc::clone(&cached.robots);
            }
        }

        let robots = fetch_robots(client, url).await;
        let cached = CachedRobots::new(robots);
        let robots = Arc::clone(&cached.robots);
        entries.insert(origin, cached);

        robots
    }

    /// Number of origins currently cached
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
