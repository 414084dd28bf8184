//! Crawl frontier and visited tracking
//!
//! The frontier is the FIFO queue of URLs waiting to be fetched in one
//! domain run. A URL is enqueued at most once per run: the first discovery
//! wins and later discoveries (even at a shallower depth) are ignored.

use crate::url::{normalize_url, visit_key};
use chrono::{DateTime, Utc};
use std::collections::{HashSet, VecDeque};
use url::Url;

/// A URL waiting to be fetched
#[derive(Debug, Clone)]
pub struct FrontierEntry {
    /// Normalized URL
    pub url: Url,
    pub depth: u32,
    /// Domain of the page the link was found on
    pub source_domain: String,
    pub discovered_at: DateTime<Utc>,
}

/// FIFO work queue with per-run deduplication
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<FrontierEntry>,
    /// Visit key of every URL ever enqueued in this run
    seen: HashSet<String>,
    /// Visit keys of URLs that have been fetched (or attempted)
    visited: HashSet<String>,
    max_depth: u32,
}

impl Frontier {
    pub fn new(max_depth: u32) -> Self {
        Self {
            queue: VecDeque::new(),
            seen: HashSet::new(),
            visited: HashSet::new(),
            max_depth,
        }
    }

    /// Adds a URL to the queue
    ///
    /// # Returns
    ///
    /// `true` if the URL was queued; `false` if it is deeper than the depth
    /// limit, cannot be normalized, or was already queued or visited.
    pub fn enqueue(&mut self, url: &Url, depth: u32, source_domain: &str) -> bool {
        if depth > self.max_depth {
            return false;
        }

        let Ok(normalized) = normalize_url(url.as_str()) else {
            return false;
        };

        if !self.seen.insert(visit_key(&normalized)) {
            return false;
        }

        self.queue.push_back(FrontierEntry {
            url: normalized,
            depth,
            source_domain: source_domain.to_string(),
            discovered_at: Utc::now(),
        });
        true
    }

    /// Takes the oldest entry that has not been visited and marks it visited
    ///
    /// Entries whose URL was reached in the meantime (as a redirect target)
    /// are dropped.
    pub fn dequeue(&mut self) -> Option<FrontierEntry> {
        while let Some(entry) = self.queue.pop_front() {
            if self.visited.insert(visit_key(&entry.url)) {
                return Some(entry);
            }
        }
        None
    }

    /// Marks a URL as visited without going through the queue
    ///
    /// Used for redirect targets, so a page reached via a redirect is not
    /// fetched again under its final URL.
    pub fn mark_visited(&mut self, url: &Url) {
        if let Ok(normalized) = normalize_url(url.as_str()) {
            let key = visit_key(&normalized);
            self.seen.insert(key.clone());
            self.visited.insert(key);
        }
    }

    /// Checks if a URL has been queued or visited in this run
    pub fn is_known(&self, url: &Url) -> bool {
        match normalize_url(url.as_str()) {
            Ok(normalized) => self.seen.contains(&visit_key(&normalized)),
            Err(_) => false,
        }
    }

    pub fn is_visited(&self, url: &Url) -> bool {
        match normalize_url(url.as_str()) {
            Ok(normalized) => self.visited.contains(&visit_key(&normalized)),
            Err(_) => false,
        }
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Number of URLs waiting in the queue
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}
