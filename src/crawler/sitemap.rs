//! Sitemap-assisted discovery
//!
//! Looks for a sitemap at the locations robots.txt advertises, then at the
//! conventional paths, and returns the page URLs it lists. The first
//! candidate that answers with a 2xx wins. A `<sitemapindex>` is followed one
//! level deep.

use crate::crawler::fetcher::{FetchOutcome, Fetcher};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use url::Url;

/// Maximum number of child sitemaps followed from an index
const MAX_CHILD_SITEMAPS: usize = 25;

/// Conventional sitemap paths tried after the robots.txt entries
const SITEMAP_PATHS: &[&str] = &["/sitemap.xml", "/sitemap_index.xml", "/sitemap-index.xml"];

/// The parsed contents of one sitemap document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sitemap {
    /// The document is a `<sitemapindex>` whose locations are sitemaps
    pub is_index: bool,
    pub locations: Vec<String>,
}

fn loc_regex() -> Option<&'static Regex> {
    static LOC: OnceLock<Option<Regex>> = OnceLock::new();
    LOC.get_or_init(|| Regex::new(r"(?is)<loc>\s*(.*?)\s*</loc>").ok())
        .as_ref()
}

/// Extracts `<loc>` entries from a sitemap or sitemap index
pub fn parse_sitemap(xml: &str) -> Sitemap {
    let is_index = xml.contains("<sitemapindex");

    let Some(loc) = loc_regex() else {
        return Sitemap::default();
    };

    let locations = loc
        .captures_iter(xml)
        .filter_map(|caps| caps.get(1))
        .map(|m| unescape_xml(m.as_str()))
        .filter(|loc| !loc.is_empty())
        .collect();

    Sitemap {
        is_index,
        locations,
    }
}

fn unescape_xml(s: &str) -> String {
    let s = s.trim();
    let s = s
        .strip_prefix("<![CDATA[")
        .and_then(|inner| inner.strip_suffix("]]>"))
        .unwrap_or(s);

    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Candidate sitemap URLs for the origin of `base_url`
fn candidates(advertised: &[String], base_url: &Url) -> Vec<Url> {
    let mut seen = HashSet::new();

    advertised
        .iter()
        .filter_map(|s| Url::parse(s.trim()).ok())
        .chain(SITEMAP_PATHS.iter().filter_map(|path| base_url.join(path).ok()))
        .filter(|url| seen.insert(url.to_string()))
        .collect()
}

/// Fetches and parses one sitemap, returning None if it is unavailable
async fn fetch_sitemap(fetcher: &Fetcher, url: &Url) -> Option<Sitemap> {
    if url.path().ends_with(".gz") {
        tracing::debug!(url = %url, "skipping compressed sitemap");
        return None;
    }

    match fetcher.fetch(url).await {
        Ok(FetchOutcome::Fetched(page)) => {
            let body = String::from_utf8_lossy(&page.body);
            Some(parse_sitemap(&body))
        }
        Ok(FetchOutcome::RobotsDisallowed) => None,
        Err(e) => {
            tracing::debug!(url = %url, error = %e, "sitemap not available");
            None
        }
    }
}

/// Discovers page URLs from the sitemaps of a domain
///
/// # Arguments
///
/// * `fetcher` - Shared fetcher (robots.txt and politeness apply)
/// * `base_url` - The domain's home page
/// * `limit` - Maximum number of page URLs to return (`max-sitemap-urls`)
///
/// # Returns
///
/// Up to `limit` absolute page URLs; empty if no sitemap exists
pub async fn discover_sitemap_urls(fetcher: &Fetcher, base_url: &Url, limit: usize) -> Vec<Url> {
    let robots = fetcher.robots_for(base_url).await;

    let mut sitemap = None;
    for candidate in candidates(robots.sitemaps(), base_url) {
        if let Some(found) = fetch_sitemap(fetcher, &candidate).await {
            tracing::debug!(url = %candidate, entries = found.locations.len(), "found sitemap");
            sitemap = Some(found);
            break;
        }
    }

    let Some(sitemap) = sitemap else {
        return Vec::new();
    };

    let page_locations = if sitemap.is_index {
        let mut pages = Vec::new();
        for child in sitemap
            .locations
            .iter()
            .filter_map(|loc| Url::parse(loc).ok())
            .take(MAX_CHILD_SITEMAPS)
        {
            if pages.len() >= limit {
                break;
            }
            if let Some(child_sitemap) = fetch_sitemap(fetcher, &child).await {
                pages.extend(child_sitemap.locations);
            }
        }
        pages
    } else {
        sitemap.locations
    };

    let (urls, dropped) = page_urls(&page_locations, limit);
    if dropped > 0 {
        tracing::info!(
            sitemap_base = %base_url,
            kept = urls.len(),
            dropped,
            "sitemap URL list truncated (max-sitemap-urls)"
        );
    }
    urls
}

/// Unique http(s) page URLs from sitemap locations, capped at `limit`
///
/// Returns the kept URLs and how many valid URLs were left out.
fn page_urls(locations: &[String], limit: usize) -> (Vec<Url>, usize) {
    let mut seen = HashSet::new();
    let mut unique: Vec<Url> = locations
        .iter()
        .filter_map(|loc| Url::parse(loc).ok())
        .filter(|url| url.scheme() == "http" || url.scheme() == "https")
        .filter(|url| seen.insert(url.to_string()))
        .collect();

    let dropped = unique.len().saturating_sub(limit);
    unique.truncate(limit);
    (unique, dropped)
}
