//! Crawler module: from frontier entry to indexed page
//!
//! This module contains the core crawling logic, including:
//! - Breadth-first frontier with per-run visited tracking
//! - Polite, bounded-concurrency HTTP fetching with robots.txt and retries
//! - Content classification and HTML/PDF extraction
//! - Whitelist and depth filtering of discovered links
//! - Sitemap-assisted seeding
//! - Per-domain crawl orchestration

mod coordinator;
mod extractor;
mod fetcher;
mod frontier;
mod link_filter;
mod parser;
mod pipeline;
mod sitemap;

pub use coordinator::{parse_base_url, Coordinator, CrawlSummary};
pub use extractor::{
    classify, ExtractionError, ExtractionResult, Extractor, PageBoundary, PdfExtractor,
    PdfTextExtractor,
};
pub use fetcher::{build_http_client, FetchError, FetchOutcome, FetchedPage, Fetcher};
pub use frontier::{Frontier, FrontierEntry};
pub use link_filter::{LinkDecision, LinkFilter};
pub use parser::{parse_html, ParsedPage};
pub use pipeline::{PageJob, PagePipeline, PageReport};
pub use sitemap::{discover_sitemap_urls, parse_sitemap, Sitemap};
