//! Per-URL processing unit
//!
//! One call handles a single frontier entry from fetch to index:
//! fetch (with retry) → classify/extract → change detection → persist page →
//! chunk → index. Every page-level failure is folded into a [`PageOutcome`];
//! nothing here aborts the domain run. Each attempt produces exactly one
//! crawl-log row and one tracing event.

use crate::crawler::extractor::{ExtractionResult, Extractor};
use crate::crawler::fetcher::{FetchOutcome, Fetcher};
use crate::crawler::link_filter::LinkFilter;
use crate::index::{compute_checksum, ChangeDetector, Chunker, Indexer, PageToIndex};
use crate::state::{ContentKind, IndexStatus, PageOutcome};
use crate::storage::{
    lock_storage, now_timestamp, CrawlLogEntry, NewPage, SharedStorage, Storage, StorageResult,
};
use crate::url::normalize_url;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// A URL to process within a domain run
#[derive(Debug, Clone)]
pub struct PageJob {
    pub url: Url,
    pub depth: u32,
    /// Domain of the page the URL was found on
    pub source_domain: String,
    /// Domain whose run discovered the URL
    pub run_domain: String,
}

/// Result of processing one URL
#[derive(Debug, Clone)]
pub struct PageReport {
    pub url: Url,
    /// Normalized URL after redirects
    pub final_url: Url,
    pub depth: u32,
    /// Domain the page was stored under
    pub page_domain: Option<String>,
    pub outcome: PageOutcome,
    pub status_code: Option<u16>,
    /// Outbound links (HTML only)
    pub links: Vec<Url>,
    pub error: Option<String>,
}

/// Accumulates what happened to a page while it is processed
struct Attempt {
    outcome: PageOutcome,
    final_url: Url,
    page_domain: Option<String>,
    content_kind: Option<ContentKind>,
    status_code: Option<u16>,
    size_bytes: Option<u64>,
    chunk_count: Option<u32>,
    links: Vec<Url>,
    error: Option<String>,
}

impl Attempt {
    fn new(url: &Url) -> Self {
        Self {
            outcome: PageOutcome::FetchFailed,
            final_url: url.clone(),
            page_domain: None,
            content_kind: None,
            status_code: None,
            size_bytes: None,
            chunk_count: None,
            links: Vec::new(),
            error: None,
        }
    }

    fn fail(mut self, outcome: PageOutcome, error: impl ToString) -> Self {
        self.outcome = outcome;
        self.error = Some(error.to_string());
        self
    }

    fn finish(mut self, outcome: PageOutcome) -> Self {
        self.outcome = outcome;
        self
    }
}

/// Shared per-URL machinery, cloned into each worker task
#[derive(Clone)]
pub struct PagePipeline {
    fetcher: Arc<Fetcher>,
    extractor: Extractor,
    storage: SharedStorage,
    detector: ChangeDetector,
    chunker: Chunker,
    indexer: Arc<Indexer>,
}

impl PagePipeline {
    pub fn new(
        fetcher: Arc<Fetcher>,
        extractor: Extractor,
        storage: SharedStorage,
        chunker: Chunker,
        indexer: Arc<Indexer>,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            detector: ChangeDetector::new(storage.clone()),
            storage,
            chunker,
            indexer,
        }
    }

    pub fn fetcher(&self) -> &Arc<Fetcher> {
        &self.fetcher
    }

    /// Processes one URL and records the attempt
    ///
    /// # Arguments
    ///
    /// * `job` - The URL, its depth and domains
    /// * `filter` - The run's link filter, used to place redirected pages
    /// * `force` - Re-index even if the text is unchanged
    pub async fn process(&self, job: &PageJob, filter: &LinkFilter, force: bool) -> PageReport {
        let started = Instant::now();
        let attempt = self.run(job, filter, force).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        self.record(job, &attempt, duration_ms);

        PageReport {
            url: job.url.clone(),
            final_url: attempt.final_url,
            depth: job.depth,
            page_domain: attempt.page_domain,
            outcome: attempt.outcome,
            status_code: attempt.status_code,
            links: attempt.links,
            error: attempt.error,
        }
    }

    async fn run(&self, job: &PageJob, filter: &LinkFilter, force: bool) -> Attempt {
        let mut attempt = Attempt::new(&job.url);

        let fetched = match self.fetcher.fetch_with_retry(&job.url).await {
            Ok(FetchOutcome::Fetched(page)) => page,
            Ok(FetchOutcome::RobotsDisallowed) => {
                return attempt.finish(PageOutcome::RobotsDisallowed)
            }
            Err(e) => {
                attempt.status_code = e.status_code;
                return attempt.fail(PageOutcome::FetchFailed, e);
            }
        };

        attempt.status_code = Some(fetched.status_code);
        attempt.size_bytes = Some(fetched.body.len() as u64);
        attempt.final_url =
            normalize_url(fetched.final_url.as_str()).unwrap_or_else(|_| fetched.final_url.clone());

        let Some(domain) = filter.owning_domain(&attempt.final_url, &job.source_domain) else {
            let target = attempt.final_url.to_string();
            return attempt.fail(
                PageOutcome::FetchFailed,
                format!("redirected outside approved domains to {}", target),
            );
        };
        attempt.page_domain = Some(domain.clone());

        let extractor = self.extractor.clone();
        let content_type = fetched.content_type;
        let body = fetched.body;
        let base = attempt.final_url.clone();
        let extracted = tokio::task::spawn_blocking(move || {
            extractor.extract(&content_type, &body, &base)
        })
        .await;

        let extraction = match extracted {
            Ok(Ok(extraction)) => extraction,
            Ok(Err(e)) => return attempt.fail(PageOutcome::ExtractionFailed, e),
            Err(e) => return attempt.fail(PageOutcome::ExtractionFailed, e),
        };

        attempt.content_kind = Some(extraction.kind);
        attempt.links = extraction.links.clone();

        let url = attempt.final_url.to_string();

        if !extraction.kind.is_indexable() {
            let page_id =
                match self.store_page(job, &attempt, &domain, &extraction, None, IndexStatus::Skipped) {
                    Ok(id) => id,
                    Err(e) => return attempt.fail(PageOutcome::IndexFailed, e),
                };

            // A page that used to be indexed keeps no vectors once it is not
            let page = PageToIndex {
                page_id,
                url: &url,
                domain: &domain,
                title: extraction.title.as_deref(),
                content_kind: extraction.kind,
            };
            return match self.indexer.clear(&page).await {
                Ok(_) => attempt.finish(PageOutcome::Recorded),
                Err(e) => {
                    if let Err(status_err) = lock_storage(&self.storage)
                        .and_then(|mut s| s.set_index_status(page_id, IndexStatus::Failed))
                    {
                        tracing::warn!(url = %url, error = %status_err, "failed to record index status");
                    }
                    attempt.fail(PageOutcome::IndexFailed, e)
                }
            };
        }

        let checksum = compute_checksum(&extraction.text);

        match self.detector.should_reindex(&url, &checksum, force) {
            Ok(true) => {}
            Ok(false) => {
                let touched = lock_storage(&self.storage).and_then(|mut s| s.touch_page(&url));
                return match touched {
                    Ok(()) => attempt.finish(PageOutcome::Unchanged),
                    Err(e) => attempt.fail(PageOutcome::IndexFailed, e),
                };
            }
            Err(e) => return attempt.fail(PageOutcome::IndexFailed, e),
        }

        let page_id = match self.store_page(
            job,
            &attempt,
            &domain,
            &extraction,
            Some(&checksum),
            IndexStatus::Pending,
        ) {
            Ok(id) => id,
            Err(e) => return attempt.fail(PageOutcome::IndexFailed, e),
        };

        let chunks = match &extraction.page_boundaries {
            Some(boundaries) => self.chunker.split_pages(&extraction.text, boundaries),
            None => self.chunker.split(&extraction.text),
        };
        attempt.chunk_count = Some(chunks.len() as u32);

        let page = PageToIndex {
            page_id,
            url: &url,
            domain: &domain,
            title: extraction.title.as_deref(),
            content_kind: extraction.kind,
        };

        let indexed = self.indexer.index(&page, &chunks).await;
        let status = if indexed.is_ok() {
            IndexStatus::Indexed
        } else {
            IndexStatus::Failed
        };
        if let Err(e) = lock_storage(&self.storage).and_then(|mut s| s.set_index_status(page_id, status)) {
            tracing::warn!(url = %url, error = %e, "failed to record index status");
        }

        match indexed {
            Ok(_) => attempt.finish(PageOutcome::Indexed),
            Err(e) => attempt.fail(PageOutcome::IndexFailed, e),
        }
    }

    fn store_page(
        &self,
        job: &PageJob,
        attempt: &Attempt,
        domain: &str,
        extraction: &ExtractionResult,
        checksum: Option<&str>,
        index_status: IndexStatus,
    ) -> StorageResult<i64> {
        let url = attempt.final_url.to_string();
        let text = checksum.map(|_| extraction.text.as_str());
        let page = NewPage {
            url: &url,
            domain,
            content_kind: extraction.kind,
            title: extraction.title.as_deref(),
            checksum,
            text,
            size_bytes: attempt.size_bytes.unwrap_or(0),
            depth: job.depth,
            index_status,
        };

        lock_storage(&self.storage).and_then(|mut s| s.upsert_page(&page))
    }

    /// Writes the crawl-log row and the structured tracing event
    fn record(&self, job: &PageJob, attempt: &Attempt, duration_ms: u64) {
        let bytes = attempt.size_bytes.unwrap_or(0);

        if attempt.outcome.is_error() {
            tracing::warn!(
                domain = %job.run_domain,
                url = %job.url,
                depth = job.depth,
                outcome = %attempt.outcome,
                duration_ms,
                bytes,
                error = attempt.error.as_deref().unwrap_or(""),
                "page failed"
            );
        } else {
            tracing::info!(
                domain = %job.run_domain,
                url = %job.url,
                depth = job.depth,
                outcome = %attempt.outcome,
                duration_ms,
                bytes,
                "page processed"
            );
        }

        let entry = CrawlLogEntry {
            timestamp: now_timestamp(),
            domain: job.run_domain.clone(),
            url: job.url.to_string(),
            depth: job.depth,
            outcome: attempt.outcome,
            content_kind: attempt.content_kind,
            status_code: attempt.status_code,
            size_bytes: attempt.size_bytes,
            chunk_count: attempt.chunk_count,
            duration_ms,
            error_message: attempt.error.clone(),
        };

        if let Err(e) = lock_storage(&self.storage).and_then(|mut s| s.insert_crawl_log(&entry)) {
            tracing::warn!(url = %job.url, error = %e, "failed to write crawl log");
        }
    }
}
