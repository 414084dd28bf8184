//! Crawl orchestration
//!
//! The coordinator drives one run per domain through
//! `Pending → Crawling → Completed | Failed`:
//! - Seeds the frontier with the domain's home page (processed first, so an
//!   unreachable domain fails fast) and with sitemap URLs
//! - Pulls frontier entries breadth-first into a bounded set of page tasks
//! - Filters and enqueues the links each page reports
//! - Stops on exhaustion, on the page or time budget, or on cancellation
//!
//! Page failures are folded into the run summary; only seeding problems
//! fail a domain.

use crate::config::Config;
use crate::crawler::extractor::{Extractor, PdfExtractor};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::frontier::{Frontier, FrontierEntry};
use crate::crawler::link_filter::{LinkDecision, LinkFilter};
use crate::crawler::pipeline::{PageJob, PagePipeline, PageReport};
use crate::crawler::sitemap::discover_sitemap_urls;
use crate::index::{Chunker, EmbeddingProvider, Indexer, VectorStore};
use crate::registry::DomainRegistry;
use crate::state::{DomainStatus, PageOutcome};
use crate::storage::{lock_storage, SharedStorage, Storage};
use crate::url::{normalize_domain, normalize_url};
use crate::{DomainFatalError, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Outcome of one domain run
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub domain: String,
    pub status: DomainStatus,
    pub pages_attempted: u32,
    pub pages_indexed: u32,
    pub pages_unchanged: u32,
    pub pages_failed: u32,
    pub duration: Duration,
    pub error: Option<String>,
}

impl CrawlSummary {
    fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            status: DomainStatus::Pending,
            pages_attempted: 0,
            pages_indexed: 0,
            pages_unchanged: 0,
            pages_failed: 0,
            duration: Duration::ZERO,
            error: None,
        }
    }

    fn record(&mut self, report: &PageReport) {
        self.pages_attempted += 1;
        match report.outcome {
            PageOutcome::Indexed => self.pages_indexed += 1,
            PageOutcome::Unchanged => self.pages_unchanged += 1,
            outcome if outcome.is_error() => self.pages_failed += 1,
            _ => {}
        }
    }
}

/// Why the dispatch loop of a domain run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunEnd {
    Exhausted,
    BudgetReached,
    Cancelled,
}

/// Removes a domain from the active set when its run ends
struct ActiveGuard {
    active: Arc<Mutex<HashSet<String>>>,
    domain: String,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        active.remove(&self.domain);
    }
}

/// Entry point for crawl runs
///
/// Cloning is cheap; clones share the fetcher, storage, registry and
/// cancellation token.
#[derive(Clone)]
pub struct Coordinator {
    config: Arc<Config>,
    storage: SharedStorage,
    registry: Arc<DomainRegistry>,
    pipeline: PagePipeline,
    cancel: CancellationToken,
    active: Arc<Mutex<HashSet<String>>>,
}

impl Coordinator {
    /// Creates a coordinator and its shared crawl machinery
    ///
    /// # Arguments
    ///
    /// * `config` - Loaded and validated configuration
    /// * `storage` - Relational metadata store
    /// * `embedder` - Embedding collaborator
    /// * `store` - Vector store collaborator
    /// * `pdf` - PDF text collaborator
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to crawl
    /// * `Err(LanternError)` - The HTTP client could not be built
    pub fn new(
        config: Config,
        storage: SharedStorage,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        pdf: Arc<dyn PdfExtractor>,
    ) -> Result<Self> {
        let fetcher = Arc::new(Fetcher::new(&config.crawler, &config.user_agent)?);
        let chunker = Chunker::new(config.indexer.chunk_size, config.indexer.chunk_overlap);
        let indexer = Arc::new(Indexer::new(
            &config.indexer,
            embedder,
            store,
            storage.clone(),
        ));
        let pipeline = PagePipeline::new(
            fetcher,
            Extractor::new(pdf),
            storage.clone(),
            chunker,
            indexer,
        );

        Ok(Self {
            config: Arc::new(config),
            storage,
            registry: Arc::new(DomainRegistry::default()),
            pipeline,
            cancel: CancellationToken::new(),
            active: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    /// Token that stops every run of this coordinator when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn registry(&self) -> &Arc<DomainRegistry> {
        &self.registry
    }

    pub fn storage(&self) -> &SharedStorage {
        &self.storage
    }

    /// Registers the configured domains and loads the approved set
    ///
    /// # Returns
    ///
    /// The number of approved domains after the refresh
    pub fn seed_domains(&self) -> Result<usize> {
        let interval = self.config.crawler.crawl_interval_hours;
        let mut storage = lock_storage(&self.storage)?;

        for entry in &self.config.domains {
            let domain = normalize_domain(&entry.domain);
            storage.upsert_domain(&domain, &entry.base_url(), interval)?;
        }

        let count = self.registry.refresh(&*storage)?;
        tracing::info!(domains = count, "approved domains loaded");
        Ok(count)
    }

    /// Domains whose next crawl time has passed
    pub fn due_domains(&self) -> Result<Vec<String>> {
        let due = lock_storage(&self.storage)?.due_domains(chrono::Utc::now())?;
        Ok(due)
    }

    /// Starts one run per domain and waits for all of them
    ///
    /// Unknown domains are registered with `https://{domain}/` as their home
    /// page. A domain that already has a run in progress is skipped.
    ///
    /// # Arguments
    ///
    /// * `domains` - Domains to crawl (any form `normalize_domain` accepts)
    /// * `force` - Re-index pages even when their text is unchanged
    pub async fn trigger_crawl(&self, domains: &[String], force: bool) -> Result<Vec<CrawlSummary>> {
        let mut targets = Vec::new();
        {
            let mut storage = lock_storage(&self.storage)?;
            for raw in domains {
                let domain = normalize_domain(raw);
                if domain.is_empty() || targets.contains(&domain) {
                    continue;
                }
                if storage.get_domain(&domain)?.is_none() {
                    tracing::info!(domain = %domain, "registering new domain");
                    storage.upsert_domain(
                        &domain,
                        &format!("https://{}/", domain),
                        self.config.crawler.crawl_interval_hours,
                    )?;
                }
                targets.push(domain);
            }
            self.registry.refresh(&*storage)?;
        }

        let mut runs = JoinSet::new();
        for domain in targets {
            let Some(guard) = self.claim(&domain) else {
                tracing::warn!(domain = %domain, "crawl already in progress; skipping");
                continue;
            };

            let coordinator = self.clone();
            runs.spawn(async move {
                let _guard = guard;
                coordinator.crawl_domain(&domain, force).await
            });
        }

        let mut summaries = Vec::new();
        while let Some(joined) = runs.join_next().await {
            match joined {
                Ok(summary) => summaries.push(summary),
                Err(e) => tracing::error!(error = %e, "domain run task panicked"),
            }
        }

        Ok(summaries)
    }

    fn claim(&self, domain: &str) -> Option<ActiveGuard> {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(domain.to_string()) {
            return None;
        }
        Some(ActiveGuard {
            active: Arc::clone(&self.active),
            domain: domain.to_string(),
        })
    }

    /// Runs one domain from `Crawling` to its final state
    ///
    /// Never fails: storage problems and domain-fatal conditions end up in
    /// the returned summary.
    pub async fn crawl_domain(&self, domain: &str, force: bool) -> CrawlSummary {
        let started = Instant::now();
        let mut summary = CrawlSummary::new(domain);

        let record = match lock_storage(&self.storage).and_then(|mut s| s.begin_domain_crawl(domain))
        {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(domain, error = %e, "could not start domain crawl");
                summary.status = DomainStatus::Failed;
                summary.error = Some(e.to_string());
                return summary;
            }
        };

        tracing::info!(domain, base_url = %record.base_url, force, "domain crawl started");

        let result = self.run_domain(domain, &record.base_url, force, &mut summary).await;

        let (status, error) = match result {
            Ok(RunEnd::Cancelled) => (DomainStatus::Pending, Some("crawl cancelled".to_string())),
            Ok(_) => (DomainStatus::Completed, None),
            Err(e) => (DomainStatus::Failed, Some(e.to_string())),
        };

        if let Err(e) = lock_storage(&self.storage)
            .and_then(|mut s| s.finish_domain_crawl(domain, status, error.as_deref()))
        {
            tracing::error!(domain, error = %e, "could not record domain crawl result");
        }

        summary.status = status;
        summary.error = error;
        summary.duration = started.elapsed();

        match status {
            DomainStatus::Failed => tracing::error!(
                domain,
                error = summary.error.as_deref().unwrap_or(""),
                "domain crawl failed"
            ),
            _ => tracing::info!(
                domain,
                status = %status,
                attempted = summary.pages_attempted,
                indexed = summary.pages_indexed,
                unchanged = summary.pages_unchanged,
                failed = summary.pages_failed,
                duration_ms = summary.duration.as_millis() as u64,
                "domain crawl finished"
            ),
        }

        summary
    }

    async fn run_domain(
        &self,
        domain: &str,
        base_url: &str,
        force: bool,
        summary: &mut CrawlSummary,
    ) -> Result<RunEnd> {
        let crawler = &self.config.crawler;
        let deadline = crawler
            .max_crawl_seconds
            .map(|secs| Instant::now() + Duration::from_secs(secs));
        let seed = parse_base_url(domain, base_url)?;

        let filter = LinkFilter::new(self.registry.snapshot(), crawler.max_depth);
        let fetcher = self.pipeline.fetcher();

        if crawler.respect_robots_txt {
            let mut root = seed.clone();
            root.set_path("/");
            root.set_query(None);
            if !fetcher.is_allowed(&root).await {
                return Err(DomainFatalError::RobotsBlocksRoot {
                    domain: domain.to_string(),
                }
                .into());
            }
        }

        let mut frontier = Frontier::new(crawler.max_depth);
        frontier.enqueue(&seed, 0, domain);
        let Some(seed_entry) = frontier.dequeue() else {
            return Ok(RunEnd::Exhausted);
        };

        let seed_report = self
            .pipeline
            .process(&self.job(&seed_entry, domain), &filter, force)
            .await;
        summary.record(&seed_report);

        match seed_report.outcome {
            PageOutcome::FetchFailed => {
                return Err(DomainFatalError::SeedUnreachable {
                    url: seed.to_string(),
                    cause: seed_report.error.unwrap_or_default(),
                }
                .into());
            }
            PageOutcome::RobotsDisallowed => {
                return Err(DomainFatalError::RobotsBlocksRoot {
                    domain: domain.to_string(),
                }
                .into());
            }
            _ => {}
        }

        if crawler.enable_sitemap {
            let found = discover_sitemap_urls(fetcher, &seed, crawler.max_sitemap_urls).await;
            let mut queued = 0usize;
            for url in &found {
                if let LinkDecision::Accept { url, depth, .. } =
                    filter.evaluate_at(url, domain, 0, &frontier)
                {
                    if frontier.enqueue(&url, depth, domain) {
                        queued += 1;
                    }
                }
            }
            tracing::debug!(domain, found = found.len(), queued, "sitemap seeding done");
        }

        self.absorb(&seed_report, &seed_entry, domain, &filter, &mut frontier);

        self.dispatch(domain, force, &filter, &mut frontier, summary, deadline)
            .await
    }

    /// Runs page tasks until the frontier drains or the run must stop
    async fn dispatch(
        &self,
        domain: &str,
        force: bool,
        filter: &LinkFilter,
        frontier: &mut Frontier,
        summary: &mut CrawlSummary,
        deadline: Option<Instant>,
    ) -> Result<RunEnd> {
        let crawler = &self.config.crawler;
        let limit = crawler.max_concurrent_requests.max(1) as usize;
        let page_budget = crawler.max_pages_per_domain;

        let mut dispatched: u32 = summary.pages_attempted;
        let mut end = RunEnd::Exhausted;
        let mut tasks: JoinSet<(FrontierEntry, PageReport)> = JoinSet::new();

        loop {
            while end == RunEnd::Exhausted && tasks.len() < limit {
                if self.cancel.is_cancelled() {
                    end = RunEnd::Cancelled;
                    break;
                }
                if page_budget.is_some_and(|max| dispatched >= max) {
                    tracing::info!(domain, pages = dispatched, "page budget reached");
                    end = RunEnd::BudgetReached;
                    break;
                }
                if deadline.is_some_and(|at| Instant::now() >= at) {
                    tracing::info!(domain, "time budget reached");
                    end = RunEnd::BudgetReached;
                    break;
                }

                let Some(entry) = frontier.dequeue() else {
                    break;
                };

                let job = self.job(&entry, domain);
                let pipeline = self.pipeline.clone();
                let filter = filter.clone();
                tasks.spawn(async move {
                    let report = pipeline.process(&job, &filter, force).await;
                    (entry, report)
                });
                dispatched += 1;
            }

            if tasks.is_empty() {
                break;
            }

            let in_flight = tasks.len();
            let joined = tokio::select! {
                joined = tasks.join_next() => joined,
                _ = self.cancel.cancelled(), if end != RunEnd::Cancelled => {
                    tracing::info!(domain, in_flight, "cancellation requested");
                    end = RunEnd::Cancelled;
                    continue;
                }
            };

            match joined {
                Some(Ok((entry, report))) => {
                    summary.record(&report);
                    if end == RunEnd::Exhausted {
                        self.absorb(&report, &entry, domain, filter, frontier);
                    }
                }
                Some(Err(e)) => {
                    summary.pages_failed += 1;
                    tracing::error!(domain, error = %e, "page task failed");
                }
                None => break,
            }
        }

        Ok(end)
    }

    /// Marks a processed page visited and enqueues its accepted links
    fn absorb(
        &self,
        report: &PageReport,
        entry: &FrontierEntry,
        run_domain: &str,
        filter: &LinkFilter,
        frontier: &mut Frontier,
    ) {
        frontier.mark_visited(&report.final_url);

        let source = report.page_domain.as_deref().unwrap_or(run_domain);
        let mut accepted = 0usize;
        let mut cross = 0usize;

        for link in &report.links {
            match filter.evaluate(link, source, entry.depth, frontier) {
                LinkDecision::Accept {
                    url,
                    domain,
                    depth,
                    cross_domain,
                } => {
                    if frontier.enqueue(&url, depth, source) {
                        accepted += 1;
                        if cross_domain {
                            cross += 1;
                            tracing::debug!(from = source, to = %domain, url = %url, "cross-domain discovery");
                        }
                    }
                }
                decision => {
                    tracing::trace!(url = %link, ?decision, "link rejected");
                }
            }
        }

        if accepted > 0 {
            tracing::debug!(
                url = %report.final_url,
                links = report.links.len(),
                accepted,
                cross_domain = cross,
                "links enqueued"
            );
        }
    }

    fn job(&self, entry: &FrontierEntry, run_domain: &str) -> PageJob {
        PageJob {
            url: entry.url.clone(),
            depth: entry.depth,
            source_domain: entry.source_domain.clone(),
            run_domain: run_domain.to_string(),
        }
    }
}

/// Parses and normalizes a domain's home page URL
pub fn parse_base_url(domain: &str, base_url: &str) -> std::result::Result<Url, DomainFatalError> {
    normalize_url(base_url).map_err(|e| DomainFatalError::InvalidBaseUrl {
        domain: domain.to_string(),
        reason: e.to_string(),
    })
}
