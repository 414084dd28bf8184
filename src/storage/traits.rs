//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::index::Chunk;
use crate::state::{DomainStatus, IndexStatus};
use crate::storage::{ChunkRecord, CrawlLogEntry, DomainRecord, NewPage, PageRecord};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Domain not found: {0}")]
    DomainNotFound(String),

    #[error("Page not found: {0}")]
    PageNotFound(i64),

    #[error("Invalid domain status transition: {from} -> {to}")]
    InvalidTransition { from: DomainStatus, to: DomainStatus },

    #[error("Chunk/vector mismatch: {chunks} chunks, {vectors} vector ids")]
    ChunkVectorMismatch { chunks: usize, vectors: usize },

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines all relational metadata operations needed by the
/// crawler and indexer. Vector entries live in a separate
/// [`VectorStore`](crate::index::VectorStore).
pub trait Storage {
    // ===== Domain Management =====

    /// Registers a domain, or re-enables an existing one
    ///
    /// An existing row keeps its status and history; only the base URL and
    /// crawl interval are refreshed.
    ///
    /// # Returns
    ///
    /// The domain's row ID
    fn upsert_domain(
        &mut self,
        domain: &str,
        base_url: &str,
        crawl_interval_hours: u32,
    ) -> StorageResult<i64>;

    /// Gets a domain by name
    fn get_domain(&self, domain: &str) -> StorageResult<Option<DomainRecord>>;

    /// Lists all domains ordered by name
    fn list_domains(&self) -> StorageResult<Vec<DomainRecord>>;

    /// Names of all enabled domains (the approved-domain set)
    fn approved_domains(&self) -> StorageResult<Vec<String>>;

    /// Enabled domains whose next scheduled crawl is at or before `now`
    fn due_domains(&self, now: DateTime<Utc>) -> StorageResult<Vec<String>>;

    /// Moves a domain into `Crawling`
    ///
    /// A domain left in `Crawling` by a process that died is taken over.
    fn begin_domain_crawl(&mut self, domain: &str) -> StorageResult<DomainRecord>;

    /// Ends a crawl run, moving the domain to `status`
    ///
    /// Recomputes the page count. `Completed` and `Failed` set the last and
    /// next crawl times; `Pending` (a cancelled run) makes the domain due
    /// again immediately. A non-empty `error` is recorded as the last error.
    fn finish_domain_crawl(
        &mut self,
        domain: &str,
        status: DomainStatus,
        error: Option<&str>,
    ) -> StorageResult<()>;

    // ===== Page Management =====

    /// Inserts or updates a page keyed by URL
    ///
    /// # Returns
    ///
    /// The page ID
    fn upsert_page(&mut self, page: &NewPage<'_>) -> StorageResult<i64>;

    /// Gets a page by URL
    fn get_page_by_url(&self, url: &str) -> StorageResult<Option<PageRecord>>;

    /// Lists pages, optionally restricted to one domain
    fn list_pages(&self, domain: Option<&str>) -> StorageResult<Vec<PageRecord>>;

    /// Refreshes the last-seen timestamp of an unchanged page
    fn touch_page(&mut self, url: &str) -> StorageResult<()>;

    fn set_index_status(&mut self, page_id: i64, status: IndexStatus) -> StorageResult<()>;

    fn count_pages_for_domain(&self, domain: &str) -> StorageResult<u64>;

    fn count_total_pages(&self) -> StorageResult<u64>;

    // ===== Chunk Management =====

    /// Vector-store IDs currently mapped to a page's chunks
    fn vector_ids_for_page(&self, page_id: i64) -> StorageResult<Vec<String>>;

    /// Replaces all chunks of a page and their vector mappings in one transaction
    ///
    /// `vector_ids[i]` is the vector-store ID of `chunks[i]`.
    fn replace_chunks(
        &mut self,
        page_id: i64,
        chunks: &[Chunk],
        vector_ids: &[String],
    ) -> StorageResult<()>;

    fn chunks_for_page(&self, page_id: i64) -> StorageResult<Vec<ChunkRecord>>;

    fn count_chunks(&self) -> StorageResult<u64>;

    // ===== Crawl Log =====

    fn insert_crawl_log(&mut self, entry: &CrawlLogEntry) -> StorageResult<()>;

    /// Most recent log entries for a domain, newest first
    fn recent_logs(&self, domain: &str, limit: usize) -> StorageResult<Vec<CrawlLogEntry>>;

    /// All log entries that reference a URL, oldest first
    fn logs_for_url(&self, url: &str) -> StorageResult<Vec<CrawlLogEntry>>;
}
