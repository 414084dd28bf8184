//! Storage module for persisting crawl data
//!
//! This module handles all relational database operations, including:
//! - SQLite database initialization and schema management
//! - Domain records and their crawl lifecycle
//! - Pages keyed by URL, with checksum and extracted text
//! - Chunks and their mapping to vector-store entries
//! - The per-page crawl log

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::{ContentKind, DomainStatus, IndexStatus, PageOutcome};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Storage shared between the orchestrator, page workers and the indexer
pub type SharedStorage = Arc<Mutex<SqliteStorage>>;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Wraps a storage backend for sharing across tasks
pub fn shared(storage: SqliteStorage) -> SharedStorage {
    Arc::new(Mutex::new(storage))
}

/// Locks shared storage, mapping a poisoned lock to a storage error
pub fn lock_storage(storage: &SharedStorage) -> StorageResult<MutexGuard<'_, SqliteStorage>> {
    storage.lock().map_err(|_| StorageError::LockPoisoned)
}

/// Represents a domain in the database
#[derive(Debug, Clone)]
pub struct DomainRecord {
    pub id: i64,
    pub domain: String,
    pub base_url: String,
    pub status: DomainStatus,
    pub enabled: bool,
    pub page_count: u64,
    pub crawl_interval_hours: u32,
    pub last_crawl_at: Option<String>,
    pub next_crawl_at: Option<String>,
    pub error_count: u32,
    pub last_error: Option<String>,
    pub last_error_at: Option<String>,
    pub created_at: String,
}

/// Represents a page in the database
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub id: i64,
    pub url: String,
    pub domain: String,
    pub content_kind: ContentKind,
    pub title: Option<String>,
    pub checksum: Option<String>,
    pub text: Option<String>,
    pub size_bytes: u64,
    pub depth: u32,
    pub index_status: IndexStatus,
    pub fetched_at: String,
    pub last_seen_at: String,
}

/// Values written when a page is fetched
#[derive(Debug, Clone)]
pub struct NewPage<'a> {
    pub url: &'a str,
    pub domain: &'a str,
    pub content_kind: ContentKind,
    pub title: Option<&'a str>,
    pub checksum: Option<&'a str>,
    pub text: Option<&'a str>,
    pub size_bytes: u64,
    pub depth: u32,
    pub index_status: IndexStatus,
}

/// Represents a stored chunk and its vector-store mapping
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub id: i64,
    pub page_id: i64,
    pub sequence: u32,
    pub text: String,
    pub char_len: u32,
    pub page_number: Option<u32>,
    pub vector_id: Option<String>,
}

/// One crawl-log record: the outcome of a single page attempt
#[derive(Debug, Clone)]
pub struct CrawlLogEntry {
    pub timestamp: String,
    pub domain: String,
    pub url: String,
    pub depth: u32,
    pub outcome: PageOutcome,
    pub content_kind: Option<ContentKind>,
    pub status_code: Option<u16>,
    pub size_bytes: Option<u64>,
    pub chunk_count: Option<u32>,
    pub duration_ms: u64,
    pub error_message: Option<String>,
}

/// Formats a timestamp the way every stored time is written
///
/// Fixed-width UTC RFC 3339, so stored values sort and compare as strings.
pub fn format_timestamp(at: chrono::DateTime<chrono::Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// The current time as a stored timestamp
pub fn now_timestamp() -> String {
    format_timestamp(chrono::Utc::now())
}
