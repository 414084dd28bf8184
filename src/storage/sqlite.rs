//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::index::Chunk;
use crate::state::{ContentKind, DomainStatus, IndexStatus, PageOutcome};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    format_timestamp, ChunkRecord, CrawlLogEntry, DomainRecord, NewPage, PageRecord,
};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const DOMAIN_COLUMNS: &str = "id, domain, base_url, status, enabled, page_count, \
     crawl_interval_hours, last_crawl_at, next_crawl_at, error_count, last_error, \
     last_error_at, created_at";

const PAGE_COLUMNS: &str = "id, url, domain, content_kind, title, checksum, text, \
     size_bytes, depth, index_status, fetched_at, last_seen_at";

const LOG_COLUMNS: &str = "timestamp, domain, url, depth, outcome, content_kind, \
     status_code, size_bytes, chunk_count, duration_ms, error_message";

/// SQLite storage backend
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn domain_from_row(row: &Row<'_>) -> rusqlite::Result<DomainRecord> {
    Ok(DomainRecord {
        id: row.get(0)?,
        domain: row.get(1)?,
        base_url: row.get(2)?,
        status: DomainStatus::from_db_string(&row.get::<_, String>(3)?)
            .unwrap_or(DomainStatus::Pending),
        enabled: row.get::<_, i64>(4)? != 0,
        page_count: row.get::<_, i64>(5)? as u64,
        crawl_interval_hours: row.get(6)?,
        last_crawl_at: row.get(7)?,
        next_crawl_at: row.get(8)?,
        error_count: row.get(9)?,
        last_error: row.get(10)?,
        last_error_at: row.get(11)?,
        created_at: row.get(12)?,
    })
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<PageRecord> {
    Ok(PageRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        domain: row.get(2)?,
        content_kind: ContentKind::from_db_string(&row.get::<_, String>(3)?)
            .unwrap_or(ContentKind::Other),
        title: row.get(4)?,
        checksum: row.get(5)?,
        text: row.get(6)?,
        size_bytes: row.get::<_, i64>(7)? as u64,
        depth: row.get(8)?,
        index_status: IndexStatus::from_db_string(&row.get::<_, String>(9)?)
            .unwrap_or(IndexStatus::Pending),
        fetched_at: row.get(10)?,
        last_seen_at: row.get(11)?,
    })
}

fn log_from_row(row: &Row<'_>) -> rusqlite::Result<CrawlLogEntry> {
    Ok(CrawlLogEntry {
        timestamp: row.get(0)?,
        domain: row.get(1)?,
        url: row.get(2)?,
        depth: row.get(3)?,
        outcome: PageOutcome::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(PageOutcome::FetchFailed),
        content_kind: row
            .get::<_, Option<String>>(5)?
            .and_then(|s| ContentKind::from_db_string(&s)),
        status_code: row.get(6)?,
        size_bytes: row.get::<_, Option<i64>>(7)?.map(|n| n as u64),
        chunk_count: row.get(8)?,
        duration_ms: row.get::<_, i64>(9)? as u64,
        error_message: row.get(10)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Domain Management =====

    fn upsert_domain(
        &mut self,
        domain: &str,
        base_url: &str,
        crawl_interval_hours: u32,
    ) -> StorageResult<i64> {
        let now = format_timestamp(Utc::now());

        self.conn.execute(
            "INSERT INTO domains (domain, base_url, status, enabled, crawl_interval_hours, next_crawl_at, created_at)
             VALUES (?1, ?2, ?3, 1, ?4, ?5, ?5)
             ON CONFLICT(domain) DO UPDATE SET
                base_url = excluded.base_url,
                crawl_interval_hours = excluded.crawl_interval_hours,
                enabled = 1",
            params![
                domain,
                base_url,
                DomainStatus::Pending.to_db_string(),
                crawl_interval_hours,
                now
            ],
        )?;

        let id = self.conn.query_row(
            "SELECT id FROM domains WHERE domain = ?1",
            params![domain],
            |row| row.get(0),
        )?;

        Ok(id)
    }

    fn get_domain(&self, domain: &str) -> StorageResult<Option<DomainRecord>> {
        let sql = format!("SELECT {} FROM domains WHERE domain = ?1", DOMAIN_COLUMNS);
        let record = self
            .conn
            .query_row(&sql, params![domain], domain_from_row)
            .optional()?;
        Ok(record)
    }

    fn list_domains(&self) -> StorageResult<Vec<DomainRecord>> {
        let sql = format!("SELECT {} FROM domains ORDER BY domain", DOMAIN_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let domains = stmt
            .query_map([], domain_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(domains)
    }

    fn approved_domains(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT domain FROM domains WHERE enabled = 1 ORDER BY domain")?;
        let domains = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(domains)
    }

    fn due_domains(&self, now: DateTime<Utc>) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT domain FROM domains
             WHERE enabled = 1
               AND status != ?1
               AND (next_crawl_at IS NULL OR next_crawl_at <= ?2)
             ORDER BY domain",
        )?;
        let domains = stmt
            .query_map(
                params![DomainStatus::Crawling.to_db_string(), format_timestamp(now)],
                |row| row.get(0),
            )?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(domains)
    }

    fn begin_domain_crawl(&mut self, domain: &str) -> StorageResult<DomainRecord> {
        let mut record = self
            .get_domain(domain)?
            .ok_or_else(|| StorageError::DomainNotFound(domain.to_string()))?;

        if record.status == DomainStatus::Crawling {
            tracing::warn!(domain, "domain was left in crawling state; taking it over");
        } else if !record.status.can_transition_to(DomainStatus::Crawling) {
            return Err(StorageError::InvalidTransition {
                from: record.status,
                to: DomainStatus::Crawling,
            });
        }

        self.conn.execute(
            "UPDATE domains SET status = ?1 WHERE id = ?2",
            params![DomainStatus::Crawling.to_db_string(), record.id],
        )?;

        record.status = DomainStatus::Crawling;
        Ok(record)
    }

    fn finish_domain_crawl(
        &mut self,
        domain: &str,
        status: DomainStatus,
        error: Option<&str>,
    ) -> StorageResult<()> {
        let record = self
            .get_domain(domain)?
            .ok_or_else(|| StorageError::DomainNotFound(domain.to_string()))?;

        if !record.status.can_transition_to(status) {
            return Err(StorageError::InvalidTransition {
                from: record.status,
                to: status,
            });
        }

        let now = Utc::now();
        let page_count = self.count_pages_for_domain(domain)?;

        let (last_crawl_at, next_crawl_at) = if status.is_terminal() {
            let next = now + Duration::hours(i64::from(record.crawl_interval_hours));
            (Some(format_timestamp(now)), format_timestamp(next))
        } else {
            (record.last_crawl_at.clone(), format_timestamp(now))
        };

        let (last_error, last_error_at) = match error {
            Some(message) => (Some(message.to_string()), Some(format_timestamp(now))),
            None => (record.last_error.clone(), record.last_error_at.clone()),
        };

        let error_count = match status {
            DomainStatus::Failed => record.error_count + 1,
            DomainStatus::Completed => 0,
            _ => record.error_count,
        };

        self.conn.execute(
            "UPDATE domains SET
                status = ?1,
                page_count = ?2,
                last_crawl_at = ?3,
                next_crawl_at = ?4,
                last_error = ?5,
                last_error_at = ?6,
                error_count = ?7
             WHERE id = ?8",
            params![
                status.to_db_string(),
                page_count as i64,
                last_crawl_at,
                next_crawl_at,
                last_error,
                last_error_at,
                error_count,
                record.id
            ],
        )?;

        Ok(())
    }

    // ===== Page Management =====

    fn upsert_page(&mut self, page: &NewPage<'_>) -> StorageResult<i64> {
        let now = format_timestamp(Utc::now());

        let id = self.conn.query_row(
            "INSERT INTO pages (url, domain, content_kind, title, checksum, text, size_bytes,
                                depth, index_status, fetched_at, last_seen_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
             ON CONFLICT(url) DO UPDATE SET
                domain = excluded.domain,
                content_kind = excluded.content_kind,
                title = excluded.title,
                checksum = excluded.checksum,
                text = excluded.text,
                size_bytes = excluded.size_bytes,
                depth = excluded.depth,
                index_status = excluded.index_status,
                fetched_at = excluded.fetched_at,
                last_seen_at = excluded.last_seen_at
             RETURNING id",
            params![
                page.url,
                page.domain,
                page.content_kind.to_db_string(),
                page.title,
                page.checksum,
                page.text,
                page.size_bytes as i64,
                page.depth,
                page.index_status.to_db_string(),
                now
            ],
            |row| row.get(0),
        )?;

        Ok(id)
    }

    fn get_page_by_url(&self, url: &str) -> StorageResult<Option<PageRecord>> {
        let sql = format!("SELECT {} FROM pages WHERE url = ?1", PAGE_COLUMNS);
        let page = self
            .conn
            .query_row(&sql, params![url], page_from_row)
            .optional()?;
        Ok(page)
    }

    fn list_pages(&self, domain: Option<&str>) -> StorageResult<Vec<PageRecord>> {
        let sql = format!(
            "SELECT {} FROM pages WHERE (?1 IS NULL OR domain = ?1) ORDER BY url",
            PAGE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let pages = stmt
            .query_map(params![domain], page_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pages)
    }

    fn touch_page(&mut self, url: &str) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE pages SET last_seen_at = ?1 WHERE url = ?2",
            params![format_timestamp(Utc::now()), url],
        )?;
        Ok(())
    }

    fn set_index_status(&mut self, page_id: i64, status: IndexStatus) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE pages SET index_status = ?1 WHERE id = ?2",
            params![status.to_db_string(), page_id],
        )?;

        if updated == 0 {
            return Err(StorageError::PageNotFound(page_id));
        }
        Ok(())
    }

    fn count_pages_for_domain(&self, domain: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE domain = ?1",
            params![domain],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_total_pages(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Chunk Management =====

    fn vector_ids_for_page(&self, page_id: i64) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT cv.vector_id FROM chunk_vectors cv
             JOIN chunks c ON c.id = cv.chunk_id
             WHERE c.page_id = ?1
             ORDER BY c.sequence",
        )?;
        let ids = stmt
            .query_map(params![page_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    fn replace_chunks(
        &mut self,
        page_id: i64,
        chunks: &[Chunk],
        vector_ids: &[String],
    ) -> StorageResult<()> {
        if chunks.len() != vector_ids.len() {
            return Err(StorageError::ChunkVectorMismatch {
                chunks: chunks.len(),
                vectors: vector_ids.len(),
            });
        }

        let tx = self.conn.transaction()?;

        tx.execute(
            "DELETE FROM chunk_vectors WHERE chunk_id IN (SELECT id FROM chunks WHERE page_id = ?1)",
            params![page_id],
        )?;
        tx.execute("DELETE FROM chunks WHERE page_id = ?1", params![page_id])?;

        {
            let mut insert_chunk = tx.prepare(
                "INSERT INTO chunks (page_id, sequence, text, char_len, page_number)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            let mut insert_mapping =
                tx.prepare("INSERT INTO chunk_vectors (chunk_id, vector_id) VALUES (?1, ?2)")?;

            for (chunk, vector_id) in chunks.iter().zip(vector_ids) {
                let chunk_id = insert_chunk.insert(params![
                    page_id,
                    chunk.sequence,
                    chunk.text,
                    chunk.char_len,
                    chunk.page_number
                ])?;
                insert_mapping.execute(params![chunk_id, vector_id])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn chunks_for_page(&self, page_id: i64) -> StorageResult<Vec<ChunkRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.page_id, c.sequence, c.text, c.char_len, c.page_number, cv.vector_id
             FROM chunks c
             LEFT JOIN chunk_vectors cv ON cv.chunk_id = c.id
             WHERE c.page_id = ?1
             ORDER BY c.sequence",
        )?;

        let chunks = stmt
            .query_map(params![page_id], |row| {
                Ok(ChunkRecord {
                    id: row.get(0)?,
                    page_id: row.get(1)?,
                    sequence: row.get(2)?,
                    text: row.get(3)?,
                    char_len: row.get(4)?,
                    page_number: row.get(5)?,
                    vector_id: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(chunks)
    }

    fn count_chunks(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Crawl Log =====

    fn insert_crawl_log(&mut self, entry: &CrawlLogEntry) -> StorageResult<()> {
        let sql = format!(
            "INSERT INTO crawl_logs ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            LOG_COLUMNS
        );

        self.conn.execute(
            &sql,
            params![
                entry.timestamp,
                entry.domain,
                entry.url,
                entry.depth,
                entry.outcome.to_db_string(),
                entry.content_kind.map(|k| k.to_db_string()),
                entry.status_code,
                entry.size_bytes.map(|n| n as i64),
                entry.chunk_count,
                entry.duration_ms as i64,
                entry.error_message
            ],
        )?;

        Ok(())
    }

    fn recent_logs(&self, domain: &str, limit: usize) -> StorageResult<Vec<CrawlLogEntry>> {
        let sql = format!(
            "SELECT {} FROM crawl_logs WHERE domain = ?1 ORDER BY id DESC LIMIT ?2",
            LOG_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![domain, limit as i64], log_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    fn logs_for_url(&self, url: &str) -> StorageResult<Vec<CrawlLogEntry>> {
        let sql = format!(
            "SELECT {} FROM crawl_logs WHERE url = ?1 ORDER BY id",
            LOG_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![url], log_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(logs)
    }
}
