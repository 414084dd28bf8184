//! Index-wide statistics from the metadata store
//!
//! This module provides functionality for extracting and displaying
//! totals across every domain: pages by index status and kind, chunks, and
//! registered domains.

use crate::state::{ContentKind, IndexStatus};
use crate::storage::Storage;
use crate::Result;
use std::collections::BTreeMap;

/// Totals across the whole metadata store
#[derive(Debug, Clone, Default)]
pub struct IndexStatistics {
    /// Number of registered domains
    pub total_domains: u64,

    /// Number of stored pages
    pub total_pages: u64,

    /// Number of stored chunks (one vector entry each)
    pub total_chunks: u64,

    /// Count of pages by index status
    pub pages_by_status: BTreeMap<String, u64>,

    /// Count of pages by content kind
    pub pages_by_kind: BTreeMap<String, u64>,
}

impl IndexStatistics {
    pub fn count_status(&self, status: IndexStatus) -> u64 {
        self.pages_by_status
            .get(status.to_db_string())
            .copied()
            .unwrap_or(0)
    }

    pub fn count_kind(&self, kind: ContentKind) -> u64 {
        self.pages_by_kind
            .get(kind.to_db_string())
            .copied()
            .unwrap_or(0)
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
pub fn load_statistics(storage: &dyn Storage) -> Result<IndexStatistics> {
    let total_domains = storage.list_domains()?.len() as u64;
    let total_pages = storage.count_total_pages()?;
    let total_chunks = storage.count_chunks()?;

    let mut pages_by_status = BTreeMap::new();
    let mut pages_by_kind = BTreeMap::new();
    for page in storage.list_pages(None)? {
        *pages_by_status
            .entry(page.index_status.to_db_string().to_string())
            .or_insert(0) += 1;
        *pages_by_kind
            .entry(page.content_kind.to_db_string().to_string())
            .or_insert(0) += 1;
    }

    Ok(IndexStatistics {
        total_domains,
        total_pages,
        total_chunks,
        pages_by_status,
        pages_by_kind,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &IndexStatistics) {
    println!("=== Index Statistics ===\n");

    println!("Overview:");
    println!("  Domains: {}", stats.total_domains);
    println!("  Pages: {}", stats.total_pages);
    println!("  Chunks: {}", stats.total_chunks);
    println!();

    if !stats.pages_by_status.is_empty() {
        println!("Pages by Index Status:");
        for (status, count) in &stats.pages_by_status {
            let percentage = if stats.total_pages > 0 {
                (*count as f64 / stats.total_pages as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", status, count, percentage);
        }
        println!();
    }

    if !stats.pages_by_kind.is_empty() {
        println!("Pages by Content Kind:");
        for (kind, count) in &stats.pages_by_kind {
            println!("  {}: {}", kind, count);
        }
        println!();
    }
}
