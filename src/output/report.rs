//! Per-domain status projection
//!
//! A [`DomainReport`] is a read-only view of one domain: its lifecycle
//! state, live page count, crawl times, last error, and the tail of its
//! crawl log.

use crate::state::DomainStatus;
use crate::storage::{CrawlLogEntry, Storage};
use crate::Result;

/// Status of one domain as shown to operators
#[derive(Debug, Clone)]
pub struct DomainReport {
    pub domain: String,
    pub base_url: String,
    pub status: DomainStatus,
    /// Pages currently stored under this domain
    pub page_count: u64,
    pub last_crawl_at: Option<String>,
    pub next_crawl_at: Option<String>,
    pub error_count: u32,
    pub last_error: Option<String>,
    pub last_error_at: Option<String>,
    /// Most recent crawl-log records, newest first
    pub recent_logs: Vec<CrawlLogEntry>,
}

/// Builds the report for one domain
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `domain` - Normalized domain name
/// * `tail` - Number of crawl-log records to include
///
/// # Returns
///
/// * `Ok(Some(DomainReport))` - The domain is registered
/// * `Ok(None)` - Unknown domain
pub fn domain_report(
    storage: &dyn Storage,
    domain: &str,
    tail: usize,
) -> Result<Option<DomainReport>> {
    let Some(record) = storage.get_domain(domain)? else {
        return Ok(None);
    };

    let page_count = storage.count_pages_for_domain(domain)?;
    let recent_logs = storage.recent_logs(domain, tail)?;

    Ok(Some(DomainReport {
        domain: record.domain,
        base_url: record.base_url,
        status: record.status,
        page_count,
        last_crawl_at: record.last_crawl_at,
        next_crawl_at: record.next_crawl_at,
        error_count: record.error_count,
        last_error: record.last_error,
        last_error_at: record.last_error_at,
        recent_logs,
    }))
}

/// Builds reports for every registered domain, ordered by name
pub fn all_domain_reports(storage: &dyn Storage, tail: usize) -> Result<Vec<DomainReport>> {
    let mut reports = Vec::new();
    for record in storage.list_domains()? {
        if let Some(report) = domain_report(storage, &record.domain, tail)? {
            reports.push(report);
        }
    }
    reports.sort_by(|a, b| a.domain.cmp(&b.domain));
    Ok(reports)
}

/// Prints a report to stdout
pub fn print_report(report: &DomainReport) {
    println!("=== {} ===", report.domain);
    println!("  Base URL: {}", report.base_url);
    println!("  Status: {}", report.status);
    println!("  Pages: {}", report.page_count);
    println!(
        "  Last crawl: {}",
        report.last_crawl_at.as_deref().unwrap_or("never")
    );
    println!(
        "  Next crawl: {}",
        report.next_crawl_at.as_deref().unwrap_or("-")
    );

    if let Some(error) = &report.last_error {
        println!(
            "  Last error ({} total): {} at {}",
            report.error_count,
            error,
            report.last_error_at.as_deref().unwrap_or("?")
        );
    }

    if !report.recent_logs.is_empty() {
        println!("  Recent activity:");
        for log in &report.recent_logs {
            let status = log
                .status_code
                .map(|code| code.to_string())
                .unwrap_or_else(|| "-".to_string());
            print!(
                "    {} [{}] {} {} ({} ms)",
                log.timestamp, log.outcome, status, log.url, log.duration_ms
            );
            match &log.error_message {
                Some(error) => println!(": {}", error),
                None => println!(),
            }
        }
    }
    println!();
}
