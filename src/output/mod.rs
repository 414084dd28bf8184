//! Output module for operator-facing reports
//!
//! This module handles:
//! - Per-domain status projections with a crawl-log tail
//! - Index-wide statistics
//! - Printing crawl-run summaries

mod report;
pub mod stats;

pub use report::{all_domain_reports, domain_report, print_report, DomainReport};
pub use stats::{load_statistics, print_statistics, IndexStatistics};

use crate::crawler::CrawlSummary;

/// Prints the summaries returned by a crawl trigger
pub fn print_crawl_summaries(summaries: &[CrawlSummary]) {
    println!("=== Crawl Summary ===\n");

    for summary in summaries {
        println!("{} [{}]", summary.domain, summary.status);
        println!(
            "  Pages: {} attempted, {} indexed, {} unchanged, {} failed",
            summary.pages_attempted,
            summary.pages_indexed,
            summary.pages_unchanged,
            summary.pages_failed
        );
        println!("  Duration: {:.1}s", summary.duration.as_secs_f64());
        if let Some(error) = &summary.error {
            println!("  Error: {}", error);
        }
        println!();
    }
}
