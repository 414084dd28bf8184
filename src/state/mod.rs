//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `DomainStatus`: The per-domain crawl lifecycle (pending, crawling, completed, failed)
//! - `PageOutcome`: What happened to a single URL during a crawl run
//! - `IndexStatus`: Whether a stored page's current text is reflected in the vector index
//! - `ContentKind`: Classification of fetched content (HTML, PDF, other)
//! - `HostState`: Per-host request timing used for politeness delays

mod content_kind;
mod domain_status;
mod host_state;
mod page_outcome;

// Re-export main types
pub use content_kind::ContentKind;
pub use domain_status::DomainStatus;
pub use host_state::HostState;
pub use page_outcome::{IndexStatus, PageOutcome};
