//! URL handling module for Lantern
//!
//! This module provides URL normalization, domain extraction and the
//! exact-or-subdomain membership test used by the approved-domain registry.

mod domain;
mod matcher;
mod normalize;

// Re-export main functions
pub use domain::{extract_domain, normalize_domain, strip_www};
pub use matcher::belongs_to_domain;
pub use normalize::{normalize_url, resolve_link, visit_key};
