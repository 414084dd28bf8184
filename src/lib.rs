//! Lantern: a crawl-to-index pipeline
//!
//! This crate crawls an approved set of web domains (HTML and PDF content),
//! extracts and chunks their text, and keeps a vector index of those chunks
//! current. Re-crawls are change-aware: a page whose extracted text has not
//! changed is never re-embedded.

pub mod config;
pub mod crawler;
pub mod index;
pub mod output;
pub mod registry;
pub mod robots;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Lantern operations
#[derive(Debug, Error)]
pub enum LanternError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error(transparent)]
    Fetch(#[from] crawler::FetchError),

    #[error(transparent)]
    Extraction(#[from] crawler::ExtractionError),

    #[error("Indexing error: {0}")]
    Index(#[from] index::IndexError),

    #[error("Domain crawl aborted: {0}")]
    DomainFatal(#[from] DomainFatalError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Conditions that stop the crawl of a whole domain
///
/// Page-level failures never produce one of these; they only arise while a
/// domain run is being seeded.
#[derive(Debug, Error)]
pub enum DomainFatalError {
    #[error("robots.txt disallows the root of {domain}")]
    RobotsBlocksRoot { domain: String },

    #[error("seed URL {url} is unreachable: {cause}")]
    SeedUnreachable { url: String, cause: String },

    #[error("invalid base URL for {domain}: {reason}")]
    InvalidBaseUrl { domain: String, reason: String },
}

/// Result type alias for Lantern operations
pub type Result<T> = std::result::Result<T, LanternError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::Coordinator;
pub use registry::{ApprovedDomainSet, DomainRegistry};
pub use state::{ContentKind, DomainStatus};
pub use url::{extract_domain, normalize_url};
