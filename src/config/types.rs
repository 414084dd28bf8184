use serde::Deserialize;

/// Main configuration structure for Lantern
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub indexer: IndexerConfig,
    pub embedding: EmbeddingConfig,
    pub storage: StorageConfig,
    #[serde(default, rename = "domain")]
    pub domains: Vec<DomainEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum discovery depth; the home page of a domain is depth 0
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum number of in-flight requests across all domains
    #[serde(
        rename = "max-concurrent-requests",
        default = "default_max_concurrent_requests"
    )]
    pub max_concurrent_requests: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Minimum time between requests to the same host (milliseconds)
    #[serde(rename = "download-delay-ms", default = "default_download_delay")]
    pub download_delay_ms: u64,

    /// Extra attempts for a retryable fetch failure
    #[serde(rename = "max-retries", default = "default_fetch_retries")]
    pub max_retries: u32,

    /// Base backoff between fetch attempts (milliseconds), doubled per attempt
    #[serde(rename = "retry-backoff-ms", default = "default_fetch_backoff")]
    pub retry_backoff_ms: u64,

    /// Page budget for a single domain run
    #[serde(rename = "max-pages-per-domain", default)]
    pub max_pages_per_domain: Option<u32>,

    /// Wall-clock budget for a single domain run (seconds)
    #[serde(rename = "max-crawl-seconds", default)]
    pub max_crawl_seconds: Option<u64>,

    #[serde(rename = "respect-robots-txt", default = "default_true")]
    pub respect_robots_txt: bool,

    #[serde(rename = "enable-sitemap", default = "default_true")]
    pub enable_sitemap: bool,

    /// Page URLs taken from sitemaps per domain run
    #[serde(rename = "max-sitemap-urls", default = "default_max_sitemap_urls")]
    pub max_sitemap_urls: usize,

    /// Hours between scheduled re-crawls of a domain
    #[serde(rename = "crawl-interval-hours", default = "default_crawl_interval")]
    pub crawl_interval_hours: u32,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler, also the robots.txt product token
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Full User-Agent header value: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Chunking and batching configuration for the indexing stage
#[derive(Debug, Clone, Deserialize)]
pub struct IndexerConfig {
    #[serde(rename = "chunk-size", default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(rename = "chunk-overlap", default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Maximum number of chunks per embedding request
    #[serde(rename = "embedding-batch-size", default = "default_embedding_batch")]
    pub embedding_batch_size: usize,

    /// Maximum number of entries per vector-store upsert
    #[serde(
        rename = "vector-store-batch-size",
        default = "default_vector_store_batch"
    )]
    pub vector_store_batch_size: usize,

    #[serde(rename = "max-retries", default = "default_index_retries")]
    pub max_retries: u32,

    #[serde(rename = "retry-backoff-ms", default = "default_index_backoff")]
    pub retry_backoff_ms: u64,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            embedding_batch_size: default_embedding_batch(),
            vector_store_batch_size: default_vector_store_batch(),
            max_retries: default_index_retries(),
            retry_backoff_ms: default_index_backoff(),
        }
    }
}

/// Embedding service configuration (OpenAI-compatible endpoint)
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    pub endpoint: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(rename = "api-key", default)]
    pub api_key: Option<String>,

    /// Expected vector dimension
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,
}

/// Persistent storage locations
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite metadata database (domains, pages, chunks, logs)
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the SQLite vector store
    #[serde(rename = "vector-store-path")]
    pub vector_store_path: String,
}

/// An approved domain with an optional explicit base URL
#[derive(Debug, Clone, Deserialize)]
pub struct DomainEntry {
    /// Registrable domain name (e.g., "example.com")
    pub domain: String,

    /// Home page to start from; defaults to `https://{domain}/`
    #[serde(rename = "base-url", default)]
    pub base_url: Option<String>,
}

impl DomainEntry {
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.clone(),
            None => format!("https://{}/", self.domain),
        }
    }
}

fn default_max_depth() -> u32 {
    5
}

fn default_max_concurrent_requests() -> u32 {
    4
}

fn default_request_timeout() -> u64 {
    30
}

fn default_download_delay() -> u64 {
    2000
}

fn default_fetch_retries() -> u32 {
    2
}

fn default_fetch_backoff() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

fn default_max_sitemap_urls() -> usize {
    200
}

fn default_crawl_interval() -> u32 {
    24
}

fn default_chunk_size() -> usize {
    500
}

fn default_chunk_overlap() -> usize {
    100
}

fn default_embedding_batch() -> usize {
    16
}

fn default_vector_store_batch() -> usize {
    50
}

fn default_index_retries() -> u32 {
    3
}

fn default_index_backoff() -> u64 {
    1000
}

fn default_embedding_model() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".to_string()
}

fn default_embedding_dimension() -> usize {
    384
}
