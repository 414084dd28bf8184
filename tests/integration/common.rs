//! Shared fixtures for the integration tests

use async_trait::async_trait;
use lantern_crawl::config::{
    Config, CrawlerConfig, DomainEntry, EmbeddingConfig, IndexerConfig, StorageConfig,
    UserAgentConfig,
};
use lantern_crawl::crawler::{ExtractionError, PdfExtractor, PdfTextExtractor};
use lantern_crawl::index::{EmbeddingProvider, IndexError, SqliteVectorStore};
use lantern_crawl::storage::{lock_storage, shared, SharedStorage, SqliteStorage, Storage};
use lantern_crawl::{Coordinator, DomainStatus};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::{MockServer, ResponseTemplate};

pub const DIMENSION: usize = 8;

/// Deterministic embedder: the same text always yields the same vector
#[derive(Default)]
pub struct HashEmbedder {
    texts: AtomicUsize,
}

impl HashEmbedder {
    /// Total number of texts embedded so far
    pub fn texts_embedded(&self) -> usize {
        self.texts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        self.texts.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|t| embed_text(t)).collect())
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn model_name(&self) -> &str {
        "hash-test"
    }
}

/// Bag-of-letters vector, so texts sharing words score higher
pub fn embed_text(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; DIMENSION];
    for byte in text.to_lowercase().bytes().filter(u8::is_ascii_alphabetic) {
        vector[(byte - b'a') as usize % DIMENSION] += 1.0;
    }
    vector[0] += 0.01;
    vector
}

/// PDF collaborator returning fixed per-page text
pub struct FixedPdf(pub Vec<String>);

impl PdfExtractor for FixedPdf {
    fn extract_pages(&self, _bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        Ok(self.0.clone())
    }
}

/// Everything a crawl test needs, kept alive for the test's duration
pub struct TestCrawl {
    pub coordinator: Coordinator,
    pub storage: SharedStorage,
    pub store: Arc<SqliteVectorStore>,
    pub embedder: Arc<HashEmbedder>,
    _dir: TempDir,
}

impl TestCrawl {
    pub fn new(config: Config) -> Self {
        Self::with_pdf(config, Arc::new(PdfTextExtractor))
    }

    pub fn with_pdf(mut config: Config, pdf: Arc<dyn PdfExtractor>) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = dir.path().join("lantern.db");
        config.storage.database_path = db_path.display().to_string();
        config.storage.vector_store_path = dir.path().join("vectors.db").display().to_string();

        let storage = shared(SqliteStorage::new(&db_path).expect("Failed to open database"));
        let store = Arc::new(SqliteVectorStore::open_in_memory().expect("Failed to open store"));
        let embedder = Arc::new(HashEmbedder::default());

        let coordinator = Coordinator::new(
            config,
            storage.clone(),
            embedder.clone(),
            store.clone(),
            pdf,
        )
        .expect("Failed to build coordinator");
        coordinator.seed_domains().expect("Failed to seed domains");

        Self {
            coordinator,
            storage,
            store,
            embedder,
            _dir: dir,
        }
    }

    pub async fn crawl(&self, domains: &[&str], force: bool) {
        let domains: Vec<String> = domains.iter().map(|d| d.to_string()).collect();
        self.coordinator
            .trigger_crawl(&domains, force)
            .await
            .expect("Crawl trigger failed");
    }

    pub fn db(&self) -> std::sync::MutexGuard<'_, SqliteStorage> {
        lock_storage(&self.storage).expect("Storage lock poisoned")
    }

    pub fn status(&self, domain: &str) -> DomainStatus {
        self.db()
            .get_domain(domain)
            .unwrap()
            .expect("domain should be registered")
            .status
    }
}

/// Domain identity of a mock server ("127.0.0.1:port")
pub fn domain_of(server: &MockServer) -> String {
    let url = url::Url::parse(&server.uri()).expect("Failed to parse server URI");
    lantern_crawl::extract_domain(&url).expect("Server URI has no host")
}

/// Absolute URL on a mock server, in normalized form
pub fn page_url(server: &MockServer, path: &str) -> String {
    lantern_crawl::normalize_url(&format!("{}{}", server.uri(), path))
        .expect("Failed to normalize URL")
        .to_string()
}

/// Configuration approving every given server, tuned for fast tests
pub fn test_config(servers: &[&MockServer]) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_depth: 2,
            max_concurrent_requests: 4,
            request_timeout_secs: 5,
            download_delay_ms: 0,
            max_retries: 1,
            retry_backoff_ms: 1,
            max_pages_per_domain: None,
            max_crawl_seconds: None,
            respect_robots_txt: true,
            enable_sitemap: false,
            max_sitemap_urls: 200,
            crawl_interval_hours: 24,
        },
        user_agent: UserAgentConfig {
            crawler_name: "LanternTest".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        indexer: IndexerConfig {
            retry_backoff_ms: 1,
            ..IndexerConfig::default()
        },
        embedding: EmbeddingConfig {
            endpoint: "http://127.0.0.1:9/unused".to_string(),
            model: "hash-test".to_string(),
            api_key: None,
            dimension: DIMENSION,
        },
        storage: StorageConfig {
            database_path: String::new(),
            vector_store_path: String::new(),
        },
        domains: servers
            .iter()
            .map(|server| DomainEntry {
                domain: domain_of(server),
                base_url: Some(format!("{}/", server.uri())),
            })
            .collect(),
    }
}

/// An HTML response with a title, a paragraph and links
pub fn html(title: &str, body: &str, links: &[String]) -> ResponseTemplate {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">{}</a>"#, href, href))
        .collect::<Vec<_>>()
        .join("\n");

    ResponseTemplate::new(200).set_body_raw(
        format!(
            "<html><head><title>{}</title></head><body><p>{}</p>{}</body></html>",
            title, body, anchors
        ),
        "text/html; charset=utf-8",
    )
}
