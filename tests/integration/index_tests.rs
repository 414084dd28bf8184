//! Retrieval and status projections over a crawled index

use crate::common::{domain_of, html, page_url, test_config, TestCrawl};
use async_trait::async_trait;
use lantern_crawl::index::{search, EmbeddingProvider, IndexError, VectorFilter};
use lantern_crawl::output::{all_domain_reports, load_statistics};
use lantern_crawl::state::IndexStatus;
use lantern_crawl::storage::Storage;
use lantern_crawl::DomainStatus;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer};

struct UnreachableEmbedder;

#[async_trait]
impl EmbeddingProvider for UnreachableEmbedder {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        Err(IndexError::Embedding("connection refused".to_string()))
    }

    fn dimension(&self) -> usize {
        crate::common::DIMENSION
    }

    fn model_name(&self) -> &str {
        "unreachable"
    }
}

async fn two_domains() -> (MockServer, MockServer) {
    let a = MockServer::start().await;
    let b = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            "Alpha",
            "Alpha writes about lighthouses.",
            &[format!("{}/", b.uri())],
        ))
        .mount(&a)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("Beta", "Beta writes about bridges.", &[]))
        .mount(&b)
        .await;

    (a, b)
}

#[tokio::test]
async fn test_search_filters_by_domain() {
    let (a, b) = two_domains().await;
    let (da, db) = (domain_of(&a), domain_of(&b));
    let crawl = TestCrawl::new(test_config(&[&a, &b]));
    crawl.crawl(&[&da], false).await;

    let everything = search(
        crawl.embedder.as_ref(),
        crawl.store.as_ref(),
        "lighthouses",
        10,
        &VectorFilter::default(),
    )
    .await;
    assert_eq!(everything.len(), 2);

    let only_b = search(
        crawl.embedder.as_ref(),
        crawl.store.as_ref(),
        "lighthouses",
        10,
        &VectorFilter {
            domain: Some(db.clone()),
            content_kind: None,
        },
    )
    .await;
    assert_eq!(only_b.len(), 1);
    assert_eq!(only_b[0].metadata.domain, db);
    assert_eq!(only_b[0].metadata.url, page_url(&b, "/"));
    assert_eq!(only_b[0].metadata.title.as_deref(), Some("Beta"));
}

#[tokio::test]
async fn test_search_degrades_when_embedding_is_down() {
    let (a, b) = two_domains().await;
    let da = domain_of(&a);
    let crawl = TestCrawl::new(test_config(&[&a, &b]));
    crawl.crawl(&[&da], false).await;

    let hits = search(
        &UnreachableEmbedder,
        crawl.store.as_ref(),
        "bridges",
        5,
        &VectorFilter::default(),
    )
    .await;
    assert!(hits.is_empty());
}

#[tokio::test]
async fn test_status_reports_and_statistics() {
    let (a, b) = two_domains().await;
    let (da, db) = (domain_of(&a), domain_of(&b));
    let crawl = TestCrawl::new(test_config(&[&a, &b]));
    crawl.crawl(&[&da], false).await;

    let storage = crawl.db();
    let reports = all_domain_reports(&*storage, 5).unwrap();
    assert_eq!(reports.len(), 2);

    let report_a = reports.iter().find(|r| r.domain == da).unwrap();
    let report_b = reports.iter().find(|r| r.domain == db).unwrap();
    assert_eq!(report_a.status, DomainStatus::Completed);
    assert_eq!(report_a.page_count, 1);
    assert!(report_a.next_crawl_at > report_a.last_crawl_at);
    // Logs are attributed to the run that fetched the page
    assert_eq!(report_a.recent_logs.len(), 2);
    assert_eq!(report_b.status, DomainStatus::Pending);
    assert_eq!(report_b.page_count, 1);
    assert!(report_b.recent_logs.is_empty());

    let stats = load_statistics(&*storage).unwrap();
    assert_eq!(stats.total_domains, 2);
    assert_eq!(stats.total_pages, 2);
    assert_eq!(stats.total_chunks, 2);
    assert_eq!(stats.count_status(IndexStatus::Indexed), 2);
}

#[tokio::test]
async fn test_due_domains_after_crawl() {
    let (a, b) = two_domains().await;
    let (da, db) = (domain_of(&a), domain_of(&b));
    let crawl = TestCrawl::new(test_config(&[&a, &b]));

    let mut due = crawl.coordinator.due_domains().unwrap();
    due.sort();
    let mut both = vec![da.clone(), db.clone()];
    both.sort();
    assert_eq!(due, both);

    crawl.crawl(&[&da], false).await;
    assert_eq!(crawl.coordinator.due_domains().unwrap(), vec![db]);
    assert!(crawl.db().get_domain(&da).unwrap().unwrap().next_crawl_at.is_some());
}
