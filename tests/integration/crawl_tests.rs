//! End-to-end crawl runs against mock servers

use crate::common::{domain_of, html, page_url, test_config, FixedPdf, TestCrawl};
use lantern_crawl::index::{vector_id, VectorFilter, VectorStore};
use lantern_crawl::output::domain_report;
use lantern_crawl::state::{IndexStatus, PageOutcome};
use lantern_crawl::storage::Storage;
use lantern_crawl::{ContentKind, DomainStatus};
use std::sync::Arc;
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_cross_domain_discovery_scenario() {
    let a = MockServer::start().await;
    let b = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            "A home",
            "Welcome to domain A.",
            &[
                "/page1".to_string(),
                "/page2".to_string(),
                format!("{}/page1", b.uri()),
            ],
        ))
        .mount(&a)
        .await;
    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(html("A one", "First page of A.", &[]))
        .mount(&a)
        .await;
    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(html("A two", "Second page of A.", &[]))
        .mount(&a)
        .await;
    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(html("B one", "First page of B.", &[]))
        .expect(1)
        .mount(&b)
        .await;

    let (da, db) = (domain_of(&a), domain_of(&b));
    let crawl = TestCrawl::new(test_config(&[&a, &b]));
    crawl.crawl(&[&da], false).await;

    assert_eq!(crawl.status(&da), DomainStatus::Completed);

    let storage = crawl.db();
    assert_eq!(storage.count_total_pages().unwrap(), 4);
    assert_eq!(storage.count_pages_for_domain(&da).unwrap(), 3);
    assert_eq!(storage.count_pages_for_domain(&db).unwrap(), 1);

    let b_page = storage
        .get_page_by_url(&page_url(&b, "/page1"))
        .unwrap()
        .expect("b page should be stored");
    assert_eq!(b_page.domain, db);
    assert_eq!(b_page.depth, 1);
    assert_eq!(b_page.index_status, IndexStatus::Indexed);

    let report_a = domain_report(&*storage, &da, 10).unwrap().unwrap();
    let report_b = domain_report(&*storage, &db, 10).unwrap().unwrap();
    assert_eq!(report_a.page_count, 3);
    assert_eq!(report_b.page_count, 1);
    assert!(report_a.last_crawl_at.is_some());
    assert_eq!(report_a.recent_logs.len(), 4);
}

#[tokio::test]
async fn test_link_cycle_terminates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("Home", "Start here.", &["/b".to_string()]))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html("B", "Back to the start.", &["/".to_string(), "/b#top".to_string()]))
        .expect(1)
        .mount(&server)
        .await;

    let domain = domain_of(&server);
    let crawl = TestCrawl::new(test_config(&[&server]));
    crawl.crawl(&[&domain], false).await;

    assert_eq!(crawl.status(&domain), DomainStatus::Completed);
    assert_eq!(crawl.db().count_total_pages().unwrap(), 2);
}

#[tokio::test]
async fn test_unapproved_links_are_never_fetched() {
    let approved = MockServer::start().await;
    let outsider = MockServer::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&outsider)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            "Mixed",
            "Links everywhere.",
            &["/ok".to_string(), format!("{}/elsewhere", outsider.uri())],
        ))
        .mount(&approved)
        .await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(html("Ok", "Approved page.", &[]))
        .expect(1)
        .mount(&approved)
        .await;

    let domain = domain_of(&approved);
    let crawl = TestCrawl::new(test_config(&[&approved]));
    crawl.crawl(&[&domain], false).await;

    let storage = crawl.db();
    assert_eq!(storage.count_total_pages().unwrap(), 2);
    assert_eq!(storage.count_pages_for_domain(&domain_of(&outsider)).unwrap(), 0);
}

#[tokio::test]
async fn test_depth_limit_is_respected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("Home", "Depth zero.", &["/d1".to_string()]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/d1"))
        .respond_with(html("One", "Depth one.", &["/d2".to_string()]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/d2"))
        .respond_with(html("Two", "Depth two.", &[]))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = test_config(&[&server]);
    config.crawler.max_depth = 1;
    let domain = domain_of(&server);
    let crawl = TestCrawl::new(config);
    crawl.crawl(&[&domain], false).await;

    let pages = crawl.db().list_pages(Some(&domain)).unwrap();
    assert_eq!(pages.len(), 2);
    assert!(pages.iter().all(|p| p.depth <= 1));
}

#[tokio::test]
async fn test_server_error_does_not_abort_domain() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            "Home",
            "One good link, one bad.",
            &["/broken".to_string(), "/fine".to_string()],
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fine"))
        .respond_with(html("Fine", "Still here.", &[]))
        .mount(&server)
        .await;

    let domain = domain_of(&server);
    let crawl = TestCrawl::new(test_config(&[&server]));
    crawl.crawl(&[&domain], false).await;

    assert_eq!(crawl.status(&domain), DomainStatus::Completed);

    let storage = crawl.db();
    let logs = storage.logs_for_url(&page_url(&server, "/broken")).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].outcome, PageOutcome::FetchFailed);
    assert_eq!(logs[0].status_code, Some(500));
    assert!(logs[0].error_message.is_some());

    assert!(storage
        .get_page_by_url(&page_url(&server, "/fine"))
        .unwrap()
        .is_some());
    assert!(storage.get_domain(&domain).unwrap().unwrap().last_error.is_none());
}

#[tokio::test]
async fn test_unchanged_recrawl_skips_embedding() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("Home", "Stable content that never changes.", &["/about".to_string()]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html("About", "Also stable.", &[]))
        .mount(&server)
        .await;

    let domain = domain_of(&server);
    let crawl = TestCrawl::new(test_config(&[&server]));

    crawl.crawl(&[&domain], false).await;
    let embedded = crawl.embedder.texts_embedded();
    let vectors = crawl.store.count().await.unwrap();
    assert!(embedded > 0);
    assert_eq!(vectors, embedded);

    crawl.crawl(&[&domain], false).await;
    assert_eq!(crawl.embedder.texts_embedded(), embedded);
    assert_eq!(crawl.store.count().await.unwrap(), vectors);

    {
        let storage = crawl.db();
        let logs = storage.logs_for_url(&page_url(&server, "/")).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].outcome, PageOutcome::Indexed);
        assert_eq!(logs[1].outcome, PageOutcome::Unchanged);
    }

    crawl.crawl(&[&domain], true).await;
    assert_eq!(crawl.embedder.texts_embedded(), embedded * 2);
    assert_eq!(crawl.store.count().await.unwrap(), vectors);
}

#[tokio::test]
async fn test_changed_content_replaces_vectors_exactly() {
    let server = MockServer::start().await;
    let long_text = "Lanterns light the harbor at night ".repeat(35);

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("Harbor", &long_text, &[]))
        .mount(&server)
        .await;

    let domain = domain_of(&server);
    let url = page_url(&server, "/");
    let crawl = TestCrawl::new(test_config(&[&server]));

    crawl.crawl(&[&domain], false).await;
    let before = crawl.store.ids_for_url(&url).await.unwrap();
    assert!(before.len() > 1);

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("Harbor", "The harbor is dark now.", &[]))
        .mount(&server)
        .await;

    crawl.crawl(&[&domain], false).await;

    let mut after = crawl.store.ids_for_url(&url).await.unwrap();
    after.sort();
    assert_eq!(after, vec![vector_id(&url, 0)]);
    assert_eq!(crawl.store.count().await.unwrap(), 1);

    let storage = crawl.db();
    let page = storage.get_page_by_url(&url).unwrap().unwrap();
    let chunks = storage.chunks_for_page(page.id).unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].vector_id.as_deref(), Some(after[0].as_str()));
    assert_eq!(page.text.as_deref(), Some("The harbor is dark now."));
}

#[tokio::test]
async fn test_robots_blocking_root_fails_domain() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("User-agent: *\nDisallow: /", "text/plain"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("Home", "Hidden.", &[]))
        .expect(0)
        .mount(&server)
        .await;

    let domain = domain_of(&server);
    let crawl = TestCrawl::new(test_config(&[&server]));
    crawl.crawl(&[&domain], false).await;

    let record = crawl.db().get_domain(&domain).unwrap().unwrap();
    assert_eq!(record.status, DomainStatus::Failed);
    assert_eq!(record.error_count, 1);
    assert!(record.last_error.unwrap().contains("robots.txt"));
    assert!(record.last_error_at.is_some());
}

#[tokio::test]
async fn test_unreachable_seed_fails_only_that_domain() {
    let down = MockServer::start().await;
    let up = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&down)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("Up", "Working fine.", &[]))
        .mount(&up)
        .await;

    let (d_down, d_up) = (domain_of(&down), domain_of(&up));
    let crawl = TestCrawl::new(test_config(&[&down, &up]));
    crawl.crawl(&[&d_down, &d_up], false).await;

    assert_eq!(crawl.status(&d_down), DomainStatus::Failed);
    assert_eq!(crawl.status(&d_up), DomainStatus::Completed);

    let record = crawl.db().get_domain(&d_down).unwrap().unwrap();
    assert!(record.last_error.unwrap().contains("unreachable"));
}

#[tokio::test]
async fn test_redirect_target_is_stored() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("Home", "Moved things.", &["/old".to_string()]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("location", format!("{}/new", server.uri()).as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(html("New", "The new home of the old page.", &["/new".to_string()]))
        .expect(1)
        .mount(&server)
        .await;

    let domain = domain_of(&server);
    let crawl = TestCrawl::new(test_config(&[&server]));
    crawl.crawl(&[&domain], false).await;

    let storage = crawl.db();
    assert!(storage
        .get_page_by_url(&page_url(&server, "/old"))
        .unwrap()
        .is_none());
    let page = storage
        .get_page_by_url(&page_url(&server, "/new"))
        .unwrap()
        .expect("redirect target should be stored");
    assert_eq!(page.title.as_deref(), Some("New"));
}

#[tokio::test]
async fn test_sitemap_urls_seed_the_frontier() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("Home", "No links here.", &[]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            format!(
                r#"<?xml version="1.0"?>
                <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
                  <url><loc>{uri}/</loc></url>
                  <url><loc>{uri}/orphan</loc></url>
                </urlset>"#,
                uri = server.uri()
            ),
            "application/xml",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orphan"))
        .respond_with(html("Orphan", "Only the sitemap knows me.", &[]))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config(&[&server]);
    config.crawler.enable_sitemap = true;
    let domain = domain_of(&server);
    let crawl = TestCrawl::new(config);
    crawl.crawl(&[&domain], false).await;

    let page = crawl
        .db()
        .get_page_by_url(&page_url(&server, "/orphan"))
        .unwrap()
        .expect("sitemap page should be stored");
    assert_eq!(page.depth, 0);
}

#[tokio::test]
async fn test_page_budget_stops_run() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            "Home",
            "Many links.",
            &["/p1".to_string(), "/p2".to_string(), "/p3".to_string()],
        ))
        .mount(&server)
        .await;
    for leaf in ["/p1", "/p2", "/p3"] {
        Mock::given(method("GET"))
            .and(path(leaf))
            .respond_with(html("Leaf", "A leaf page.", &[]))
            .mount(&server)
            .await;
    }

    let mut config = test_config(&[&server]);
    config.crawler.max_pages_per_domain = Some(2);
    let domain = domain_of(&server);
    let crawl = TestCrawl::new(config);
    crawl.crawl(&[&domain], false).await;

    assert_eq!(crawl.status(&domain), DomainStatus::Completed);
    assert_eq!(crawl.db().count_pages_for_domain(&domain).unwrap(), 2);
}

#[tokio::test]
async fn test_cancelled_run_returns_domain_to_pending() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("Home", "Seed page.", &["/next".to_string()]))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/next"))
        .respond_with(html("Next", "Never reached.", &[]))
        .expect(0)
        .mount(&server)
        .await;

    let domain = domain_of(&server);
    let crawl = TestCrawl::new(test_config(&[&server]));
    crawl.coordinator.cancellation_token().cancel();
    crawl.crawl(&[&domain], false).await;

    let record = crawl.db().get_domain(&domain).unwrap().unwrap();
    assert_eq!(record.status, DomainStatus::Pending);
    assert_eq!(record.last_error.as_deref(), Some("crawl cancelled"));
    assert!(record.last_crawl_at.is_none());
}

#[tokio::test]
async fn test_pdf_chunks_carry_page_numbers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("Home", "See the report.", &["/report.pdf".to_string()]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4 stub".to_vec(), "application/pdf"),
        )
        .mount(&server)
        .await;

    let pdf = FixedPdf(vec![
        "Annual harbor report.".to_string(),
        String::new(),
        "Appendix with tide tables.".to_string(),
    ]);
    let domain = domain_of(&server);
    let crawl = TestCrawl::with_pdf(test_config(&[&server]), Arc::new(pdf));
    crawl.crawl(&[&domain], false).await;

    let url = page_url(&server, "/report.pdf");
    {
        let storage = crawl.db();
        let page = storage.get_page_by_url(&url).unwrap().unwrap();
        assert_eq!(page.content_kind, ContentKind::Pdf);
        assert_eq!(page.index_status, IndexStatus::Indexed);
        assert!(page.text.unwrap().contains("tide tables"));
    }

    let filter = VectorFilter {
        domain: Some(domain.clone()),
        content_kind: Some(ContentKind::Pdf),
    };
    let hits = crawl
        .store
        .query(&crate::common::embed_text("harbor report"), 10, &filter)
        .await
        .unwrap();
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|h| h.metadata.url == url));
    assert!(hits.iter().all(|h| h.metadata.page_number.is_some()));
}

#[tokio::test]
async fn test_other_content_is_recorded_not_indexed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("Home", "Look at the logo.", &["/logo.png".to_string()]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0x89, b'P', b'N', b'G'], "image/png"))
        .mount(&server)
        .await;

    let domain = domain_of(&server);
    let crawl = TestCrawl::new(test_config(&[&server]));
    crawl.crawl(&[&domain], false).await;

    let url = page_url(&server, "/logo.png");
    {
        let storage = crawl.db();
        let page = storage.get_page_by_url(&url).unwrap().unwrap();
        assert_eq!(page.content_kind, ContentKind::Other);
        assert_eq!(page.index_status, IndexStatus::Skipped);
        assert!(storage.chunks_for_page(page.id).unwrap().is_empty());
    }
    assert!(crawl.store.ids_for_url(&url).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_page_that_stops_being_html_loses_its_vectors() {
    let server = MockServer::start().await;
    let home = || html("Home", "See the notes.", &["/notes".to_string()]);

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(home())
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/notes"))
        .respond_with(html("Notes", "Tide tables for the harbor.", &[]))
        .mount(&server)
        .await;

    let domain = domain_of(&server);
    let url = page_url(&server, "/notes");
    let crawl = TestCrawl::new(test_config(&[&server]));

    crawl.crawl(&[&domain], false).await;
    assert_eq!(crawl.store.ids_for_url(&url).await.unwrap().len(), 1);

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(home())
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/notes"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0x89, b'P', b'N', b'G'], "image/png"))
        .mount(&server)
        .await;

    crawl.crawl(&[&domain], false).await;

    assert!(crawl.store.ids_for_url(&url).await.unwrap().is_empty());
    let storage = crawl.db();
    let page = storage.get_page_by_url(&url).unwrap().unwrap();
    assert_eq!(page.content_kind, ContentKind::Other);
    assert_eq!(page.index_status, IndexStatus::Skipped);
    assert!(page.checksum.is_none());
    assert!(storage.chunks_for_page(page.id).unwrap().is_empty());
}
