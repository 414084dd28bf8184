//! Lantern main entry point
//!
//! This is the command-line interface for the Lantern crawl-to-index pipeline.

use anyhow::Context;
use clap::Parser;
use lantern_crawl::config::{load_config_with_hash, Config};
use lantern_crawl::crawler::PdfTextExtractor;
use lantern_crawl::index::{search, HttpEmbeddingClient, SqliteVectorStore, VectorFilter};
use lantern_crawl::output::{
    all_domain_reports, load_statistics, print_crawl_summaries, print_report, print_statistics,
};
use lantern_crawl::storage::{lock_storage, shared, SqliteStorage, Storage};
use lantern_crawl::url::normalize_domain;
use lantern_crawl::{Coordinator, ContentKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Number of crawl-log records shown per domain in `--status`
const STATUS_LOG_TAIL: usize = 10;

/// Lantern: crawl approved domains into a searchable vector index
///
/// Lantern crawls an approved set of domains (HTML and PDF), follows links
/// between them, and keeps a vector index of their text current. Pages whose
/// text has not changed since the last crawl are not re-embedded.
#[derive(Parser, Debug)]
#[command(name = "lantern-crawl")]
#[command(version)]
#[command(about = "Crawl approved domains into a vector index", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Crawl only these domains (repeatable; defaults to every configured domain)
    #[arg(long = "domain", value_name = "DOMAIN", conflicts_with = "due")]
    domains: Vec<String>,

    /// Crawl the domains whose next crawl time has passed
    #[arg(long)]
    due: bool,

    /// Re-index every page even when its text is unchanged
    #[arg(long)]
    force: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["status", "query"])]
    dry_run: bool,

    /// Show per-domain status and index statistics, then exit
    #[arg(long, conflicts_with_all = ["dry_run", "query"])]
    status: bool,

    /// Search the index instead of crawling
    #[arg(long, value_name = "TEXT", conflicts_with_all = ["dry_run", "status"])]
    query: Option<String>,

    /// Restrict `--query` to one domain
    #[arg(long, value_name = "DOMAIN", requires = "query")]
    filter_domain: Option<String>,

    /// Restrict `--query` to one content kind (html, pdf)
    #[arg(long, value_name = "KIND", requires = "query")]
    filter_kind: Option<String>,

    /// Number of results for `--query`
    #[arg(long, default_value_t = 5, requires = "query")]
    top_k: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.status {
        handle_status(&config)?;
    } else if let Some(query) = &cli.query {
        handle_query(&config, query, &cli).await?;
    } else {
        handle_crawl(config, &cli).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("lantern_crawl=info,warn"),
            1 => EnvFilter::new("lantern_crawl=debug,info"),
            2 => EnvFilter::new("lantern_crawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Lantern Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!(
        "  Max concurrent requests: {}",
        config.crawler.max_concurrent_requests
    );
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Download delay: {}ms", config.crawler.download_delay_ms);
    println!(
        "  Retries: {} (backoff {}ms)",
        config.crawler.max_retries, config.crawler.retry_backoff_ms
    );
    if let Some(max) = config.crawler.max_pages_per_domain {
        println!("  Max pages per domain: {}", max);
    }
    if let Some(secs) = config.crawler.max_crawl_seconds {
        println!("  Max crawl time: {}s", secs);
    }
    println!("  Respect robots.txt: {}", config.crawler.respect_robots_txt);
    println!(
        "  Sitemap discovery: {} (up to {} URLs)",
        config.crawler.enable_sitemap, config.crawler.max_sitemap_urls
    );
    println!(
        "  Re-crawl interval: {}h",
        config.crawler.crawl_interval_hours
    );

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nIndexer:");
    println!(
        "  Chunk size: {} (overlap {})",
        config.indexer.chunk_size, config.indexer.chunk_overlap
    );
    println!(
        "  Batches: {} per embedding call, {} per vector-store write",
        config.indexer.embedding_batch_size, config.indexer.vector_store_batch_size
    );

    println!("\nEmbedding:");
    println!("  Endpoint: {}", config.embedding.endpoint);
    println!(
        "  Model: {} ({} dimensions)",
        config.embedding.model, config.embedding.dimension
    );

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);
    println!("  Vector store: {}", config.storage.vector_store_path);

    println!("\nApproved Domains ({}):", config.domains.len());
    for entry in &config.domains {
        println!("  - {} ({})", normalize_domain(&entry.domain), entry.base_url());
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --status mode: per-domain reports and index totals
fn handle_status(config: &Config) -> anyhow::Result<()> {
    let storage = SqliteStorage::new(Path::new(&config.storage.database_path))
        .context("failed to open database")?;

    println!("Database: {}\n", config.storage.database_path);

    for report in all_domain_reports(&storage, STATUS_LOG_TAIL)? {
        print_report(&report);
    }

    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --query mode: retrieves the most similar chunks
async fn handle_query(config: &Config, query: &str, cli: &Cli) -> anyhow::Result<()> {
    let embedder = HttpEmbeddingClient::new(&config.embedding)?;
    let store = SqliteVectorStore::open(Path::new(&config.storage.vector_store_path))
        .context("failed to open vector store")?;

    let content_kind = match cli.filter_kind.as_deref() {
        Some(kind) => Some(
            ContentKind::from_db_string(&kind.to_lowercase())
                .with_context(|| format!("unknown content kind '{}'", kind))?,
        ),
        None => None,
    };
    let filter = VectorFilter {
        domain: cli.filter_domain.as_deref().map(normalize_domain),
        content_kind,
    };

    let hits = search(&embedder, &store, query, cli.top_k, &filter).await;

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (rank, hit) in hits.iter().enumerate() {
        let title = hit.metadata.title.as_deref().unwrap_or("(untitled)");
        match hit.metadata.page_number {
            Some(page) => println!(
                "{}. [{:.3}] {} - {} (page {})",
                rank + 1,
                hit.score,
                title,
                hit.metadata.url,
                page
            ),
            None => println!(
                "{}. [{:.3}] {} - {}",
                rank + 1,
                hit.score,
                title,
                hit.metadata.url
            ),
        }
        println!("   {}\n", preview(&hit.text, 200));
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, cli: &Cli) -> anyhow::Result<()> {
    let storage = shared(
        SqliteStorage::new(Path::new(&config.storage.database_path))
            .context("failed to open database")?,
    );
    let embedder = Arc::new(HttpEmbeddingClient::new(&config.embedding)?);
    let store = Arc::new(
        SqliteVectorStore::open(Path::new(&config.storage.vector_store_path))
            .context("failed to open vector store")?,
    );

    let coordinator = Coordinator::new(
        config,
        storage.clone(),
        embedder,
        store,
        Arc::new(PdfTextExtractor),
    )?;
    let approved = coordinator.seed_domains()?;

    let domains = if cli.due {
        coordinator.due_domains()?
    } else if !cli.domains.is_empty() {
        cli.domains.clone()
    } else {
        lock_storage(&storage)?.approved_domains()?
    };

    if domains.is_empty() {
        tracing::info!(approved, "nothing to crawl");
        return Ok(());
    }

    let cancel = coordinator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; finishing in-flight pages");
            cancel.cancel();
        }
    });

    tracing::info!(domains = domains.len(), force = cli.force, "starting crawl");
    let summaries = coordinator.trigger_crawl(&domains, cli.force).await?;

    if !cli.quiet {
        print_crawl_summaries(&summaries);
    }

    Ok(())
}

/// First `max` characters of a chunk on one line
fn preview(text: &str, max: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        flat
    } else {
        let cut: String = flat.chars().take(max).collect();
        format!("{}…", cut)
    }
}
