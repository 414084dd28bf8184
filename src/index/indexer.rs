//! Batched embedding and vector-store writes
//!
//! Indexing one page runs in this order:
//! 1. Embed all chunks, `embedding-batch-size` texts per request
//! 2. Delete the page's previous vector entries
//! 3. Upsert the new entries, `vector-store-batch-size` per write
//! 4. Replace the page's chunk rows and chunk→vector mapping in one transaction
//!
//! Embedding first means a failing embedding service leaves the previous
//! index for the page untouched.

use crate::config::IndexerConfig;
use crate::index::change::compute_checksum;
use crate::index::{
    Chunk, EmbeddingProvider, IndexError, VectorEntry, VectorMetadata, VectorStore,
};
use crate::state::ContentKind;
use crate::storage::{lock_storage, SharedStorage, Storage};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// The page a set of chunks belongs to
#[derive(Debug, Clone)]
pub struct PageToIndex<'a> {
    pub page_id: i64,
    pub url: &'a str,
    /// The page's own domain
    pub domain: &'a str,
    pub title: Option<&'a str>,
    pub content_kind: ContentKind,
}

/// What an indexing pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub chunks: usize,
    pub vectors_deleted: usize,
    pub vectors_written: usize,
}

/// Stable vector-store ID for a chunk: URL hash prefix plus sequence
pub fn vector_id(url: &str, sequence: u32) -> String {
    let digest = compute_checksum(url);
    format!("{}-{}", &digest[..16], sequence)
}

/// Writes chunk embeddings to the vector store
pub struct Indexer {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    storage: SharedStorage,
    embedding_batch_size: usize,
    vector_store_batch_size: usize,
    max_retries: u32,
    retry_backoff: Duration,
}

impl Indexer {
    pub fn new(
        config: &IndexerConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        storage: SharedStorage,
    ) -> Self {
        Self {
            embedder,
            store,
            storage,
            embedding_batch_size: config.embedding_batch_size.max(1),
            vector_store_batch_size: config.vector_store_batch_size.max(1),
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Replaces a page's vector entries with embeddings of `chunks`
    ///
    /// # Returns
    ///
    /// * `Ok(IndexReport)` - Old entries removed, new entries written
    /// * `Err(IndexError)` - Retries exhausted; the caller marks the page failed
    pub async fn index(
        &self,
        page: &PageToIndex<'_>,
        chunks: &[Chunk],
    ) -> Result<IndexReport, IndexError> {
        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.embedding_batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embedded = self
                .with_retry("embed", || self.embedder.embed(&texts))
                .await?;

            if embedded.len() != batch.len() {
                return Err(IndexError::Embedding(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    embedded.len()
                )));
            }
            vectors.extend(embedded);
        }

        let vectors_deleted = self.delete_previous(page).await?;

        let ids: Vec<String> = chunks
            .iter()
            .map(|c| vector_id(page.url, c.sequence))
            .collect();

        let entries: Vec<VectorEntry> = chunks
            .iter()
            .zip(vectors)
            .zip(&ids)
            .map(|((chunk, vector), id)| VectorEntry {
                id: id.clone(),
                vector,
                metadata: VectorMetadata {
                    url: page.url.to_string(),
                    domain: page.domain.to_string(),
                    title: page.title.map(str::to_string),
                    content_kind: page.content_kind,
                    chunk_sequence: chunk.sequence,
                    page_number: chunk.page_number,
                },
                text: chunk.text.clone(),
            })
            .collect();

        for batch in entries.chunks(self.vector_store_batch_size) {
            self.with_retry("upsert", || self.store.upsert(batch))
                .await?;
        }

        lock_storage(&self.storage)?.replace_chunks(page.page_id, chunks, &ids)?;

        Ok(IndexReport {
            chunks: chunks.len(),
            vectors_deleted,
            vectors_written: entries.len(),
        })
    }

    /// Removes every vector entry and chunk row a page still holds
    ///
    /// Used when a re-crawled page no longer has indexable content.
    pub async fn clear(&self, page: &PageToIndex<'_>) -> Result<usize, IndexError> {
        let vectors_deleted = self.delete_previous(page).await?;
        lock_storage(&self.storage)?.replace_chunks(page.page_id, &[], &[])?;

        if vectors_deleted > 0 {
            tracing::debug!(url = page.url, vectors_deleted, "cleared stale vectors");
        }
        Ok(vectors_deleted)
    }

    async fn delete_previous(&self, page: &PageToIndex<'_>) -> Result<usize, IndexError> {
        let old_ids = self.previous_ids(page).await?;
        let mut vectors_deleted = 0;
        for batch in old_ids.chunks(self.vector_store_batch_size) {
            vectors_deleted += self
                .with_retry("delete", || self.store.delete(batch))
                .await?;
        }
        Ok(vectors_deleted)
    }

    /// Vector IDs currently held for a page
    ///
    /// The mapping table is authoritative; entries the store holds for the
    /// URL but the mapping lost (an interrupted earlier pass) are included.
    async fn previous_ids(&self, page: &PageToIndex<'_>) -> Result<Vec<String>, IndexError> {
        let mapped = lock_storage(&self.storage)?.vector_ids_for_page(page.page_id)?;
        let stored = self
            .with_retry("lookup", || self.store.ids_for_url(page.url))
            .await?;

        let ids: BTreeSet<String> = mapped.into_iter().chain(stored).collect();
        Ok(ids.into_iter().collect())
    }

    /// Runs a collaborator call, retrying retryable failures with backoff
    async fn with_retry<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, IndexError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, IndexError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let backoff = self.retry_backoff * 2u32.saturating_pow(attempt);
                    tracing::warn!(
                        operation,
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "index operation failed; retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
