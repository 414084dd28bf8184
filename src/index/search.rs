//! Query-time retrieval
//!
//! The read path never fails: an unreachable embedding service or a broken
//! vector store yields an empty result list and a warning.

use crate::index::{EmbeddingProvider, VectorFilter, VectorHit, VectorStore};

/// Retrieves the chunks most similar to `query`
///
/// # Arguments
///
/// * `embedder` - Embeds the query text
/// * `store` - The vector store to search
/// * `query` - Natural-language query
/// * `top_k` - Maximum number of hits
/// * `filter` - Optional domain and content-kind predicates
pub async fn search(
    embedder: &dyn EmbeddingProvider,
    store: &dyn VectorStore,
    query: &str,
    top_k: usize,
    filter: &VectorFilter,
) -> Vec<VectorHit> {
    let query = query.trim();
    if query.is_empty() || top_k == 0 {
        return Vec::new();
    }

    let vector = match embedder.embed(&[query.to_string()]).await {
        Ok(mut vectors) if !vectors.is_empty() => vectors.swap_remove(0),
        Ok(_) => {
            tracing::warn!("embedding service returned no vector for query");
            return Vec::new();
        }
        Err(e) => {
            tracing::warn!(error = %e, "query embedding failed; returning no results");
            return Vec::new();
        }
    };

    match store.query(&vector, top_k, filter).await {
        Ok(hits) => hits,
        Err(e) => {
            tracing::warn!(error = %e, "vector store query failed; returning no results");
            Vec::new()
        }
    }
}
