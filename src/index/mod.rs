//! Indexing module
//!
//! Everything between extracted text and the vector index:
//! - Change detection by checksum of the extracted text
//! - Chunking with paragraph/sentence preference and overlap
//! - Batched embedding through an [`EmbeddingProvider`]
//! - Batched writes to a [`VectorStore`]
//! - Query-time retrieval

mod change;
mod chunker;
mod embedding;
mod indexer;
mod search;
mod vector_store;

pub use change::{compute_checksum, ChangeDetector};
pub use chunker::{Chunk, Chunker};
pub use embedding::{EmbeddingProvider, HttpEmbeddingClient};
pub use indexer::{vector_id, IndexReport, Indexer, PageToIndex};
pub use search::search;
pub use vector_store::{
    cosine_similarity, SqliteVectorStore, VectorEntry, VectorFilter, VectorHit, VectorMetadata,
    VectorStore,
};

use crate::storage::StorageError;
use thiserror::Error;

/// Errors raised while indexing a page
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Embedding service error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl IndexError {
    /// Transient collaborator failures are retried with backoff
    pub fn is_retryable(&self) -> bool {
        matches!(self, IndexError::Embedding(_) | IndexError::VectorStore(_))
    }
}
