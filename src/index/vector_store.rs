//! Vector store collaborators
//!
//! [`VectorStore`] is the seam between the indexer and the similarity index.
//! [`SqliteVectorStore`] keeps vectors as little-endian `f32` blobs in SQLite
//! and answers queries with a brute-force cosine scan.

use crate::index::IndexError;
use crate::state::ContentKind;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const VECTOR_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS vectors (
    id TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    domain TEXT NOT NULL,
    title TEXT,
    content_kind TEXT NOT NULL,
    chunk_sequence INTEGER NOT NULL,
    page_number INTEGER,
    text TEXT NOT NULL,
    dimension INTEGER NOT NULL,
    embedding BLOB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_vectors_domain ON vectors(domain);
CREATE INDEX IF NOT EXISTS idx_vectors_url ON vectors(url);
"#;

/// Citation metadata stored next to each vector
#[derive(Debug, Clone, PartialEq)]
pub struct VectorMetadata {
    pub url: String,
    pub domain: String,
    pub title: Option<String>,
    pub content_kind: ContentKind,
    pub chunk_sequence: u32,
    pub page_number: Option<u32>,
}

/// One chunk's embedding and metadata
#[derive(Debug, Clone, PartialEq)]
pub struct VectorEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: VectorMetadata,
    pub text: String,
}

/// Query-time predicates
#[derive(Debug, Clone, Default)]
pub struct VectorFilter {
    pub domain: Option<String>,
    pub content_kind: Option<ContentKind>,
}

/// A scored query result
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub id: String,
    /// Cosine similarity in [-1, 1]
    pub score: f32,
    pub metadata: VectorMetadata,
    pub text: String,
}

/// Trait for vector store operations
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Inserts or replaces entries by ID
    async fn upsert(&self, entries: &[VectorEntry]) -> Result<(), IndexError>;

    /// Deletes entries by ID, returning how many existed
    async fn delete(&self, ids: &[String]) -> Result<usize, IndexError>;

    /// Returns the `top_k` most similar entries matching `filter`
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: &VectorFilter,
    ) -> Result<Vec<VectorHit>, IndexError>;

    /// IDs of all entries for a page URL
    async fn ids_for_url(&self, url: &str) -> Result<Vec<String>, IndexError>;

    async fn count(&self) -> Result<usize, IndexError>;
}

fn store_error(e: rusqlite::Error) -> IndexError {
    IndexError::VectorStore(e.to_string())
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Cosine similarity; 0 when either vector has zero length
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// SQLite-backed vector store
#[derive(Debug)]
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Opens (or creates) a vector store file
    pub fn open(path: &Path) -> Result<Self, IndexError> {
        let conn = Connection::open(path).map_err(store_error)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")
            .map_err(store_error)?;
        Self::with_connection(conn)
    }

    /// Creates an in-memory vector store
    pub fn open_in_memory() -> Result<Self, IndexError> {
        Self::with_connection(Connection::open_in_memory().map_err(store_error)?)
    }

    fn with_connection(conn: Connection) -> Result<Self, IndexError> {
        conn.execute_batch(VECTOR_SCHEMA_SQL).map_err(store_error)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, IndexError> {
        self.conn
            .lock()
            .map_err(|_| IndexError::VectorStore("vector store lock poisoned".to_string()))
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn upsert(&self, entries: &[VectorEntry]) -> Result<(), IndexError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(store_error)?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR REPLACE INTO vectors
                     (id, url, domain, title, content_kind, chunk_sequence, page_number, text, dimension, embedding)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                )
                .map_err(store_error)?;

            for entry in entries {
                stmt.execute(params![
                    entry.id,
                    entry.metadata.url,
                    entry.metadata.domain,
                    entry.metadata.title,
                    entry.metadata.content_kind.to_db_string(),
                    entry.metadata.chunk_sequence,
                    entry.metadata.page_number,
                    entry.text,
                    entry.vector.len() as i64,
                    encode_vector(&entry.vector),
                ])
                .map_err(store_error)?;
            }
        }
        tx.commit().map_err(store_error)
    }

    async fn delete(&self, ids: &[String]) -> Result<usize, IndexError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(store_error)?;
        let mut removed = 0;
        {
            let mut stmt = tx
                .prepare("DELETE FROM vectors WHERE id = ?1")
                .map_err(store_error)?;
            for id in ids {
                removed += stmt.execute(params![id]).map_err(store_error)?;
            }
        }
        tx.commit().map_err(store_error)?;
        Ok(removed)
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: &VectorFilter,
    ) -> Result<Vec<VectorHit>, IndexError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, url, domain, title, content_kind, chunk_sequence, page_number, text, embedding
                 FROM vectors
                 WHERE (?1 IS NULL OR domain = ?1) AND (?2 IS NULL OR content_kind = ?2)",
            )
            .map_err(store_error)?;

        let kind = filter.content_kind.map(|k| k.to_db_string());
        let rows = stmt
            .query_map(params![filter.domain, kind], |row| {
                let kind: String = row.get(4)?;
                let embedding: Vec<u8> = row.get(8)?;
                Ok((
                    row.get::<_, String>(0)?,
                    VectorMetadata {
                        url: row.get(1)?,
                        domain: row.get(2)?,
                        title: row.get(3)?,
                        content_kind: ContentKind::from_db_string(&kind)
                            .unwrap_or(ContentKind::Other),
                        chunk_sequence: row.get(5)?,
                        page_number: row.get(6)?,
                    },
                    row.get::<_, String>(7)?,
                    embedding,
                ))
            })
            .map_err(store_error)?;

        let mut hits = Vec::new();
        for row in rows {
            let (id, metadata, text, embedding) = row.map_err(store_error)?;
            let stored = decode_vector(&embedding);
            if stored.len() != vector.len() {
                continue;
            }
            hits.push(VectorHit {
                id,
                score: cosine_similarity(vector, &stored),
                metadata,
                text,
            });
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn ids_for_url(&self, url: &str) -> Result<Vec<String>, IndexError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id FROM vectors WHERE url = ?1 ORDER BY chunk_sequence")
            .map_err(store_error)?;
        let ids = stmt
            .query_map(params![url], |row| row.get(0))
            .map_err(store_error)?
            .collect::<Result<Vec<String>, _>>()
            .map_err(store_error)?;
        Ok(ids)
    }

    async fn count(&self) -> Result<usize, IndexError> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM vectors", [], |row| row.get(0))
            .map_err(store_error)?;
        Ok(count as usize)
    }
}
