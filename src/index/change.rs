//! Content change detection
//!
//! A page is re-chunked and re-embedded only when the SHA-256 of its
//! extracted text differs from the stored checksum, or when its previous
//! indexing attempt did not finish.

use crate::state::IndexStatus;
use crate::storage::{lock_storage, SharedStorage, Storage, StorageResult};
use sha2::{Digest, Sha256};

/// Computes the checksum of extracted text (lowercase hex SHA-256)
pub fn compute_checksum(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compares fresh checksums against the stored ones
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    storage: SharedStorage,
}

impl ChangeDetector {
    pub fn new(storage: SharedStorage) -> Self {
        Self { storage }
    }

    /// Decides whether a page needs to be (re)indexed
    ///
    /// # Arguments
    ///
    /// * `url` - Normalized page URL
    /// * `checksum` - Checksum of the newly extracted text
    /// * `force` - Bypass the comparison entirely
    ///
    /// # Returns
    ///
    /// `true` if the page is new, its text changed, its last indexing did
    /// not succeed, or `force` is set
    pub fn should_reindex(&self, url: &str, checksum: &str, force: bool) -> StorageResult<bool> {
        if force {
            return Ok(true);
        }

        let storage = lock_storage(&self.storage)?;
        let Some(page) = storage.get_page_by_url(url)? else {
            return Ok(true);
        };

        let unchanged = page.checksum.as_deref() == Some(checksum)
            && page.index_status == IndexStatus::Indexed;

        Ok(!unchanged)
    }
}
