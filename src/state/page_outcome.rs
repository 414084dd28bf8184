//! Per-URL outcomes and index status definitions
use std::fmt;

/// What happened to a single URL during a crawl run
///
/// Every processed URL produces exactly one outcome, which is what the crawl
/// log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageOutcome {
    /// Content changed (or was new) and the index now reflects it
    Indexed,

    /// Extracted text matched the stored checksum; the index was left alone
    Unchanged,

    /// Fetched and recorded, but the content kind is not indexed
    Recorded,

    /// robots.txt disallows the URL; it was never requested
    RobotsDisallowed,

    /// The fetch failed after retries
    FetchFailed,

    /// The body could not be parsed
    ExtractionFailed,

    /// Embedding or vector-store writes failed
    IndexFailed,
}

impl PageOutcome {
    /// Returns true if this outcome is an error for the URL
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::FetchFailed | Self::ExtractionFailed | Self::IndexFailed
        )
    }

    /// Converts the outcome to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Indexed => "indexed",
            Self::Unchanged => "unchanged",
            Self::Recorded => "recorded",
            Self::RobotsDisallowed => "robots_disallowed",
            Self::FetchFailed => "fetch_failed",
            Self::ExtractionFailed => "extraction_failed",
            Self::IndexFailed => "index_failed",
        }
    }

    /// Parses an outcome from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "indexed" => Some(Self::Indexed),
            "unchanged" => Some(Self::Unchanged),
            "recorded" => Some(Self::Recorded),
            "robots_disallowed" => Some(Self::RobotsDisallowed),
            "fetch_failed" => Some(Self::FetchFailed),
            "extraction_failed" => Some(Self::ExtractionFailed),
            "index_failed" => Some(Self::IndexFailed),
            _ => None,
        }
    }
}

impl fmt::Display for PageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// Whether a stored page's current text is reflected in the vector index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexStatus {
    /// Text stored, indexing not yet finished
    Pending,

    /// Chunks and vectors match the stored checksum
    Indexed,

    /// The last indexing attempt failed; the next crawl retries it
    Failed,

    /// Content kind is not indexed
    Skipped,
}

impl IndexStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Indexed => "indexed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "indexed" => Some(Self::Indexed),
            "failed" => Some(Self::Failed),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }
}
