use std::fmt;

/// Lifecycle of a domain crawl
///
/// ```text
/// Pending ──> Crawling ──> Completed
///                 │   └──> Failed
///                 └──────> Pending   (run cancelled)
/// Completed / Failed ──> Crawling    (re-crawl)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainStatus {
    /// Registered and waiting for a crawl run
    Pending,

    /// A crawl run is in progress
    Crawling,

    /// The last run finished; individual pages may still have failed
    Completed,

    /// The last run hit a domain-fatal condition
    Failed,
}

impl DomainStatus {
    /// Returns true if a domain in this state may move to `next`
    pub fn can_transition_to(&self, next: DomainStatus) -> bool {
        use DomainStatus::*;

        matches!(
            (self, next),
            (Pending, Crawling)
                | (Completed, Crawling)
                | (Failed, Crawling)
                | (Crawling, Completed)
                | (Crawling, Failed)
                | (Crawling, Pending)
        )
    }

    /// Returns true if this status ends a crawl run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Crawling => "crawling",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "crawling" => Some(Self::Crawling),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}
