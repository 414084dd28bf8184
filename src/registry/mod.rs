//! Approved-domain registry
//!
//! The registry is the authoritative set of domains the crawler may visit.
//! Readers take an immutable [`ApprovedDomainSet`] snapshot; updates build a
//! fresh set and swap it in, so a crawl already in progress keeps the view it
//! started with.

use crate::storage::{Storage, StorageResult};
use crate::url::{belongs_to_domain, normalize_domain};
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

/// An immutable set of approved domains
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApprovedDomainSet {
    domains: BTreeSet<String>,
}

impl ApprovedDomainSet {
    /// Builds a set from raw domain strings, normalizing each one
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let domains = domains
            .into_iter()
            .map(|d| normalize_domain(d.as_ref()))
            .filter(|d| !d.is_empty())
            .collect();

        Self { domains }
    }

    /// Returns true if the domain is approved or is a subdomain of an
    /// approved domain
    pub fn contains(&self, domain: &str) -> bool {
        self.owning_domain(domain).is_some()
    }

    /// Returns the most specific approved domain that covers `domain`
    ///
    /// With both `example.com` and `docs.example.com` approved, a page on
    /// `api.docs.example.com` is owned by `docs.example.com`.
    pub fn owning_domain(&self, domain: &str) -> Option<&str> {
        let candidate = normalize_domain(domain);

        self.domains
            .iter()
            .filter(|approved| belongs_to_domain(&candidate, approved))
            .max_by_key(|approved| approved.len())
            .map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.domains.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// Shared handle to the current approved-domain snapshot
#[derive(Debug, Default)]
pub struct DomainRegistry {
    current: RwLock<Arc<ApprovedDomainSet>>,
}

impl DomainRegistry {
    pub fn new(initial: ApprovedDomainSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    /// Returns the current snapshot
    ///
    /// The snapshot never changes after it is handed out.
    pub fn snapshot(&self) -> Arc<ApprovedDomainSet> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Atomically replaces the current snapshot
    pub fn replace(&self, next: ApprovedDomainSet) {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(next);
    }

    /// Reloads the approved set from persistent storage
    ///
    /// # Returns
    ///
    /// The number of approved domains in the new snapshot
    pub fn refresh(&self, storage: &dyn Storage) -> StorageResult<usize> {
        let next = ApprovedDomainSet::new(storage.approved_domains()?);
        let count = next.len();

        tracing::debug!(domains = count, "approved-domain registry refreshed");
        self.replace(next);

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_and_subdomain_membership() {
        let set = ApprovedDomainSet::new(["example.com"]);

        assert!(set.contains("example.com"));
        assert!(set.contains("docs.example.com"));
        assert!(set.contains("WWW.Example.com"));
        assert!(!set.contains("example.org"));
        assert!(!set.contains("notexample.com"));
    }

    #[test]
    fn test_owning_domain_prefers_most_specific() {
        let set = ApprovedDomainSet::new(["example.com", "docs.example.com"]);

        assert_eq!(set.owning_domain("example.com"), Some("example.com"));
        assert_eq!(set.owning_domain("blog.example.com"), Some("example.com"));
        assert_eq!(
            set.owning_domain("api.docs.example.com"),
            Some("docs.example.com")
        );
        assert_eq!(set.owning_domain("other.net"), None);
    }

    #[test]
    fn test_inputs_are_normalized() {
        let set = ApprovedDomainSet::new(["https://www.Example.com/", "  b.example.org "]);
        let domains: Vec<&str> = set.iter().collect();

        assert_eq!(domains, vec!["b.example.org", "example.com"]);
    }

    #[test]
    fn test_snapshot_is_stable_across_replace() {
        let registry = DomainRegistry::new(ApprovedDomainSet::new(["a.example"]));
        let before = registry.snapshot();

        registry.replace(ApprovedDomainSet::new(["b.example"]));
        let after = registry.snapshot();

        assert!(before.contains("a.example"));
        assert!(!before.contains("b.example"));
        assert!(after.contains("b.example"));
        assert!(!after.contains("a.example"));
    }
}
