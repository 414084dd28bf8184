//! Link filtering
//!
//! Decides whether a discovered link is enqueued. Rules are evaluated in
//! order and the first rejection wins:
//! 1. The link's domain must be the source domain or an approved domain
//! 2. The link's depth (`source_depth + 1`) must not exceed the maximum
//! 3. The link must not already be known to this run
//!
//! The filter holds an immutable [`ApprovedDomainSet`] snapshot taken when
//! the run started, so registry refreshes never change decisions mid-run.

use crate::crawler::frontier::Frontier;
use crate::registry::ApprovedDomainSet;
use crate::url::{belongs_to_domain, extract_domain};
use std::sync::Arc;
use url::Url;

/// Outcome of evaluating one link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkDecision {
    Accept {
        url: Url,
        /// Domain the linked page belongs to
        domain: String,
        depth: u32,
        /// The link leaves the source domain for another approved domain
        cross_domain: bool,
    },
    RejectUnapproved,
    RejectDepth,
    RejectVisited,
}

impl LinkDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, LinkDecision::Accept { .. })
    }
}

/// Whitelist and depth policy for discovered links
#[derive(Debug, Clone)]
pub struct LinkFilter {
    approved: Arc<ApprovedDomainSet>,
    max_depth: u32,
}

impl LinkFilter {
    pub fn new(approved: Arc<ApprovedDomainSet>, max_depth: u32) -> Self {
        Self {
            approved,
            max_depth,
        }
    }

    pub fn approved(&self) -> &ApprovedDomainSet {
        &self.approved
    }

    /// Returns the domain a URL belongs to, if it may be crawled from
    /// `source_domain`
    ///
    /// The most specific approved domain wins; a host under the source
    /// domain belongs to it even if the source itself is not approved.
    pub fn owning_domain(&self, url: &Url, source_domain: &str) -> Option<String> {
        let host = extract_domain(url)?;

        if let Some(owner) = self.approved.owning_domain(&host) {
            return Some(owner.to_string());
        }

        if belongs_to_domain(&host, source_domain) {
            return Some(source_domain.to_string());
        }

        None
    }

    /// Evaluates a link found on a page of `source_domain` at `source_depth`
    ///
    /// # Arguments
    ///
    /// * `link` - Absolute, normalized link target
    /// * `source_domain` - Domain of the page the link was found on
    /// * `source_depth` - Depth of that page
    /// * `frontier` - The run's frontier, consulted for visited URLs
    pub fn evaluate(
        &self,
        link: &Url,
        source_domain: &str,
        source_depth: u32,
        frontier: &Frontier,
    ) -> LinkDecision {
        self.evaluate_at(link, source_domain, source_depth.saturating_add(1), frontier)
    }

    /// Evaluates a URL that would be enqueued at an explicit `depth`
    ///
    /// Sitemap entries are seeded this way at depth 0.
    pub fn evaluate_at(
        &self,
        link: &Url,
        source_domain: &str,
        depth: u32,
        frontier: &Frontier,
    ) -> LinkDecision {
        let Some(domain) = self.owning_domain(link, source_domain) else {
            return LinkDecision::RejectUnapproved;
        };

        if depth > self.max_depth {
            return LinkDecision::RejectDepth;
        }

        if frontier.is_known(link) {
            return LinkDecision::RejectVisited;
        }

        let cross_domain = domain != source_domain;
        LinkDecision::Accept {
            url: link.clone(),
            domain,
            depth,
            cross_domain,
        }
    }

    /// Boolean form of [`evaluate`](Self::evaluate)
    pub fn accept(
        &self,
        link: &Url,
        source_domain: &str,
        source_depth: u32,
        frontier: &Frontier,
    ) -> bool {
        self.evaluate(link, source_domain, source_depth, frontier)
            .is_accepted()
    }
}
