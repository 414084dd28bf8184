/// Checks whether a domain equals, or is a subdomain of, another domain
///
/// Both arguments must already be normalized (see
/// [`normalize_domain`](super::normalize_domain)). The comparison is on
/// whole labels, so `notexample.com` does not belong to `example.com`.
///
/// # Examples
///
/// ```
/// use lantern_crawl::url::belongs_to_domain;
///
/// assert!(belongs_to_domain("example.com", "example.com"));
/// assert!(belongs_to_domain("docs.example.com", "example.com"));
/// assert!(!belongs_to_domain("example.com", "docs.example.com"));
/// assert!(!belongs_to_domain("badexample.com", "example.com"));
/// ```
pub fn belongs_to_domain(candidate: &str, domain: &str) -> bool {
    if candidate == domain {
        return true;
    }

    candidate.len() > domain.len()
        && candidate.ends_with(domain)
        && candidate.as_bytes()[candidate.len() - domain.len() - 1] == b'.'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(belongs_to_domain("example.com", "example.com"));
        assert!(belongs_to_domain("127.0.0.1:8080", "127.0.0.1:8080"));
    }

    #[test]
    fn test_subdomains_match() {
        assert!(belongs_to_domain("blog.example.com", "example.com"));
        assert!(belongs_to_domain("api.v2.example.com", "example.com"));
        assert!(belongs_to_domain("api.example.com:8443", "example.com:8443"));
    }

    #[test]
    fn test_parent_does_not_match_child() {
        assert!(!belongs_to_domain("example.com", "blog.example.com"));
    }

    #[test]
    fn test_suffix_without_label_boundary() {
        assert!(!belongs_to_domain("notexample.com", "example.com"));
        assert!(!belongs_to_domain("example.com.evil.net", "example.com"));
    }

    #[test]
    fn test_different_ports_do_not_match() {
        assert!(!belongs_to_domain("127.0.0.1:8080", "127.0.0.1:9090"));
        assert!(!belongs_to_domain("127.0.0.1:8080", "127.0.0.1"));
    }
}
