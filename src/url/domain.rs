use url::Url;

/// Extracts the crawl domain from a URL
///
/// The domain is the lowercased host with any leading `www.` removed. An
/// explicit non-default port is kept (`host:port`) so that services bound to
/// the same address on different ports are treated as distinct domains.
///
/// # Arguments
///
/// * `url` - The URL to extract the domain from
///
/// # Returns
///
/// * `Some(String)` - The normalized domain
/// * `None` - If the URL has no host
///
/// # Examples
///
/// ```
/// use url::Url;
/// use lantern_crawl::url::extract_domain;
///
/// let url = Url::parse("https://WWW.Example.com/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(extract_domain(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    let lowered = url.host_str()?.to_lowercase();
    let host = strip_www(&lowered);

    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host.to_string()),
    }
}

/// Normalizes a domain string supplied by an operator
///
/// Accepts bare domains as well as pasted URLs ("https://www.Example.com/")
/// and reduces them to the same form [`extract_domain`] produces.
pub fn normalize_domain(input: &str) -> String {
    let trimmed = input.trim();

    if trimmed.contains("://") {
        if let Some(domain) = Url::parse(trimmed).ok().as_ref().and_then(extract_domain) {
            return domain;
        }
    }

    let lowered = trimmed.trim_end_matches('/').to_lowercase();
    strip_www(&lowered).to_string()
}

/// Removes every leading `www.` label from a host
pub fn strip_www(host: &str) -> &str {
    let mut host = host;
    while let Some(rest) = host.strip_prefix("www.") {
        host = rest;
    }
    host
}
