//! HTML parser for extracting text, links and metadata
//!
//! This module handles parsing HTML content to extract:
//! - Visible text, split into paragraphs
//! - Links to follow (from <a> tags, canonical links and frames)
//! - Page title

use crate::url::resolve_link;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;
use url::Url;

/// Elements whose subtree is never part of the visible text
const SKIPPED_ELEMENTS: &[&str] = &[
    "head", "script", "style", "noscript", "nav", "header", "footer", "template", "svg",
];

/// Elements that start a new paragraph
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "br", "dd", "div", "dl", "dt",
    "figcaption", "figure", "form", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "li", "main", "ol",
    "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

/// Extracted information from an HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// The page title (from <title> tag, or the first <h1>)
    pub title: Option<String>,

    /// Visible text; paragraphs separated by a blank line
    pub text: String,

    /// All links found on the page (absolute, normalized, deduplicated)
    pub links: Vec<Url>,
}

/// Parses HTML content and extracts text, links and metadata
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
/// - `<link rel="canonical" href="...">`
/// - `<frame src="...">` and `<iframe src="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - Fragment-only links
///
/// `rel="nofollow"` links are followed. Relative links resolve against
/// `<base href>` when present.
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The base URL for resolving relative links
///
/// # Example
///
/// ```
/// use lantern_crawl::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><p>Hi</p><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links.len(), 1);
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    let base = document_base(&document, base_url);
    let title = extract_title(&document);
    let text = extract_text(&document);
    let links = extract_links(&document, &base);

    ParsedPage { title, text, links }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Honors `<base href>` if it resolves to an absolute URL
fn document_base(document: &Html, page_url: &Url) -> Url {
    selector("base[href]")
        .and_then(|s| {
            document
                .select(&s)
                .next()
                .and_then(|el| el.value().attr("href"))
                .and_then(|href| page_url.join(href.trim()).ok())
        })
        .unwrap_or_else(|| page_url.clone())
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let from = |css: &str| -> Option<String> {
        let sel = selector(css)?;
        document
            .select(&sel)
            .next()
            .map(|element| collapse_whitespace(&element.text().collect::<String>()))
            .filter(|s| !s.is_empty())
    };

    from("title").or_else(|| from("h1"))
}

/// Extracts the visible text of the document body
fn extract_text(document: &Html) -> String {
    let mut raw = String::new();
    collect_text(document.root_element(), &mut raw);

    raw.split("\n\n")
        .map(collapse_whitespace)
        .filter(|paragraph| !paragraph.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_ELEMENTS.contains(&name) {
                    continue;
                }
                let Some(child_element) = ElementRef::wrap(child) else {
                    continue;
                };

                let block = BLOCK_ELEMENTS.contains(&name);
                if block {
                    out.push_str("\n\n");
                }
                collect_text(child_element, out);
                if block {
                    out.push_str("\n\n");
                } else {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts all valid links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    let mut push = |href: &str| {
        if let Some(url) = resolve_link(href, base_url) {
            if seen.insert(url.to_string()) {
                links.push(url);
            }
        }
    };

    if let Some(a_selector) = selector("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    if let Some(canonical_selector) = selector("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    if let Some(frame_selector) = selector("frame[src], iframe[src]") {
        for element in document.select(&frame_selector) {
            if let Some(src) = element.value().attr("src") {
                push(src);
            }
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    fn link_strings(parsed: &ParsedPage) -> Vec<String> {
        parsed.links.iter().map(|u| u.to_string()).collect()
    }

    #[test]
    fn test_extract_title_with_whitespace() {
        let html = r#"<html><head><title>  Test   Page  </title></head><body></body></html>"#;
        let parsed = parse_html(html, &base_url());
        assert_eq!(parsed.title, Some("Test Page".to_string()));
    }

    #[test]
    fn test_title_falls_back_to_h1() {
        let html = r#"<html><body><h1>Heading</h1></body></html>"#;
        let parsed = parse_html(html, &base_url());
        assert_eq!(parsed.title, Some("Heading".to_string()));
    }

    #[test]
    fn test_no_title() {
        let html = r#"<html><head></head><body></body></html>"#;
        let parsed = parse_html(html, &base_url());
        assert_eq!(parsed.title, None);
    }

    #[test]
    fn test_text_paragraphs() {
        let html = r#"<html><body><p>First   paragraph
            here.</p><p>Second <b>bold</b> one.</p></body></html>"#;
        let parsed = parse_html(html, &base_url());
        assert_eq!(parsed.text, "First paragraph here.\n\nSecond bold one.");
    }

    #[test]
    fn test_text_skips_chrome_and_scripts() {
        let html = r#"
            <html>
            <head><title>T</title><style>p { color: red; }</style></head>
            <body>
                <header>Site header</header>
                <nav>Menu</nav>
                <script>var x = 1;</script>
                <noscript>Enable JS</noscript>
                <p>Body text</p>
                <footer>Copyright</footer>
            </body>
            </html>
        "#;
        let parsed = parse_html(html, &base_url());
        assert_eq!(parsed.text, "Body text");
    }

    #[test]
    fn test_extract_relative_link() {
        let html = r#"<html><body><a href="/other">Link</a></body></html>"#;
        let parsed = parse_html(html, &base_url());
        assert_eq!(link_strings(&parsed), vec!["https://example.com/other"]);
    }

    #[test]
    fn test_links_are_deduplicated() {
        let html = r#"<html><body><a href="/a">1</a><a href="/a#x">2</a><a href="/a/">3</a></body></html>"#;
        let parsed = parse_html(html, &base_url());
        assert_eq!(parsed.links.len(), 1);
    }

    #[test]
    fn test_skip_special_links() {
        let html = r##"
            <html><body>
                <a href="javascript:void(0)">js</a>
                <a href="mailto:test@example.com">mail</a>
                <a href="tel:+1234567890">tel</a>
                <a href="data:text/html,hi">data</a>
                <a href="#section">jump</a>
                <a href="/file.pdf" download>download</a>
            </body></html>
        "##;
        let parsed = parse_html(html, &base_url());
        assert!(parsed.links.is_empty());
    }

    #[test]
    fn test_follow_nofollow_links() {
        let html = r#"<html><body><a href="/page2" rel="nofollow">Link</a></body></html>"#;
        let parsed = parse_html(html, &base_url());
        assert_eq!(link_strings(&parsed), vec!["https://example.com/page2"]);
    }

    #[test]
    fn test_links_inside_nav_are_followed() {
        let html = r#"<html><body><nav><a href="/docs">Docs</a></nav></body></html>"#;
        let parsed = parse_html(html, &base_url());
        assert_eq!(parsed.links.len(), 1);
        assert!(parsed.text.is_empty());
    }

    #[test]
    fn test_canonical_and_frames() {
        let html = r#"
            <html>
            <head><link rel="canonical" href="https://example.com/canonical" /></head>
            <body><iframe src="/embedded"></iframe></body>
            </html>
        "#;
        let parsed = parse_html(html, &base_url());
        let links = link_strings(&parsed);
        assert!(links.contains(&"https://example.com/canonical".to_string()));
        assert!(links.contains(&"https://example.com/embedded".to_string()));
    }

    #[test]
    fn test_base_href() {
        let html = r#"<html><head><base href="https://example.com/docs/"></head><body><a href="intro">Intro</a></body></html>"#;
        let parsed = parse_html(html, &base_url());
        assert_eq!(link_strings(&parsed), vec!["https://example.com/docs/intro"]);
    }
}
