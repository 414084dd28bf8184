//! Content classification and text extraction
//!
//! Decides the effective [`ContentKind`] of a fetched body and selects the
//! extraction strategy by matching on it:
//! - HTML: visible text, title and outbound links via [`parse_html`]
//! - PDF: per-page text from a [`PdfExtractor`] collaborator
//! - Other: recorded, never chunked

use crate::crawler::parser::parse_html;
use crate::state::ContentKind;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Errors raised while extracting text from a fetched body
#[derive(Debug, Clone, Error)]
pub enum ExtractionError {
    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("Document has no extractable text")]
    NoText,

    #[error("Extraction task failed: {0}")]
    Task(String),
}

/// Character span of one PDF page within the joined document text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBoundary {
    /// 1-based page number in the source document
    pub page_number: u32,
    /// Start offset in characters (inclusive)
    pub start: usize,
    /// End offset in characters (exclusive)
    pub end: usize,
}

/// Output of extraction for one fetched body
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub kind: ContentKind,
    pub title: Option<String>,
    pub text: String,
    pub links: Vec<Url>,
    /// Page spans, for PDFs only
    pub page_boundaries: Option<Vec<PageBoundary>>,
}

impl ExtractionResult {
    fn other() -> Self {
        Self {
            kind: ContentKind::Other,
            title: None,
            text: String::new(),
            links: Vec::new(),
            page_boundaries: None,
        }
    }
}

/// PDF text extraction collaborator
///
/// Returns one text segment per page, in page order. An implementation may
/// fall back to OCR internally; an empty segment marks a page it could not
/// read.
pub trait PdfExtractor: Send + Sync {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractionError>;
}

/// Direct text extraction with `pdf-extract` (no OCR)
#[derive(Debug, Default, Clone)]
pub struct PdfTextExtractor;

impl PdfExtractor for PdfTextExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
            .map_err(|e| ExtractionError::Pdf(e.to_string()))
    }
}

/// Determines the effective content kind of a response
///
/// The Content-Type header decides when it is specific. A missing or
/// generic (`application/octet-stream`) header falls back to sniffing the
/// body and the URL extension.
pub fn classify(content_type: &str, body: &[u8], url: &Url) -> ContentKind {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        "text/html" | "application/xhtml+xml" => ContentKind::Html,
        "application/pdf" | "application/x-pdf" => ContentKind::Pdf,
        "" | "application/octet-stream" | "binary/octet-stream" => sniff(body, url),
        _ => ContentKind::Other,
    }
}

fn sniff(body: &[u8], url: &Url) -> ContentKind {
    if body.starts_with(b"%PDF-") || url.path().to_ascii_lowercase().ends_with(".pdf") {
        return ContentKind::Pdf;
    }

    let head = String::from_utf8_lossy(&body[..body.len().min(512)]).to_ascii_lowercase();
    let head = head.trim_start();
    if head.starts_with("<!doctype html") || head.starts_with("<html") {
        return ContentKind::Html;
    }

    ContentKind::Other
}

/// Joins per-page PDF text, skipping pages that yielded nothing
///
/// Pages are separated by a blank line; the returned boundaries locate each
/// kept page in the joined text.
pub fn join_pdf_pages(pages: &[String], url: &Url) -> (String, Vec<PageBoundary>) {
    let mut text = String::new();
    let mut boundaries = Vec::new();
    let mut offset = 0usize;

    for (index, page) in pages.iter().enumerate() {
        let page_number = index as u32 + 1;
        let trimmed = page.trim();
        if trimmed.is_empty() {
            tracing::debug!(url = %url, page = page_number, "PDF page has no extractable text");
            continue;
        }

        if !text.is_empty() {
            text.push_str("\n\n");
            offset += 2;
        }

        let len = trimmed.chars().count();
        text.push_str(trimmed);
        boundaries.push(PageBoundary {
            page_number,
            start: offset,
            end: offset + len,
        });
        offset += len;
    }

    (text, boundaries)
}

/// Extraction strategy selector
#[derive(Clone)]
pub struct Extractor {
    pdf: Arc<dyn PdfExtractor>,
}

impl Extractor {
    pub fn new(pdf: Arc<dyn PdfExtractor>) -> Self {
        Self { pdf }
    }

    /// Classifies a fetched body and extracts its text and links
    ///
    /// This is CPU-bound; call it from a blocking task.
    ///
    /// # Arguments
    ///
    /// * `content_type` - The response Content-Type header (may be empty)
    /// * `body` - The raw response body
    /// * `url` - The final URL of the response, used to resolve links
    ///
    /// # Returns
    ///
    /// * `Ok(ExtractionResult)` - Extracted content (empty for `Other`)
    /// * `Err(ExtractionError)` - The body is malformed or has no text at all
    pub fn extract(
        &self,
        content_type: &str,
        body: &[u8],
        url: &Url,
    ) -> Result<ExtractionResult, ExtractionError> {
        match classify(content_type, body, url) {
            ContentKind::Html => {
                let html = String::from_utf8_lossy(body);
                let parsed = parse_html(&html, url);
                Ok(ExtractionResult {
                    kind: ContentKind::Html,
                    title: parsed.title,
                    text: parsed.text,
                    links: parsed.links,
                    page_boundaries: None,
                })
            }
            ContentKind::Pdf => {
                let pages = self.pdf.extract_pages(body)?;
                let (text, boundaries) = join_pdf_pages(&pages, url);
                if text.is_empty() {
                    return Err(ExtractionError::NoText);
                }
                Ok(ExtractionResult {
                    kind: ContentKind::Pdf,
                    title: pdf_title(url),
                    text,
                    links: Vec::new(),
                    page_boundaries: Some(boundaries),
                })
            }
            ContentKind::Other => Ok(ExtractionResult::other()),
        }
    }
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor").finish_non_exhaustive()
    }
}

/// A PDF's title is its file name
fn pdf_title(url: &Url) -> Option<String> {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(|name| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedPages(Vec<&'static str>);

    impl PdfExtractor for FixedPages {
        fn extract_pages(&self, _bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
            Ok(self.0.iter().map(|s| s.to_string()).collect())
        }
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_classify_by_header() {
        let u = url("https://a.com/x");
        assert_eq!(classify("text/html; charset=utf-8", b"", &u), ContentKind::Html);
        assert_eq!(classify("application/xhtml+xml", b"", &u), ContentKind::Html);
        assert_eq!(classify("application/pdf", b"", &u), ContentKind::Pdf);
        assert_eq!(classify("image/png", b"", &u), ContentKind::Other);
        assert_eq!(classify("text/plain", b"hello", &u), ContentKind::Other);
    }

    #[test]
    fn test_classify_sniffs_generic_types() {
        assert_eq!(
            classify("application/octet-stream", b"%PDF-1.7 ...", &url("https://a.com/x")),
            ContentKind::Pdf
        );
        assert_eq!(
            classify("", b"", &url("https://a.com/report.PDF")),
            ContentKind::Pdf
        );
        assert_eq!(
            classify("", b"  <!DOCTYPE html><html></html>", &url("https://a.com/")),
            ContentKind::Html
        );
        assert_eq!(
            classify("", b"\x00\x01\x02", &url("https://a.com/blob")),
            ContentKind::Other
        );
    }

    #[test]
    fn test_join_pdf_pages_skips_empty_pages() {
        let pages = vec!["One".to_string(), "   ".to_string(), "Three".to_string()];
        let (text, boundaries) = join_pdf_pages(&pages, &url("https://a.com/doc.pdf"));

        assert_eq!(text, "One\n\nThree");
        assert_eq!(
            boundaries,
            vec![
                PageBoundary { page_number: 1, start: 0, end: 3 },
                PageBoundary { page_number: 3, start: 5, end: 10 },
            ]
        );
        let chars: Vec<char> = text.chars().collect();
        let third: String = chars[5..10].iter().collect();
        assert_eq!(third, "Three");
    }

    #[test]
    fn test_extract_pdf() {
        let extractor = Extractor::new(Arc::new(FixedPages(vec!["Page one", "", "Page three"])));
        let result = extractor
            .extract("application/pdf", b"%PDF-", &url("https://a.com/files/guide.pdf"))
            .unwrap();

        assert_eq!(result.kind, ContentKind::Pdf);
        assert_eq!(result.title.as_deref(), Some("guide.pdf"));
        assert!(result.links.is_empty());
        assert_eq!(result.page_boundaries.unwrap().len(), 2);
    }

    #[test]
    fn test_extract_pdf_without_text_fails() {
        let extractor = Extractor::new(Arc::new(FixedPages(vec!["", "  "])));
        let result = extractor.extract("application/pdf", b"%PDF-", &url("https://a.com/scan.pdf"));
        assert!(matches!(result, Err(ExtractionError::NoText)));
    }

    #[test]
    fn test_extract_other_has_no_text_or_links() {
        let extractor = Extractor::new(Arc::new(PdfTextExtractor));
        let result = extractor
            .extract("image/png", b"\x89PNG", &url("https://a.com/logo.png"))
            .unwrap();
        assert_eq!(result.kind, ContentKind::Other);
        assert!(result.text.is_empty());
        assert!(result.links.is_empty());
    }

    #[test]
    fn test_extract_html() {
        let extractor = Extractor::new(Arc::new(PdfTextExtractor));
        let body = br#"<html><head><title>Home</title></head><body><p>Hello</p><a href="/next">n</a></body></html>"#;
        let result = extractor
            .extract("text/html", body, &url("https://a.com/"))
            .unwrap();
        assert_eq!(result.kind, ContentKind::Html);
        assert_eq!(result.title.as_deref(), Some("Home"));
        // Anchor text is visible text too
        assert_eq!(result.text, "Hello\n\nn");
        assert_eq!(result.links[0].as_str(), "https://a.com/next");
    }
}
