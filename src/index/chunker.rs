//! Text chunking
//!
//! Splits extracted text into overlapping segments of at most `chunk_size`
//! characters. A chunk prefers to end on a paragraph break, then on a
//! sentence break, and falls back to a hard cut at `chunk_size`. The next
//! chunk starts `chunk_overlap` characters before the previous one ended.
//!
//! Splitting is deterministic: identical input always yields identical
//! chunks.

use crate::crawler::PageBoundary;

/// Sentence terminators tried after paragraph breaks, in preference order
const SENTENCE_BREAKS: &[[char; 2]] = &[['.', ' '], ['!', ' '], ['?', ' '], ['.', '\n']];

/// A bounded-length text segment prepared for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of the chunk within its page, starting at 0
    pub sequence: u32,
    pub text: String,
    /// Length of `text` in characters
    pub char_len: u32,
    /// Character offset of the chunk in the page text
    pub start: usize,
    /// PDF page the chunk starts on
    pub page_number: Option<u32>,
}

/// Paragraph/sentence-aware splitter with overlap
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    /// Creates a chunker; `overlap` is clamped below `chunk_size`
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Splits text into chunks
    ///
    /// Chunks made only of whitespace are dropped; sequence numbers stay
    /// contiguous.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        let mut chunks = Vec::new();

        if total == 0 {
            return chunks;
        }

        let mut start = 0usize;
        loop {
            let hard_end = (start + self.chunk_size).min(total);
            let end = if hard_end == total {
                total
            } else {
                self.soft_boundary(&chars, start, hard_end)
                    .unwrap_or(hard_end)
            };

            let segment: String = chars[start..end].iter().collect();
            if !segment.trim().is_empty() {
                chunks.push(Chunk {
                    sequence: chunks.len() as u32,
                    char_len: (end - start) as u32,
                    text: segment,
                    start,
                    page_number: None,
                });
            }

            if end == total {
                break;
            }

            start = end.saturating_sub(self.overlap).max(start + 1);
        }

        chunks
    }

    /// Splits PDF text and tags each chunk with the page it starts on
    pub fn split_pages(&self, text: &str, boundaries: &[PageBoundary]) -> Vec<Chunk> {
        let mut chunks = self.split(text);

        for chunk in &mut chunks {
            chunk.page_number = boundaries
                .iter()
                .take_while(|b| b.start <= chunk.start)
                .last()
                .or_else(|| boundaries.first())
                .map(|b| b.page_number);
        }

        chunks
    }

    /// Finds the latest soft break in the lookback window before `hard_end`
    ///
    /// The window starts far enough into the chunk that the next chunk
    /// always begins after this one did.
    fn soft_boundary(&self, chars: &[char], start: usize, hard_end: usize) -> Option<usize> {
        let min_len = (self.overlap + 1).max(self.chunk_size / 2);
        let window_start = start + min_len;
        if window_start >= hard_end {
            return None;
        }

        let ends_with = |end: usize, pair: [char; 2]| -> bool {
            end >= 2 && chars[end - 2] == pair[0] && chars[end - 1] == pair[1]
        };

        let search = |pair: [char; 2]| -> Option<usize> {
            (window_start..=hard_end)
                .rev()
                .find(|&end| ends_with(end, pair))
        };

        search(['\n', '\n']).or_else(|| SENTENCE_BREAKS.iter().find_map(|&pair| search(pair)))
    }
}
