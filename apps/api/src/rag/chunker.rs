//! Chunker — splits page text into overlapping fixed-size windows.
//!
//! Pages are joined in order with a single newline (blank pages skipped), then
//! windows of `chunk_size` chars are cut, advancing `chunk_size - overlap` chars
//! each step. The final window may be shorter. Sizes are counted in chars so a
//! multi-byte character is never split.

use thiserror::Error;

use crate::rag::models::{PageText, SourceLocator, TextSegment};

const PAGE_SEPARATOR: char = '\n';

#[derive(Debug, Error, PartialEq, Eq)]
#[error("chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size}), and chunk size must be positive")]
pub struct InvalidChunkParams {
    pub chunk_size: usize,
    pub overlap: usize,
}

/// Window size and overlap. Construction enforces `chunk_size > overlap >= 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkParams {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, InvalidChunkParams> {
        if chunk_size == 0 || overlap >= chunk_size {
            return Err(InvalidChunkParams {
                chunk_size,
                overlap,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

/// Splits `pages` into overlapping segments tagged with `source`.
/// Returns an empty vec when no page carries any text.
pub fn split(pages: &[PageText], source: &str, params: &ChunkParams) -> Vec<TextSegment> {
    let mut chars: Vec<char> = Vec::new();
    // (char offset where the page starts, page number), ascending by offset
    let mut page_starts: Vec<(usize, u32)> = Vec::new();

    for page in pages {
        let text = page.text.trim_end();
        if text.trim().is_empty() {
            continue;
        }
        if !chars.is_empty() {
            chars.push(PAGE_SEPARATOR);
        }
        page_starts.push((chars.len(), page.number));
        chars.extend(text.chars());
    }

    if chars.is_empty() {
        return Vec::new();
    }

    let mut segments = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + params.chunk_size).min(chars.len());
        segments.push(TextSegment {
            content: chars[start..end].iter().collect(),
            locator: SourceLocator {
                source: source.to_string(),
                start_page: page_at(&page_starts, start),
                end_page: page_at(&page_starts, end - 1),
                char_offset: start,
            },
        });
        start += params.step();
    }
    segments
}

fn page_at(page_starts: &[(usize, u32)], offset: usize) -> u32 {
    let idx = page_starts.partition_point(|(start, _)| *start <= offset);
    page_starts[idx.saturating_sub(1)].1
}
