use serde::Serialize;

/// Fixed-length embedding. Every vector inside one index has the same length.
pub type EmbeddingVector = Vec<f32>;

/// Text extracted from a single page of the uploaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// 1-based page number.
    pub number: u32,
    pub text: String,
}

impl PageText {
    pub fn new(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// Where a segment came from in the source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocator {
    pub source: String,
    pub start_page: u32,
    pub end_page: u32,
    /// Offset, in chars, into the concatenated document text.
    pub char_offset: usize,
}

/// A bounded slice of document text used as the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextSegment {
    pub content: String,
    pub locator: SourceLocator,
}

impl TextSegment {
    /// Length in chars, the unit chunk sizes are expressed in.
    #[cfg(test)]
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub segment: TextSegment,
    pub vector: EmbeddingVector,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetrievedSegment {
    pub segment: TextSegment,
    pub score: f32,
}

/// Segments ranked by descending similarity to a query vector.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetrievalResult {
    pub hits: Vec<RetrievedSegment>,
}

impl RetrievalResult {
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn segments(&self) -> impl Iterator<Item = &TextSegment> {
        self.hits.iter().map(|h| &h.segment)
    }

    /// Segment contents joined with blank lines, in rank order.
    pub fn context(&self) -> String {
        self.segments()
            .map(|s| s.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
