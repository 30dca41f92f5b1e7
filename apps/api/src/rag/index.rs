//! Vector Index — brute-force nearest-neighbour search over one document.
//!
//! A resume produces tens of segments, so a linear scan is all that is needed.
//! Ranking contract: descending similarity, ties keep insertion order. Any
//! replacement structure must honour the same contract.

use serde::Serialize;
use thiserror::Error;

use crate::rag::embedder::EmbedError;
use crate::rag::models::{IndexEntry, RetrievalResult, RetrievedSegment};

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("No document has been loaded")]
    NotLoaded,

    #[error("Chunking produced no text segments; the document has no readable text")]
    NoSegments,

    #[error("Vector dimension mismatch: index holds {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbedError),
}

/// Similarity measure, fixed for the lifetime of an index. Higher is closer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    Cosine,
    DotProduct,
}

impl Metric {
    fn score(self, a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        match self {
            Metric::DotProduct => dot,
            Metric::Cosine => {
                let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
                if mag_a == 0.0 || mag_b == 0.0 {
                    0.0
                } else {
                    dot / (mag_a * mag_b)
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct VectorIndex {
    dimension: usize,
    metric: Metric,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    pub fn new(dimension: usize, metric: Metric) -> Self {
        Self {
            dimension,
            metric,
            entries: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends entries. No dedup. The whole batch is rejected if any vector
    /// has the wrong dimension.
    pub fn add(&mut self, entries: Vec<IndexEntry>) -> Result<(), IndexError> {
        if let Some(bad) = entries.iter().find(|e| e.vector.len() != self.dimension) {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.vector.len(),
            });
        }
        self.entries.extend(entries);
        Ok(())
    }

    /// Returns up to `k` segments, most similar first.
    /// An empty index (or `k == 0`) gives an empty result, never an error.
    pub fn search(&self, query: &[f32], k: usize) -> Result<RetrievalResult, IndexError> {
        if self.is_empty() || k == 0 {
            return Ok(RetrievalResult::default());
        }
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let score = self.metric.score(query, &e.vector);
                // NaN would otherwise outrank every real score under total_cmp
                (i, if score.is_nan() { f32::NEG_INFINITY } else { score })
            })
            .collect();
        // sort_by is stable: equal scores stay in insertion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(RetrievalResult {
            hits: scored
                .into_iter()
                .map(|(i, score)| RetrievedSegment {
                    segment: self.entries[i].segment.clone(),
                    score,
                })
                .collect(),
        })
    }
}
