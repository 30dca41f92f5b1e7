//! Embedder — pluggable text → vector capability.
//!
//! Default: `HashEmbedder` (local feature hashing, deterministic, no network).
//! Alternative: `OpenAiEmbedder` (any OpenAI-compatible `/embeddings` endpoint).
//!
//! The pipeline holds an `Arc<dyn Embedder>` and never assumes which one it got.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use crate::rag::models::EmbeddingVector;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Embedding API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Embedder returned {actual} vectors for {expected} inputs")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Embedder returned a {actual}-dimensional vector, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// The embedder trait. All vectors one instance returns share `dimension()`.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;

    /// Short label for logs ("hash", "openai:<model>").
    fn name(&self) -> String;

    async fn embed(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, EmbedError>;

    async fn embed_one(&self, text: &str) -> Result<EmbeddingVector, EmbedError> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors.pop().ok_or(EmbedError::CountMismatch {
            expected: 1,
            actual: 0,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// HashEmbedder
// ────────────────────────────────────────────────────────────────────────────

/// Feature-hashing embedder.
///
/// Each lowercase alphanumeric token is hashed into one of `dimension` buckets;
/// the top hash bit picks the sign. The result is L2-normalised, so cosine
/// similarity reduces to weighted token overlap. Texts with no tokens map to
/// the zero vector.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn embed_text(&self, text: &str) -> EmbeddingVector {
        let mut vector = vec![0.0_f32; self.dimension];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = token_hash(&token.to_lowercase());
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

/// First 8 bytes of the token's SHA-256, so buckets never depend on the
/// toolchain or the process.
fn token_hash(token: &str) -> u64 {
    let digest = Sha256::digest(token.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> String {
        "hash".to_string()
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, EmbedError> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// OpenAiEmbedder
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// Embeddings from an OpenAI-compatible HTTP endpoint.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    dimension: usize,
}

impl OpenAiEmbedder {
    pub fn new(
        api_key: String,
        base_url: &str,
        model: String,
        dimension: usize,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(!model.trim().is_empty(), "missing embedding model name");
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("failed to build embedding HTTP client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            api_key,
            model,
            dimension,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> String {
        format!("openai:{}", self.model)
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.trim())
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
                dimensions: self.dimension,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmbedError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let mut parsed: EmbeddingResponse = response.json().await?;
        parsed.data.sort_by_key(|d| d.index);
        let vectors: Vec<EmbeddingVector> = parsed.data.into_iter().map(|d| d.embedding).collect();
        check_batch(&vectors, texts.len(), self.dimension)?;

        debug!("Embedded {} texts via {}", texts.len(), self.model);
        Ok(vectors)
    }
}

/// Verifies a remote batch has one vector per input, each of the right length.
fn check_batch(
    vectors: &[EmbeddingVector],
    expected_count: usize,
    dimension: usize,
) -> Result<(), EmbedError> {
    if vectors.len() != expected_count {
        return Err(EmbedError::CountMismatch {
            expected: expected_count,
            actual: vectors.len(),
        });
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
        return Err(EmbedError::DimensionMismatch {
            expected: dimension,
            actual: bad.len(),
        });
    }
    Ok(())
}
