//! Resume Q&A pipeline — owns the single document session.
//!
//! Flow: load_document → build_index (chunk → embed → index), then per question:
//!       embed query → search(k) → build prompt → generate.
//!
//! Session states: `Empty → DocumentLoaded → Indexed`. A failed load or a failed
//! index build leaves the session `Empty`; the user has to upload again. Asking
//! a question only reads the index, so a failed answer leaves it `Indexed`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::llm_client::{AnswerGenerator, GenerationCause, GenerationError, GenerationRequest};
use crate::rag::chunker::{self, ChunkParams};
use crate::rag::embedder::{EmbedError, Embedder};
use crate::rag::index::{IndexError, Metric, VectorIndex};
use crate::rag::loader::{DocumentLoader, LoadError};
use crate::rag::models::{IndexEntry, PageText, RetrievalResult};
use crate::rag::prompts::{build_answer_prompt, ANSWER_SYSTEM};

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub chunk: ChunkParams,
    pub retrieval_k: usize,
    pub temperature: f32,
    pub max_tokens: u32,
    pub generation_timeout: Duration,
    pub metric: Metric,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk: config.chunk,
            retrieval_k: config.retrieval_k,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            generation_timeout: config.generation_timeout,
            metric: config.metric,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub session_id: Uuid,
    pub source: String,
    pub pages: Vec<PageText>,
    pub loaded_at: DateTime<Utc>,
}

pub enum SessionState {
    Empty,
    DocumentLoaded(LoadedDocument),
    Indexed {
        document: LoadedDocument,
        index: VectorIndex,
    },
}

/// Read-only view of the session for the API.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionStatus {
    Empty,
    DocumentLoaded {
        session_id: Uuid,
        source: String,
        pages: usize,
        loaded_at: DateTime<Utc>,
    },
    Indexed {
        session_id: Uuid,
        source: String,
        pages: usize,
        chunks: usize,
        dimension: usize,
        loaded_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexSummary {
    pub session_id: Uuid,
    pub source: String,
    pub pages: usize,
    pub chunks: usize,
    pub dimension: usize,
}

#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub retrieval: RetrievalResult,
}

#[derive(Debug, Error)]
pub enum AskError {
    #[error("Question must not be empty")]
    EmptyQuestion,

    #[error("No resume has been indexed yet")]
    NotIndexed,

    #[error("Failed to embed question: {0}")]
    Embedding(#[from] EmbedError),

    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] IndexError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

pub struct Pipeline {
    settings: PipelineSettings,
    loader: Arc<dyn DocumentLoader>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn AnswerGenerator>,
    state: SessionState,
}

impl Pipeline {
    pub fn new(
        settings: PipelineSettings,
        loader: Arc<dyn DocumentLoader>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        Self {
            settings,
            loader,
            embedder,
            generator,
            state: SessionState::Empty,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn status(&self) -> SessionStatus {
        match &self.state {
            SessionState::Empty => SessionStatus::Empty,
            SessionState::DocumentLoaded(doc) => SessionStatus::DocumentLoaded {
                session_id: doc.session_id,
                source: doc.source.clone(),
                pages: doc.pages.len(),
                loaded_at: doc.loaded_at,
            },
            SessionState::Indexed { document, index } => SessionStatus::Indexed {
                session_id: document.session_id,
                source: document.source.clone(),
                pages: document.pages.len(),
                chunks: index.len(),
                dimension: index.dimension(),
                loaded_at: document.loaded_at,
            },
        }
    }

    /// Loads a new document, replacing whatever the session held before.
    /// Returns the page count. On failure the session is `Empty`.
    pub async fn load_document(&mut self, path: PathBuf, source: String) -> Result<usize, LoadError> {
        self.state = SessionState::Empty;

        // pdf extraction is CPU-bound and may panic on hostile input
        let loader = Arc::clone(&self.loader);
        let pages = tokio::task::spawn_blocking(move || loader.load(&path))
            .await
            .map_err(|e| LoadError::Unreadable(format!("PDF extraction aborted: {e}")))??;

        if pages.is_empty() {
            return Err(LoadError::NoPages);
        }

        let page_count = pages.len();
        info!("Loaded '{}' ({} pages)", source, page_count);

        self.state = SessionState::DocumentLoaded(LoadedDocument {
            session_id: Uuid::new_v4(),
            source,
            pages,
            loaded_at: Utc::now(),
        });
        Ok(page_count)
    }

    /// Chunks, embeds and indexes the loaded document.
    /// On failure the document is discarded and the session is `Empty`.
    pub async fn build_index(&mut self) -> Result<IndexSummary, IndexError> {
        let document = match std::mem::replace(&mut self.state, SessionState::Empty) {
            SessionState::DocumentLoaded(doc) => doc,
            other => {
                self.state = other;
                return Err(IndexError::NotLoaded);
            }
        };

        let segments = chunker::split(&document.pages, &document.source, &self.settings.chunk);
        if segments.is_empty() {
            warn!("'{}' produced no text segments", document.source);
            return Err(IndexError::NoSegments);
        }

        let texts: Vec<String> = segments.iter().map(|s| s.content.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != segments.len() {
            return Err(EmbedError::CountMismatch {
                expected: segments.len(),
                actual: vectors.len(),
            }
            .into());
        }

        let mut index = VectorIndex::new(self.embedder.dimension(), self.settings.metric);
        index.add(
            segments
                .into_iter()
                .zip(vectors)
                .map(|(segment, vector)| IndexEntry { segment, vector })
                .collect(),
        )?;

        let summary = IndexSummary {
            session_id: document.session_id,
            source: document.source.clone(),
            pages: document.pages.len(),
            chunks: index.len(),
            dimension: index.dimension(),
        };
        info!(
            "Indexed '{}': {} chunks, dimension {}, embedder {}, metric {:?}",
            summary.source,
            summary.chunks,
            summary.dimension,
            self.embedder.name(),
            index.metric()
        );

        self.state = SessionState::Indexed { document, index };
        Ok(summary)
    }

    /// Answers one question against the indexed document. Never mutates the session.
    pub async fn ask(&self, question: &str) -> Result<Answer, AskError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AskError::EmptyQuestion);
        }

        let index = match &self.state {
            SessionState::Indexed { index, .. } => index,
            _ => return Err(AskError::NotIndexed),
        };

        let query = self.embedder.embed_one(question).await?;
        let retrieval = index.search(&query, self.settings.retrieval_k)?;
        if retrieval.is_empty() {
            warn!("No segments retrieved; answering without resume context");
        }
        info!(
            "Retrieved {} of {} segments (k={})",
            retrieval.len(),
            index.len(),
            self.settings.retrieval_k
        );

        let request = GenerationRequest {
            system_prompt: ANSWER_SYSTEM.to_string(),
            user_prompt: build_answer_prompt(&retrieval.context(), question),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let timeout = self.settings.generation_timeout;
        let text = match tokio::time::timeout(timeout, self.generator.generate(&request)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(GenerationError::new(
                    GenerationCause::Timeout,
                    format!("no answer within {}s", timeout.as_secs()),
                )
                .into())
            }
        };

        Ok(Answer { text, retrieval })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
