//! Stub collaborators shared by the pipeline and router tests.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::llm_client::{AnswerGenerator, GenerationCause, GenerationError, GenerationRequest};
use crate::rag::chunker::ChunkParams;
use crate::rag::embedder::HashEmbedder;
use crate::rag::index::Metric;
use crate::rag::loader::{DocumentLoader, LoadError};
use crate::rag::models::PageText;
use crate::rag::pipeline::{Pipeline, PipelineSettings};

pub struct StubLoader {
    pages: Option<Vec<PageText>>,
}

impl StubLoader {
    pub fn pages(pages: Vec<PageText>) -> Self {
        Self { pages: Some(pages) }
    }

    pub fn failing() -> Self {
        Self { pages: None }
    }
}

impl DocumentLoader for StubLoader {
    fn load(&self, _path: &Path) -> Result<Vec<PageText>, LoadError> {
        self.pages.clone().ok_or(LoadError::NoPages)
    }
}

#[derive(Clone)]
enum Behaviour {
    Answer(String),
    Fail(GenerationCause),
    Hang,
}

/// Answer generator with a canned outcome. Clones share the recorded request.
#[derive(Clone)]
pub struct StubGenerator {
    behaviour: Behaviour,
    last_request: Arc<Mutex<Option<GenerationRequest>>>,
}

impl StubGenerator {
    fn with(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    pub fn answering(text: &str) -> Self {
        Self::with(Behaviour::Answer(text.to_string()))
    }

    pub fn failing(cause: GenerationCause) -> Self {
        Self::with(Behaviour::Fail(cause))
    }

    pub fn hanging() -> Self {
        Self::with(Behaviour::Hang)
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnswerGenerator for StubGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        *self.last_request.lock().unwrap() = Some(request.clone());
        match &self.behaviour {
            Behaviour::Answer(text) => Ok(text.clone()),
            Behaviour::Fail(cause) => Err(GenerationError::new(*cause, "stubbed failure")),
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok("too late".to_string())
            }
        }
    }
}

pub fn default_settings() -> PipelineSettings {
    PipelineSettings {
        chunk: ChunkParams::new(1000, 200).unwrap(),
        retrieval_k: 3,
        temperature: 0.7,
        max_tokens: 1024,
        generation_timeout: Duration::from_secs(60),
        metric: Metric::Cosine,
    }
}

pub fn pipeline_with(loader: StubLoader, generator: StubGenerator) -> Pipeline {
    Pipeline::new(
        default_settings(),
        Arc::new(loader),
        Arc::new(HashEmbedder::new(384)),
        Arc::new(generator),
    )
}

/// Two pages of exactly 900 chars each, ending in a non-space char.
pub fn two_page_resume() -> Vec<PageText> {
    let page = |body: &str| {
        let mut text: String = body.chars().cycle().take(899).collect();
        text.push('.');
        text
    };
    vec![
        PageText::new(
            1,
            page("Jane Doe. Senior software engineer with five years of Rust and Go. "),
        ),
        PageText::new(
            2,
            page("Education: BSc Computer Science, University of Toronto. Certified Kubernetes administrator. "),
        ),
    ]
}
