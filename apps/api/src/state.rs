use std::sync::Arc;

use tokio::sync::RwLock;

use crate::rag::pipeline::Pipeline;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The single document session. Uploads take the write lock, questions
    /// share the read lock, so a re-index never races an answer.
    pub pipeline: Arc<RwLock<Pipeline>>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(RwLock::new(pipeline)),
        }
    }
}
