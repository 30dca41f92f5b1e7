use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::{GenerationCause, GenerationError};
use crate::rag::embedder::EmbedError;
use crate::rag::index::IndexError;
use crate::rag::loader::LoadError;
use crate::rag::pipeline::AskError;

const REUPLOAD_HINT: &str = "Upload a text-based PDF resume (scanned images have no extractable text).";

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
/// Every response carries a `hint` telling the user what to do next.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Embedding(#[from] EmbedError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("No resume has been indexed yet")]
    NoDocument,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<AskError> for AppError {
    fn from(err: AskError) -> Self {
        match err {
            AskError::EmptyQuestion => {
                AppError::Validation("Question must not be empty".to_string())
            }
            AskError::NotIndexed => AppError::NoDocument,
            AskError::Embedding(e) => AppError::Embedding(e),
            AskError::Retrieval(e) => AppError::Internal(anyhow::anyhow!(e)),
            AskError::Generation(e) => AppError::Generation(e),
        }
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String, String) {
        match self {
            AppError::Load(e) => {
                if let LoadError::Io(io) = e {
                    tracing::error!("Upload I/O error: {io}");
                }
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "LOAD_ERROR",
                    e.to_string(),
                    REUPLOAD_HINT.to_string(),
                )
            }
            AppError::Index(IndexError::Embedding(e)) | AppError::Embedding(e) => {
                tracing::error!("Embedding error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "EMBEDDING_ERROR",
                    "The embedding service failed".to_string(),
                    "Check the embedding provider settings, then try again.".to_string(),
                )
            }
            AppError::Index(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INDEX_ERROR",
                e.to_string(),
                REUPLOAD_HINT.to_string(),
            ),
            AppError::Generation(e) => {
                tracing::error!("LLM error: {e}");
                let (status, code) = match e.cause {
                    GenerationCause::Auth => (StatusCode::BAD_GATEWAY, "LLM_AUTH_ERROR"),
                    GenerationCause::RateLimit => {
                        (StatusCode::TOO_MANY_REQUESTS, "LLM_RATE_LIMITED")
                    }
                    GenerationCause::Network => (StatusCode::BAD_GATEWAY, "LLM_NETWORK_ERROR"),
                    GenerationCause::Malformed => {
                        (StatusCode::BAD_GATEWAY, "LLM_MALFORMED_RESPONSE")
                    }
                    GenerationCause::Timeout => (StatusCode::GATEWAY_TIMEOUT, "LLM_TIMEOUT"),
                };
                (status, code, e.to_string(), e.hint())
            }
            AppError::NoDocument => (
                StatusCode::CONFLICT,
                "NO_DOCUMENT",
                self.to_string(),
                "Upload a PDF resume first.".to_string(),
            ),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg.clone(),
                "Fix the request and try again.".to_string(),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    "Try again; if it keeps failing, upload the resume again.".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, hint) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
                "hint": hint
            }
        }));

        (status, body).into_response()
    }
}
