//! Axum route handlers for the resume Q&A API.

use std::io::Write;

use anyhow::Context;
use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::rag::pipeline::{IndexSummary, SessionStatus};
use crate::state::AppState;

const UPLOAD_FIELD: &str = "file";
const EXCERPT_CHARS: usize = 200;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

#[derive(Debug, Serialize)]
pub struct SourceRef {
    pub page: u32,
    pub end_page: u32,
    pub score: f32,
    pub excerpt: String,
}

struct Upload {
    file_name: String,
    data: Bytes,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/resume
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IndexSummary>, AppError> {
    let upload = read_upload(&mut multipart).await?;
    info!(
        "Received upload '{}' ({} bytes)",
        upload.file_name,
        upload.data.len()
    );

    // kept alive until loading finishes; removed on drop
    let mut file = tempfile::Builder::new()
        .prefix("resume-")
        .suffix(".pdf")
        .tempfile()
        .context("failed to create temporary upload file")?;
    file.write_all(&upload.data)
        .context("failed to write temporary upload file")?;

    let mut pipeline = state.pipeline.write().await;
    pipeline
        .load_document(file.path().to_path_buf(), upload.file_name)
        .await?;
    let summary = pipeline.build_index().await?;

    Ok(Json(summary))
}

/// GET /api/v1/session
pub async fn handle_session(State(state): State<AppState>) -> Json<SessionStatus> {
    Json(state.pipeline.read().await.status())
}

/// POST /api/v1/ask
pub async fn handle_ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    let pipeline = state.pipeline.read().await;
    let answer = pipeline.ask(&req.question).await?;

    let sources = answer
        .retrieval
        .hits
        .iter()
        .map(|hit| SourceRef {
            page: hit.segment.locator.start_page,
            end_page: hit.segment.locator.end_page,
            score: hit.score,
            excerpt: hit.segment.content.chars().take(EXCERPT_CHARS).collect(),
        })
        .collect();

    Ok(Json(AskResponse {
        answer: answer.text,
        sources,
    }))
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("resume.pdf").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        if data.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }
        return Ok(Upload { file_name, data });
    }

    Err(AppError::Validation(format!(
        "Multipart field '{UPLOAD_FIELD}' with a PDF resume is required"
    )))
}
