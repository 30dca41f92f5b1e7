pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::rag::handlers;
use crate::state::AppState;

/// Largest accepted resume upload.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/resume",
            post(handlers::handle_upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/v1/session", get(handlers::handle_session))
        .route("/api/v1/ask", post(handlers::handle_ask))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::llm_client::GenerationCause;
    use crate::rag::testing::{pipeline_with, two_page_resume, StubGenerator, StubLoader};

    const BOUNDARY: &str = "resume-rag-test-boundary";

    fn app(loader: StubLoader, generator: StubGenerator) -> Router {
        build_router(AppState::new(pipeline_with(loader, generator)))
    }

    fn upload_request() -> Request<Body> {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"jane_doe.pdf\"\r\n\
             Content-Type: application/pdf\r\n\r\n\
             %PDF-1.4 stub\r\n\
             --{BOUNDARY}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri("/api/v1/resume")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn ask_request(question: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/ask")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({ "question": question }).to_string(),
            ))
            .unwrap()
    }

    fn session_request() -> Request<Body> {
        Request::builder()
            .uri("/api/v1/session")
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = app(StubLoader::pages(vec![]), StubGenerator::answering("x"));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_ask_before_upload_is_conflict() {
        let app = app(StubLoader::pages(vec![]), StubGenerator::answering("x"));
        let response = app.oneshot(ask_request("Any Rust?")).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "NO_DOCUMENT");
        assert!(body["error"]["hint"].as_str().unwrap().contains("Upload"));
    }

    #[tokio::test]
    async fn test_upload_then_ask() {
        let app = app(
            StubLoader::pages(two_page_resume()),
            StubGenerator::answering("Five years of Rust and Go."),
        );

        let response = app.clone().oneshot(upload_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let summary = json_body(response).await;
        assert_eq!(summary["source"], "jane_doe.pdf");
        assert_eq!(summary["pages"], 2);
        assert_eq!(summary["chunks"], 3);

        let response = app.clone().oneshot(ask_request("How much Rust?")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["answer"], "Five years of Rust and Go.");
        assert_eq!(body["sources"].as_array().unwrap().len(), 3);

        let response = app.oneshot(session_request()).await.unwrap();
        assert_eq!(json_body(response).await["state"], "indexed");
    }

    #[tokio::test]
    async fn test_failed_load_reports_hint_and_stays_empty() {
        let app = app(StubLoader::failing(), StubGenerator::answering("x"));

        let response = app.clone().oneshot(upload_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["error"]["code"], "LOAD_ERROR");

        let response = app.oneshot(session_request()).await.unwrap();
        assert_eq!(json_body(response).await["state"], "empty");
    }

    #[tokio::test]
    async fn test_upload_without_file_field_rejected() {
        let app = app(StubLoader::pages(two_page_resume()), StubGenerator::answering("x"));
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"note\"\r\n\r\n\
             hello\r\n\
             --{BOUNDARY}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/resume")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_auth_failure_surfaces_hint_and_keeps_index() {
        let app = app(
            StubLoader::pages(two_page_resume()),
            StubGenerator::failing(GenerationCause::Auth),
        );
        app.clone().oneshot(upload_request()).await.unwrap();

        let response = app.clone().oneshot(ask_request("Where did they study?")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "LLM_AUTH_ERROR");
        assert!(body["error"]["hint"]
            .as_str()
            .unwrap()
            .contains("https://console.groq.com/keys"));

        let response = app.oneshot(session_request()).await.unwrap();
        assert_eq!(json_body(response).await["state"], "indexed");
    }

    #[tokio::test]
    async fn test_blank_question_is_bad_request() {
        let app = app(StubLoader::pages(two_page_resume()), StubGenerator::answering("x"));
        app.clone().oneshot(upload_request()).await.unwrap();
        let response = app.oneshot(ask_request("  ")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
