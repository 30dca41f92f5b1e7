mod config;
mod errors;
mod llm_client;
mod rag;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, EmbeddingProvider};
use crate::llm_client::GroqClient;
use crate::rag::embedder::{Embedder, HashEmbedder, OpenAiEmbedder};
use crate::rag::loader::PdfLoader;
use crate::rag::pipeline::{Pipeline, PipelineSettings};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // load .env if present; ignore if missing

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info",
                env!("CARGO_PKG_NAME").replace('-', "_")
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // A missing or malformed key stops the process before anything else starts
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(hint = %e.hint(), "Configuration error: {e}");
            return Err(anyhow::anyhow!("{e}. {}", e.hint()));
        }
    };

    info!("Starting Resume RAG API v{}", env!("CARGO_PKG_VERSION"));

    let embedder = build_embedder(&config)?;
    info!(
        "Embedder initialized ({}, dimension {})",
        embedder.name(),
        embedder.dimension()
    );

    // Initialize LLM client
    let llm = GroqClient::new(
        config.api_key.clone(),
        config.model.clone(),
        &config.groq_base_url,
    )?;
    info!("LLM client initialized (model: {})", llm.model());

    info!(
        "Chunking {} chars with {} overlap, retrieving top {}",
        config.chunk.chunk_size(),
        config.chunk.overlap(),
        config.retrieval_k
    );

    let pipeline = Pipeline::new(
        PipelineSettings::from_config(&config),
        Arc::new(PdfLoader),
        embedder,
        Arc::new(llm),
    );

    // Build router
    let app = build_router(AppState::new(pipeline))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Picks the embedding backend named by `EMBEDDING_PROVIDER`.
fn build_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match &config.embedding_provider {
        EmbeddingProvider::Hash => Arc::new(HashEmbedder::new(config.embedding_dimension)),
        EmbeddingProvider::OpenAi {
            api_key,
            model,
            base_url,
        } => Arc::new(OpenAiEmbedder::new(
            api_key.clone(),
            base_url,
            model.clone(),
            config.embedding_dimension,
        )?),
    };
    Ok(embedder)
}
