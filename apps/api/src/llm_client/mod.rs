//! LLM Client — the single point of entry for all chat-completion calls.
//!
//! ARCHITECTURAL RULE: No other module may call the Groq API directly.
//! The pipeline only sees the `AnswerGenerator` trait; `GroqClient` is the
//! production implementation.

use std::fmt;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::GROQ_KEYS_URL;

const MAX_RETRIES: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Why a generation call failed. Drives the hint shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationCause {
    Auth,
    RateLimit,
    Network,
    Malformed,
    Timeout,
}

impl fmt::Display for GenerationCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GenerationCause::Auth => "authentication",
            GenerationCause::RateLimit => "rate limit",
            GenerationCause::Network => "network",
            GenerationCause::Malformed => "malformed response",
            GenerationCause::Timeout => "timeout",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
#[error("LLM {cause} error: {detail}")]
pub struct GenerationError {
    pub cause: GenerationCause,
    pub detail: String,
}

impl GenerationError {
    pub fn new(cause: GenerationCause, detail: impl Into<String>) -> Self {
        Self {
            cause,
            detail: detail.into(),
        }
    }

    /// Remediation for the user. The session stays usable after every cause.
    pub fn hint(&self) -> String {
        match self.cause {
            GenerationCause::Auth => format!(
                "Your API key may be expired or invalid. Get a new one from {GROQ_KEYS_URL}"
            ),
            GenerationCause::RateLimit => {
                "Rate limit exceeded. Try again in a moment.".to_string()
            }
            GenerationCause::Network => {
                "Could not reach the language model. Check your connection and ask again."
                    .to_string()
            }
            GenerationCause::Malformed => {
                "The language model returned an unexpected response. Ask again.".to_string()
            }
            GenerationCause::Timeout => {
                "The language model took too long to answer. Ask again or shorten the question."
                    .to_string()
            }
        }
    }
}

/// One chat-completion call: a system prompt, a user prompt and sampling knobs.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// The answer generator trait. Implement this to swap the LLM backend without
/// touching the pipeline or the handlers.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Chat-completions client for Groq's OpenAI-compatible API.
/// Retries rate limits, 5xx and transport failures with exponential backoff.
#[derive(Clone)]
pub struct GroqClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    retry_base_delay: Duration,
}

impl GroqClient {
    /// `base_url` is the OpenAI-compatible root, e.g. `https://api.groq.com/openai/v1`.
    pub fn new(api_key: String, model: String, base_url: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("failed to build Groq HTTP client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            model,
            retry_base_delay: RETRY_BASE_DELAY,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl AnswerGenerator for GroqClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let body = ChatRequest {
            model: &self.model,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
        };

        let mut last_error: Option<GenerationError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = self.retry_base_delay * (1 << (attempt - 1));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .client
                .post(&self.endpoint)
                .bearer_auth(self.api_key.trim())
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(GenerationError::new(transport_cause(&e), e.to_string()));
                    continue;
                }
            };

            let status = response.status().as_u16();

            if !(200..300).contains(&status) {
                let raw = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiErrorEnvelope>(&raw)
                    .map(|e| e.error.message)
                    .unwrap_or(raw);
                warn!("LLM API returned {}: {}", status, message);
                let error = GenerationError::new(classify_status(status), message);
                if is_retryable(status) {
                    last_error = Some(error);
                    continue;
                }
                return Err(error);
            }

            let raw = response
                .text()
                .await
                .map_err(|e| GenerationError::new(GenerationCause::Network, e.to_string()))?;
            return extract_answer(&raw);
        }

        Err(last_error.unwrap_or_else(|| {
            GenerationError::new(
                GenerationCause::RateLimit,
                format!("gave up after {MAX_RETRIES} attempts"),
            )
        }))
    }
}

fn classify_status(status: u16) -> GenerationCause {
    match status {
        401 | 403 => GenerationCause::Auth,
        429 => GenerationCause::RateLimit,
        408 | 504 => GenerationCause::Timeout,
        500..=599 => GenerationCause::Network,
        _ => GenerationCause::Malformed,
    }
}

fn is_retryable(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}

fn transport_cause(error: &reqwest::Error) -> GenerationCause {
    if error.is_timeout() {
        GenerationCause::Timeout
    } else {
        GenerationCause::Network
    }
}

/// Pulls the first choice's text out of a chat-completions body.
fn extract_answer(raw: &str) -> Result<String, GenerationError> {
    let parsed: ChatResponse = serde_json::from_str(raw)
        .map_err(|e| GenerationError::new(GenerationCause::Malformed, e.to_string()))?;

    if let Some(usage) = &parsed.usage {
        debug!(
            "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
            usage.prompt_tokens, usage.completion_tokens
        );
    }

    parsed
        .choices
        .into_iter()
        .find_map(|c| c.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| GenerationError::new(GenerationCause::Malformed, "LLM returned empty content"))
}
