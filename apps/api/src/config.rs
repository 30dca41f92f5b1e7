use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::rag::chunker::ChunkParams;
use crate::rag::index::Metric;

/// Groq keys are issued with this prefix; anything else is rejected at startup.
pub const API_KEY_PREFIX: &str = "gsk_";
pub const GROQ_KEYS_URL: &str = "https://console.groq.com/keys";

const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_EMBEDDING_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Required environment variable '{key}' is not set")]
    Missing { key: &'static str },

    #[error("Invalid Groq API key format: key starts with '{prefix}...', expected 'gsk_'")]
    InvalidApiKeyFormat { prefix: String },

    #[error("Invalid value for '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    /// Remediation shown next to the error before the process exits.
    pub fn hint(&self) -> String {
        match self {
            ConfigError::Missing { key: "GROQ_API_KEY" } => format!(
                "Get your Groq API key from {GROQ_KEYS_URL}, then add \
                 `GROQ_API_KEY=your_groq_key_here` to the .env file and restart"
            ),
            ConfigError::Missing { key } => {
                format!("Set {key} in the environment or in the .env file")
            }
            ConfigError::InvalidApiKeyFormat { .. } => format!(
                "Groq API keys start with '{API_KEY_PREFIX}'. Copy the key again from {GROQ_KEYS_URL}"
            ),
            ConfigError::Invalid { key, .. } => {
                format!("Fix the value of {key} in the environment or in the .env file")
            }
        }
    }
}

/// Which embedding backend feeds the vector index.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingProvider {
    /// Local feature-hashing embedder. No network, no credentials.
    Hash,
    /// Any OpenAI-compatible `/embeddings` endpoint.
    OpenAi {
        api_key: String,
        model: String,
        base_url: String,
    },
}

/// Application configuration loaded from environment variables.
/// Built once at startup and handed to the pipeline by value.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub chunk: ChunkParams,
    pub retrieval_k: usize,
    pub model: String,
    pub groq_base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub generation_timeout: Duration,
    pub embedding_dimension: usize,
    pub embedding_provider: EmbeddingProvider,
    pub metric: Metric,
    pub port: u16,
}

impl Config {
    /// Reads the process environment. `main` loads `.env` beforehand.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = validate_api_key(lookup("GROQ_API_KEY"))?;

        let chunk_size: usize = parse_or(&lookup, "CHUNK_SIZE", 1000)?;
        let chunk_overlap: usize = parse_or(&lookup, "CHUNK_OVERLAP", 200)?;
        let chunk = ChunkParams::new(chunk_size, chunk_overlap).map_err(|e| {
            ConfigError::Invalid {
                key: "CHUNK_OVERLAP",
                reason: e.to_string(),
            }
        })?;

        let retrieval_k: usize = parse_or(&lookup, "RETRIEVAL_K", 3)?;
        if retrieval_k == 0 {
            return Err(ConfigError::Invalid {
                key: "RETRIEVAL_K",
                reason: "must be at least 1".to_string(),
            });
        }

        let temperature: f32 = parse_or(&lookup, "TEMPERATURE", 0.7)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::Invalid {
                key: "TEMPERATURE",
                reason: format!("{temperature} is outside 0.0..=2.0"),
            });
        }

        let max_tokens: u32 = parse_or(&lookup, "MAX_TOKENS", 1024)?;
        if max_tokens == 0 {
            return Err(ConfigError::Invalid {
                key: "MAX_TOKENS",
                reason: "must be at least 1".to_string(),
            });
        }

        let timeout_secs: u64 = parse_or(&lookup, "GENERATION_TIMEOUT_SECS", 60)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "GENERATION_TIMEOUT_SECS",
                reason: "must be at least 1".to_string(),
            });
        }

        let embedding_dimension: usize = parse_or(&lookup, "EMBEDDING_DIMENSION", 384)?;
        if embedding_dimension == 0 {
            return Err(ConfigError::Invalid {
                key: "EMBEDDING_DIMENSION",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Config {
            api_key,
            chunk,
            retrieval_k,
            model: lookup("GROQ_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            groq_base_url: lookup("GROQ_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GROQ_BASE_URL.to_string()),
            temperature,
            max_tokens,
            generation_timeout: Duration::from_secs(timeout_secs),
            embedding_dimension,
            embedding_provider: parse_embedding_provider(&lookup)?,
            metric: parse_metric(&lookup)?,
            port: parse_or(&lookup, "PORT", 8080)?,
        })
    }
}

fn validate_api_key(raw: Option<String>) -> Result<String, ConfigError> {
    let key = raw
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .ok_or(ConfigError::Missing { key: "GROQ_API_KEY" })?;

    if !key.starts_with(API_KEY_PREFIX) {
        // Only echo a few characters back; the rest is a secret.
        return Err(ConfigError::InvalidApiKeyFormat {
            prefix: key.chars().take(4).collect(),
        });
    }
    Ok(key)
}

fn parse_embedding_provider<F>(lookup: &F) -> Result<EmbeddingProvider, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let provider = lookup("EMBEDDING_PROVIDER").unwrap_or_else(|| "hash".to_string());
    match provider.trim().to_ascii_lowercase().as_str() {
        "hash" => Ok(EmbeddingProvider::Hash),
        "openai" => Ok(EmbeddingProvider::OpenAi {
            api_key: lookup("EMBEDDING_API_KEY")
                .filter(|k| !k.trim().is_empty())
                .ok_or(ConfigError::Missing {
                    key: "EMBEDDING_API_KEY",
                })?,
            model: lookup("EMBEDDING_MODEL").unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            base_url: lookup("EMBEDDING_BASE_URL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_BASE_URL.to_string()),
        }),
        other => Err(ConfigError::Invalid {
            key: "EMBEDDING_PROVIDER",
            reason: format!("unknown provider '{other}', expected 'hash' or 'openai'"),
        }),
    }
}

fn parse_metric<F>(lookup: &F) -> Result<Metric, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup("SIMILARITY_METRIC") else {
        return Ok(Metric::default());
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "cosine" => Ok(Metric::Cosine),
        "dot" | "dot_product" => Ok(Metric::DotProduct),
        other => Err(ConfigError::Invalid {
            key: "SIMILARITY_METRIC",
            reason: format!("unknown metric '{other}', expected 'cosine' or 'dot_product'"),
        }),
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_applied() {
        let config = config_from(&[("GROQ_API_KEY", "gsk_test123")]).unwrap();
        assert_eq!(config.api_key, "gsk_test123");
        assert_eq!(config.chunk.chunk_size(), 1000);
        assert_eq!(config.chunk.overlap(), 200);
        assert_eq!(config.retrieval_k, 3);
        assert_eq!(config.model, "llama-3.3-70b-versatile");
        assert!((config.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.max_tokens, 1024);
        assert_eq!(config.embedding_dimension, 384);
        assert_eq!(config.embedding_provider, EmbeddingProvider::Hash);
        assert_eq!(config.metric, Metric::Cosine);
        assert_eq!(config.groq_base_url, "https://api.groq.com/openai/v1");
        assert_eq!(config.generation_timeout, Duration::from_secs(60));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        let err = config_from(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { key: "GROQ_API_KEY" }));
        assert!(err.hint().contains(GROQ_KEYS_URL));
    }

    #[test]
    fn test_blank_api_key_counts_as_missing() {
        let err = config_from(&[("GROQ_API_KEY", "   ")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { .. }));
    }

    #[test]
    fn test_malformed_api_key_rejected() {
        let err = config_from(&[("GROQ_API_KEY", "sk-live-abcdef")]).unwrap_err();
        match &err {
            ConfigError::InvalidApiKeyFormat { prefix } => assert_eq!(prefix, "sk-l"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.hint().contains("gsk_"));
        assert!(!err.to_string().contains("abcdef"));
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk_size() {
        let err = config_from(&[
            ("GROQ_API_KEY", "gsk_x"),
            ("CHUNK_SIZE", "100"),
            ("CHUNK_OVERLAP", "100"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_zero_retrieval_k_rejected() {
        let err = config_from(&[("GROQ_API_KEY", "gsk_x"), ("RETRIEVAL_K", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "RETRIEVAL_K", .. }));
    }

    #[test]
    fn test_zero_generation_timeout_rejected() {
        let err = config_from(&[("GROQ_API_KEY", "gsk_x"), ("GENERATION_TIMEOUT_SECS", "0")])
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "GENERATION_TIMEOUT_SECS",
                ..
            }
        ));
    }

    #[test]
    fn test_similarity_metric_parsed() {
        let config =
            config_from(&[("GROQ_API_KEY", "gsk_x"), ("SIMILARITY_METRIC", "Dot_Product")]).unwrap();
        assert_eq!(config.metric, Metric::DotProduct);

        let err = config_from(&[("GROQ_API_KEY", "gsk_x"), ("SIMILARITY_METRIC", "euclid")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SIMILARITY_METRIC", .. }));
    }

    #[test]
    fn test_non_numeric_value_rejected() {
        let err = config_from(&[("GROQ_API_KEY", "gsk_x"), ("MAX_TOKENS", "lots")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "MAX_TOKENS", .. }));
    }

    #[test]
    fn test_temperature_out_of_range() {
        let err = config_from(&[("GROQ_API_KEY", "gsk_x"), ("TEMPERATURE", "3.5")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "TEMPERATURE", .. }));
    }

    #[test]
    fn test_openai_embedder_requires_key() {
        let err = config_from(&[("GROQ_API_KEY", "gsk_x"), ("EMBEDDING_PROVIDER", "openai")])
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Missing {
                key: "EMBEDDING_API_KEY"
            }
        ));

        let config = config_from(&[
            ("GROQ_API_KEY", "gsk_x"),
            ("EMBEDDING_PROVIDER", "OpenAI"),
            ("EMBEDDING_API_KEY", "sk-embed"),
        ])
        .unwrap();
        match config.embedding_provider {
            EmbeddingProvider::OpenAi { model, .. } => assert_eq!(model, "text-embedding-3-small"),
            other => panic!("unexpected provider: {other:?}"),
        }
    }
}
