
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::EmbeddingConfig;
use crate::{Result, SearchError};

/// Failure kinds surfaced to callers. The client never retries; retry policy
/// belongs to whoever issues the call.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Embedding service rate limited: {0}")]
    RateLimited(String),

    #[error("Embedding service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),
}

impl From<EmbeddingError> for SearchError {
    #[inline]
    fn from(err: EmbeddingError) -> Self {
        SearchError::Embedding(err.to_string())
    }
}

/// Client for an OpenAI-compatible embeddings endpoint. Stateless; one
/// request per call, no caching.
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    endpoint: Url,
    api_key: String,
    model: String,
    dimension: usize,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Debug, Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
    index: usize,
}

impl EmbeddingClient {
    #[inline]
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let endpoint = config
            .embeddings_url()
            .map_err(|e| SearchError::Config(e.to_string()))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            endpoint,
            api_key: config.resolved_api_key(),
            model: config.model.clone(),
            dimension: config.dimension as usize,
            agent,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed a single text. Convenience form for per-query embedding.
    #[inline]
    pub fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let texts = [text.to_string()];
        let mut vectors = self.embed_batch(&texts)?;
        vectors.pop().ok_or_else(|| {
            EmbeddingError::InvalidResponse("Service returned no embedding".to_string())
        })
    }

    /// Embed a batch of texts. One vector per input, order preserved.
    #[inline]
    pub fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };
        let request_json = serde_json::to_string(&request).map_err(|e| {
            EmbeddingError::InvalidResponse(format!("Failed to serialize request: {e}"))
        })?;

        let mut builder = self
            .agent
            .post(self.endpoint.as_str())
            .header("Content-Type", "application/json");
        if !self.api_key.is_empty() {
            let auth = format!("Bearer {}", self.api_key);
            builder = builder.header("Authorization", auth.as_str());
        }

        let response_text = builder
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(classify_transport_error)?;

        let response: EmbedResponse = serde_json::from_str(&response_text).map_err(|e| {
            EmbeddingError::InvalidResponse(format!("Failed to parse response: {e}"))
        })?;

        if response.data.len() != texts.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.data.len()
            )));
        }

        // The service reports an index per entry; sort so output order always
        // matches input order.
        let mut data = response.data;
        data.sort_by_key(|entry| entry.index);

        for entry in &data {
            if entry.embedding.len() != self.dimension {
                return Err(EmbeddingError::InvalidResponse(format!(
                    "Expected {} dimensions, got {}",
                    self.dimension,
                    entry.embedding.len()
                )));
            }
        }

        debug!("Generated {} embeddings", data.len());
        Ok(data.into_iter().map(|entry| entry.embedding).collect())
    }
}

fn classify_transport_error(error: ureq::Error) -> EmbeddingError {
    match error {
        ureq::Error::StatusCode(429) => {
            EmbeddingError::RateLimited("HTTP 429 Too Many Requests".to_string())
        }
        ureq::Error::StatusCode(status) if status >= 500 => {
            EmbeddingError::ServiceUnavailable(format!("HTTP {status}"))
        }
        ureq::Error::StatusCode(status) => {
            EmbeddingError::InvalidResponse(format!("Client error: HTTP {status}"))
        }
        ureq::Error::ConnectionFailed
        | ureq::Error::HostNotFound
        | ureq::Error::Timeout(_)
        | ureq::Error::Io(_) => EmbeddingError::ServiceUnavailable(error.to_string()),
        _ => EmbeddingError::ServiceUnavailable(error.to_string()),
    }
}
