//! Ollama embedding and generation backends.
//!
//! This module is only available when the `ollama` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::TextGenerator;

/// The default local Ollama endpoint.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// The default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";

/// The default generation model.
pub const DEFAULT_GENERATION_MODEL: &str = "phi";

const PROVIDER: &str = "Ollama";

fn client(timeout: Duration) -> std::result::Result<reqwest::Client, String> {
    reqwest::Client::builder().timeout(timeout).build().map_err(|e| {
        error!(provider = PROVIDER, error = %e, "failed to build HTTP client");
        format!("failed to build HTTP client: {e}")
    })
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{path}", base_url.trim_end_matches('/'))
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Send `body` to `url` and decode a JSON response, describing any failure
/// as a plain message.
async fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
    client: &reqwest::Client,
    url: &str,
    body: &B,
) -> std::result::Result<R, String> {
    let response = client.post(url).json(body).send().await.map_err(|e| {
        error!(provider = PROVIDER, url, error = %e, "request failed");
        format!("request failed: {e}")
    })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error).unwrap_or(body);

        error!(provider = PROVIDER, %status, url, "API error");
        return Err(format!("API returned {status}: {detail}"));
    }

    response.json::<R>().await.map_err(|e| {
        error!(provider = PROVIDER, url, error = %e, "failed to parse response");
        format!("failed to parse response: {e}")
    })
}

// ── Embeddings ─────────────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by Ollama's `/api/embed` endpoint.
///
/// # Example
///
/// ```rust,ignore
/// use knowrn_rag::ollama::OllamaEmbeddingProvider;
///
/// let provider = OllamaEmbeddingProvider::new("http://localhost:11434", "nomic-embed-text")?;
/// let embedding = provider.embed("plays ukulele").await?;
/// ```
pub struct OllamaEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl OllamaEmbeddingProvider {
    /// Create a provider for `model` served at `base_url`.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let model = model.into();
        if model.is_empty() {
            return Err(RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: "model name must not be empty".into(),
            });
        }

        Ok(Self {
            client: Self::client(Duration::from_secs(60))?,
            base_url: base_url.into(),
            model,
            dimensions: 0,
        })
    }

    fn client(timeout: Duration) -> Result<reqwest::Client> {
        client(timeout)
            .map_err(|message| RagError::EmbeddingError { provider: PROVIDER.into(), message })
    }

    /// Set the HTTP request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] if the HTTP client cannot be built.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Self::client(timeout)?;
        Ok(self)
    }

    /// Declare the model's output dimensionality up front.
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| RagError::EmbeddingError {
            provider: PROVIDER.into(),
            message: "API returned empty response".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = PROVIDER, batch_size = texts.len(), model = %self.model, "embedding batch");

        let request = EmbedRequest { model: &self.model, input: texts.to_vec() };
        let response: EmbedResponse =
            post_json(&self.client, &endpoint(&self.base_url, "api/embed"), &request)
                .await
                .map_err(|message| RagError::EmbeddingError { provider: PROVIDER.into(), message })?;

        Ok(response.embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ── Generation ─────────────────────────────────────────────────────

/// A [`TextGenerator`] backed by Ollama's `/api/generate` endpoint,
/// requesting a single non-streamed completion.
pub struct OllamaGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaGenerator {
    /// Create a generator for `model` served at `base_url`.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let model = model.into();
        if model.is_empty() {
            return Err(RagError::GenerationError {
                provider: PROVIDER.into(),
                message: "model name must not be empty".into(),
            });
        }

        let client = Self::client(Duration::from_secs(60))?;
        Ok(Self { client, base_url: base_url.into(), model })
    }

    fn client(timeout: Duration) -> Result<reqwest::Client> {
        client(timeout)
            .map_err(|message| RagError::GenerationError { provider: PROVIDER.into(), message })
    }

    /// Set the HTTP request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::GenerationError`] if the HTTP client cannot be built.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Self::client(timeout)?;
        Ok(self)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(provider = PROVIDER, prompt_len = prompt.len(), model = %self.model, "generating");

        let request = GenerateRequest { model: &self.model, prompt, stream: false };
        let response: GenerateResponse =
            post_json(&self.client, &endpoint(&self.base_url, "api/generate"), &request)
                .await
                .map_err(|message| RagError::GenerationError { provider: PROVIDER.into(), message })?;

        Ok(response.response)
    }
}
