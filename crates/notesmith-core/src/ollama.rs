//! Ollama client for embeddings, JSON-mode generation and chat. Wraps ollama-rs
//! and implements the provider traits.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use ollama_rs::generation::chat::request::ChatMessageRequest;
use ollama_rs::generation::chat::ChatMessage;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};
use ollama_rs::generation::parameters::FormatType;
use ollama_rs::Ollama;
use thiserror::Error;

use crate::providers::{ChatModel, EmbeddingProvider, ProviderError, StructuredModel};

pub const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_MODEL: &str = "llama3.2:3b-instruct-q4_K_M";
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
/// Upper bound on a single Ollama request. ollama-rs sets no timeout itself.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Thin wrapper around Ollama: one model for embeddings, one for generation.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    inner: Ollama,
    embed_model: String,
    model: String,
    request_timeout: Duration,
}

impl OllamaClient {
    /// Create from URL string, e.g. `http://localhost:11434`.
    pub fn from_url(url: &str) -> Result<Self, OllamaError> {
        let inner = Ollama::try_new(url).map_err(OllamaError::ParseUrl)?;
        Ok(Self {
            inner,
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Set the embedding model (e.g. `nomic-embed-text`, `all-minilm`).
    pub fn with_embed_model(mut self, model: impl Into<String>) -> Self {
        self.embed_model = model.into();
        self
    }

    /// Set the generation model (e.g. `llama3.2`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Embed a single string. Returns the embedding vector.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, OllamaError> {
        let req = GenerateEmbeddingsRequest::new(
            self.embed_model.clone(),
            EmbeddingsInput::Single(text.to_string()),
        );
        let res = within(self.request_timeout, self.inner.generate_embeddings(req)).await?;
        res.embeddings
            .into_iter()
            .next()
            .ok_or(OllamaError::EmptyEmbedding)
    }

    /// Generate with Ollama's JSON output mode. The schema is spelled out in
    /// the system message since JSON mode alone does not enforce a shape.
    pub async fn generate_json(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
    ) -> Result<serde_json::Value, OllamaError> {
        let system = format!("Respond only with a JSON object matching this JSON schema:\n{schema}");
        let req = GenerationRequest::new(self.model.clone(), prompt.to_string())
            .system(system)
            .format(FormatType::Json);
        let res = within(self.request_timeout, self.inner.generate(req)).await?;
        serde_json::from_str(res.response.trim()).map_err(OllamaError::Json)
    }

    /// One-shot chat completion with a system and a user message.
    pub async fn chat(&self, system: &str, user: &str) -> Result<String, OllamaError> {
        let req = ChatMessageRequest::new(
            self.model.clone(),
            vec![
                ChatMessage::system(system.to_string()),
                ChatMessage::user(user.to_string()),
            ],
        );
        let res = within(self.request_timeout, self.inner.send_chat_messages(req)).await?;
        Ok(res.message.content)
    }
}

async fn within<T>(
    limit: Duration,
    request: impl Future<Output = Result<T, ollama_rs::error::OllamaError>>,
) -> Result<T, OllamaError> {
    match tokio::time::timeout(limit, request).await {
        Ok(res) => res.map_err(OllamaError::Request),
        Err(_) => Err(OllamaError::Timeout(limit)),
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self {
            inner: Ollama::default(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        OllamaClient::embed(self, text).await.map_err(ProviderError::from)
    }
}

#[async_trait]
impl StructuredModel for OllamaClient {
    async fn generate_json(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        OllamaClient::generate_json(self, prompt, schema)
            .await
            .map_err(ProviderError::from)
    }
}

#[async_trait]
impl ChatModel for OllamaClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        self.chat(system, user).await.map_err(ProviderError::from)
    }
}

#[derive(Debug, Error)]
pub enum OllamaError {
    #[error("invalid Ollama URL: {0}")]
    ParseUrl(#[from] url::ParseError),
    #[error("Ollama request failed: {0}")]
    Request(#[from] ollama_rs::error::OllamaError),
    #[error("Ollama request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Ollama returned no embedding")]
    EmptyEmbedding,
    #[error("Ollama returned invalid JSON: {0}")]
    Json(serde_json::Error),
}

impl From<OllamaError> for ProviderError {
    fn from(err: OllamaError) -> Self {
        match err {
            OllamaError::ParseUrl(e) => ProviderError::Unavailable(e.to_string()),
            OllamaError::Request(e) => ProviderError::from_message(e.to_string()),
            OllamaError::Timeout(limit) => {
                ProviderError::Timeout(format!("no response within {limit:?}"))
            }
            OllamaError::EmptyEmbedding => {
                ProviderError::InvalidResponse("Ollama returned no embedding".into())
            }
            OllamaError::Json(e) => ProviderError::InvalidResponse(e.to_string()),
        }
    }
}
