//! Capabilities the pipeline is given rather than builds: embeddings and
//! language-model calls. Implemented for Ollama in [`crate::ollama`].
//!
//! All traits are `Send + Sync` so they can be shared as `Arc<dyn …>`.

use async_trait::async_trait;
use thiserror::Error;

/// Failure reported by a provider call.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The backend did not answer in time.
    #[error("request timed out: {0}")]
    Timeout(String),
    /// The backend could not be reached or is not configured.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("request failed: {0}")]
    Request(String),
    /// The backend answered with something we could not use.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Classifies a client error message, treating any mention of a timeout as one.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("timed out") || lower.contains("timeout") {
            ProviderError::Timeout(message)
        } else {
            ProviderError::Request(message)
        }
    }
}

/// Turns text into a fixed-length vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}

/// A model call constrained to return a JSON object matching `schema`.
#[async_trait]
pub trait StructuredModel: Send + Sync {
    async fn generate_json(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError>;
}

/// Freeform chat completion: one system message, one user message, text back.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError>;
}
