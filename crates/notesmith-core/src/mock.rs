//! Deterministic stand-ins for the providers, for tests.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::providers::{ChatModel, EmbeddingProvider, ProviderError, StructuredModel};

/// Returns a fixed vector per known text. Unknown texts get a vector spread
/// from a hash of the text, so equal strings embed equally and distinct ones
/// are almost never near-identical.
#[derive(Default)]
pub struct TableEmbedder {
    table: HashMap<String, Vec<f32>>,
    failing: Vec<String>,
    pub calls: AtomicUsize,
}

impl TableEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.table.insert(text.to_string(), vector);
        self
    }

    /// Embedding `text` fails.
    pub fn failing_on(mut self, text: &str) -> Self {
        self.failing.push(text.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for TableEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.iter().any(|t| t == text) {
            return Err(ProviderError::Request(format!("cannot embed {text:?}")));
        }
        if let Some(v) = self.table.get(text) {
            return Ok(v.clone());
        }
        Ok(hash_embedding(text, 16))
    }
}

fn hash_embedding(text: &str, dimensions: usize) -> Vec<f32> {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    let mut hash = hasher.finish();
    let mut embedding = Vec::with_capacity(dimensions);
    for _ in 0..dimensions {
        embedding.push(((hash as f64 / u64::MAX as f64) * 2.0 - 1.0) as f32);
        let mut h = DefaultHasher::new();
        hash.hash(&mut h);
        hash = h.finish();
    }
    embedding
}

/// Every call fails as if the embedding service were down.
pub struct DownEmbedder;

#[async_trait]
impl EmbeddingProvider for DownEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
        Err(ProviderError::Unavailable("connection refused".into()))
    }
}

/// Structured model that turns the prompt's chunk marker into a note.
///
/// Prompts are expected to contain the chunk between `<capture>` tags; the
/// returned note echoes that text as its content. Failures and delays can be
/// scripted per chunk text.
#[derive(Default)]
pub struct EchoModel {
    delays: HashMap<String, Duration>,
    failures: HashMap<String, ProviderError>,
    raw: Option<serde_json::Value>,
    pub prompts: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl EchoModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delay(mut self, chunk: &str, delay: Duration) -> Self {
        self.delays.insert(chunk.to_string(), delay);
        self
    }

    pub fn fail(mut self, chunk: &str, err: ProviderError) -> Self {
        self.failures.insert(chunk.to_string(), err);
        self
    }

    /// Always answer with `value`, whatever the prompt.
    pub fn answering(value: serde_json::Value) -> Self {
        Self {
            raw: Some(value),
            ..Self::default()
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

pub fn captured_section(prompt: &str) -> String {
    let start = prompt.find("<capture>").map(|i| i + "<capture>".len());
    let end = prompt.find("</capture>");
    match (start, end) {
        (Some(s), Some(e)) if s <= e => prompt[s..e].trim().to_string(),
        _ => String::new(),
    }
}

#[async_trait]
impl StructuredModel for EchoModel {
    async fn generate_json(
        &self,
        prompt: &str,
        _schema: &serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let chunk = captured_section(prompt);
        if let Some(delay) = self.delays.get(&chunk) {
            tokio::time::sleep(*delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(err) = self.failures.get(&chunk) {
            return Err(err.clone());
        }
        if let Some(raw) = &self.raw {
            return Ok(raw.clone());
        }
        let title = chunk.split_whitespace().take(3).collect::<Vec<_>>().join(" ");
        Ok(json!({
            "title": title,
            "content": format!("<p>{chunk}</p>"),
            "tags": ["#notes"],
        }))
    }
}

/// Chat model that replies with a fixed string.
pub struct CannedChat(pub Result<String, ProviderError>);

#[async_trait]
impl ChatModel for CannedChat {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String, ProviderError> {
        self.0.clone()
    }
}
