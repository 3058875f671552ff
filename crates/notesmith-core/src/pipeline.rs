//! Note synthesis pipeline: capture items → dedup → chunk → generate → merge.
//!
//! One code path for every variant; [`PipelineConfig`] picks the mode, the
//! chunk policy and the generation backend. Providers are injected.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::batch::process_batches;
use crate::capture::{clean_ocr_text, extract_ocr_text, ContentItem};
use crate::chunks::{chunk_text, group_items, Chunk};
use crate::config::{GenerationBackend, PipelineConfig, PipelineMode};
use crate::dedup::deduplicate;
use crate::error::{NoteError, PipelineFailure};
use crate::generate::{generate_note, generate_note_from_items, generate_note_via_chat, TimeWindow};
use crate::merge::merge_notes;
use crate::notes::Note;
use crate::ollama::{OllamaClient, OllamaError};
use crate::providers::{ChatModel, EmbeddingProvider, StructuredModel};

/// One request to turn a capture session into a note.
#[derive(Debug, Clone)]
pub struct NoteRequest {
    pub items: Vec<ContentItem>,
    pub window: TimeWindow,
    /// What the user wants from the notes; also the default title reference.
    pub custom_prompt: String,
    /// Label titles are compared against when merging. Defaults to the prompt.
    pub reference_label: Option<String>,
}

impl NoteRequest {
    pub fn new(items: Vec<ContentItem>, window: TimeWindow, custom_prompt: impl Into<String>) -> Self {
        Self {
            items,
            window,
            custom_prompt: custom_prompt.into(),
            reference_label: None,
        }
    }

    pub fn with_reference_label(mut self, label: impl Into<String>) -> Self {
        self.reference_label = Some(label.into());
        self
    }

    fn reference_label(&self) -> &str {
        self.reference_label.as_deref().unwrap_or(&self.custom_prompt)
    }
}

pub struct NotePipeline {
    config: PipelineConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    model: Arc<dyn StructuredModel>,
    chat: Option<Arc<dyn ChatModel>>,
}

impl NotePipeline {
    pub fn new(
        config: PipelineConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        model: Arc<dyn StructuredModel>,
    ) -> Result<Self, NoteError> {
        config.validate()?;
        Ok(Self {
            config,
            embedder,
            model,
            chat: None,
        })
    }

    /// Chat model used when the config selects [`GenerationBackend::Chat`].
    pub fn with_chat(mut self, chat: Arc<dyn ChatModel>) -> Self {
        self.chat = Some(chat);
        self
    }

    /// Pipeline with every capability served by one Ollama instance.
    pub fn from_ollama(config: PipelineConfig) -> Result<Self, PipelineSetupError> {
        let client = Arc::new(
            OllamaClient::from_url(&config.ollama_url)?
                .with_model(config.model.clone())
                .with_embed_model(config.embed_model.clone())
                .with_request_timeout(Duration::from_secs(config.request_timeout_secs)),
        );
        let pipeline = Self::new(config, client.clone(), client.clone())?;
        Ok(pipeline.with_chat(client))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the pipeline. Failures come back as a single opaque error; the
    /// typed cause is logged and kept only as a diagnostic message.
    pub async fn run(&self, request: &NoteRequest) -> Result<Note, PipelineFailure> {
        self.synthesize(request).await.map_err(|err| {
            error!(error = %err, "error generating notes");
            PipelineFailure::from(err)
        })
    }

    /// Runs the pipeline, returning the typed error on failure.
    pub async fn synthesize(&self, request: &NoteRequest) -> Result<Note, NoteError> {
        let items = if self.config.deduplication_enabled {
            deduplicate(
                &request.items,
                self.embedder.as_ref(),
                self.config.duplicate_threshold,
            )
            .await
            .items
        } else {
            request.items.clone()
        };

        let notes = match self.config.mode {
            PipelineMode::OcrText => self.notes_from_text(&items, request).await?,
            PipelineMode::StructuredItems => self.notes_from_items(&items, request).await?,
        };
        info!(count = notes.len(), "generated notes");

        match notes.len() {
            0 => Err(NoteError::NoNotesGenerated),
            1 => Ok(notes.into_iter().next().ok_or(NoteError::NoNotesGenerated)?),
            _ => {
                merge_notes(
                    &notes,
                    request.reference_label(),
                    self.embedder.as_ref(),
                    self.config.tag_limit,
                )
                .await
            }
        }
    }

    async fn notes_from_text(
        &self,
        items: &[ContentItem],
        request: &NoteRequest,
    ) -> Result<Vec<Note>, NoteError> {
        let mut text = extract_ocr_text(items);
        if self.config.clean_ocr_text {
            text = clean_ocr_text(&text);
        }
        let chunks = chunk_text(
            &text,
            self.config.max_chunk_size,
            self.config.chunk_size_policy,
        );
        if chunks.is_empty() {
            return Err(NoteError::NoChunksProduced);
        }
        debug!(chunks = chunks.len(), policy = ?self.config.chunk_size_policy, "chunked capture text");

        process_batches(&chunks, self.config.concurrency_limit, |chunk: &Chunk| {
            let text = chunk.text.clone();
            async move { self.generate_from_text(&text, request).await }
        })
        .await
    }

    async fn notes_from_items(
        &self,
        items: &[ContentItem],
        request: &NoteRequest,
    ) -> Result<Vec<Note>, NoteError> {
        let groups = group_items(
            items,
            self.config.max_chunk_size,
            self.config.chunk_size_policy,
        );
        if groups.is_empty() {
            return Err(NoteError::NoChunksProduced);
        }
        debug!(groups = groups.len(), "grouped capture items");

        process_batches(&groups, self.config.concurrency_limit, |group: &Vec<ContentItem>| {
            let group = group.clone();
            async move {
                match self.config.generation {
                    GenerationBackend::Structured => {
                        generate_note_from_items(
                            self.model.as_ref(),
                            &group,
                            request.window,
                            &request.custom_prompt,
                        )
                        .await
                    }
                    GenerationBackend::Chat => {
                        let data = serde_json::to_string(&group)
                            .map_err(|e| NoteError::GenerationFailed(e.to_string()))?;
                        self.generate_from_text(&data, request).await
                    }
                }
            }
        })
        .await
    }

    async fn generate_from_text(&self, text: &str, request: &NoteRequest) -> Result<Note, NoteError> {
        match self.config.generation {
            GenerationBackend::Structured => {
                generate_note(
                    self.model.as_ref(),
                    text,
                    request.window,
                    &request.custom_prompt,
                )
                .await
            }
            GenerationBackend::Chat => {
                let chat = self.chat.as_ref().ok_or_else(|| {
                    NoteError::GenerationFailed("no chat model configured".into())
                })?;
                generate_note_via_chat(
                    chat.as_ref(),
                    text,
                    request.window,
                    &request.custom_prompt,
                )
                .await
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineSetupError {
    #[error(transparent)]
    Ollama(#[from] OllamaError),
    #[error(transparent)]
    Note(#[from] NoteError),
}
