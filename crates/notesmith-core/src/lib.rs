//! Note synthesis independent of how it is run (CLI or embedded).
//!
//! Captured screen/audio items are deduplicated by embedding similarity,
//! chunked, turned into notes by a language model a few chunks at a time,
//! and merged into one note per session. Models are injected through
//! [`providers`]; [`ollama`] supplies a local implementation.

pub mod app_data;
pub mod batch;
pub mod capture;
pub mod chunks;
pub mod config;
pub mod dedup;
pub mod error;
pub mod generate;
pub mod merge;
pub mod notes;
pub mod ollama;
pub mod pipeline;
pub mod prompt;
pub mod providers;
pub mod similarity;
pub mod store;

#[cfg(test)]
mod mock;

pub use app_data::app_data_dir;
pub use capture::{load_items, ContentItem, ContentKind, ItemContent, LoadError};
pub use chunks::{chunk_text, Chunk, ChunkSizePolicy};
pub use config::{
    load_config, save_config, ConfigError, GenerationBackend, PipelineConfig, PipelineMode,
};
pub use dedup::{deduplicate, DedupReport};
pub use error::{NoteError, PipelineFailure};
pub use generate::TimeWindow;
pub use merge::merge_notes;
pub use notes::{GeneratedNote, Note};
pub use ollama::OllamaClient;
pub use pipeline::{NotePipeline, NoteRequest, PipelineSetupError};
pub use providers::{ChatModel, EmbeddingProvider, ProviderError, StructuredModel};
pub use similarity::cosine_similarity;
pub use store::{NoteStore, StoreError, StoredNote};

/// Returns a short status string. Used to verify the backend is wired up.
pub fn status() -> &'static str {
    "notesmith-core ready"
}
