//! Error kinds for note synthesis, and the opaque failure callers see.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors from note synthesis.
#[derive(Debug, Error)]
pub enum NoteError {
    /// Title selection during merge could not embed a label or title.
    #[error("embedding failed: {0}")]
    EmbeddingFailed(String),

    #[error("{0}")]
    GenerationTimeout(String),

    #[error("failed to generate note: {0}")]
    GenerationFailed(String),

    #[error("failed to parse model response: {0}")]
    ResponseParseFailed(String),

    #[error("cannot merge an empty list of notes")]
    EmptyMergeInput,

    #[error("no text to generate notes from")]
    NoChunksProduced,

    #[error("could not generate any notes")]
    NoNotesGenerated,

    #[error("start time is after end time")]
    InvalidTimeWindow,

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// User-facing message for a generation timeout.
pub const TIMEOUT_MESSAGE: &str =
    "Note generation timed out. The text might be too long or the model is busy.";

/// What callers outside the core see when the pipeline fails. The typed cause
/// is logged; only its message travels along as a diagnostic.
#[derive(Debug, Error)]
#[error("error generating notes")]
pub struct PipelineFailure {
    pub diagnostic: String,
}

impl From<NoteError> for PipelineFailure {
    fn from(err: NoteError) -> Self {
        Self {
            diagnostic: err.to_string(),
        }
    }
}
