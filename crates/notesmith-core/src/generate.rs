//! Turns one chunk of capture data into a [`Note`] with a single model call.
//!
//! No retries happen here; a failed call is reported and the caller decides.

use chrono::{DateTime, Utc};
use tracing::{debug, error};

use crate::capture::ContentItem;
use crate::error::{NoteError, TIMEOUT_MESSAGE};
use crate::notes::{GeneratedNote, Note};
use crate::prompt::{build_items_prompt, build_text_prompt, note_schema, CHAT_SYSTEM_PROMPT};
use crate::providers::{ChatModel, ProviderError, StructuredModel};

/// Time window a generated note is stamped with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, NoteError> {
        if start > end {
            return Err(NoteError::InvalidTimeWindow);
        }
        Ok(Self { start, end })
    }
}

/// Generates a note from a chunk of text through the structured-output model.
pub async fn generate_note(
    model: &dyn StructuredModel,
    chunk: &str,
    window: TimeWindow,
    custom_prompt: &str,
) -> Result<Note, NoteError> {
    require_prompt(custom_prompt)?;
    let prompt = build_text_prompt(chunk, custom_prompt);
    generate_structured(model, &prompt, window).await
}

/// Same as [`generate_note`], but the raw capture items go into the prompt as JSON.
pub async fn generate_note_from_items(
    model: &dyn StructuredModel,
    items: &[ContentItem],
    window: TimeWindow,
    custom_prompt: &str,
) -> Result<Note, NoteError> {
    require_prompt(custom_prompt)?;
    let prompt = build_items_prompt(items, custom_prompt);
    generate_structured(model, &prompt, window).await
}

/// Generates a note through a plain chat completion. The reply must be JSON,
/// optionally inside a fenced code block.
pub async fn generate_note_via_chat(
    chat: &dyn ChatModel,
    chunk: &str,
    window: TimeWindow,
    custom_prompt: &str,
) -> Result<Note, NoteError> {
    require_prompt(custom_prompt)?;
    let prompt = build_text_prompt(chunk, custom_prompt);
    let reply = chat
        .complete(CHAT_SYSTEM_PROMPT, &prompt)
        .await
        .map_err(|e| generation_error(e, prompt.len()))?;
    if reply.trim().is_empty() {
        return Err(NoteError::GenerationFailed(
            "model returned an empty response".into(),
        ));
    }
    let generated = parse_note_reply(&reply)?;
    Ok(Note::from_generated(generated, window.start, window.end))
}

/// Parses a chat reply into a note, removing a surrounding code fence first.
pub fn parse_note_reply(reply: &str) -> Result<GeneratedNote, NoteError> {
    let body = strip_code_fence(reply);
    serde_json::from_str(body).map_err(|e| NoteError::ResponseParseFailed(e.to_string()))
}

/// Removes a leading ```` ``` ```` or ```` ```json ```` fence and its closing marker.
pub fn strip_code_fence(text: &str) -> &str {
    let t = text.trim();
    let Some(rest) = t.strip_prefix("```") else {
        return t;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

async fn generate_structured(
    model: &dyn StructuredModel,
    prompt: &str,
    window: TimeWindow,
) -> Result<Note, NoteError> {
    let value = model
        .generate_json(prompt, &note_schema())
        .await
        .map_err(|e| generation_error(e, prompt.len()))?;
    let generated: GeneratedNote = serde_json::from_value(value).map_err(|e| {
        NoteError::GenerationFailed(format!("model output does not match the note schema: {e}"))
    })?;
    debug!(title = %generated.title, "generated note");
    Ok(Note::from_generated(generated, window.start, window.end))
}

fn generation_error(err: ProviderError, prompt_len: usize) -> NoteError {
    error!(error = %err, prompt_len, "note generation failed");
    match err {
        ProviderError::Timeout(_) => NoteError::GenerationTimeout(TIMEOUT_MESSAGE.to_string()),
        other => NoteError::GenerationFailed(other.to_string()),
    }
}

fn require_prompt(custom_prompt: &str) -> Result<(), NoteError> {
    if custom_prompt.trim().is_empty() {
        return Err(NoteError::GenerationFailed("custom prompt is required".into()));
    }
    Ok(())
}
