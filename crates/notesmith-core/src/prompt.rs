//! Prompt text for note generation.

use serde_json::json;

use crate::capture::ContentItem;

/// System message for chat-style generation.
pub const CHAT_SYSTEM_PROMPT: &str = "You are a helpful assistant that generates structured \
educational content in JSON format. Return only a JSON object with the keys \"title\" \
(clear, topic-focused), \"content\" (well-structured markup) and \"tags\" (relevant \
topics, each starting with #).";

const MARKUP_RULES: &str = "\
Format `content` using only this markup:
- <h1> for the main title, <h2> and <h3> for subtopics
- <p> for paragraphs
- <ul>/<ol> with <li> for lists and steps
- <code> for code snippets
- <em> for emphasis, <strong> for important terms
- [[concept]] to link a key concept";

const OUTPUT_SHAPE: &str =
    r##"{"title": "brief, topic-focused title", "content": "markup as described", "tags": ["#topic", "#subject"]}"##;

/// JSON schema of the object the model must return.
pub fn note_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "title": { "type": "string" },
            "content": { "type": "string" },
            "tags": { "type": "array", "items": { "type": "string" } }
        },
        "required": ["title", "content", "tags"]
    })
}

/// Prompt for one chunk of screen text.
pub fn build_text_prompt(chunk: &str, custom_prompt: &str) -> String {
    build(chunk.trim(), custom_prompt)
}

/// Prompt for a group of raw capture items, serialized as JSON.
pub fn build_items_prompt(items: &[ContentItem], custom_prompt: &str) -> String {
    let data = serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string());
    build(&data, custom_prompt)
}

fn build(data: &str, custom_prompt: &str) -> String {
    format!(
        r#"Create clear, educational notes from this screen recording data that are relevant to the user's instructions.

<capture>
{data}
</capture>

Instructions: {instructions}

Rules:
- Structure the notes with a clear hierarchy for easy review
- Include key learning points and takeaways
- Add relevant educational tags
{MARKUP_RULES}

Return a JSON object: {OUTPUT_SHAPE}"#,
        instructions = custom_prompt.trim(),
    )
}
