//! Generated notes: what the model returns and what the pipeline hands back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marker every tag starts with.
pub const TAG_MARKER: char = '#';

/// The part of a note the model produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedNote {
    pub title: String,
    /// Markup using headings, paragraphs, lists, code, emphasis and `[[concept]]` links.
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A finished note covering one capture window. Never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl Note {
    /// Stamps a generated note with the caller's time window and normalizes its tags.
    pub fn from_generated(
        generated: GeneratedNote,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            title: generated.title.trim().to_string(),
            content: generated.content,
            tags: normalize_tags(&generated.tags),
            start_time,
            end_time,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        let wanted = normalize_tag(tag);
        self.tags.iter().any(|t| Some(t) == wanted.as_ref())
    }
}

/// Trims a tag and makes sure it carries the marker. Blank tags give `None`.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let t = tag.trim().trim_start_matches(TAG_MARKER).trim();
    if t.is_empty() {
        return None;
    }
    Some(format!("{TAG_MARKER}{t}"))
}

pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    tags.iter().filter_map(|t| normalize_tag(t)).collect()
}
