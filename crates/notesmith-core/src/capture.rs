//! Captured screen/audio items and the text we pull out of them.
//!
//! Items come from an external recorder as JSON. We only read them: either a
//! single file (an array of items, or an object with a `data` array) or a
//! directory of such files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

/// What kind of capture produced an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentKind {
    #[serde(rename = "OCR")]
    Ocr,
    #[serde(rename = "Audio")]
    Audio,
    #[serde(other)]
    Other,
}

/// Payload of a captured item: plain text, or a structured object that
/// usually carries a `text` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemContent {
    Text(String),
    Structured(serde_json::Value),
}

/// One observed capture unit. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub content: ItemContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ContentItem {
    pub fn ocr(text: impl Into<String>) -> Self {
        Self {
            kind: ContentKind::Ocr,
            content: ItemContent::Structured(serde_json::json!({ "text": text.into() })),
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Text used to embed this item for deduplication: the string itself,
    /// the `text` field of a structured payload, or the whole payload as JSON.
    pub fn embedding_text(&self) -> String {
        match &self.content {
            ItemContent::Text(s) => s.clone(),
            ItemContent::Structured(value) => match value.get("text") {
                Some(serde_json::Value::String(s)) => s.clone(),
                _ => value.to_string(),
            },
        }
    }

    /// Text of an OCR item with a structured `text` payload; `None` otherwise.
    pub fn ocr_text(&self) -> Option<&str> {
        if self.kind != ContentKind::Ocr {
            return None;
        }
        match &self.content {
            ItemContent::Structured(value) => value.get("text").and_then(|t| t.as_str()),
            ItemContent::Text(_) => None,
        }
    }

    /// Capture time: the item's own timestamp, else a `timestamp` field in the payload.
    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        if let Some(ts) = self.timestamp {
            return Some(ts);
        }
        let ItemContent::Structured(value) = &self.content else {
            return None;
        };
        value
            .get("timestamp")
            .and_then(|t| t.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Joins the OCR text of all items with blank lines, skipping blank entries.
pub fn extract_ocr_text(items: &[ContentItem]) -> String {
    items
        .iter()
        .filter_map(ContentItem::ocr_text)
        .filter(|text| !text.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "did", "do", "does", "doing", "down", "during", "each", "few", "for", "from",
    "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself", "him",
    "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just", "me",
    "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once", "only",
    "or", "other", "our", "ours", "ourselves", "out", "over", "own", "same", "she", "should", "so",
    "some", "such", "than", "that", "the", "their", "theirs", "them", "themselves", "then",
    "there", "these", "they", "this", "those", "through", "to", "too", "under", "until", "up",
    "very", "was", "we", "were", "what", "when", "where", "which", "while", "who", "whom", "why",
    "will", "with", "you", "your", "yours", "yourself", "yourselves",
];

/// Normalizes OCR text before chunking: lowercases, drops everything except
/// ASCII letters, digits and whitespace, removes stopwords, and rejoins the
/// remaining words with single spaces.
pub fn clean_ocr_text(text: &str) -> String {
    let stopwords: HashSet<&str> = STOPWORDS.iter().copied().collect();
    let lowered: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect();
    lowered
        .split_whitespace()
        .filter(|word| !stopwords.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CaptureFile {
    Items(Vec<ContentItem>),
    Envelope { data: Vec<ContentItem> },
}

/// Loads items from a JSON file, or from every `.json` file under a directory
/// (sorted by path, hidden entries skipped).
pub fn load_items(path: &Path) -> Result<Vec<ContentItem>, LoadError> {
    if path.is_file() {
        return read_items_file(path);
    }
    if !path.is_dir() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
    {
        let entry = entry.map_err(|e| LoadError::Walk(e.to_string()))?;
        let p = entry.path();
        if p.extension().map_or(false, |e| e == "json") && p.is_file() {
            files.push(p.to_path_buf());
        }
    }
    files.sort();
    let mut items = Vec::new();
    for file in files {
        items.extend(read_items_file(&file)?);
    }
    Ok(items)
}

fn read_items_file(path: &Path) -> Result<Vec<ContentItem>, LoadError> {
    let raw = std::fs::read_to_string(path).map_err(|e| LoadError::Read(path.to_path_buf(), e))?;
    let parsed: CaptureFile =
        serde_json::from_str(&raw).map_err(|e| LoadError::Parse(path.to_path_buf(), e))?;
    Ok(match parsed {
        CaptureFile::Items(items) => items,
        CaptureFile::Envelope { data } => data,
    })
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|s| s.starts_with('.'))
            .unwrap_or(false)
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("no such file or directory: {0}")]
    NotFound(PathBuf),
    #[error("walk error: {0}")]
    Walk(String),
    #[error("read error for {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("invalid capture JSON in {0}: {1}")]
    Parse(PathBuf, serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(kind: ContentKind, content: ItemContent) -> ContentItem {
        ContentItem {
            kind,
            content,
            timestamp: None,
        }
    }

    #[test]
    fn embedding_text_prefers_string_then_text_field() {
        let plain = item(ContentKind::Other, ItemContent::Text("hello".into()));
        assert_eq!(plain.embedding_text(), "hello");

        let ocr = ContentItem::ocr("screen words");
        assert_eq!(ocr.embedding_text(), "screen words");

        let audio = item(
            ContentKind::Audio,
            ItemContent::Structured(json!({ "transcription": "hi there" })),
        );
        assert_eq!(audio.embedding_text(), r#"{"transcription":"hi there"}"#);
    }

    #[test]
    fn deserializes_recorder_shapes() {
        let raw = r#"[
            {"type": "OCR", "content": {"text": "slide one", "timestamp": "2024-05-01T10:00:00Z"}},
            {"type": "Audio", "content": {"transcription": "spoken"}},
            {"type": "UI", "content": "raw string"}
        ]"#;
        let items: Vec<ContentItem> = serde_json::from_str(raw).unwrap();
        assert_eq!(items[0].kind, ContentKind::Ocr);
        assert_eq!(items[1].kind, ContentKind::Audio);
        assert_eq!(items[2].kind, ContentKind::Other);
        assert_eq!(items[2].content, ItemContent::Text("raw string".into()));
        assert_eq!(
            items[0].captured_at().unwrap().to_rfc3339(),
            "2024-05-01T10:00:00+00:00"
        );
    }

    #[test]
    fn extract_ocr_text_skips_non_ocr_and_blank() {
        let items = vec![
            ContentItem::ocr("first"),
            ContentItem::ocr("   "),
            item(ContentKind::Audio, ItemContent::Structured(json!({ "text": "audio" }))),
            ContentItem::ocr("second"),
        ];
        assert_eq!(extract_ocr_text(&items), "first\n\nsecond");
    }

    #[test]
    fn clean_drops_punctuation_and_stopwords() {
        assert_eq!(
            clean_ocr_text("The Rust Book: Chapter 4, Ownership!\n\nIt is  great."),
            "rust book chapter 4 ownership great"
        );
    }

    #[test]
    fn load_items_from_file_and_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("b.json"),
            r#"{"data": [{"type": "OCR", "content": {"text": "two"}}]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a.json"),
            r#"[{"type": "OCR", "content": {"text": "one"}}]"#,
        )
        .unwrap();
        std::fs::write(dir.path().join(".hidden.json"), "not json").unwrap();

        let single = load_items(&dir.path().join("a.json")).unwrap();
        assert_eq!(single.len(), 1);

        let all = load_items(dir.path()).unwrap();
        let texts: Vec<_> = all.iter().filter_map(|i| i.ocr_text()).collect();
        assert_eq!(texts, vec!["one", "two"]);
    }

    #[test]
    fn load_items_reports_missing_path() {
        let err = load_items(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }
}
