//! Consolidates the per-chunk notes of one session into a single note.

use std::collections::HashMap;

use tracing::debug;

use crate::error::NoteError;
use crate::notes::Note;
use crate::providers::EmbeddingProvider;
use crate::similarity::cosine_similarity;

/// Number of tags a merged note keeps.
pub const DEFAULT_TAG_LIMIT: usize = 4;

/// Merges `notes`, assumed to be in chronological order, into one note.
///
/// - window: first note's start to last note's end
/// - title: the candidate most similar to `reference_label`
/// - content: all contents in order, separated by a blank line
/// - tags: the `tag_limit` most frequent, see [`top_tags`]
pub async fn merge_notes(
    notes: &[Note],
    reference_label: &str,
    embedder: &dyn EmbeddingProvider,
    tag_limit: usize,
) -> Result<Note, NoteError> {
    let (Some(first), Some(last)) = (notes.first(), notes.last()) else {
        return Err(NoteError::EmptyMergeInput);
    };

    let titles: Vec<&str> = notes.iter().map(|n| n.title.as_str()).collect();
    let title = select_title(&titles, reference_label, embedder)
        .await?
        .unwrap_or_else(|| first.title.clone());

    let content = notes
        .iter()
        .map(|n| n.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let tags = top_tags(notes.iter().flat_map(|n| n.tags.iter()), tag_limit);

    Ok(Note {
        title,
        content,
        tags,
        start_time: first.start_time,
        end_time: last.end_time,
    })
}

/// Picks the title whose embedding is closest to the reference label's.
///
/// Ties go to the earliest candidate and `NaN` scores are skipped. Returns
/// `None` when no title produced a comparable score. Any embedding failure
/// is an error.
pub async fn select_title(
    titles: &[&str],
    reference_label: &str,
    embedder: &dyn EmbeddingProvider,
) -> Result<Option<String>, NoteError> {
    let reference = embedder
        .embed(reference_label)
        .await
        .map_err(|e| NoteError::EmbeddingFailed(e.to_string()))?;

    let mut best: Option<(f32, &str)> = None;
    for &title in titles {
        let embedding = embedder
            .embed(title)
            .await
            .map_err(|e| NoteError::EmbeddingFailed(e.to_string()))?;
        let score = cosine_similarity(&reference, &embedding);
        debug!(title, score, "title candidate");
        if score.is_nan() {
            continue;
        }
        if best.map_or(true, |(top, _)| score > top) {
            best = Some((score, title));
        }
    }
    Ok(best.map(|(_, title)| title.to_string()))
}

/// The `limit` most frequent tags, most frequent first. Equal counts keep the
/// order in which each tag was first seen.
pub fn top_tags<'a>(tags: impl IntoIterator<Item = &'a String>, limit: usize) -> Vec<String> {
    let mut position: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for tag in tags {
        match position.get(tag.as_str()) {
            Some(&i) => counts[i].1 += 1,
            None => {
                position.insert(tag.as_str(), counts.len());
                counts.push((tag.as_str(), 1));
            }
        }
    }
    // Stable sort: ties stay in first-seen order.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(limit)
        .map(|(tag, _)| tag.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Utc};

    use super::*;
    use crate::mock::{DownEmbedder, TableEmbedder};

    fn at(minutes: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + Duration::minutes(minutes)
    }

    fn note(title: &str, content: &str, tags: &[&str], start: i64, end: i64) -> Note {
        Note {
            title: title.into(),
            content: content.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            start_time: at(start),
            end_time: at(end),
        }
    }

    #[tokio::test]
    async fn empty_input_is_an_error() {
        let err = merge_notes(&[], "label", &TableEmbedder::new(), DEFAULT_TAG_LIMIT)
            .await
            .unwrap_err();
        assert!(matches!(err, NoteError::EmptyMergeInput));
    }

    #[tokio::test]
    async fn picks_most_similar_title() {
        let embedder = TableEmbedder::new()
            .with("rust ownership", vec![1.0, 0.0, 0.0])
            .with("Cooking pasta", vec![0.0, 1.0, 0.0])
            .with("Borrowing in Rust", vec![0.9, 0.1, 0.1])
            .with("Memory safety", vec![0.6, 0.5, 0.3]);
        let notes = vec![
            note("Cooking pasta", "a", &[], 0, 10),
            note("Borrowing in Rust", "b", &[], 10, 20),
            note("Memory safety", "c", &[], 20, 30),
        ];
        let merged = merge_notes(&notes, "rust ownership", &embedder, DEFAULT_TAG_LIMIT)
            .await
            .unwrap();
        assert_eq!(merged.title, "Borrowing in Rust");
    }

    #[tokio::test]
    async fn exact_tie_keeps_first_candidate() {
        let embedder = TableEmbedder::new()
            .with("label", vec![1.0, 0.0])
            .with("First", vec![0.5, 0.5])
            .with("Second", vec![0.5, 0.5])
            .with("Third", vec![0.0, 1.0]);
        let titles = ["First", "Second", "Third"];
        let title = select_title(&titles, "label", &embedder).await.unwrap();
        assert_eq!(title.as_deref(), Some("First"));
    }

    #[tokio::test]
    async fn negative_scores_still_pick_a_title() {
        let embedder = TableEmbedder::new()
            .with("label", vec![1.0, 0.0])
            .with("Away", vec![-1.0, 0.0])
            .with("Less away", vec![-1.0, 1.0]);
        let title = select_title(&["Away", "Less away"], "label", &embedder)
            .await
            .unwrap();
        assert_eq!(title.as_deref(), Some("Less away"));
    }

    #[tokio::test]
    async fn embedding_failure_fails_the_merge() {
        let notes = vec![note("One", "a", &[], 0, 1), note("Two", "b", &[], 1, 2)];
        let err = merge_notes(&notes, "label", &DownEmbedder, DEFAULT_TAG_LIMIT)
            .await
            .unwrap_err();
        assert!(matches!(err, NoteError::EmbeddingFailed(_)));

        let embedder = TableEmbedder::new()
            .with("label", vec![1.0, 0.0])
            .with("Two", vec![0.0, 1.0])
            .failing_on("One");
        let err = select_title(&["One", "Two"], "label", &embedder)
            .await
            .unwrap_err();
        assert!(matches!(err, NoteError::EmbeddingFailed(_)));
    }

    #[tokio::test]
    async fn unscorable_titles_fall_back_to_first() {
        // Zero vectors score NaN against anything.
        let embedder = TableEmbedder::new()
            .with("label", vec![1.0, 0.0])
            .with("One", vec![0.0, 0.0])
            .with("Two", vec![0.0, 0.0]);
        let notes = vec![note("One", "a", &[], 0, 1), note("Two", "b", &[], 1, 2)];
        let merged = merge_notes(&notes, "label", &embedder, DEFAULT_TAG_LIMIT)
            .await
            .unwrap();
        assert_eq!(merged.title, "One");
    }

    #[tokio::test]
    async fn content_window_and_tags() {
        let notes = vec![
            note("A", "<p>first</p>", &["#a", "#a", "#b"], 0, 10),
            note("B", "<p>second</p>", &["#c", "#c"], 10, 20),
            note("C", "<p>third</p>", &["#c", "#d"], 20, 30),
        ];
        let merged = merge_notes(&notes, "label", &TableEmbedder::new(), DEFAULT_TAG_LIMIT)
            .await
            .unwrap();
        assert_eq!(merged.content, "<p>first</p>\n\n<p>second</p>\n\n<p>third</p>");
        assert_eq!(merged.start_time, at(0));
        assert_eq!(merged.end_time, at(30));
        assert_eq!(merged.tags, vec!["#c", "#a", "#b", "#d"]);
    }

    #[test]
    fn tag_ranking_breaks_ties_by_first_seen() {
        let tags: Vec<String> = ["#a", "#a", "#b", "#c", "#c", "#c", "#d"]
            .iter()
            .map(|t| t.to_string())
            .collect();
        assert_eq!(top_tags(&tags, 4), vec!["#c", "#a", "#b", "#d"]);

        let reordered: Vec<String> = ["#d", "#a", "#c", "#b", "#a", "#c", "#c"]
            .iter()
            .map(|t| t.to_string())
            .collect();
        assert_eq!(top_tags(&reordered, 4), vec!["#c", "#a", "#d", "#b"]);
    }

    #[test]
    fn tag_limit_truncates() {
        let tags: Vec<String> = ["#x", "#y", "#z", "#x"].iter().map(|t| t.to_string()).collect();
        assert_eq!(top_tags(&tags, 2), vec!["#x", "#y"]);
        assert!(top_tags(&tags, 0).is_empty());
    }
}
