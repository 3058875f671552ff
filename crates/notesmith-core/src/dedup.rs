//! Drops captured items whose text is a near-duplicate of one already kept.
//!
//! Deduplication is best effort. A failed embedding keeps its item; if the
//! embedding service is down altogether the input comes back untouched.

use tracing::{info, warn};

use crate::capture::ContentItem;
use crate::providers::{EmbeddingProvider, ProviderError};
use crate::similarity::cosine_similarity;

/// Similarity above which two items count as duplicates.
pub const DEFAULT_DUPLICATE_THRESHOLD: f32 = 0.95;

/// Outcome of a deduplication run.
#[derive(Debug, Clone)]
pub struct DedupReport {
    pub items: Vec<ContentItem>,
    pub duplicates_removed: usize,
    pub embedding_failures: usize,
    /// True when dedup was skipped and `items` is the original input.
    pub skipped: bool,
}

/// Deduplicates `items` in order against the embeddings kept so far in this run.
///
/// Blank items are kept without embedding. An item is dropped when its
/// similarity to any kept embedding is strictly above `threshold`.
pub async fn deduplicate(
    items: &[ContentItem],
    embedder: &dyn EmbeddingProvider,
    threshold: f32,
) -> DedupReport {
    if items.is_empty() {
        return DedupReport {
            items: Vec::new(),
            duplicates_removed: 0,
            embedding_failures: 0,
            skipped: false,
        };
    }

    match try_deduplicate(items, embedder, threshold).await {
        Ok(report) => {
            info!(
                "deduplication: removed {} duplicates from {} items",
                report.duplicates_removed,
                items.len()
            );
            report
        }
        Err(err) => {
            warn!(error = %err, "deduplication failed, using original data");
            DedupReport {
                items: items.to_vec(),
                duplicates_removed: 0,
                embedding_failures: 0,
                skipped: true,
            }
        }
    }
}

async fn try_deduplicate(
    items: &[ContentItem],
    embedder: &dyn EmbeddingProvider,
    threshold: f32,
) -> Result<DedupReport, ProviderError> {
    let mut kept_embeddings: Vec<Vec<f32>> = Vec::new();
    let mut unique = Vec::with_capacity(items.len());
    let mut duplicates_removed = 0;
    let mut embedding_failures = 0;
    let mut attempted = 0;

    for item in items {
        let text = item.embedding_text();
        if text.trim().is_empty() {
            unique.push(item.clone());
            continue;
        }

        attempted += 1;
        let embedding = match embedder.embed(&text).await {
            Ok(embedding) => embedding,
            Err(err) => {
                warn!(error = %err, "embedding failed for item, keeping it");
                embedding_failures += 1;
                unique.push(item.clone());
                continue;
            }
        };

        let is_duplicate = kept_embeddings
            .iter()
            .any(|kept| cosine_similarity(&embedding, kept) > threshold);
        if is_duplicate {
            duplicates_removed += 1;
        } else {
            kept_embeddings.push(embedding);
            unique.push(item.clone());
        }
    }

    // Nothing embedded at all: treat the service as unavailable.
    if attempted > 0 && embedding_failures == attempted {
        return Err(ProviderError::Unavailable(format!(
            "all {attempted} embedding calls failed"
        )));
    }

    Ok(DedupReport {
        items: unique,
        duplicates_removed,
        embedding_failures,
        skipped: false,
    })
}
