//! Splits long capture text into bounded chunks for note generation.
//!
//! Text is split on whitespace and words are packed greedily: a chunk is
//! closed when the next word would push it past the bound. The bound is
//! either a word count or a character count, chosen once per pipeline.

use serde::{Deserialize, Serialize};

use crate::capture::ContentItem;

/// Default chunk bound under [`ChunkSizePolicy::Words`].
pub const DEFAULT_MAX_WORDS: usize = 1024;

/// How a chunk's size is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkSizePolicy {
    /// Number of words in the chunk.
    #[default]
    Words,
    /// Number of characters in the chunk, counting the single spaces between words.
    Chars,
}

impl ChunkSizePolicy {
    /// Size of `text` under this policy.
    pub fn measure(self, text: &str) -> usize {
        match self {
            ChunkSizePolicy::Words => text.split_whitespace().count(),
            ChunkSizePolicy::Chars => {
                let mut len = 0;
                for (i, word) in text.split_whitespace().enumerate() {
                    if i > 0 {
                        len += 1;
                    }
                    len += word.chars().count();
                }
                len
            }
        }
    }
}

/// A contiguous run of words from a larger text, in generation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    /// Position of this chunk in the sequence (0, 1, 2, …).
    pub index: usize,
}

/// Splits `text` into chunks of at most `max_size` under `policy`.
///
/// Words are rejoined with single spaces. Empty or whitespace-only input gives
/// no chunks. A `max_size` of 0 is treated as 1. Under the chars policy a
/// single word longer than the bound becomes its own chunk rather than being cut.
pub fn chunk_text(text: &str, max_size: usize, policy: ChunkSizePolicy) -> Vec<Chunk> {
    let max_size = max_size.max(1);
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_size = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if !current.is_empty() && current_size + word_cost(policy, word_len, false) > max_size {
            push_chunk(&mut chunks, &current);
            current.clear();
            current_size = 0;
        }
        current_size += word_cost(policy, word_len, current.is_empty());
        current.push(word);
    }
    if !current.is_empty() {
        push_chunk(&mut chunks, &current);
    }
    chunks
}

/// Size a word adds to a chunk; under the chars policy every word after the
/// first also pays for its separating space.
fn word_cost(policy: ChunkSizePolicy, word_len: usize, first: bool) -> usize {
    match policy {
        ChunkSizePolicy::Words => 1,
        ChunkSizePolicy::Chars if first => word_len,
        ChunkSizePolicy::Chars => word_len + 1,
    }
}

fn push_chunk(chunks: &mut Vec<Chunk>, words: &[&str]) {
    chunks.push(Chunk {
        text: words.join(" "),
        index: chunks.len(),
    });
}

/// Packs whole items into consecutive groups whose combined embedding text
/// stays within `max_size` under `policy`. An item larger than the bound gets
/// a group of its own. Item order is preserved.
pub fn group_items(
    items: &[ContentItem],
    max_size: usize,
    policy: ChunkSizePolicy,
) -> Vec<Vec<ContentItem>> {
    let max_size = max_size.max(1);
    let mut groups = Vec::new();
    let mut current: Vec<ContentItem> = Vec::new();
    let mut current_size = 0;

    for item in items {
        let size = policy.measure(&item.embedding_text());
        if !current.is_empty() && current_size + size > max_size {
            groups.push(std::mem::take(&mut current));
            current_size = 0;
        }
        current_size += size;
        current.push(item.clone());
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}
