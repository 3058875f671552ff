//! Vector similarity for embedding comparison.

/// Cosine similarity of two vectors: `dot(a, b) / (|a| * |b|)`.
///
/// Returns a value in `[-1, 1]` for non-degenerate input. Vectors of different
/// length, or a zero vector on either side, yield `NaN`. `NaN` never compares
/// greater than anything, so callers using `>` treat it as "no match".
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::NAN;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = norm(a);
    let norm_b = norm(b);
    dot / (norm_a * norm_b)
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}
