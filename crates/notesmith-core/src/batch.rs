//! Runs generation over many chunks, a bounded window at a time.
//!
//! Calls inside a window run concurrently; the next window starts only after
//! every call in the current one has finished. Output order is input order.
//! If any call in a window fails, the whole run fails once that window has
//! settled and later windows are never started.

use std::future::Future;

use futures::future::join_all;
use tracing::debug;

use crate::error::NoteError;

/// Default number of generation calls in flight at once.
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 3;

/// Applies `generate` to every input, `limit` at a time. A `limit` of 0 is treated as 1.
pub async fn process_batches<T, R, F, Fut>(
    inputs: &[T],
    limit: usize,
    generate: F,
) -> Result<Vec<R>, NoteError>
where
    F: Fn(&T) -> Fut,
    Fut: Future<Output = Result<R, NoteError>>,
{
    let limit = limit.max(1);
    let mut results = Vec::with_capacity(inputs.len());
    for (window_index, window) in inputs.chunks(limit).enumerate() {
        debug!(window = window_index, size = window.len(), "processing window");
        let settled = join_all(window.iter().map(&generate)).await;
        for outcome in settled {
            results.push(outcome?);
        }
    }
    Ok(results)
}
