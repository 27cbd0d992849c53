//! Splitting ciphertext text into per-frame shards.

use tracing::warn;

/// Default number of shards a ciphertext is split into.
pub const DEFAULT_SHARD_COUNT: usize = 10;

/// Split `text` into at most `count` consecutive shards.
///
/// Every shard except possibly the last holds `ceil(len / count)` characters.
/// Concatenating the result in order reproduces `text` exactly. A `count` of
/// zero is treated as one.
pub fn split_shards(text: &str, count: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let per_shard = chars.len().div_ceil(count.max(1));
    chars
        .chunks(per_shard)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Shards paired with the frame index that will carry them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardPlan {
    pub placements: Vec<(usize, String)>,
    pub dropped: usize,
}

impl ShardPlan {
    /// Assign shard `i` to frame `i` while `i < min(shards, frame_count)`.
    ///
    /// Shards beyond the frame count are dropped; the decoder then only sees
    /// a prefix of the ciphertext.
    pub fn assign(shards: Vec<String>, frame_count: usize) -> Self {
        let total = shards.len();
        let placements: Vec<(usize, String)> =
            shards.into_iter().take(frame_count).enumerate().collect();
        let dropped = total - placements.len();
        if dropped > 0 {
            warn!(
                "Video has {} frames for {} shards, dropping {} trailing shards",
                frame_count, total, dropped
            );
        }
        Self { placements, dropped }
    }

    pub fn frame_indices(&self) -> Vec<usize> {
        self.placements.iter().map(|(idx, _)| *idx).collect()
    }
}
