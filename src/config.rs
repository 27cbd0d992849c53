//! Tunables for both channels and the decode fallback.

use crate::border::{DEFAULT_BORDER_WIDTH, DEFAULT_MARKER};
use crate::error::{Result, StegoError};
use crate::shard::DEFAULT_SHARD_COUNT;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Widest border accepted; the corners then need a frame of 4096 pixels.
pub const MAX_BORDER_WIDTH: u32 = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StegoConfig {
    /// Number of LSB shards the ciphertext is split into.
    pub shard_count: usize,
    /// Depth of the edge strips; corners are twice this size.
    pub border_width: u32,
    /// Frames sampled by border extraction.
    pub sample_frames: usize,
    /// Trailing frames searched for the metadata record.
    pub metadata_scan_depth: usize,
    /// Frames tried for shards when no metadata record is found.
    pub default_shard_frames: usize,
    /// Maximum characters returned after the border marker.
    pub fragment_len: usize,
    pub marker: String,
    /// Upper bound on frames processed per video.
    pub max_frames: usize,
}

impl Default for StegoConfig {
    fn default() -> Self {
        Self {
            shard_count: DEFAULT_SHARD_COUNT,
            border_width: DEFAULT_BORDER_WIDTH,
            sample_frames: 10,
            metadata_scan_depth: 5,
            default_shard_frames: 15,
            fragment_len: 200,
            marker: DEFAULT_MARKER.to_string(),
            max_frames: 3000,
        }
    }
}

impl StegoConfig {
    /// Load from a JSON file; missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("shard_count", self.shard_count),
            ("border_width", self.border_width as usize),
            ("sample_frames", self.sample_frames),
            ("metadata_scan_depth", self.metadata_scan_depth),
            ("max_frames", self.max_frames),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(StegoError::InvalidConfig(format!("{} must be > 0", name)));
        }
        if self.border_width > MAX_BORDER_WIDTH {
            return Err(StegoError::InvalidConfig(format!(
                "border_width must be <= {}",
                MAX_BORDER_WIDTH
            )));
        }
        if self.marker.is_empty() {
            return Err(StegoError::InvalidConfig("marker cannot be empty".to_string()));
        }
        if self.marker.contains(',') || !self.marker.chars().all(crate::bits::is_printable) {
            return Err(StegoError::InvalidConfig(
                "marker must be printable ASCII without commas".to_string(),
            ));
        }
        Ok(())
    }
}
