//! The synthetic metadata frame listing which frames carry shards.

use crate::error::{Result, StegoError};
use crate::frame::{Frame, FrameRead};
use crate::lsb::{LsbChannel, LsbPrimitive};
use tracing::{debug, info};

/// Ordered list of shard-bearing frame indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    indices: Vec<usize>,
}

impl MetadataRecord {
    pub fn new(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Comma-joined indices. A single index gets a trailing comma so the
    /// record is still recognised by [`MetadataRecord::parse`].
    pub fn encode(&self) -> String {
        let joined = self
            .indices
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(",");
        if self.indices.len() == 1 {
            format!("{},", joined)
        } else {
            joined
        }
    }

    /// Parse a revealed payload. Only text containing a comma qualifies and
    /// every non-empty entry must be an integer.
    pub fn parse(text: &str) -> Option<Self> {
        if !text.contains(',') {
            return None;
        }
        let indices = text
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<usize>().ok())
            .collect::<Option<Vec<_>>>()?;
        if indices.is_empty() {
            return None;
        }
        Some(Self { indices })
    }
}

/// Append a copy of frame 0 carrying `record` as its LSB payload.
pub fn append_metadata_frame<P: LsbPrimitive>(
    frames: &mut Vec<Frame>,
    record: &MetadataRecord,
    lsb: &LsbChannel<P>,
) -> Result<()> {
    let first = frames.first().ok_or(StegoError::NoFrames)?;
    let image = lsb.hide(&first.image, &record.encode())?;
    let index = frames.len();
    frames.push(Frame::new(index, image));
    info!("Appended metadata frame {} listing {:?}", index, record.indices());
    Ok(())
}

/// Scan the last `depth` frames, newest first, for a metadata record.
pub fn locate_metadata<P: LsbPrimitive>(
    frames: &[Frame],
    lsb: &LsbChannel<P>,
    depth: usize,
) -> Option<MetadataRecord> {
    for frame in frames.iter().rev().take(depth) {
        if let FrameRead::Payload(text) = lsb.reveal_frame(frame) {
            if let Some(record) = MetadataRecord::parse(&text) {
                debug!("Metadata record found in frame {}", frame.index);
                return Some(record);
            }
        }
    }
    None
}
