//! The encode and decode pipelines over a whole frame sequence.
//!
//! Encoding writes the border channel into every frame, then the encrypted
//! LSB shards into the leading frames, then appends the metadata frame.
//! Decoding is delegated to [`DecodeOrchestrator`].

use crate::border::BorderCodec;
use crate::config::StegoConfig;
use crate::crypto::{ciphertext_to_text, EncryptionService};
use crate::error::{Result, StegoError};
use crate::frame::{check_frame_limit, reindex, Frame, FrameSink, FrameSource};
use crate::lsb::{LsbChannel, LsbPrimitive, SequentialLsb};
use crate::metadata::{append_metadata_frame, MetadataRecord};
use crate::orchestrator::{DecodeOrchestrator, Recovery};
use crate::shard::{split_shards, ShardPlan};
use std::path::Path;
use tracing::info;

/// Result of [`VideoStego::embed`].
#[derive(Debug, Clone)]
pub struct EncodeReport {
    /// Output frames, metadata frame last.
    pub frames: Vec<Frame>,
    /// Frames that received the border channel.
    pub border_frames: usize,
    /// Frames that received an LSB shard, ascending.
    pub shard_frames: Vec<usize>,
    /// Shards the ciphertext was split into.
    pub shard_count: usize,
    /// Trailing shards that did not fit the video.
    pub dropped_shards: usize,
}

/// Main engine
pub struct VideoStego<E, P = SequentialLsb> {
    config: StegoConfig,
    border: BorderCodec,
    lsb: LsbChannel<P>,
    cipher: E,
}

impl<E: EncryptionService> VideoStego<E> {
    pub fn new(config: StegoConfig, cipher: E) -> Result<Self> {
        Self::with_primitive(config, cipher, SequentialLsb)
    }
}

impl<E: EncryptionService, P: LsbPrimitive> VideoStego<E, P> {
    pub fn with_primitive(config: StegoConfig, cipher: E, primitive: P) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            border: BorderCodec::new(&config),
            lsb: LsbChannel::new(primitive),
            config,
            cipher,
        })
    }

    pub fn config(&self) -> &StegoConfig {
        &self.config
    }

    pub fn border(&self) -> &BorderCodec {
        &self.border
    }

    pub fn lsb(&self) -> &LsbChannel<P> {
        &self.lsb
    }

    fn check_message(message: &str) -> Result<()> {
        if message.is_empty() {
            return Err(StegoError::EmptyMessage);
        }
        Ok(())
    }

    fn check_frames(&self, frames: &[Frame]) -> Result<()> {
        if frames.is_empty() {
            return Err(StegoError::NoFrames);
        }
        check_frame_limit(frames.len(), self.config.max_frames)
    }

    /// Hide `message` in `frames`.
    pub fn embed(&self, mut frames: Vec<Frame>, message: &str) -> Result<EncodeReport> {
        Self::check_message(message)?;
        self.check_frames(&frames)?;
        reindex(&mut frames);

        // Stage 1: border channel, plaintext with marker
        let border_frames = self.border.embed_all(&mut frames, message);

        // Stage 2: LSB channel, encrypted and sharded
        let ciphertext = self.cipher.encrypt(message.as_bytes())?;
        let text = ciphertext_to_text(&ciphertext);
        let shards = split_shards(&text, self.config.shard_count);
        let shard_count = shards.len();
        let plan = ShardPlan::assign(shards, frames.len());
        let shard_frames = self.lsb.write_shards(&mut frames, &plan)?;

        // Stage 3: metadata frame
        append_metadata_frame(&mut frames, &MetadataRecord::new(shard_frames.clone()), &self.lsb)?;

        info!(
            "Embedded {} chars: border in {} frames, {} of {} shards in frames {:?}",
            message.chars().count(),
            border_frames,
            shard_frames.len(),
            shard_count,
            shard_frames
        );
        Ok(EncodeReport {
            frames,
            border_frames,
            shard_frames,
            shard_count,
            dropped_shards: plan.dropped,
        })
    }

    /// Recover the hidden message from `frames`.
    ///
    /// Finding nothing is not an error; it is reported as [`Recovery::NotFound`].
    pub fn recover(&self, frames: &[Frame]) -> Result<Recovery> {
        if frames.is_empty() {
            return Err(StegoError::NoFrames);
        }
        Ok(DecodeOrchestrator::new(&self.config, &self.border, &self.lsb, &self.cipher).run(frames))
    }

    /// Extract, embed and reassemble in one go.
    pub fn hide_video(
        &self,
        source: &dyn FrameSource,
        sink: &dyn FrameSink,
        input: &Path,
        output: &Path,
        message: &str,
    ) -> Result<EncodeReport> {
        Self::check_message(message)?;
        let frames = source.extract_bounded(input, self.config.max_frames)?;
        let report = self.embed(frames, message)?;
        sink.assemble(&report.frames, input, output)?;
        Ok(report)
    }

    pub fn recover_video(&self, source: &dyn FrameSource, input: &Path) -> Result<Recovery> {
        let frames = source.extract_bounded(input, self.config.max_frames)?;
        self.check_frames(&frames)?;
        self.recover(&frames)
    }
}
