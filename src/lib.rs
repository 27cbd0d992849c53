//! # StegoFrame Video Steganography Library
//!
//! Hides a text message in a video through two independent channels:
//!
//! - a **border channel** that paints `marker + message` as coloured pixels
//!   into the top-left corner of every frame, disguised by decoy corners and
//!   blended edge strips, and recoverable without any key;
//! - an **LSB channel** that encrypts the message, splits the ciphertext into
//!   shards and hides one shard per leading frame, with a trailing metadata
//!   frame listing the shard-bearing frames.
//!
//! Decoding tries both and returns the best answer available.
//!
//! ## Quick Start
//!
//! ```no_run
//! use stegoframe::{AeadCipher, KeyHandle, PngSequence, StegoConfig, VideoStego};
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let key = KeyHandle::load_or_generate(Path::new("data/stego.key"))?;
//! let stego = VideoStego::new(StegoConfig::default(), AeadCipher::new(&key))?;
//!
//! // A directory of PNG frames in, another one out
//! let report = stego.hide_video(
//!     &PngSequence,
//!     &PngSequence,
//!     Path::new("frames"),
//!     Path::new("frames_out"),
//!     "meet at dawn",
//! )?;
//! println!("Shards in frames {:?}", report.shard_frames);
//!
//! let recovery = stego.recover_video(&PngSequence, Path::new("frames_out"))?;
//! assert_eq!(recovery.text(), Some("meet at dawn"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - `border`: corner data block, camouflage and detection
//! - `lsb`: per-frame LSB primitive and shard placement
//! - `orchestrator`: decode fallback across both channels
//! - `pipeline`: the `VideoStego` engine
//! - `media`: PNG directories and ffmpeg containers

pub mod bits;
pub mod border;
pub mod config;
pub mod crypto;
pub mod error;
pub mod frame;
pub mod lsb;
pub mod media;
pub mod metadata;
pub mod orchestrator;
pub mod pipeline;
pub mod shard;

// Re-export main types for convenience
pub use border::{BorderCodec, BorderExtraction};
pub use config::StegoConfig;
pub use crypto::{AeadCipher, EncryptionService, KeyHandle};
pub use error::{Result, StegoError};
pub use frame::{Frame, FrameRead, FrameSink, FrameSource};
pub use lsb::{LsbChannel, LsbPrimitive, SequentialLsb};
pub use media::{Ffmpeg, PngSequence};
pub use orchestrator::{DecodeOrchestrator, Recovery};
pub use pipeline::{EncodeReport, VideoStego};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::path::PathBuf;

    fn create_test_frames(count: usize) -> Vec<Frame> {
        // 96x96 gradients, shifting per frame
        (0..count)
            .map(|i| {
                let img = RgbImage::from_fn(96, 96, |x, y| {
                    Rgb([(x * 2) as u8, (y * 2) as u8, (i * 11 % 256) as u8])
                });
                Frame::new(i, img)
            })
            .collect()
    }

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("stegoframe-it-{}-{}", tag, std::process::id()))
    }

    #[test]
    fn test_full_hide_recover_cycle() {
        let key = KeyHandle::generate();
        let stego = VideoStego::new(StegoConfig::default(), AeadCipher::new(&key)).unwrap();
        let message = "Hello, this is a secret message for testing!";

        let report = stego.embed(create_test_frames(20), message).unwrap();
        assert_eq!(report.frames.len(), 21);

        let recovery = stego.recover(&report.frames).unwrap();
        assert_eq!(recovery, Recovery::Decrypted(message.to_string()));
        assert_eq!(recovery.source(), "lsb");
    }

    #[test]
    fn test_png_directory_cycle() {
        let input = temp_dir("in");
        let output = temp_dir("out");
        PngSequence
            .assemble(&create_test_frames(12), std::path::Path::new(""), &input)
            .unwrap();

        let stego =
            VideoStego::new(StegoConfig::default(), AeadCipher::new(&KeyHandle::generate())).unwrap();
        let report = stego
            .hide_video(&PngSequence, &PngSequence, &input, &output, "on disk")
            .unwrap();
        assert_eq!(report.frames.len(), 13);

        let recovery = stego.recover_video(&PngSequence, &output).unwrap();
        assert_eq!(recovery.text(), Some("on disk"));

        std::fs::remove_dir_all(&input).ok();
        std::fs::remove_dir_all(&output).ok();
    }

    #[test]
    fn test_border_survives_loss_of_most_frames() {
        let stego =
            VideoStego::new(StegoConfig::default(), AeadCipher::new(&KeyHandle::generate())).unwrap();
        let report = stego.embed(create_test_frames(5), "redundant").unwrap();

        // One surviving frame carries a lone shard and the border; the rest are blank.
        let mut frames = vec![Frame::new(0, report.frames[4].image.clone())];
        frames.extend((1..4).map(|i| Frame::new(i, RgbImage::new(96, 96))));

        assert_eq!(
            stego.recover(&frames).unwrap(),
            Recovery::Border("redundant".to_string())
        );
    }

    #[test]
    fn test_plain_video_yields_nothing() {
        let stego =
            VideoStego::new(StegoConfig::default(), AeadCipher::new(&KeyHandle::generate())).unwrap();
        let frames: Vec<Frame> = (0..4).map(|i| Frame::new(i, RgbImage::new(96, 96))).collect();
        assert_eq!(stego.recover(&frames).unwrap(), Recovery::NotFound);
    }
}
