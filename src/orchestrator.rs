//! Decode fallback: border channel and LSB channel are read independently,
//! then reconciled.
//!
//! 1. Border extraction over sampled frames.
//! 2. Metadata record from the last few frames, else the first
//!    `default_shard_frames` frames, as the shard candidates.
//! 3. LSB reveal on each candidate; misses are skipped.
//! 4. Shards concatenated in index order and decrypted.
//!
//! Decryption success wins. Otherwise the border text is preferred over the
//! raw LSB text, and "not found" is only reported when both channels came
//! back empty.

use crate::border::BorderCodec;
use crate::config::StegoConfig;
use crate::crypto::{text_to_ciphertext, EncryptionService};
use crate::error::{Result, StegoError};
use crate::frame::{Frame, FrameRead};
use crate::lsb::{LsbChannel, LsbPrimitive};
use crate::metadata::locate_metadata;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Final answer of a decode request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recovery {
    /// LSB shards reassembled and decrypted.
    Decrypted(String),
    /// Text recovered by the border channel.
    Border(String),
    /// LSB text that could not be decrypted.
    Raw(String),
    NotFound,
}

impl Recovery {
    pub fn text(&self) -> Option<&str> {
        match self {
            Recovery::Decrypted(t) | Recovery::Border(t) | Recovery::Raw(t) => Some(t.as_str()),
            Recovery::NotFound => None,
        }
    }

    /// Short label of the channel that produced the text.
    pub fn source(&self) -> &'static str {
        match self {
            Recovery::Decrypted(_) => "lsb",
            Recovery::Border(_) => "border",
            Recovery::Raw(_) => "raw",
            Recovery::NotFound => "none",
        }
    }

    pub fn is_found(&self) -> bool {
        !matches!(self, Recovery::NotFound)
    }
}

/// Where the shard candidate list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    Metadata,
    Default,
}

pub struct DecodeOrchestrator<'a, P: LsbPrimitive, E: EncryptionService + ?Sized> {
    config: &'a StegoConfig,
    border: &'a BorderCodec,
    lsb: &'a LsbChannel<P>,
    cipher: &'a E,
}

impl<'a, P: LsbPrimitive, E: EncryptionService + ?Sized> DecodeOrchestrator<'a, P, E> {
    pub fn new(
        config: &'a StegoConfig,
        border: &'a BorderCodec,
        lsb: &'a LsbChannel<P>,
        cipher: &'a E,
    ) -> Self {
        Self {
            config,
            border,
            lsb,
            cipher,
        }
    }

    pub fn run(&self, frames: &[Frame]) -> Recovery {
        let (border, lsb_text) = rayon::join(
            || self.border.extract_border_data(frames),
            || self.lsb_ciphertext(frames),
        );
        let border_text = border.text().map(str::to_string);

        let recovery = match lsb_text {
            Some(text) => match self.decrypt_text(&text) {
                Ok(plaintext) => Recovery::Decrypted(plaintext),
                Err(e) => {
                    warn!("LSB text recovered but not decryptable: {}", e);
                    match border_text {
                        Some(b) => Recovery::Border(b),
                        None => Recovery::Raw(text),
                    }
                }
            },
            None => match border_text {
                Some(b) => Recovery::Border(b),
                None => Recovery::NotFound,
            },
        };
        info!("Decode finished via {}", recovery.source());
        recovery
    }

    /// Shard-bearing frame indices, ascending and within bounds.
    pub fn candidate_frames(&self, frames: &[Frame]) -> (Vec<usize>, CandidateSource) {
        match locate_metadata(frames, self.lsb, self.config.metadata_scan_depth) {
            Some(record) => {
                let mut indices: Vec<usize> = record
                    .indices()
                    .iter()
                    .copied()
                    .filter(|&i| i < frames.len())
                    .collect();
                indices.sort_unstable();
                indices.dedup();
                if indices.len() < record.indices().len() {
                    debug!("Ignoring metadata entries outside the {} frames", frames.len());
                }
                info!("Metadata lists shard frames {:?}", indices);
                (indices, CandidateSource::Metadata)
            }
            None => {
                let count = self.config.default_shard_frames.min(frames.len());
                info!("No metadata frame, trying the first {} frames", count);
                ((0..count).collect(), CandidateSource::Default)
            }
        }
    }

    /// Reveal every candidate, keeping the ones that produced text.
    pub fn collect_shards(&self, frames: &[Frame], candidates: &[usize]) -> BTreeMap<usize, String> {
        let mut shards = BTreeMap::new();
        for &idx in candidates {
            let Some(frame) = frames.get(idx) else {
                continue;
            };
            match self.lsb.reveal_frame(frame) {
                FrameRead::Payload(text) if !text.is_empty() => {
                    shards.insert(idx, text);
                }
                FrameRead::Payload(_) | FrameRead::Empty | FrameRead::Failed(_) => {}
            }
        }
        shards
    }

    /// Concatenated shard text, or `None` when the LSB channel gave nothing.
    fn lsb_ciphertext(&self, frames: &[Frame]) -> Option<String> {
        let (candidates, _) = self.candidate_frames(frames);
        let shards = self.collect_shards(frames, &candidates);
        if shards.is_empty() {
            info!("LSB channel: nothing recovered from {} candidates", candidates.len());
            return None;
        }
        info!(
            "LSB channel: {} of {} candidate frames yielded shards",
            shards.len(),
            candidates.len()
        );
        Some(shards.into_values().collect())
    }

    fn decrypt_text(&self, text: &str) -> Result<String> {
        let ciphertext = text_to_ciphertext(text)?;
        let plaintext = self.cipher.decrypt(&ciphertext)?;
        String::from_utf8(plaintext)
            .map_err(|_| StegoError::Decryption("plaintext is not valid UTF-8".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{ciphertext_to_text, AeadCipher, KeyHandle};
    use crate::lsb::SequentialLsb;
    use image::{Rgb, RgbImage};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Reveals scripted payloads keyed on the red value of pixel (0, 0) and
    /// records every frame it was asked about.
    #[derive(Default)]
    struct ScriptedLsb {
        payloads: HashMap<u8, String>,
        seen: Mutex<Vec<u8>>,
    }

    impl LsbPrimitive for ScriptedLsb {
        fn hide(&self, image: &RgbImage, _text: &str) -> Result<RgbImage> {
            Ok(image.clone())
        }

        fn reveal(&self, image: &RgbImage) -> FrameRead {
            let tag = image.get_pixel(0, 0)[0];
            self.seen.lock().unwrap().push(tag);
            match self.payloads.get(&tag) {
                Some(text) => FrameRead::Payload(text.clone()),
                None => FrameRead::Empty,
            }
        }
    }

    /// Accepts ciphertext that starts with `plain:`.
    struct PrefixCipher;

    impl EncryptionService for PrefixCipher {
        fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
            Ok([b"plain:".as_slice(), plaintext].concat())
        }

        fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
            ciphertext
                .strip_prefix(b"plain:".as_slice())
                .map(<[u8]>::to_vec)
                .ok_or_else(|| StegoError::Decryption("bad prefix".to_string()))
        }
    }

    fn tagged_frames(count: usize) -> Vec<Frame> {
        (0..count)
            .map(|i| Frame::new(i, RgbImage::from_pixel(8, 8, Rgb([i as u8, 0, 0]))))
            .collect()
    }

    fn scripted(payloads: &[(u8, &str)]) -> LsbChannel<ScriptedLsb> {
        LsbChannel::new(ScriptedLsb {
            payloads: payloads.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            seen: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn test_metadata_guides_candidates() {
        let text = ciphertext_to_text(b"plain:attack at noon");
        let (a, rest) = text.split_at(8);
        let (b, c) = rest.split_at(8);

        let mut frames = tagged_frames(10);
        frames.push(Frame::new(10, RgbImage::from_pixel(8, 8, Rgb([200, 0, 0]))));
        let lsb = scripted(&[(200, "2,5,7"), (2, a), (5, b), (7, c), (3, "stray")]);

        let config = StegoConfig::default();
        let border = BorderCodec::new(&config);
        let orchestrator = DecodeOrchestrator::new(&config, &border, &lsb, &PrefixCipher);

        let recovery = orchestrator.run(&frames);
        assert_eq!(recovery, Recovery::Decrypted("attack at noon".to_string()));
        // metadata scan stops at the last frame, then exactly 2, 5, 7
        assert_eq!(*lsb.primitive().seen.lock().unwrap(), vec![200, 2, 5, 7]);
    }

    #[test]
    fn test_default_candidates_without_metadata() {
        let frames = tagged_frames(20);
        let lsb = scripted(&[]);
        let config = StegoConfig::default();
        let border = BorderCodec::new(&config);
        let orchestrator = DecodeOrchestrator::new(&config, &border, &lsb, &PrefixCipher);

        let (candidates, source) = orchestrator.candidate_frames(&frames);
        assert_eq!(source, CandidateSource::Default);
        assert_eq!(candidates, (0..15).collect::<Vec<_>>());

        let (short, _) = orchestrator.candidate_frames(&frames[..4]);
        assert_eq!(short, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_metadata_out_of_range_entries_are_dropped() {
        let mut frames = tagged_frames(4);
        frames.push(Frame::new(4, RgbImage::from_pixel(8, 8, Rgb([99, 0, 0]))));
        let lsb = scripted(&[(99, "3,1,42,1")]);
        let config = StegoConfig::default();
        let border = BorderCodec::new(&config);
        let orchestrator = DecodeOrchestrator::new(&config, &border, &lsb, &PrefixCipher);

        let (candidates, source) = orchestrator.candidate_frames(&frames);
        assert_eq!(source, CandidateSource::Metadata);
        assert_eq!(candidates, vec![1, 3]);
    }

    #[test]
    fn test_collect_skips_misses_and_orders_by_index() {
        let frames = tagged_frames(6);
        let lsb = scripted(&[(4, "DD"), (1, "AA"), (3, "")]);
        let config = StegoConfig::default();
        let border = BorderCodec::new(&config);
        let orchestrator = DecodeOrchestrator::new(&config, &border, &lsb, &PrefixCipher);

        let shards = orchestrator.collect_shards(&frames, &[0, 1, 3, 4, 9]);
        assert_eq!(shards.into_iter().collect::<Vec<_>>(), vec![
            (1, "AA".to_string()),
            (4, "DD".to_string()),
        ]);
    }

    fn border_frames(message: &str, count: usize, border: &BorderCodec) -> Vec<Frame> {
        let mut frames: Vec<Frame> = (0..count)
            .map(|i| {
                Frame::new(i, RgbImage::from_fn(96, 96, |x, y| Rgb([x as u8, y as u8, (i * 9) as u8])))
            })
            .collect();
        border.embed_all(&mut frames, message);
        frames
    }

    #[test]
    fn test_undecryptable_lsb_falls_back_to_border() {
        let config = StegoConfig::default();
        let border = BorderCodec::new(&config);
        let lsb = LsbChannel::new(SequentialLsb);
        let cipher = AeadCipher::new(&KeyHandle::generate());

        let mut frames = border_frames("secret", 3, &border);
        frames[0].image = lsb.hide(&frames[0].image, "bm90IGNpcGhlcnRleHQ=").unwrap();

        let recovery = DecodeOrchestrator::new(&config, &border, &lsb, &cipher).run(&frames);
        assert_eq!(recovery, Recovery::Border("secret".to_string()));
        assert_eq!(recovery.source(), "border");
    }

    #[test]
    fn test_undecryptable_lsb_without_border_is_raw() {
        let config = StegoConfig::default();
        let border = BorderCodec::new(&config);
        let lsb = LsbChannel::new(SequentialLsb);
        let cipher = AeadCipher::new(&KeyHandle::generate());

        let mut frames: Vec<Frame> = (0..3)
            .map(|i| Frame::new(i, RgbImage::from_pixel(16, 16, Rgb([10, 20, 30]))))
            .collect();
        frames[0].image = lsb.hide(&frames[0].image, "partial").unwrap();
        frames[1].image = lsb.hide(&frames[1].image, "-shard").unwrap();

        let recovery = DecodeOrchestrator::new(&config, &border, &lsb, &cipher).run(&frames);
        assert_eq!(recovery, Recovery::Raw("partial-shard".to_string()));
    }

    #[test]
    fn test_border_only() {
        let config = StegoConfig::default();
        let border = BorderCodec::new(&config);
        let lsb = LsbChannel::new(SequentialLsb);
        let cipher = AeadCipher::new(&KeyHandle::generate());
        let frames = border_frames("no lsb here", 4, &border);

        let recovery = DecodeOrchestrator::new(&config, &border, &lsb, &cipher).run(&frames);
        assert_eq!(recovery, Recovery::Border("no lsb here".to_string()));
    }

    #[test]
    fn test_nothing_found() {
        let config = StegoConfig::default();
        let border = BorderCodec::new(&config);
        let lsb = LsbChannel::new(SequentialLsb);
        let cipher = AeadCipher::new(&KeyHandle::generate());
        let frames: Vec<Frame> = (0..5)
            .map(|i| Frame::new(i, RgbImage::new(100, 100)))
            .collect();

        let recovery = DecodeOrchestrator::new(&config, &border, &lsb, &cipher).run(&frames);
        assert_eq!(recovery, Recovery::NotFound);
        assert!(!recovery.is_found());
        assert_eq!(recovery.text(), None);
    }
}
