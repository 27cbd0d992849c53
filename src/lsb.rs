//! LSB text channel: the hide/reveal primitive and the shard adapter on top of it.
//!
//! The primitive writes one bit into the least-significant bit of each colour
//! channel, walking pixels row-major and channels R, G, B. Its stream is a
//! 16-bit magic, a 32-bit big-endian byte length, then the UTF-8 bytes.

use crate::bits::{bits_to_bytes, bytes_to_bits};
use crate::error::{Result, StegoError};
use crate::frame::{Frame, FrameRead};
use crate::shard::ShardPlan;
use image::RgbImage;
use rayon::prelude::*;
use tracing::debug;

const MAGIC: [u8; 2] = *b"SF";
const HEADER_BITS: usize = (MAGIC.len() + 4) * 8;

/// Per-image text hiding. `hide` must round-trip through `reveal` for any
/// image that is not modified afterwards.
pub trait LsbPrimitive: Send + Sync {
    fn hide(&self, image: &RgbImage, text: &str) -> Result<RgbImage>;
    fn reveal(&self, image: &RgbImage) -> FrameRead;
}

/// Sequential LSB primitive using ±1 matching instead of plain replacement.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialLsb;

impl SequentialLsb {
    /// Number of text bytes an image of this size can carry.
    pub fn capacity_bytes(width: u32, height: u32) -> usize {
        let bits = width as usize * height as usize * 3;
        bits.saturating_sub(HEADER_BITS) / 8
    }
}

impl LsbPrimitive for SequentialLsb {
    fn hide(&self, image: &RgbImage, text: &str) -> Result<RgbImage> {
        let len = u32::try_from(text.len()).map_err(|_| StegoError::CapacityExceeded {
            needed: text.len().saturating_mul(8),
            available: u32::MAX as usize,
        })?;

        let mut stream = Vec::with_capacity(MAGIC.len() + 4 + text.len());
        stream.extend_from_slice(&MAGIC);
        stream.extend_from_slice(&len.to_be_bytes());
        stream.extend_from_slice(text.as_bytes());
        let bits = bytes_to_bits(&stream);

        let mut out = image.clone();
        let available = out.as_raw().len();
        if bits.len() > available {
            return Err(StegoError::CapacityExceeded {
                needed: bits.len(),
                available,
            });
        }

        // RgbImage stores samples row-major as R, G, B which is exactly the walk order.
        let samples: &mut [u8] = &mut out;
        for (pos, (&bit, sample)) in bits.iter().zip(samples.iter_mut()).enumerate() {
            *sample = embed_bit_lsb_match_with_dir(*sample, bit, sign_up_for_pos(pos));
        }
        Ok(out)
    }

    fn reveal(&self, image: &RgbImage) -> FrameRead {
        let samples = image.as_raw();
        if samples.len() < HEADER_BITS {
            return FrameRead::Empty;
        }

        let header = read_bytes(samples, 0, MAGIC.len() + 4);
        if header[..MAGIC.len()] != MAGIC {
            return FrameRead::Empty;
        }
        let len = u32::from_be_bytes([header[2], header[3], header[4], header[5]]) as usize;
        if len == 0 {
            return FrameRead::Empty;
        }
        if HEADER_BITS + len * 8 > samples.len() {
            return FrameRead::Failed(format!("declared length {} exceeds capacity", len));
        }

        let body = read_bytes(samples, HEADER_BITS, len);
        match String::from_utf8(body) {
            Ok(text) => FrameRead::Payload(text),
            Err(_) => FrameRead::Failed("payload is not valid UTF-8".to_string()),
        }
    }
}

fn read_bytes(samples: &[u8], bit_offset: usize, count: usize) -> Vec<u8> {
    let bits: Vec<u8> = samples[bit_offset..bit_offset + count * 8]
        .iter()
        .map(|s| s & 1)
        .collect();
    bits_to_bytes(&bits)
}

/// Direction of the ±1 step for a sample position, fixed per position so the
/// result is reproducible.
fn sign_up_for_pos(pos: usize) -> bool {
    (pos as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 63 == 1
}

/// LSB embedding with ±1 matching.
///
/// When the LSB needs to change the sample moves one step up or down instead
/// of having its low bit overwritten, staying inside `0..=255`.
fn embed_bit_lsb_match_with_dir(value: u8, bit: u8, sign_up: bool) -> u8 {
    if (value & 1) == bit {
        return value;
    }
    match (sign_up, value) {
        (true, 255) => 254,
        (true, v) => v + 1,
        (false, 0) => 1,
        (false, v) => v - 1,
    }
}

/// Places ciphertext shards into frames through an [`LsbPrimitive`].
#[derive(Debug, Clone, Default)]
pub struct LsbChannel<P = SequentialLsb> {
    primitive: P,
}

impl<P: LsbPrimitive> LsbChannel<P> {
    pub fn new(primitive: P) -> Self {
        Self { primitive }
    }

    pub fn primitive(&self) -> &P {
        &self.primitive
    }

    /// Hide shard `i` in frame `i` for every placement in `plan`.
    ///
    /// Returns the indices that received a shard, in ascending order.
    pub fn write_shards(&self, frames: &mut [Frame], plan: &ShardPlan) -> Result<Vec<usize>> {
        let count = plan.placements.len().min(frames.len());
        frames[..count]
            .par_iter_mut()
            .zip(plan.placements[..count].par_iter())
            .try_for_each(|(frame, (idx, text))| {
                debug_assert_eq!(frame.index, *idx);
                frame.image = self.primitive.hide(&frame.image, text)?;
                Ok::<(), StegoError>(())
            })?;
        Ok(plan.placements[..count].iter().map(|(idx, _)| *idx).collect())
    }

    pub fn reveal_frame(&self, frame: &Frame) -> FrameRead {
        let read = self.primitive.reveal(&frame.image);
        match &read {
            FrameRead::Payload(text) => debug!("Frame {}: LSB payload of {} bytes", frame.index, text.len()),
            FrameRead::Empty => debug!("Frame {}: no LSB payload", frame.index),
            FrameRead::Failed(reason) => debug!("Frame {}: LSB read failed: {}", frame.index, reason),
        }
        read
    }

    pub fn hide(&self, image: &RgbImage, text: &str) -> Result<RgbImage> {
        self.primitive.hide(image, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shard::split_shards;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7) as u8, (y * 5) as u8, ((x + y) * 3) as u8])
        })
    }

    #[test]
    fn test_hide_reveal_roundtrip() {
        let img = gradient(32, 32);
        let hidden = SequentialLsb.hide(&img, "c2VjcmV0IGNpcGhlcnRleHQ=").unwrap();
        assert_eq!(
            SequentialLsb.reveal(&hidden),
            FrameRead::Payload("c2VjcmV0IGNpcGhlcnRleHQ=".to_string())
        );
    }

    #[test]
    fn test_hide_handles_saturated_pixels() {
        for fill in [0u8, 255] {
            let img = RgbImage::from_pixel(16, 16, Rgb([fill, fill, fill]));
            let hidden = SequentialLsb.hide(&img, "edge values").unwrap();
            assert_eq!(SequentialLsb.reveal(&hidden).payload().as_deref(), Some("edge values"));
            for (a, b) in img.as_raw().iter().zip(hidden.as_raw()) {
                assert!((*a as i16 - *b as i16).abs() <= 1);
            }
        }
    }

    #[test]
    fn test_unmarked_image_is_empty() {
        let img = gradient(32, 32);
        assert_eq!(SequentialLsb.reveal(&img), FrameRead::Empty);
        assert_eq!(SequentialLsb.reveal(&RgbImage::new(2, 2)), FrameRead::Empty);
    }

    #[test]
    fn test_capacity_exceeded() {
        let img = gradient(4, 4); // 48 sample bits, header alone fills it
        let err = SequentialLsb.hide(&img, "x").unwrap_err();
        assert!(matches!(err, StegoError::CapacityExceeded { .. }));
        assert_eq!(SequentialLsb::capacity_bytes(4, 4), 0);
        assert_eq!(SequentialLsb::capacity_bytes(10, 10), 31);
    }

    #[test]
    fn test_modified_image_fails_or_differs() {
        let img = gradient(32, 32);
        let mut hidden = SequentialLsb.hide(&img, "fragile").unwrap();
        // Flip the low bit of the first body sample, like a lossy re-encode would.
        let samples: &mut [u8] = &mut hidden;
        samples[HEADER_BITS + 1] ^= 1;
        assert_ne!(SequentialLsb.reveal(&hidden).payload().as_deref(), Some("fragile"));
    }

    #[test]
    fn test_write_shards_places_in_order() {
        let mut frames: Vec<Frame> = (0..3).map(|i| Frame::new(i, gradient(24, 24))).collect();
        let plan = ShardPlan::assign(split_shards("abcdefgh", 4), frames.len());
        let channel = LsbChannel::new(SequentialLsb);

        let written = channel.write_shards(&mut frames, &plan).unwrap();
        assert_eq!(written, vec![0, 1, 2]);
        assert_eq!(channel.reveal_frame(&frames[0]).payload().as_deref(), Some("ab"));
        assert_eq!(channel.reveal_frame(&frames[2]).payload().as_deref(), Some("ef"));
    }
}
