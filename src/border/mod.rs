//! Border channel: the whole marked message painted into the top-left corner
//! of every frame.
//!
//! ## Layout
//!
//! The data corner is `corner_size x corner_size` pixels
//! (`corner_size = 2 * border_width`), one bit per pixel, row-major. Its
//! physical size is the canonical capacity: the perimeter-based budget is
//! larger for any realistic frame and is never used for writes.
//!
//! ## Redundancy
//!
//! Frame `i` reads the payload cyclically from a rotating start offset
//! `(i * window / 3) mod len`, aligned down to a byte, where
//! `window = min(len, capacity)`. Adjacent windows overlap by two thirds, and
//! when the payload fits the block it repeats, so a single intact frame holds
//! the marker followed by the whole message.
//!
//! ## Detection and decoding
//!
//! Decoding classifies each data pixel through a [`BitClassifier`] and runs
//! the bits through [`crate::bits::binary_to_text`]. Video-level extraction
//! samples evenly spaced frames, keeps those a [`BorderDetector`] accepts and
//! returns the longest fragment that follows the marker.

pub mod camouflage;
pub mod classify;
pub mod geometry;
pub mod palette;

use crate::bits::{binary_to_text, printable, text_to_binary};
use crate::config::StegoConfig;
use crate::error::Result;
use crate::frame::Frame;
use classify::{BitClassifier, BorderDetector, RedOverBlue};
use geometry::{Corner, CornerLayout};
use image::RgbImage;
use palette::BitPalette;
use rayon::prelude::*;
use tracing::{debug, info, warn};

pub const DEFAULT_BORDER_WIDTH: u32 = 20;
pub const DEFAULT_MARKER: &str = "STEGO:";

/// What the border channel recovered from a video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BorderExtraction {
    /// Longest fragment found after the marker.
    Marked(String),
    /// No marker anywhere; printable text of all detected frames, space-joined.
    Unmarked(String),
    /// No sampled frame passed the detector.
    NotFound,
}

impl BorderExtraction {
    /// The recovered text, if there is any.
    pub fn text(&self) -> Option<&str> {
        match self {
            BorderExtraction::Marked(t) | BorderExtraction::Unmarked(t) if !t.is_empty() => {
                Some(t.as_str())
            }
            _ => None,
        }
    }
}

pub struct BorderCodec {
    border_width: u32,
    sample_frames: usize,
    fragment_len: usize,
    marker: String,
    palette: BitPalette,
    classifier: Box<dyn BitClassifier>,
    detector: BorderDetector,
}

impl Default for BorderCodec {
    fn default() -> Self {
        Self::new(&StegoConfig::default())
    }
}

impl BorderCodec {
    pub fn new(config: &StegoConfig) -> Self {
        Self {
            border_width: config.border_width,
            sample_frames: config.sample_frames,
            fragment_len: config.fragment_len,
            marker: config.marker.clone(),
            palette: BitPalette::default(),
            classifier: Box::new(RedOverBlue::default()),
            detector: BorderDetector::default(),
        }
    }

    pub fn with_classifier(mut self, classifier: Box<dyn BitClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_detector(mut self, detector: BorderDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn marked_payload(&self, message: &str) -> String {
        format!("{}{}", self.marker, message)
    }

    pub fn layout(&self, image: &RgbImage) -> Result<CornerLayout> {
        CornerLayout::new(self.border_width, image.width(), image.height())
    }

    /// Paint `payload` (already marked) into frame `index` of `total`, then
    /// the camouflage corners and edges.
    pub fn create_data_border(
        &self,
        image: &mut RgbImage,
        payload: &str,
        index: usize,
        total: usize,
    ) -> Result<()> {
        let layout = self.layout(image)?;
        let bits: Vec<u8> = text_to_binary(payload)
            .bytes()
            .map(|b| u8::from(b == b'1'))
            .collect();

        if !bits.is_empty() {
            let capacity = layout.capacity_bits();
            let start = window_start(index, bits.len(), capacity);
            let data = layout.corner(Corner::TopLeft);
            for (p, (x, y)) in data.pixels().enumerate() {
                let bit = bits[(start + p) % bits.len()];
                let color = self.palette.color(bit, index, total, x, y);
                image.put_pixel(x, y, color);
            }
            if bits.len() > capacity {
                debug!(
                    "Frame {}: payload of {} bits exceeds the {}-bit corner, writing window at {}",
                    index,
                    bits.len(),
                    capacity,
                    start
                );
            }
        }

        camouflage::paint_corner_markers(image, &layout);
        camouflage::blend_edges(image, &layout, index as u64);
        Ok(())
    }

    /// Border-encode every frame with `marker + message`. Frames that are too
    /// small are left untouched. Returns how many frames were encoded.
    pub fn embed_all(&self, frames: &mut [Frame], message: &str) -> usize {
        let payload = self.marked_payload(message);
        let total = frames.len();
        let encoded = frames
            .par_iter_mut()
            .map(|frame| {
                match self.create_data_border(&mut frame.image, &payload, frame.index, total) {
                    Ok(()) => 1,
                    Err(e) => {
                        warn!("Frame {}: border skipped: {}", frame.index, e);
                        0
                    }
                }
            })
            .sum();
        info!("Border channel written to {}/{} frames", encoded, total);
        encoded
    }

    pub fn detect_border_in_frame(&self, image: &RgbImage) -> bool {
        let Ok(layout) = self.layout(image) else {
            return false;
        };
        self.detector.matching_rule(image, &layout).is_some()
    }

    /// Read the data corner back as printable text.
    pub fn decode_border_data(&self, image: &RgbImage) -> String {
        let Ok(layout) = self.layout(image) else {
            return String::new();
        };
        let bits: String = layout
            .corner(Corner::TopLeft)
            .pixels()
            .map(|(x, y)| {
                if self.classifier.bit(image.get_pixel(x, y)) == 1 { '1' } else { '0' }
            })
            .collect();
        binary_to_text(&bits)
    }

    /// Sample the video and recover the best border text.
    pub fn extract_border_data(&self, frames: &[Frame]) -> BorderExtraction {
        let samples = sample_indices(frames.len(), self.sample_frames);
        let decoded: Vec<(usize, String)> = samples
            .par_iter()
            .filter_map(|&i| {
                let frame = &frames[i];
                if self.detect_border_in_frame(&frame.image) {
                    Some((frame.index, self.decode_border_data(&frame.image)))
                } else {
                    debug!("Frame {}: no border detected", frame.index);
                    None
                }
            })
            .collect();

        if decoded.is_empty() {
            info!("Border channel: no data found in {} sampled frames", samples.len());
            return BorderExtraction::NotFound;
        }

        // Frames whose window starts on the marker rank first: in the others
        // a marker inside the message can pose as the start.
        let mut best: Option<((bool, usize), usize, String)> = None;
        for (idx, text) in &decoded {
            if let Some(fragment) = self.fragment_after_marker(text) {
                let rank = (text.starts_with(&self.marker), fragment.len());
                if best.as_ref().map_or(true, |(r, _, _)| rank > *r) {
                    best = Some((rank, *idx, fragment));
                }
            }
        }

        match best {
            Some((_, idx, fragment)) => {
                info!(
                    "Border channel: marker found, {} chars from frame {}",
                    fragment.len(),
                    idx
                );
                BorderExtraction::Marked(fragment)
            }
            None => {
                let joined = decoded
                    .iter()
                    .map(|(_, text)| printable(text))
                    .collect::<Vec<_>>()
                    .join(" ");
                info!(
                    "Border channel: {} frames detected but no marker, returning raw text",
                    decoded.len()
                );
                BorderExtraction::Unmarked(joined)
            }
        }
    }

    /// Text following the first marker, cut where the payload starts over
    /// and at `fragment_len` characters.
    fn fragment_after_marker(&self, text: &str) -> Option<String> {
        let pos = text.find(&self.marker)?;
        let rest = &text[pos + self.marker.len()..];
        let rest = &rest[..repetition_end(rest, &self.marker)];
        Some(printable(rest).chars().take(self.fragment_len).collect())
    }
}

/// Length of the first period of `rest`, the text after a marker.
///
/// A later marker only ends the period when everything after it repeats
/// `rest` from the start, so markers inside the message are kept. Without
/// such a marker the whole of `rest` is returned.
fn repetition_end(rest: &str, marker: &str) -> usize {
    rest.match_indices(marker)
        .map(|(next, _)| next)
        .find(|&next| {
            let again = &rest[next + marker.len()..];
            !again.is_empty() && rest.starts_with(again)
        })
        .unwrap_or(rest.len())
}

/// Byte-aligned start of frame `index`'s window into a payload of
/// `payload_bits` bits.
fn window_start(index: usize, payload_bits: usize, capacity: usize) -> usize {
    let window = payload_bits.min(capacity);
    let raw = (index * window / 3) % payload_bits;
    raw - raw % 8
}

/// Up to `samples` indices spread evenly over `0..count`, first and last included.
pub fn sample_indices(count: usize, samples: usize) -> Vec<usize> {
    if count == 0 || samples == 0 {
        return Vec::new();
    }
    if count <= samples {
        return (0..count).collect();
    }
    if samples == 1 {
        return vec![0];
    }
    let mut out: Vec<usize> = (0..samples)
        .map(|k| k * (count - 1) / (samples - 1))
        .collect();
    out.dedup();
    out
}
