//! Bit colours for the data corner.
//!
//! A `1` is painted from a bright orange/red band and a `0` from a dark
//! blue/purple band. Both bands rotate with the frame's position in the video
//! by at most `hue_swing` degrees, so neighbouring frames never share exact
//! colours while staying on the right side of the red-vs-blue classifier.

use image::Rgb;

const ONE_HUE: f32 = 15.0;
const ONE_SATURATION: f32 = 0.9;
const ONE_VALUE: f32 = 0.95;

const ZERO_HUE: f32 = 250.0;
const ZERO_SATURATION: f32 = 0.8;
const ZERO_VALUE: f32 = 0.55;

#[derive(Debug, Clone, Copy)]
pub struct BitPalette {
    pub hue_swing: f32,
}

impl Default for BitPalette {
    fn default() -> Self {
        Self { hue_swing: 20.0 }
    }
}

impl BitPalette {
    /// Colour for `bit` in frame `index` of `total`, with a small per-pixel
    /// brightness wobble keyed on `(x, y)`.
    pub fn color(&self, bit: u8, index: usize, total: usize, x: u32, y: u32) -> Rgb<u8> {
        let shift = index as f32 / total.max(1) as f32 * self.hue_swing;
        let wobble = ((x * 7 + y * 13) % 5) as f32 * 0.02 - 0.04;
        if bit == 1 {
            hsv_to_rgb(ONE_HUE + shift, ONE_SATURATION, ONE_VALUE + wobble)
        } else {
            hsv_to_rgb(ZERO_HUE + shift, ZERO_SATURATION, ZERO_VALUE + wobble)
        }
    }
}

/// Hue in degrees, saturation and value in `[0, 1]`.
pub fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> Rgb<u8> {
    let h = hue.rem_euclid(360.0) / 60.0;
    let s = saturation.clamp(0.0, 1.0);
    let v = value.clamp(0.0, 1.0);
    let sector = h.floor();
    let f = h - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match sector as u8 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    Rgb([to_byte(r), to_byte(g), to_byte(b)])
}

fn to_byte(c: f32) -> u8 {
    (c * 255.0).round().clamp(0.0, 255.0) as u8
}
