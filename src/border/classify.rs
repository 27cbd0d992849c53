//! Pluggable heuristics for reading the border channel.
//!
//! [`BitClassifier`] turns one data-corner pixel into a bit; [`BorderRule`]
//! votes on whether a frame carries the border at all. Each rule can be
//! exercised on its own and [`BorderDetector`] accepts a frame as soon as any
//! rule matches.

use super::geometry::{Corner, CornerLayout, Rect};
use image::{Rgb, RgbImage};

pub trait BitClassifier: Send + Sync {
    fn bit(&self, pixel: &Rgb<u8>) -> u8;
}

/// `1` when red exceeds blue by more than `margin`.
#[derive(Debug, Clone, Copy)]
pub struct RedOverBlue {
    pub margin: i16,
}

impl Default for RedOverBlue {
    fn default() -> Self {
        Self { margin: 20 }
    }
}

impl BitClassifier for RedOverBlue {
    fn bit(&self, pixel: &Rgb<u8>) -> u8 {
        u8::from(pixel[0] as i16 - pixel[2] as i16 > self.margin)
    }
}

pub trait BorderRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn matches(&self, image: &RgbImage, layout: &CornerLayout) -> bool;
}

/// Per-channel mean and population standard deviation over a region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelStats {
    pub mean: [f64; 3],
    pub std: [f64; 3],
}

impl ChannelStats {
    pub fn of_region(image: &RgbImage, rect: Rect) -> Self {
        let n = rect.area().max(1) as f64;
        let mut sum = [0f64; 3];
        let mut sum_sq = [0f64; 3];
        for (x, y) in rect.pixels() {
            let px = image.get_pixel(x, y);
            for c in 0..3 {
                let v = px[c] as f64;
                sum[c] += v;
                sum_sq[c] += v * v;
            }
        }
        let mut mean = [0f64; 3];
        let mut std = [0f64; 3];
        for c in 0..3 {
            mean[c] = sum[c] / n;
            std[c] = (sum_sq[c] / n - mean[c] * mean[c]).max(0.0).sqrt();
        }
        Self { mean, std }
    }

    pub fn mean_std(&self) -> f64 {
        self.std.iter().sum::<f64>() / 3.0
    }
}

/// Top-left corner is busy and at least one channel is bright.
#[derive(Debug, Clone, Copy)]
pub struct BusyDataCorner {
    pub min_mean_std: f64,
    pub min_channel_mean: f64,
}

impl Default for BusyDataCorner {
    fn default() -> Self {
        Self {
            min_mean_std: 50.0,
            min_channel_mean: 100.0,
        }
    }
}

impl BorderRule for BusyDataCorner {
    fn name(&self) -> &'static str {
        "busy-data-corner"
    }

    fn matches(&self, image: &RgbImage, layout: &CornerLayout) -> bool {
        let stats = ChannelStats::of_region(image, layout.corner(Corner::TopLeft));
        stats.mean_std() > self.min_mean_std
            && stats.mean.iter().any(|&m| m > self.min_channel_mean)
    }
}

/// Top-right corner is dominated by green.
#[derive(Debug, Clone, Copy)]
pub struct GreenMarkerCorner {
    pub margin: f64,
}

impl Default for GreenMarkerCorner {
    fn default() -> Self {
        Self { margin: 30.0 }
    }
}

impl BorderRule for GreenMarkerCorner {
    fn name(&self) -> &'static str {
        "green-marker-corner"
    }

    fn matches(&self, image: &RgbImage, layout: &CornerLayout) -> bool {
        let [r, g, b] = ChannelStats::of_region(image, layout.corner(Corner::TopRight)).mean;
        g - r > self.margin && g - b > self.margin
    }
}

pub struct BorderDetector {
    rules: Vec<Box<dyn BorderRule>>,
}

impl Default for BorderDetector {
    fn default() -> Self {
        Self::new(vec![
            Box::new(BusyDataCorner::default()),
            Box::new(GreenMarkerCorner::default()),
        ])
    }
}

impl BorderDetector {
    pub fn new(rules: Vec<Box<dyn BorderRule>>) -> Self {
        Self { rules }
    }

    /// Name of the first matching rule, if any.
    pub fn matching_rule(&self, image: &RgbImage, layout: &CornerLayout) -> Option<&'static str> {
        self.rules
            .iter()
            .find(|rule| rule.matches(image, layout))
            .map(|rule| rule.name())
    }
}
