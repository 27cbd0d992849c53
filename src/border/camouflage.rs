//! Decorations that carry no payload.
//!
//! Three corners get static markers, the top-right one green so that
//! [`super::classify::GreenMarkerCorner`] can spot an encoded frame. The edge
//! strips get a seeded random pattern blended over the original pixels.

use super::geometry::{Corner, CornerLayout, Rect};
use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const EDGE_ALPHA: f32 = 0.6;

const HATCH_FILL: Rgb<u8> = Rgb([34, 177, 76]);
const HATCH_LINE: Rgb<u8> = Rgb([18, 120, 44]);
const CIRCLE_FILL: Rgb<u8> = Rgb([142, 68, 173]);
const CIRCLE_LINE: Rgb<u8> = Rgb([236, 240, 241]);
const SQUARE_FILL: Rgb<u8> = Rgb([241, 196, 15]);
const SQUARE_LINE: Rgb<u8> = Rgb([44, 62, 80]);

/// Paint the top-right, bottom-left and bottom-right markers.
pub fn paint_corner_markers(image: &mut RgbImage, layout: &CornerLayout) {
    let cs = layout.corner_size as i64;

    // diagonal hatching
    fill(image, layout.corner(Corner::TopRight), |dx, dy| {
        if (dx + dy) % 6 < 2 { HATCH_LINE } else { HATCH_FILL }
    });

    // ring centred in the block
    let center = cs / 2;
    let radius = cs / 3;
    fill(image, layout.corner(Corner::BottomLeft), |dx, dy| {
        let (ddx, ddy) = (dx - center, dy - center);
        let d2 = ddx * ddx + ddy * ddy;
        if (d2 - radius * radius).abs() <= radius { CIRCLE_LINE } else { CIRCLE_FILL }
    });

    // outline plus an inset square
    let inset = cs / 4;
    fill(image, layout.corner(Corner::BottomRight), |dx, dy| {
        let on_ring = |lo: i64, hi: i64| {
            let inside = dx >= lo && dx <= hi && dy >= lo && dy <= hi;
            let edge = dx == lo || dx == hi || dy == lo || dy == hi;
            inside && edge
        };
        if on_ring(0, cs - 1) || on_ring(inset, cs - 1 - inset) {
            SQUARE_LINE
        } else {
            SQUARE_FILL
        }
    });
}

/// Blend a random colour pattern over the edge strips. `seed` makes the
/// pattern reproducible per frame.
pub fn blend_edges(image: &mut RgbImage, layout: &CornerLayout, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for strip in layout.edge_strips() {
        for (x, y) in strip.pixels() {
            let overlay = Rgb([rng.gen::<u8>(), rng.gen::<u8>(), rng.gen::<u8>()]);
            let px = image.get_pixel_mut(x, y);
            for c in 0..3 {
                let blended = EDGE_ALPHA * overlay[c] as f32 + (1.0 - EDGE_ALPHA) * px[c] as f32;
                px[c] = blended.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

fn fill(image: &mut RgbImage, rect: Rect, color_at: impl Fn(i64, i64) -> Rgb<u8>) {
    for (x, y) in rect.pixels() {
        let dx = (x - rect.x) as i64;
        let dy = (y - rect.y) as i64;
        image.put_pixel(x, y, color_at(dx, dy));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::border::classify::{BorderRule, ChannelStats, GreenMarkerCorner};

    #[test]
    fn test_markers_leave_data_corner_alone() {
        let layout = CornerLayout::new(10, 80, 60).unwrap();
        let mut img = RgbImage::from_pixel(80, 60, Rgb([1, 2, 3]));
        paint_corner_markers(&mut img, &layout);
        blend_edges(&mut img, &layout, 7);

        for (x, y) in layout.corner(Corner::TopLeft).pixels() {
            assert_eq!(*img.get_pixel(x, y), Rgb([1, 2, 3]));
        }
        assert!(GreenMarkerCorner::default().matches(&img, &layout));
    }

    #[test]
    fn test_markers_are_distinct() {
        let layout = CornerLayout::new(10, 80, 80).unwrap();
        let mut img = RgbImage::new(80, 80);
        paint_corner_markers(&mut img, &layout);
        let means: Vec<[f64; 3]> = [Corner::TopRight, Corner::BottomLeft, Corner::BottomRight]
            .iter()
            .map(|&c| ChannelStats::of_region(&img, layout.corner(c)).mean)
            .collect();
        assert_ne!(means[0], means[1]);
        assert_ne!(means[1], means[2]);
        assert_eq!(*img.get_pixel(60, 60), SQUARE_LINE);
    }

    #[test]
    fn test_edge_blend_is_seeded() {
        let layout = CornerLayout::new(10, 80, 80).unwrap();
        let base = RgbImage::from_pixel(80, 80, Rgb([100, 100, 100]));
        let (mut a, mut b, mut c) = (base.clone(), base.clone(), base.clone());
        blend_edges(&mut a, &layout, 1);
        blend_edges(&mut b, &layout, 1);
        blend_edges(&mut c, &layout, 2);
        assert_eq!(a, b);
        assert_ne!(a, c);
        // interior untouched
        assert_eq!(*a.get_pixel(40, 40), Rgb([100, 100, 100]));
        assert_ne!(a, base);
    }
}
