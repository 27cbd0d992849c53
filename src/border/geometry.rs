//! Corner and edge regions of a frame used by the border channel.
//!
//! Each corner is a `corner_size x corner_size` square with
//! `corner_size = 2 * border_width`; the edge strips are `border_width` deep
//! and run between the corners.

use crate::error::{Result, StegoError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Absolute coordinates, row-major.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (self.y..self.y + self.height)
            .flat_map(move |y| (self.x..self.x + self.width).map(move |x| (x, y)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CornerLayout {
    pub border_width: u32,
    pub corner_size: u32,
    pub width: u32,
    pub height: u32,
}

impl CornerLayout {
    /// Layout for a `width x height` frame. All four corners must fit without
    /// overlapping.
    pub fn new(border_width: u32, width: u32, height: u32) -> Result<Self> {
        let (Some(corner_size), Some(min)) = (border_width.checked_mul(2), border_width.checked_mul(4))
        else {
            return Err(StegoError::FrameTooSmall { width, height, min: u32::MAX });
        };
        if border_width == 0 || width < min || height < min {
            return Err(StegoError::FrameTooSmall { width, height, min });
        }
        Ok(Self {
            border_width,
            corner_size,
            width,
            height,
        })
    }

    /// Bits the data corner physically holds, one per pixel.
    pub fn capacity_bits(&self) -> usize {
        self.corner_size as usize * self.corner_size as usize
    }

    /// Perimeter-based budget `(2(w+h) - 4 * border_width) / 2`.
    ///
    /// Larger than [`CornerLayout::capacity_bits`] for most frames; kept only
    /// for reporting, writes are clamped to the physical block.
    pub fn nominal_bits(&self) -> usize {
        let perimeter = 2 * (self.width as usize + self.height as usize);
        perimeter.saturating_sub(4 * self.border_width as usize) / 2
    }

    pub fn corner(&self, corner: Corner) -> Rect {
        let cs = self.corner_size;
        let (x, y) = match corner {
            Corner::TopLeft => (0, 0),
            Corner::TopRight => (self.width - cs, 0),
            Corner::BottomLeft => (0, self.height - cs),
            Corner::BottomRight => (self.width - cs, self.height - cs),
        };
        Rect {
            x,
            y,
            width: cs,
            height: cs,
        }
    }

    /// Top, bottom, left and right strips, excluding the corner squares.
    pub fn edge_strips(&self) -> [Rect; 4] {
        let (bw, cs, w, h) = (self.border_width, self.corner_size, self.width, self.height);
        [
            Rect { x: cs, y: 0, width: w - 2 * cs, height: bw },
            Rect { x: cs, y: h - bw, width: w - 2 * cs, height: bw },
            Rect { x: 0, y: cs, width: bw, height: h - 2 * cs },
            Rect { x: w - bw, y: cs, width: bw, height: h - 2 * cs },
        ]
    }
}
