// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The unit of work of the quad pipeline.

/// Number of pixels of a quad.
pub const QUAD_SIZE: usize = 4;
/// Maximum number of color buffers a quad carries colors for.
pub const MAX_COLOR_BUFS: usize = 8;

/// Mask bit of the top left pixel.
pub const MASK_TOP_LEFT: u8 = 0x1;
/// Mask bit of the top right pixel.
pub const MASK_TOP_RIGHT: u8 = 0x2;
/// Mask bit of the bottom left pixel.
pub const MASK_BOTTOM_LEFT: u8 = 0x4;
/// Mask bit of the bottom right pixel.
pub const MASK_BOTTOM_RIGHT: u8 = 0x8;
/// All four pixels.
pub const MASK_ALL: u8 = 0xf;

/// The kind of primitive a quad was rasterized from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuadPrim {
    /// A point.
    Point,
    /// A line.
    Line,
    /// A triangle.
    Triangle,
}

/// Which side of a primitive faces the viewer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Face {
    /// The front side.
    #[default]
    Front,
    /// The back side.
    Back,
}

/// Colors of the four pixels of a quad, one row per channel.
///
/// `color[c][j]` is channel `c` (RGBA) of pixel `j`.
pub type QuadColor = [[f32; QUAD_SIZE]; 4];

/// A 2x2 block of pixels in flight through the quad pipeline.
///
/// Pixel `j` sits at `(x0 + (j & 1), y0 + (j >> 1))` and is live while bit `j` of `mask`
/// is set.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadHeader {
    /// Left column, always even.
    pub x0: u16,
    /// Top row, always even.
    pub y0: u16,
    /// Live pixel mask.
    pub mask: u8,
    /// Primitive kind the quad was rasterized from.
    pub prim: QuadPrim,
    /// Facing of the primitive.
    pub facing: Face,
    /// Per-pixel window depth in `[0, 1]`.
    pub depth: [f32; QUAD_SIZE],
    /// Per-pixel colors, one set per color buffer.
    pub colors: [QuadColor; MAX_COLOR_BUFS],
}

impl QuadHeader {
    /// A quad at `(x0, y0)` with all bits of `mask` live and zeroed attributes.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if the origin is not even.
    pub fn new(x0: u16, y0: u16, mask: u8, prim: QuadPrim) -> Self {
        debug_assert!(x0 % 2 == 0 && y0 % 2 == 0, "quad origin ({x0}, {y0}) is not even");
        Self {
            x0,
            y0,
            mask,
            prim,
            facing: Face::Front,
            depth: [0.0; QUAD_SIZE],
            colors: [[[0.0; QUAD_SIZE]; 4]; MAX_COLOR_BUFS],
        }
    }

    /// The window position of pixel `j`.
    #[inline]
    pub fn pixel(&self, j: usize) -> (u16, u16) {
        debug_assert!(j < QUAD_SIZE, "pixel {j} out of range");
        #[expect(clippy::cast_possible_truncation, reason = "j is below 4")]
        let (dx, dy) = ((j & 1) as u16, (j >> 1) as u16);
        (self.x0 + dx, self.y0 + dy)
    }

    /// Whether pixel `j` is live.
    #[inline]
    pub fn is_live(&self, j: usize) -> bool {
        self.mask & (1 << j) != 0
    }

    /// Set the color of pixel `j` of color buffer `cbuf`.
    pub fn set_color(&mut self, cbuf: usize, j: usize, rgba: [f32; 4]) {
        for (c, v) in rgba.into_iter().enumerate() {
            self.colors[cbuf][c][j] = v;
        }
    }

    /// The color of pixel `j` of color buffer `cbuf`.
    pub fn color(&self, cbuf: usize, j: usize) -> [f32; 4] {
        core::array::from_fn(|c| self.colors[cbuf][c][j])
    }
}
