// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render target storage.

use crate::format::{DepthStencilFormat, FormatDesc};

/// Pixel storage that the [`TileCache`](crate::tile_cache::TileCache) reads and writes.
pub trait Surface {
    /// The in-cache representation of one pixel.
    type Texel: Copy + Default + core::fmt::Debug + PartialEq;

    /// Width of the surface in pixels.
    fn width(&self) -> u16;
    /// Height of the surface in pixels.
    fn height(&self) -> u16;
    /// Read the pixel at `(x, y)`.
    fn read(&self, x: u16, y: u16) -> Self::Texel;
    /// Write the pixel at `(x, y)`.
    fn write(&mut self, x: u16, y: u16, texel: Self::Texel);
}

/// An RGBA8 unorm render target.
///
/// In the tile cache, pixels are unpacked to `[r, g, b, a]` floats in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct ColorSurface {
    width: u16,
    height: u16,
    buf: Vec<[u8; 4]>,
}

impl ColorSurface {
    /// Create a new surface with all pixels transparent black.
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            buf: vec![[0; 4]; usize::from(width) * usize::from(height)],
        }
    }

    /// The RGBA8 value of the pixel at `(x, y)`.
    pub fn pixel(&self, x: u16, y: u16) -> [u8; 4] {
        self.buf[self.offset(x, y)]
    }

    /// The pixels in row-major order, as RGBA8 bytes.
    pub fn data_as_u8_slice(&self) -> &[u8] {
        self.buf.as_flattened()
    }

    fn offset(&self, x: u16, y: u16) -> usize {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside of {}x{} surface",
            self.width,
            self.height
        );
        usize::from(y) * usize::from(self.width) + usize::from(x)
    }
}

/// Convert a color channel to an 8-bit unorm value, rounding to nearest.
#[inline]
#[expect(
    clippy::cast_possible_truncation,
    reason = "the value is clamped to [0, 255.5) before the cast"
)]
pub fn float_to_unorm8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

/// Convert an 8-bit unorm value to a color channel in `[0, 1]`.
#[inline]
pub fn unorm8_to_float(v: u8) -> f32 {
    f32::from(v) / 255.0
}

impl Surface for ColorSurface {
    type Texel = [f32; 4];

    fn width(&self) -> u16 {
        self.width
    }

    fn height(&self) -> u16 {
        self.height
    }

    fn read(&self, x: u16, y: u16) -> [f32; 4] {
        self.pixel(x, y).map(unorm8_to_float)
    }

    fn write(&mut self, x: u16, y: u16, texel: [f32; 4]) {
        let offset = self.offset(x, y);
        self.buf[offset] = texel.map(float_to_unorm8);
    }
}

/// A depth and/or stencil render target.
///
/// Pixels are stored as little-endian packed words in the layout of the surface's
/// [`DepthStencilFormat`]. In the tile cache, each pixel is the whole storage word widened
/// to a `u64`, so padding bits survive a load/store round trip.
#[derive(Debug, Clone)]
pub struct DepthStencilSurface {
    format: DepthStencilFormat,
    desc: FormatDesc,
    width: u16,
    height: u16,
    buf: Vec<u8>,
}

impl DepthStencilSurface {
    /// Create a new surface with all bits zero.
    pub fn new(format: DepthStencilFormat, width: u16, height: u16) -> Self {
        let desc = format.description();
        desc.validate();
        Self {
            format,
            desc,
            width,
            height,
            buf: vec![0; usize::from(width) * usize::from(height) * desc.bytes()],
        }
    }

    /// The format of the surface.
    pub fn format(&self) -> DepthStencilFormat {
        self.format
    }

    /// The bit layout of the surface format.
    pub fn description(&self) -> &FormatDesc {
        &self.desc
    }

    /// The raw depth and stencil fields of the pixel at `(x, y)`.
    pub fn depth_stencil(&self, x: u16, y: u16) -> (u32, u8) {
        self.desc.unpack(self.read(x, y))
    }

    /// The packed pixels in row-major order.
    pub fn data(&self) -> &[u8] {
        &self.buf
    }

    fn range(&self, x: u16, y: u16) -> core::ops::Range<usize> {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside of {}x{} surface",
            self.width,
            self.height
        );
        let bytes = self.desc.bytes();
        let start = (usize::from(y) * usize::from(self.width) + usize::from(x)) * bytes;
        start..start + bytes
    }
}

impl Surface for DepthStencilSurface {
    type Texel = u64;

    fn width(&self) -> u16 {
        self.width
    }

    fn height(&self) -> u16 {
        self.height
    }

    fn read(&self, x: u16, y: u16) -> u64 {
        let range = self.range(x, y);
        let mut word = [0_u8; 8];
        word[..range.len()].copy_from_slice(&self.buf[range]);
        u64::from_le_bytes(word)
    }

    fn write(&mut self, x: u16, y: u16, texel: u64) {
        let range = self.range(x, y);
        let len = range.len();
        self.buf[range].copy_from_slice(&texel.to_le_bytes()[..len]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_round_trip_rounds_to_nearest() {
        let mut surface = ColorSurface::new(4, 2);
        surface.write(3, 1, [1.0, 0.5, 0.0, 2.0]);
        assert_eq!(surface.pixel(3, 1), [255, 128, 0, 255]);
        assert_eq!(surface.read(3, 1)[0], 1.0);
        assert_eq!(surface.data_as_u8_slice().len(), 4 * 2 * 4);
    }

    #[test]
    fn depth_words_are_little_endian() {
        let mut surface = DepthStencilSurface::new(DepthStencilFormat::Z24UnormS8Uint, 2, 2);
        surface.write(1, 0, 0x0102_0304);
        assert_eq!(&surface.data()[4..8], &[4, 3, 2, 1]);
        assert_eq!(surface.depth_stencil(1, 0), (0x0002_0304, 0x01));
    }

    #[test]
    fn narrow_formats_store_only_their_bytes() {
        let mut surface = DepthStencilSurface::new(DepthStencilFormat::S8Uint, 3, 1);
        surface.write(1, 0, 0x1ff);
        assert_eq!(surface.data(), &[0, 0xff, 0]);
        assert_eq!(surface.read(1, 0), 0xff);
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn out_of_bounds_access_panics() {
        let surface = ColorSurface::new(2, 2);
        surface.pixel(2, 0);
    }
}
