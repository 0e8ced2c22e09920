// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use super::{run_live, QuadStage};
use crate::framebuffer::Framebuffer;
use crate::quad::{
    QuadHeader, QuadPrim, MASK_BOTTOM_LEFT, MASK_BOTTOM_RIGHT, MASK_TOP_LEFT, MASK_TOP_RIGHT,
};
use crate::state::PolyStipple;

/// Applies the polygon stipple pattern to quads of triangles.
#[derive(Debug)]
pub struct Stipple {
    pattern: PolyStipple,
    next: Box<dyn QuadStage>,
}

impl Stipple {
    /// Create the stage in front of `next`.
    pub fn new(pattern: &PolyStipple, next: Box<dyn QuadStage>) -> Self {
        Self {
            pattern: *pattern,
            next,
        }
    }

    fn stipple_quad(&self, quad: &mut QuadHeader) {
        let col = u32::from(quad.x0 % 32);
        // x0 is even, so both columns sit in the same 32 bit row.
        let left = 0x8000_0000_u32 >> col;
        let right = 0x4000_0000_u32 >> col;
        let row0 = self.pattern.rows[usize::from(quad.y0 % 32)];
        let row1 = self.pattern.rows[usize::from((quad.y0 + 1) % 32)];

        let mut mask = quad.mask;
        if row0 & left == 0 {
            mask &= !MASK_TOP_LEFT;
        }
        if row0 & right == 0 {
            mask &= !MASK_TOP_RIGHT;
        }
        if row1 & left == 0 {
            mask &= !MASK_BOTTOM_LEFT;
        }
        if row1 & right == 0 {
            mask &= !MASK_BOTTOM_RIGHT;
        }
        quad.mask = mask;
    }
}

impl QuadStage for Stipple {
    fn begin(&mut self, fb: &Framebuffer) {
        self.next.begin(fb);
    }

    fn run(&mut self, fb: &mut Framebuffer, quads: &mut [&mut QuadHeader]) {
        for quad in quads.iter_mut() {
            if quad.prim == QuadPrim::Triangle {
                self.stipple_quad(quad);
            }
        }
        run_live(self.next.as_mut(), fb, quads);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quad::MASK_ALL;
    use crate::stage::Output;

    fn stipple(rows: [u32; 32]) -> Stipple {
        Stipple::new(&PolyStipple { rows }, Box::new(Output::new()))
    }

    #[test]
    fn clears_pixels_with_zero_bits() {
        let mut rows = [0_u32; 32];
        // Columns 4 and 5 of row 6, column 5 of row 7.
        rows[6] = 0x0c00_0000;
        rows[7] = 0x0400_0000;
        let stage = stipple(rows);
        let mut quad = QuadHeader::new(4, 6, MASK_ALL, QuadPrim::Triangle);
        stage.stipple_quad(&mut quad);
        assert_eq!(quad.mask, MASK_TOP_LEFT | MASK_TOP_RIGHT | MASK_BOTTOM_RIGHT);
    }

    #[test]
    fn pattern_repeats_every_32_pixels() {
        let mut rows = [0_u32; 32];
        rows[0] = 0x8000_0000;
        let stage = stipple(rows);
        let mut quad = QuadHeader::new(64, 32, MASK_ALL, QuadPrim::Triangle);
        stage.stipple_quad(&mut quad);
        assert_eq!(quad.mask, MASK_TOP_LEFT);
    }

    #[test]
    fn fully_stippled_quads_are_dropped() {
        let mut fb = Framebuffer::default();
        fb.set_color_buffers(vec![crate::surface::ColorSurface::new(4, 2)]);
        let mut rows = [0_u32; 32];
        rows[0] = 0xc000_0000;
        rows[1] = 0xc000_0000;
        let mut stage = stipple(rows);
        stage.begin(&fb);

        let mut kept = QuadHeader::new(0, 0, MASK_ALL, QuadPrim::Triangle);
        kept.set_color(0, 0, [1.0; 4]);
        let mut dropped = QuadHeader::new(2, 0, MASK_ALL, QuadPrim::Triangle);
        dropped.set_color(0, 0, [1.0; 4]);
        stage.run(&mut fb, &mut [&mut dropped, &mut kept]);
        assert_eq!(dropped.mask, 0);
        assert_eq!(kept.mask, MASK_ALL);

        fb.flush();
        let surface = fb.color(0).unwrap().surface();
        assert_eq!(surface.pixel(0, 0), [255; 4]);
        assert_eq!(surface.pixel(2, 0), [0; 4]);
    }

    #[test]
    fn lines_and_points_are_not_stippled() {
        let mut fb = Framebuffer::default();
        let mut stage = stipple([0; 32]);
        let mut line = QuadHeader::new(0, 0, MASK_ALL, QuadPrim::Line);
        let mut point = QuadHeader::new(2, 0, MASK_TOP_LEFT, QuadPrim::Point);
        stage.run(&mut fb, &mut [&mut line, &mut point]);
        assert_eq!(line.mask, MASK_ALL);
        assert_eq!(point.mask, MASK_TOP_LEFT);
    }
}
