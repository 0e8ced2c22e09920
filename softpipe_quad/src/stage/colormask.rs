// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use super::QuadStage;
use crate::framebuffer::Framebuffer;
use crate::quad::{QuadHeader, MAX_COLOR_BUFS, QUAD_SIZE};
use crate::state::{BlendState, COLOR_MASK_RGBA};

/// Replaces the channels a render target does not write with the value already in it.
#[derive(Debug)]
pub struct ColorMask {
    masks: [u8; MAX_COLOR_BUFS],
    next: Box<dyn QuadStage>,
}

impl ColorMask {
    /// Create the stage in front of `next`.
    pub fn new(blend: &BlendState, next: Box<dyn QuadStage>) -> Self {
        Self {
            masks: core::array::from_fn(|i| blend.target(i).color_mask),
            next,
        }
    }
}

impl QuadStage for ColorMask {
    fn begin(&mut self, fb: &Framebuffer) {
        self.next.begin(fb);
    }

    fn run(&mut self, fb: &mut Framebuffer, quads: &mut [&mut QuadHeader]) {
        for cbuf in 0..fb.num_color_bufs().min(MAX_COLOR_BUFS) {
            let mask = self.masks[cbuf];
            if mask == COLOR_MASK_RGBA {
                continue;
            }
            let Some(cache) = fb.color_mut(cbuf) else {
                continue;
            };
            for quad in quads.iter_mut() {
                let tile = cache.tile_mut(quad.x0, quad.y0);
                for j in 0..QUAD_SIZE {
                    let (x, y) = quad.pixel(j);
                    let dst = tile.get(x, y);
                    for (c, value) in dst.into_iter().enumerate() {
                        if mask & (1 << c) == 0 {
                            quad.colors[cbuf][c][j] = value;
                        }
                    }
                }
            }
        }
        self.next.run(fb, quads);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quad::{QuadPrim, MASK_ALL};
    use crate::stage::Output;
    use crate::state::{COLOR_MASK_B, COLOR_MASK_R};
    use crate::surface::ColorSurface;

    #[test]
    fn disabled_channels_keep_buffer_value() {
        let mut fb = Framebuffer::default();
        fb.set_color_buffers(vec![ColorSurface::new(2, 2)]);
        fb.color_mut(0).unwrap().clear([0.0, 1.0, 0.0, 1.0]);

        let mut blend = BlendState::default();
        blend.rt[0].color_mask = COLOR_MASK_R | COLOR_MASK_B;
        let mut stage = ColorMask::new(&blend, Box::new(Output::new()));
        stage.begin(&fb);

        let mut quad = QuadHeader::new(0, 0, MASK_ALL, QuadPrim::Triangle);
        for j in 0..QUAD_SIZE {
            quad.set_color(0, j, [1.0, 0.0, 1.0, 0.0]);
        }
        stage.run(&mut fb, &mut [&mut quad]);
        assert_eq!(quad.color(0, 0), [1.0, 1.0, 1.0, 1.0]);

        fb.flush();
        assert_eq!(fb.color(0).unwrap().surface().pixel(1, 0), [255; 4]);
    }
}
