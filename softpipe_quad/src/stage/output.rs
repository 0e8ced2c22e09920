// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use super::QuadStage;
use crate::framebuffer::Framebuffer;
use crate::quad::{QuadHeader, MAX_COLOR_BUFS, QUAD_SIZE};

/// The last stage: writes the colors of live pixels into the color tiles.
#[derive(Debug, Default)]
pub struct Output {
    _private: (),
}

impl Output {
    /// Create the output stage.
    pub fn new() -> Self {
        Self::default()
    }
}

impl QuadStage for Output {
    fn begin(&mut self, _: &Framebuffer) {}

    fn run(&mut self, fb: &mut Framebuffer, quads: &mut [&mut QuadHeader]) {
        for cbuf in 0..fb.num_color_bufs().min(MAX_COLOR_BUFS) {
            let Some(cache) = fb.color_mut(cbuf) else {
                continue;
            };
            for quad in quads.iter() {
                let tile = cache.tile_mut(quad.x0, quad.y0);
                for j in 0..QUAD_SIZE {
                    if quad.is_live(j) {
                        let (x, y) = quad.pixel(j);
                        tile.set(x, y, quad.color(cbuf, j));
                    }
                }
            }
        }
    }
}
