// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use super::QuadStage;
use crate::framebuffer::Framebuffer;
use crate::quad::QuadHeader;

/// Adds the number of live pixels to the occlusion counter of the framebuffer.
#[derive(Debug)]
pub struct Occlusion {
    next: Box<dyn QuadStage>,
}

impl Occlusion {
    /// Create the stage in front of `next`.
    pub fn new(next: Box<dyn QuadStage>) -> Self {
        Self { next }
    }
}

impl QuadStage for Occlusion {
    fn begin(&mut self, fb: &Framebuffer) {
        self.next.begin(fb);
    }

    fn run(&mut self, fb: &mut Framebuffer, quads: &mut [&mut QuadHeader]) {
        let pixels: u32 = quads.iter().map(|quad| quad.mask.count_ones()).sum();
        fb.add_occlusion(u64::from(pixels));
        self.next.run(fb, quads);
    }
}
