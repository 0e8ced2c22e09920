// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The chain of per-quad stages between setup and the render targets.
//!
//! Each stage owns the next one. A stage processes a batch of quads, drops the quads whose
//! mask became empty and hands the rest down the chain. The order is fixed when the
//! pipeline is built: stipple, alpha test, depth/stencil, occlusion, blend, color mask and
//! output. Stages whose state is disabled are left out.

mod blend;
mod colormask;
mod occlusion;
mod output;
mod stipple;

pub use alpha_test::AlphaTest;
pub use blend::Blend;
pub use colormask::ColorMask;
pub use depth_test::DepthStencilTest;
pub use occlusion::Occlusion;
pub use output::Output;
pub use stipple::Stipple;

use log::debug;

use crate::framebuffer::Framebuffer;
use crate::quad::{QuadHeader, MAX_COLOR_BUFS};
use crate::state::{BlendState, DepthStencilAlphaState, RasterizerState, COLOR_MASK_RGBA};

/// One stage of the quad pipeline.
pub trait QuadStage: core::fmt::Debug {
    /// Reset per-draw state before the first batch of a draw, then begin the next stage.
    fn begin(&mut self, fb: &Framebuffer);

    /// Process `quads`, which all have a non-empty mask, and forward the survivors.
    fn run(&mut self, fb: &mut Framebuffer, quads: &mut [&mut QuadHeader]);
}

/// Move the quads with a non-empty mask to the front, keeping their order.
///
/// Returns the number of live quads.
pub(crate) fn retain_live(quads: &mut [&mut QuadHeader]) -> usize {
    let mut live = 0;
    for i in 0..quads.len() {
        if quads[i].mask != 0 {
            quads.swap(live, i);
            live += 1;
        }
    }
    live
}

/// Forward the live quads of `quads` to `next`.
pub(crate) fn run_live(
    next: &mut dyn QuadStage,
    fb: &mut Framebuffer,
    quads: &mut [&mut QuadHeader],
) {
    let live = retain_live(quads);
    if live > 0 {
        next.run(fb, &mut quads[..live]);
    }
}

/// The state a quad pipeline is built from.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PipelineState {
    /// Depth, stencil and alpha tests.
    pub depth_stencil_alpha: DepthStencilAlphaState,
    /// Blending and color write masks.
    pub blend: BlendState,
    /// Rasterizer state. Only the polygon stipple is used by the quad stages.
    pub rasterizer: RasterizerState,
    /// Count the pixels that pass the depth and stencil tests.
    pub occlusion_query: bool,
}

/// A built chain of quad stages.
#[derive(Debug)]
pub struct QuadPipeline {
    first: Box<dyn QuadStage>,
}

impl QuadPipeline {
    /// Build the stages `state` needs.
    pub fn new(state: &PipelineState) -> Self {
        let mut stages = vec!["output"];
        let mut first: Box<dyn QuadStage> = Box::new(Output::new());

        let targets = (0..MAX_COLOR_BUFS).map(|i| state.blend.target(i));
        if targets.clone().any(|rt| rt.color_mask != COLOR_MASK_RGBA) {
            first = Box::new(ColorMask::new(&state.blend, first));
            stages.push("colormask");
        }
        if targets.clone().any(|rt| rt.enabled) {
            first = Box::new(Blend::new(&state.blend, first));
            stages.push("blend");
        }
        if state.occlusion_query {
            first = Box::new(Occlusion::new(first));
            stages.push("occlusion");
        }
        let dsa = &state.depth_stencil_alpha;
        if dsa.depth_or_stencil_enabled() {
            first = Box::new(DepthStencilTest::new(dsa, first));
            stages.push("depth_stencil");
        }
        if dsa.alpha.enabled {
            first = Box::new(AlphaTest::new(dsa.alpha, first));
            stages.push("alpha_test");
        }
        if state.rasterizer.poly_stipple_enable {
            first = Box::new(Stipple::new(&state.rasterizer.poly_stipple, first));
            stages.push("stipple");
        }

        stages.reverse();
        debug!("built quad pipeline: {}", stages.join(" -> "));

        Self { first }
    }

    /// Begin a draw.
    pub fn begin(&mut self, fb: &Framebuffer) {
        self.first.begin(fb);
    }

    /// Run a batch of quads through the pipeline.
    pub fn run(&mut self, fb: &mut Framebuffer, quads: &mut [&mut QuadHeader]) {
        run_live(self.first.as_mut(), fb, quads);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quad::{QuadPrim, MASK_ALL};

    #[test]
    fn retain_live_is_stable() {
        let mut quads: Vec<QuadHeader> = [1, 0, 2, 0, 4]
            .iter()
            .enumerate()
            .map(|(i, mask)| {
                let x = u16::try_from(i * 2).unwrap();
                QuadHeader::new(x, 0, *mask, QuadPrim::Triangle)
            })
            .collect();
        let mut refs: Vec<&mut QuadHeader> = quads.iter_mut().collect();
        assert_eq!(retain_live(&mut refs), 3);
        let xs: Vec<u16> = refs[..3].iter().map(|q| q.x0).collect();
        assert_eq!(xs, [0, 4, 8]);
    }

    #[test]
    fn empty_batches_are_not_forwarded() {
        #[derive(Debug)]
        struct Panicking;
        impl QuadStage for Panicking {
            fn begin(&mut self, _: &Framebuffer) {}
            fn run(&mut self, _: &mut Framebuffer, _: &mut [&mut QuadHeader]) {
                panic!("no quad should reach this stage");
            }
        }

        let mut fb = Framebuffer::default();
        let mut a = QuadHeader::new(0, 0, 0, QuadPrim::Point);
        let mut b = QuadHeader::new(2, 0, 0, QuadPrim::Point);
        run_live(&mut Panicking, &mut fb, &mut [&mut a, &mut b]);
    }

    #[test]
    fn default_pipeline_only_writes_output() {
        let mut fb = Framebuffer::default();
        fb.set_color_buffers(vec![crate::surface::ColorSurface::new(2, 2)]);
        let mut pipeline = QuadPipeline::new(&PipelineState::default());
        pipeline.begin(&fb);

        let mut quad = QuadHeader::new(0, 0, MASK_ALL, QuadPrim::Triangle);
        quad.set_color(0, 3, [1.0, 0.0, 1.0, 1.0]);
        pipeline.run(&mut fb, &mut [&mut quad]);
        fb.flush();
        let surface = fb.color(0).unwrap().surface();
        assert_eq!(surface.pixel(1, 1), [255, 0, 255, 255]);
        assert_eq!(surface.pixel(0, 0), [0, 0, 0, 0]);
    }
}
