// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use super::QuadStage;
use crate::framebuffer::Framebuffer;
use crate::quad::{QuadHeader, MAX_COLOR_BUFS, QUAD_SIZE};
use crate::state::{BlendFactor, BlendFunc, BlendState, RenderTargetBlend};

/// Blends the in-flight colors with the colors already in the render targets.
#[derive(Debug)]
pub struct Blend {
    targets: [RenderTargetBlend; MAX_COLOR_BUFS],
    constant: [f32; 4],
    next: Box<dyn QuadStage>,
}

impl Blend {
    /// Create the stage in front of `next`.
    pub fn new(state: &BlendState, next: Box<dyn QuadStage>) -> Self {
        Self {
            targets: core::array::from_fn(|i| *state.target(i)),
            constant: state.constant_color,
            next,
        }
    }
}

impl QuadStage for Blend {
    fn begin(&mut self, fb: &Framebuffer) {
        self.next.begin(fb);
    }

    fn run(&mut self, fb: &mut Framebuffer, quads: &mut [&mut QuadHeader]) {
        for cbuf in 0..fb.num_color_bufs().min(MAX_COLOR_BUFS) {
            let rt = self.targets[cbuf];
            if !rt.enabled {
                continue;
            }
            let Some(cache) = fb.color_mut(cbuf) else {
                continue;
            };
            for quad in quads.iter_mut() {
                let tile = cache.tile_mut(quad.x0, quad.y0);
                for j in 0..QUAD_SIZE {
                    if !quad.is_live(j) {
                        continue;
                    }
                    let (x, y) = quad.pixel(j);
                    let src = quad.color(cbuf, j).map(|v| v.clamp(0.0, 1.0));
                    let dst = tile.get(x, y);
                    quad.set_color(cbuf, j, blend_pixel(rt, self.constant, src, dst));
                }
            }
        }
        self.next.run(fb, quads);
    }
}

/// Blend one pixel. The result is clamped to `[0, 1]`.
pub(crate) fn blend_pixel(
    rt: RenderTargetBlend,
    constant: [f32; 4],
    src: [f32; 4],
    dst: [f32; 4],
) -> [f32; 4] {
    core::array::from_fn(|c| {
        let (func, src_factor, dst_factor) = if c < 3 {
            (rt.rgb_func, rt.rgb_src_factor, rt.rgb_dst_factor)
        } else {
            (rt.alpha_func, rt.alpha_src_factor, rt.alpha_dst_factor)
        };
        let s = src[c] * blend_factor(src_factor, c, src, dst, constant);
        let d = dst[c] * blend_factor(dst_factor, c, src, dst, constant);
        let v = match func {
            BlendFunc::Add => s + d,
            BlendFunc::Subtract => s - d,
            BlendFunc::ReverseSubtract => d - s,
            BlendFunc::Min => src[c].min(dst[c]),
            BlendFunc::Max => src[c].max(dst[c]),
        };
        v.clamp(0.0, 1.0)
    })
}

fn blend_factor(
    factor: BlendFactor,
    c: usize,
    src: [f32; 4],
    dst: [f32; 4],
    constant: [f32; 4],
) -> f32 {
    match factor {
        BlendFactor::Zero => 0.0,
        BlendFactor::One => 1.0,
        BlendFactor::SrcColor => src[c],
        BlendFactor::SrcAlpha => src[3],
        BlendFactor::DstColor => dst[c],
        BlendFactor::DstAlpha => dst[3],
        BlendFactor::SrcAlphaSaturate => {
            if c < 3 {
                src[3].min(1.0 - dst[3])
            } else {
                1.0
            }
        }
        BlendFactor::ConstColor => constant[c],
        BlendFactor::ConstAlpha => constant[3],
        BlendFactor::InvSrcColor => 1.0 - src[c],
        BlendFactor::InvSrcAlpha => 1.0 - src[3],
        BlendFactor::InvDstColor => 1.0 - dst[c],
        BlendFactor::InvDstAlpha => 1.0 - dst[3],
        BlendFactor::InvConstColor => 1.0 - constant[c],
        BlendFactor::InvConstAlpha => 1.0 - constant[3],
    }
}
