// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-quad depth and stencil testing against a packed depth/stencil tile.
//!
//! For one quad, the tester runs these steps in order:
//!
//! 1. Unpack the depth and stencil fields of the four pixels.
//! 2. Stencil test, then the fail operation on the pixels that failed it.
//! 3. Depth test in the native representation of the buffer, and selection of the new
//!    depth values for passing pixels.
//! 4. The zfail and zpass operations on pixels that passed the stencil test, split by the
//!    outcome of the depth test. Without a depth test, zpass applies to all of them.
//! 5. Re-pack and store the words that changed. Padding bits are kept.
//! 6. Reduce the live mask of the quad.

use crate::format::{DepthStencilFormat, DepthType, FormatDesc};
use crate::quad::{Face, QuadHeader, QuadPrim, MASK_ALL, QUAD_SIZE};
use crate::state::{DepthState, DepthStencilAlphaState, StencilOp, StencilState};
use crate::tile_cache::Tile;

/// Depth and stencil test configuration, resolved against a buffer format.
#[derive(Debug, Clone)]
pub struct DepthStencilTester {
    desc: FormatDesc,
    depth: DepthState,
    stencil: [StencilState; 2],
    stencil_max: u8,
}

impl DepthStencilTester {
    /// Resolve `state` against a buffer of `format`.
    ///
    /// # Panics
    ///
    /// Panics if the depth test is enabled but `format` has no depth, or the stencil test is
    /// enabled but `format` has no stencil.
    pub fn new(state: &DepthStencilAlphaState, format: DepthStencilFormat) -> Self {
        let desc = format.description();
        desc.validate();
        assert!(
            !state.depth.enabled || desc.depth.is_some(),
            "depth test enabled on {format:?}, which has no depth"
        );
        assert!(
            !state.stencil[0].enabled || desc.stencil.is_some(),
            "stencil test enabled on {format:?}, which has no stencil"
        );

        Self {
            desc,
            depth: state.depth,
            stencil: state.stencil,
            stencil_max: desc.stencil_max(),
        }
    }

    /// Whether the tester can modify the buffer.
    pub fn writes(&self) -> bool {
        (self.depth.enabled && self.depth.write_enabled)
            || self.stencil[0].writes()
            || self.stencil[1].writes()
    }

    /// The stencil state that applies to `quad`.
    fn stencil_for(&self, quad: &QuadHeader) -> StencilState {
        let two_sided = self.stencil[0].enabled && self.stencil[1].enabled;
        if two_sided && quad.prim == QuadPrim::Triangle && quad.facing == Face::Back {
            self.stencil[1]
        } else {
            self.stencil[0]
        }
    }

    /// Test `quad` against `tile`, update the tile and reduce the live mask of the quad.
    pub fn test_quad(&self, quad: &mut QuadHeader, tile: &mut Tile<u64>) {
        let stencil = self.stencil_for(quad);
        let stencil_enabled = self.stencil[0].enabled;
        let depth_enabled = self.depth.enabled;
        let orig_mask = quad.mask;

        let mut words = [0_u64; QUAD_SIZE];
        let mut zbuf = [0_u32; QUAD_SIZE];
        let mut sbuf = [0_u8; QUAD_SIZE];
        for j in 0..QUAD_SIZE {
            let (x, y) = quad.pixel(j);
            words[j] = tile.get(x, y);
            (zbuf[j], sbuf[j]) = self.desc.unpack(words[j]);
        }

        let mut s_pass = MASK_ALL;
        if stencil_enabled {
            let reference = stencil.reference & stencil.value_mask;
            s_pass = 0;
            for (j, value) in sbuf.iter().enumerate() {
                if stencil.func.test(reference, value & stencil.value_mask) {
                    s_pass |= 1 << j;
                }
            }
            s_pass &= orig_mask;
            self.apply_stencil_op(stencil, stencil.fail_op, orig_mask & !s_pass, &mut sbuf);
        }

        let mut z_pass = MASK_ALL;
        if depth_enabled {
            let src = quad.depth.map(|z| self.desc.encode_depth(z));
            z_pass = 0;
            for j in 0..QUAD_SIZE {
                if self.depth_test(src[j], zbuf[j]) {
                    z_pass |= 1 << j;
                }
            }

            if !stencil_enabled {
                quad.mask &= z_pass;
            }

            if self.depth.write_enabled {
                let write = orig_mask & z_pass & s_pass;
                for j in 0..QUAD_SIZE {
                    if write & (1 << j) != 0 {
                        zbuf[j] = src[j];
                    }
                }
            }

            if stencil_enabled {
                let passed = orig_mask & s_pass;
                self.apply_stencil_op(stencil, stencil.zfail_op, passed & !z_pass, &mut sbuf);
                self.apply_stencil_op(stencil, stencil.zpass_op, passed & z_pass, &mut sbuf);
            }
        } else if stencil_enabled {
            self.apply_stencil_op(stencil, stencil.zpass_op, orig_mask & s_pass, &mut sbuf);
        }

        if self.writes() {
            let whole_word = self.desc.depth_is_whole_word();
            for j in 0..QUAD_SIZE {
                if orig_mask & (1 << j) == 0 {
                    continue;
                }
                let word = if whole_word {
                    u64::from(zbuf[j])
                } else {
                    self.desc.pack(words[j], zbuf[j], sbuf[j])
                };
                if word != words[j] {
                    let (x, y) = quad.pixel(j);
                    tile.set(x, y, word);
                }
            }
        }

        if stencil_enabled {
            quad.mask &= s_pass;
            if depth_enabled {
                quad.mask &= z_pass;
            }
        }
    }

    /// Compare raw depth fields in their native representation.
    #[inline]
    fn depth_test(&self, src: u32, dst: u32) -> bool {
        match self.desc.depth {
            Some((_, DepthType::Float)) => self
                .depth
                .func
                .test(f32::from_bits(src), f32::from_bits(dst)),
            _ => self.depth.func.test(src, dst),
        }
    }

    /// Apply `op` to the stencil values of the pixels in `mask`, honoring the write mask.
    fn apply_stencil_op(
        &self,
        stencil: StencilState,
        op: StencilOp,
        mask: u8,
        sbuf: &mut [u8; QUAD_SIZE],
    ) {
        if op == StencilOp::Keep || mask == 0 {
            return;
        }
        let write_mask = stencil.write_mask & self.stencil_max;
        for (j, value) in sbuf.iter_mut().enumerate() {
            if mask & (1 << j) != 0 {
                let new = op.apply(*value, stencil.reference, self.stencil_max);
                *value = (new & write_mask) | (*value & !write_mask);
            }
        }
    }
}
