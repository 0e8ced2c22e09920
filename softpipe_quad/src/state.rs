// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pipeline state objects.
//!
//! These are immutable for the duration of a draw. The quad pipeline copies what it needs
//! when it is built.

use crate::quad::MAX_COLOR_BUFS;

/// A comparison function, used by depth, stencil and alpha tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompareFunc {
    /// Never passes.
    Never,
    /// Passes if `a < b`.
    Less,
    /// Passes if `a == b`.
    Equal,
    /// Passes if `a <= b`.
    LessEqual,
    /// Passes if `a > b`.
    Greater,
    /// Passes if `a != b`.
    NotEqual,
    /// Passes if `a >= b`.
    GreaterEqual,
    /// Always passes.
    #[default]
    Always,
}

impl CompareFunc {
    /// Evaluate `a FUNC b`.
    #[inline]
    pub fn test<T: PartialOrd>(self, a: T, b: T) -> bool {
        match self {
            Self::Never => false,
            Self::Less => a < b,
            Self::Equal => a == b,
            Self::LessEqual => a <= b,
            Self::Greater => a > b,
            Self::NotEqual => a != b,
            Self::GreaterEqual => a >= b,
            Self::Always => true,
        }
    }
}

/// What happens to a stencil value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StencilOp {
    /// Keep the value.
    #[default]
    Keep,
    /// Set the value to zero.
    Zero,
    /// Set the value to the reference value.
    Replace,
    /// Increment, clamping at the largest value.
    IncrementSaturate,
    /// Decrement, clamping at zero.
    DecrementSaturate,
    /// Increment, wrapping to zero.
    IncrementWrap,
    /// Decrement, wrapping to the largest value.
    DecrementWrap,
    /// Invert all bits.
    Invert,
}

impl StencilOp {
    /// Apply the operation to `value`, for a stencil field whose largest value is `max`.
    #[inline]
    pub fn apply(self, value: u8, reference: u8, max: u8) -> u8 {
        match self {
            Self::Keep => value,
            Self::Zero => 0,
            Self::Replace => reference & max,
            Self::IncrementSaturate => {
                if value < max {
                    value + 1
                } else {
                    value
                }
            }
            Self::DecrementSaturate => value.saturating_sub(1),
            Self::IncrementWrap => {
                if value >= max {
                    0
                } else {
                    value + 1
                }
            }
            Self::DecrementWrap => {
                if value == 0 {
                    max
                } else {
                    value - 1
                }
            }
            Self::Invert => !value & max,
        }
    }
}

/// Stencil state of one face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilState {
    /// Run the stencil test.
    pub enabled: bool,
    /// Compares `reference & value_mask` against `buffer & value_mask`.
    pub func: CompareFunc,
    /// Applied where the stencil test fails.
    pub fail_op: StencilOp,
    /// Applied where the stencil test passes but the depth test fails.
    pub zfail_op: StencilOp,
    /// Applied where both tests pass.
    pub zpass_op: StencilOp,
    /// Bits taking part in the comparison.
    pub value_mask: u8,
    /// Bits the stencil operations may change.
    pub write_mask: u8,
    /// The reference value.
    pub reference: u8,
}

impl Default for StencilState {
    fn default() -> Self {
        Self {
            enabled: false,
            func: CompareFunc::Always,
            fail_op: StencilOp::Keep,
            zfail_op: StencilOp::Keep,
            zpass_op: StencilOp::Keep,
            value_mask: 0xff,
            write_mask: 0xff,
            reference: 0,
        }
    }
}

impl StencilState {
    /// Whether any operation can change the stencil buffer.
    pub fn writes(self) -> bool {
        self.enabled
            && self.write_mask != 0
            && [self.fail_op, self.zfail_op, self.zpass_op]
                .iter()
                .any(|op| *op != StencilOp::Keep)
    }
}

/// Depth test state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthState {
    /// Run the depth test.
    pub enabled: bool,
    /// Write the depth of passing pixels.
    pub write_enabled: bool,
    /// Compares the incoming depth against the buffer.
    pub func: CompareFunc,
}

impl Default for DepthState {
    fn default() -> Self {
        Self {
            enabled: false,
            write_enabled: false,
            func: CompareFunc::Less,
        }
    }
}

/// Alpha test state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AlphaState {
    /// Run the alpha test.
    pub enabled: bool,
    /// Compares the alpha of color buffer 0 against `reference`.
    pub func: CompareFunc,
    /// The reference value.
    pub reference: f32,
}

/// Depth, stencil and alpha test state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DepthStencilAlphaState {
    /// The depth test.
    pub depth: DepthState,
    /// Front and back stencil state.
    ///
    /// The back state is used for back-facing triangles if it is enabled.
    pub stencil: [StencilState; 2],
    /// The alpha test.
    pub alpha: AlphaState,
}

impl DepthStencilAlphaState {
    /// Whether any depth or stencil work is needed.
    pub fn depth_or_stencil_enabled(&self) -> bool {
        self.depth.enabled || self.stencil[0].enabled
    }
}

/// A blend factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    /// `0`.
    Zero,
    /// `1`.
    One,
    /// The source color.
    SrcColor,
    /// The source alpha.
    SrcAlpha,
    /// The destination color.
    DstColor,
    /// The destination alpha.
    DstAlpha,
    /// `min(src.a, 1 - dst.a)` for color channels and `1` for alpha.
    SrcAlphaSaturate,
    /// The constant blend color.
    ConstColor,
    /// The constant blend alpha.
    ConstAlpha,
    /// `1 - src`.
    InvSrcColor,
    /// `1 - src.a`.
    InvSrcAlpha,
    /// `1 - dst`.
    InvDstColor,
    /// `1 - dst.a`.
    InvDstAlpha,
    /// `1 - constant`.
    InvConstColor,
    /// `1 - constant.a`.
    InvConstAlpha,
}

/// How source and destination terms are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlendFunc {
    /// `src * sf + dst * df`.
    #[default]
    Add,
    /// `src * sf - dst * df`.
    Subtract,
    /// `dst * df - src * sf`.
    ReverseSubtract,
    /// `min(src, dst)`, ignoring factors.
    Min,
    /// `max(src, dst)`, ignoring factors.
    Max,
}

/// Red channel bit of a color write mask.
pub const COLOR_MASK_R: u8 = 0x1;
/// Green channel bit of a color write mask.
pub const COLOR_MASK_G: u8 = 0x2;
/// Blue channel bit of a color write mask.
pub const COLOR_MASK_B: u8 = 0x4;
/// Alpha channel bit of a color write mask.
pub const COLOR_MASK_A: u8 = 0x8;
/// All channels.
pub const COLOR_MASK_RGBA: u8 = 0xf;

/// Blend state of one render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTargetBlend {
    /// Blend instead of replacing.
    pub enabled: bool,
    /// Combines the color channels.
    pub rgb_func: BlendFunc,
    /// Source factor of the color channels.
    pub rgb_src_factor: BlendFactor,
    /// Destination factor of the color channels.
    pub rgb_dst_factor: BlendFactor,
    /// Combines the alpha channel.
    pub alpha_func: BlendFunc,
    /// Source factor of the alpha channel.
    pub alpha_src_factor: BlendFactor,
    /// Destination factor of the alpha channel.
    pub alpha_dst_factor: BlendFactor,
    /// Channels that are written, see [`COLOR_MASK_RGBA`].
    pub color_mask: u8,
}

impl Default for RenderTargetBlend {
    fn default() -> Self {
        Self {
            enabled: false,
            rgb_func: BlendFunc::Add,
            rgb_src_factor: BlendFactor::One,
            rgb_dst_factor: BlendFactor::Zero,
            alpha_func: BlendFunc::Add,
            alpha_src_factor: BlendFactor::One,
            alpha_dst_factor: BlendFactor::Zero,
            color_mask: COLOR_MASK_RGBA,
        }
    }
}

impl RenderTargetBlend {
    /// Source-over blending of non-premultiplied colors.
    pub fn alpha_blending() -> Self {
        Self {
            enabled: true,
            rgb_src_factor: BlendFactor::SrcAlpha,
            rgb_dst_factor: BlendFactor::InvSrcAlpha,
            alpha_src_factor: BlendFactor::One,
            alpha_dst_factor: BlendFactor::InvSrcAlpha,
            ..Self::default()
        }
    }
}

/// Blend state of all render targets.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BlendState {
    /// Use `rt[i]` for render target `i`. Otherwise `rt[0]` applies to all targets.
    pub independent_blend_enable: bool,
    /// Per render target state.
    pub rt: [RenderTargetBlend; MAX_COLOR_BUFS],
    /// The constant blend color.
    pub constant_color: [f32; 4],
}

impl BlendState {
    /// The state that applies to render target `i`.
    pub fn target(&self, i: usize) -> &RenderTargetBlend {
        if self.independent_blend_enable {
            &self.rt[i]
        } else {
            &self.rt[0]
        }
    }
}

/// A 32x32 polygon stipple pattern.
///
/// Row `y % 32` of the pattern applies to window row `y`. Within a row, the most
/// significant bit applies to window column `x % 32 == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolyStipple {
    /// Pattern rows.
    pub rows: [u32; 32],
}

impl Default for PolyStipple {
    fn default() -> Self {
        Self { rows: [!0; 32] }
    }
}

impl PolyStipple {
    /// A checkerboard of `n x n` cells. `n` must divide 32.
    pub fn checkerboard(n: u32) -> Self {
        debug_assert!(n > 0 && 32 % n == 0, "cell size {n} does not divide 32");
        let rows = core::array::from_fn(|y| {
            #[expect(clippy::cast_possible_truncation, reason = "y is below 32")]
            let y = y as u32;
            (0..32_u32)
                .filter(|x| (x / n + y / n) % 2 == 0)
                .fold(0, |row, x| row | (0x8000_0000 >> x))
        });
        Self { rows }
    }
}

/// Which faces are discarded before rasterization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CullFace {
    /// Keep all triangles.
    #[default]
    None,
    /// Discard front-facing triangles.
    Front,
    /// Discard back-facing triangles.
    Back,
    /// Discard all triangles.
    FrontAndBack,
}

/// A window-space scissor rectangle. `max` is exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scissor {
    /// Left column.
    pub min_x: u16,
    /// Top row.
    pub min_y: u16,
    /// One past the right column.
    pub max_x: u16,
    /// One past the bottom row.
    pub max_y: u16,
}

/// Rasterizer state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterizerState {
    /// Counter-clockwise triangles face the front.
    pub front_ccw: bool,
    /// Faces to cull.
    pub cull_face: CullFace,
    /// Use the color of the provoking vertex for the whole primitive.
    pub flatshade: bool,
    /// The first vertex of a primitive is the provoking vertex.
    pub flatshade_first: bool,
    /// Apply the polygon stipple pattern to triangles.
    pub poly_stipple_enable: bool,
    /// The polygon stipple pattern.
    pub poly_stipple: PolyStipple,
    /// Restrict rasterization to `scissor_rect`.
    pub scissor: bool,
    /// The scissor rectangle.
    pub scissor_rect: Scissor,
    /// Width and height of points in pixels.
    pub point_size: f32,
    /// Interpolate colors with perspective correction.
    pub perspective_correct: bool,
}

impl Default for RasterizerState {
    fn default() -> Self {
        Self {
            front_ccw: true,
            cull_face: CullFace::None,
            flatshade: false,
            flatshade_first: false,
            poly_stipple_enable: false,
            poly_stipple: PolyStipple::default(),
            scissor: false,
            scissor_rect: Scissor::default(),
            point_size: 1.0,
            perspective_correct: true,
        }
    }
}

/// The mapping from normalized device coordinates to window coordinates.
///
/// `window = ndc * scale + translate`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Per-axis scale.
    pub scale: [f32; 3],
    /// Per-axis offset.
    pub translate: [f32; 3],
}

impl Viewport {
    /// A viewport covering the `width x height` rectangle at `(x, y)`.
    ///
    /// NDC `y = 1` maps to the top row, and NDC depth `[-1, 1]` maps to `[0, 1]`.
    pub fn from_rect(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            scale: [width * 0.5, -height * 0.5, 0.5],
            translate: [x + width * 0.5, y + height * 0.5, 0.5],
        }
    }

    /// Map a point in normalized device coordinates to window coordinates.
    #[inline]
    pub fn apply(&self, ndc: [f32; 3]) -> [f32; 3] {
        core::array::from_fn(|i| ndc[i] * self.scale[i] + self.translate[i])
    }
}
