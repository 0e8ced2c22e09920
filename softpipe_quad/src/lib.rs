// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The tiled quad pipeline of the softpipe software rasterizer.
//!
//! Window-space primitives are rasterized by [`Setup`] into [`QuadHeader`]s: 2x2 pixel
//! blocks with a live-pixel mask, per-pixel depth and colors. Batches of quads run through
//! a [`QuadPipeline`] of stages (stipple, alpha test, depth/stencil, occlusion counting,
//! blending, color masking, output) that test and shade against the render targets of a
//! [`Framebuffer`]. Render targets are accessed through a [`TileCache`] of 64x64 tiles.
//!
//! Depth/stencil buffers keep the packed layout of their [`DepthStencilFormat`]. The
//! [`DepthStencilTester`] unpacks the fields, compares depth in the native representation
//! of the format and packs the results back without touching padding bits.
// LINEBENDER LINT SET - lib.rs - v3
// See https://linebender.org/wiki/canonical-lints/
// These lints shouldn't apply to examples or tests.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
// These lints shouldn't apply to examples.
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![forbid(unsafe_code)]

pub mod depth_stencil;
pub mod format;
pub mod framebuffer;
pub mod quad;
pub mod setup;
pub mod stage;
pub mod state;
pub mod surface;
pub mod tile_cache;

pub use depth_stencil::DepthStencilTester;
pub use format::{DepthStencilFormat, FormatDesc};
pub use framebuffer::Framebuffer;
pub use quad::QuadHeader;
pub use setup::{Setup, SetupVertex};
pub use stage::{PipelineState, QuadPipeline, QuadStage};
pub use surface::{ColorSurface, DepthStencilSurface, Surface};
pub use tile_cache::TileCache;
