// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A small software rasterizer.
//!
//! [`RenderContext`] ties the primitive-assembly front end of [`softpipe_draw`] to the quad
//! pipeline of [`softpipe_quad`]: draws are decomposed and batched, their vertices fetched
//! and transformed to window coordinates, and the resulting points, lines and triangles
//! rasterized into 2x2 quads that run through the depth, stencil, blend and output stages.
//!
//! ```
//! use softpipe::{RenderContext, VertexBuffer};
//! use softpipe_draw::{DrawInfo, Topology, VertexElement, VertexFormat};
//! use softpipe_quad::ColorSurface;
//!
//! let mut ctx = RenderContext::default();
//! ctx.set_framebuffer(vec![ColorSurface::new(8, 8)], None);
//! ctx.set_vertex_buffer(0, VertexBuffer::from_pod(&[[-1.0_f32, -1.0], [3.0, -1.0], [-1.0, 3.0]]));
//! ctx.set_vertex_elements(vec![VertexElement::new(0, 0, VertexFormat::Float32x2)]);
//! ctx.draw(&DrawInfo::arrays(Topology::Triangles, 0, 3)).unwrap();
//! ctx.flush();
//! assert_eq!(ctx.color_surface(0).unwrap().pixel(7, 7), [255; 4]);
//! ```
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

mod context;
mod error;
mod fetch;
mod middle;

pub use context::{RenderContext, RenderSettings};
pub use error::{Error, Result};
pub use fetch::{VertexBuffer, COLOR_ELEMENT, POSITION_ELEMENT};

pub use softpipe_draw;
pub use softpipe_quad;
