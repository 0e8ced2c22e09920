// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The primitive-assembly front end of the softpipe software rasterizer.
//!
//! Draw calls come in as a topology plus an element source (a linear vertex range or an
//! index buffer). The [`VcacheFrontend`] decomposes them into points, lines, triangles and
//! their adjacency variants, deduplicates vertex references through a direct-mapped
//! [`VertexCache`], and hands batches of `(fetch list, draw list)` to a [`MiddleEnd`].
//!
//! Draws that reference a dense vertex range skip the cache entirely: the whole range is
//! fetched once and the indices are passed through, rebased to the start of the range.
//!
//! # Contents
//!
//! - [`topology`]: primitive topologies, draw pipe flags and decomposition
//! - [`vcache`]: the vertex cache and batch capacities
//! - [`frontend`]: batching and the linear-range fast path
//! - [`middle`]: the middle-end contract
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

pub mod elts;
mod error;
pub mod frontend;
pub mod middle;
pub mod topology;
pub mod vcache;
pub mod vertex;

pub use elts::{DrawInfo, Elts, IndexBuffer};
pub use error::{DrawError, LinearRangeRejection};
pub use frontend::VcacheFrontend;
pub use middle::{MiddleEnd, PrepareOptions};
pub use topology::Topology;
pub use vcache::VertexCache;
pub use vertex::{VertexElement, VertexFormat};
