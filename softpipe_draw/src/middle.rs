// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The contract between the front end and the fetch/shade/clip middle end.

use crate::topology::Topology;

/// Options the middle end is prepared with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrepareOptions {
    /// Vertices run through the primitive pipeline (per-vertex shading and primitive
    /// stages), so the front end always batches through the vertex cache.
    pub pipeline: bool,
    /// Primitives with a vertex behind the eye are dropped. Without it the middle end
    /// only drops vertices it cannot project.
    pub clip: bool,
    /// The first vertex of a primitive is its provoking vertex.
    pub flatshade_first: bool,
}

/// The stage after primitive assembly: vertex fetch, shading and clipping.
///
/// Draw-list entries passed to [`run`](MiddleEnd::run) hold a fetch-list position in
/// their low bits and the draw pipe flags ([`FLAG_MASK`](crate::topology::FLAG_MASK)) in
/// their high bits.
pub trait MiddleEnd {
    /// Prepare for primitives of `topology`.
    ///
    /// Returns the maximum number of vertices the middle end accepts per batch.
    fn prepare(&mut self, topology: Topology, options: PrepareOptions) -> usize;

    /// Fetch the vertices `fetch_elts` and draw the primitives described by `draw_elts`,
    /// which index into the fetch list.
    fn run(&mut self, fetch_elts: &[u32], draw_elts: &[u16]);

    /// Fetch the vertices `start..start + count` and draw `elts`, which index into that
    /// range, with the prepared topology.
    ///
    /// Returns `false` if the middle end cannot handle the range, in which case nothing
    /// was drawn.
    fn run_linear_elts(&mut self, start: u32, count: u32, elts: &[u16]) -> bool;

    /// Finish all outstanding work.
    fn finish(&mut self);
}
