// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The vertex-cache front end: decomposes draws into primitives and batches their
//! vertices into deduplicated fetch lists.

mod linear;

pub use linear::{DRAW_PIPE_MAX_VERTICES, UNDEFINED_VERTEX_ID};

use crate::elts::{DrawInfo, Elts};
use crate::error::{DrawError, LinearRangeRejection};
use crate::middle::{MiddleEnd, PrepareOptions};
use crate::topology::{decompose, PrimitiveSink, Topology, MAX_VERTICES_PER_PRIMITIVE};
use crate::vcache::{VertexCache, DRAW_MAX};
use crate::vertex::VertexElement;

/// Front end that batches draws through a [`VertexCache`].
///
/// A batch starts with the first primitive after a flush and ends when it gets close to
/// the fetch or draw list capacity, or at the end of the draw. Flushing never reorders or
/// drops primitives.
#[derive(Debug)]
pub struct VcacheFrontend {
    cache: VertexCache,
    draw_elts: Vec<u16>,
    scratch: Vec<u16>,
    input_prim: Topology,
    output_prim: Topology,
    middle_prim: Option<Topology>,
    options: PrepareOptions,
    instanced: bool,
}

impl Default for VcacheFrontend {
    fn default() -> Self {
        Self::new()
    }
}

impl VcacheFrontend {
    /// Create a new front end.
    pub fn new() -> Self {
        Self {
            cache: VertexCache::new(),
            draw_elts: Vec::with_capacity(DRAW_MAX),
            scratch: Vec::new(),
            input_prim: Topology::Points,
            output_prim: Topology::Points,
            middle_prim: None,
            options: PrepareOptions::default(),
            instanced: false,
        }
    }

    /// Prepare for draws of `topology`.
    ///
    /// The middle end is prepared right away with the topology the selected path submits:
    /// the reduced topology in pipeline mode, the draw's own topology otherwise.
    pub fn prepare<M: MiddleEnd>(
        &mut self,
        topology: Topology,
        options: PrepareOptions,
        elements: &[VertexElement],
        middle: &mut M,
    ) {
        if !self.draw_elts.is_empty() {
            self.flush(middle);
        }

        self.input_prim = topology;
        self.output_prim = topology.reduced();
        self.options = options;
        self.instanced = elements.iter().any(|e| e.instance_divisor != 0);
        self.middle_prim = None;

        let prim = if options.pipeline {
            self.output_prim
        } else {
            self.input_prim
        };
        self.prepare_middle(prim, middle);
    }

    /// The options the front end was prepared with.
    pub fn options(&self) -> PrepareOptions {
        self.options
    }

    /// Run a draw call of the prepared topology.
    ///
    /// In pipeline mode the draw is always batched through the vertex cache. Otherwise a
    /// single linear-range fetch is attempted first, falling back to the vertex cache if
    /// the draw does not qualify or the middle end rejects it.
    pub fn run<M: MiddleEnd>(
        &mut self,
        draw: &DrawInfo<'_>,
        middle: &mut M,
    ) -> Result<(), DrawError> {
        debug_assert_eq!(
            draw.topology, self.input_prim,
            "draw topology differs from the prepared one"
        );
        let elts = draw.elts()?;
        if draw.count == 0 {
            return Ok(());
        }

        if cfg!(debug_assertions) {
            for i in 0..draw.count {
                let e = elts.get(i);
                debug_assert!(
                    (draw.min_index..=draw.max_index).contains(&e),
                    "element {e} outside of [{}, {}]",
                    draw.min_index,
                    draw.max_index
                );
            }
        }

        if self.options.pipeline {
            return self.run_cached::<true, M>(draw, &elts, middle);
        }

        match self.run_linear(draw, &elts, middle) {
            Ok(()) => Ok(()),
            Err(reason) => {
                match reason {
                    LinearRangeRejection::Rejected | LinearRangeRejection::OutOfMemory(_) => {
                        log::warn!("linear-range draw failed, using vertex cache: {reason}");
                    }
                    _ => log::debug!("linear-range draw unavailable: {reason}"),
                }
                self.run_cached::<false, M>(draw, &elts, middle)
            }
        }
    }

    /// Submit the current batch to the middle end and start a new one.
    pub fn flush<M: MiddleEnd>(&mut self, middle: &mut M) {
        let prim = self.output_prim;
        self.prepare_middle(prim, middle);
        if !self.draw_elts.is_empty() {
            log::debug!(
                "flushing batch of {} fetches and {} draw elements",
                self.cache.len(),
                self.draw_elts.len()
            );
            middle.run(self.cache.fetch_list(), &self.draw_elts);
        }

        self.cache.reset();
        self.draw_elts.clear();
    }

    /// Flush and let the middle end finish its work.
    pub fn finish<M: MiddleEnd>(&mut self, middle: &mut M) {
        self.flush(middle);
        middle.finish();
        self.middle_prim = None;
    }

    fn prepare_middle<M: MiddleEnd>(&mut self, prim: Topology, middle: &mut M) {
        if self.middle_prim != Some(prim) {
            log::debug!("preparing middle end for {prim:?}");
            let limit = middle.prepare(prim, self.options);
            self.cache.set_fetch_limit(limit);
            self.middle_prim = Some(prim);
        }
    }

    /// Batch a draw through the vertex cache.
    ///
    /// `FLAGS` selects whether draw pipe flags are recorded on the first vertex of every
    /// primitive.
    fn run_cached<const FLAGS: bool, M: MiddleEnd>(
        &mut self,
        draw: &DrawInfo<'_>,
        elts: &Elts<'_>,
        middle: &mut M,
    ) -> Result<(), DrawError> {
        let prim = self.output_prim;
        self.prepare_middle(prim, middle);

        let topology = self.input_prim;
        let flatshade_first = self.options.flatshade_first;
        let mut sink = BatchSink::<M, FLAGS> {
            frontend: &mut *self,
            middle: &mut *middle,
            elts,
            index_bias: draw.index_bias,
        };
        let result = decompose(topology, draw.count, flatshade_first, &mut sink);
        // Whatever made it into the batch before an error is still submitted in order.
        self.flush(middle);

        result
    }

    /// Append one primitive to the batch.
    fn emit<const FLAGS: bool, M: MiddleEnd>(
        &mut self,
        middle: &mut M,
        flags: u16,
        vertices: &[u32],
    ) -> Result<(), DrawError> {
        if !self.has_room(vertices.len()) {
            self.flush(middle);
        }

        let mark = self.draw_elts.len();
        for (k, &vertex) in vertices.iter().enumerate() {
            match self.cache.lookup_or_insert(vertex) {
                Ok(position) => {
                    let flags = if FLAGS && k == 0 { flags } else { 0 };
                    self.draw_elts.push(position | flags);
                }
                Err(e) => {
                    self.draw_elts.truncate(mark);
                    return Err(e);
                }
            }
        }

        self.check_flush(middle);
        Ok(())
    }

    fn has_room(&self, vertices: usize) -> bool {
        self.draw_elts.len() + vertices <= DRAW_MAX
            && self.cache.len() + vertices <= self.cache.fetch_limit()
    }

    /// Flush once another worst-case primitive might no longer fit.
    fn check_flush<M: MiddleEnd>(&mut self, middle: &mut M) {
        if self.draw_elts.len() + MAX_VERTICES_PER_PRIMITIVE >= DRAW_MAX
            || self.cache.len() + MAX_VERTICES_PER_PRIMITIVE >= self.cache.fetch_limit()
        {
            self.flush(middle);
        }
    }
}

/// Maps decomposed primitives to vertex indices and appends them to the current batch.
struct BatchSink<'a, 'e, M, const FLAGS: bool> {
    frontend: &'a mut VcacheFrontend,
    middle: &'a mut M,
    elts: &'a Elts<'e>,
    index_bias: i32,
}

impl<M: MiddleEnd, const FLAGS: bool> BatchSink<'_, '_, M, FLAGS> {
    #[inline]
    fn vertex(&self, i: u32) -> u32 {
        self.elts.get(i).wrapping_add_signed(self.index_bias)
    }

    fn emit<const N: usize>(&mut self, flags: u16, positions: [u32; N]) -> Result<(), DrawError> {
        let vertices = positions.map(|i| self.vertex(i));
        self.frontend.emit::<FLAGS, M>(self.middle, flags, &vertices)
    }
}

impl<M: MiddleEnd, const FLAGS: bool> PrimitiveSink for BatchSink<'_, '_, M, FLAGS> {
    type Error = DrawError;

    fn point(&mut self, flags: u16, i0: u32) -> Result<(), DrawError> {
        self.emit(flags, [i0])
    }

    fn line(&mut self, flags: u16, i0: u32, i1: u32) -> Result<(), DrawError> {
        self.emit(flags, [i0, i1])
    }

    fn triangle(&mut self, flags: u16, i0: u32, i1: u32, i2: u32) -> Result<(), DrawError> {
        self.emit(flags, [i0, i1, i2])
    }

    fn line_adj(&mut self, flags: u16, i: [u32; 4]) -> Result<(), DrawError> {
        self.emit(flags, i)
    }

    fn triangle_adj(&mut self, flags: u16, i: [u32; 6]) -> Result<(), DrawError> {
        self.emit(flags, i)
    }
}
