// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The middle end that turns fetched vertices into rasterized primitives.

use core::convert::Infallible;

use log::trace;
use softpipe_draw::topology::{decompose, PrimitiveSink, FLAG_MASK};
use softpipe_draw::{MiddleEnd, PrepareOptions, Topology};
use softpipe_quad::state::Viewport;
use softpipe_quad::{Framebuffer, Setup, SetupVertex};

use crate::fetch::{VertexFetcher, COLOR_ELEMENT, POSITION_ELEMENT};

/// Fetches, transforms and rasterizes the vertices of one instance of a draw.
#[derive(Debug)]
pub(crate) struct RasterMiddleEnd<'a> {
    pub(crate) fetcher: VertexFetcher<'a>,
    pub(crate) viewport: Viewport,
    pub(crate) setup: &'a mut Setup,
    pub(crate) fb: &'a mut Framebuffer,
    pub(crate) vertices: &'a mut Vec<Option<SetupVertex>>,
    /// Vertices per batch.
    pub(crate) batch_vertex_limit: usize,
    /// Largest vertex range accepted by [`MiddleEnd::run_linear_elts`].
    pub(crate) max_linear_vertices: u32,
    pub(crate) topology: Topology,
    pub(crate) flatshade_first: bool,
    pub(crate) clip: bool,
}

impl RasterMiddleEnd<'_> {
    /// Fetch a vertex and transform it to window coordinates.
    ///
    /// Vertices with a zero or non-finite `w` yield `None`, as do vertices behind the
    /// eye (`w < 0`) when clipping.
    fn shade_vertex(&self, index: u32) -> Option<SetupVertex> {
        let [x, y, z, w] = self.fetcher.attribute(POSITION_ELEMENT, index);
        if !w.is_finite() || w == 0.0 || (self.clip && w < 0.0) {
            return None;
        }
        let color = if self.fetcher.elements.len() > COLOR_ELEMENT {
            self.fetcher.attribute(COLOR_ELEMENT, index)
        } else {
            [1.0; 4]
        };
        let inv_w = 1.0 / w;
        Some(SetupVertex {
            position: self.viewport.apply([x * inv_w, y * inv_w, z * inv_w]),
            inv_w,
            color,
        })
    }

    fn fetch(&mut self, indices: impl Iterator<Item = u32>) {
        let mut vertices = core::mem::take(self.vertices);
        vertices.clear();
        vertices.extend(indices.map(|i| self.shade_vertex(i)));
        *self.vertices = vertices;
    }

    fn assemble(&mut self, topology: Topology, elts: &[u16], mask: u16) {
        let mut sink = Assembler {
            elts,
            mask,
            vertices: self.vertices.as_slice(),
            setup: &mut *self.setup,
            fb: &mut *self.fb,
            culled: 0,
        };
        #[expect(
            clippy::cast_possible_truncation,
            reason = "draw lists never exceed DRAW_MAX entries"
        )]
        let count = elts.len() as u32;
        if let Err(never) = decompose(topology, count, self.flatshade_first, &mut sink) {
            match never {}
        }
        if sink.culled > 0 {
            trace!("dropped {} primitives with vertices behind the eye", sink.culled);
        }
    }
}

impl MiddleEnd for RasterMiddleEnd<'_> {
    fn prepare(&mut self, topology: Topology, options: PrepareOptions) -> usize {
        self.topology = topology;
        self.flatshade_first = options.flatshade_first;
        self.clip = options.clip;
        self.batch_vertex_limit
    }

    fn run(&mut self, fetch_elts: &[u32], draw_elts: &[u16]) {
        self.fetch(fetch_elts.iter().copied());
        // Draw lists hold reduced primitives, which decompose one to one.
        self.assemble(self.topology, draw_elts, !FLAG_MASK);
    }

    fn run_linear_elts(&mut self, start: u32, count: u32, elts: &[u16]) -> bool {
        if count > self.max_linear_vertices {
            return false;
        }
        let Some(end) = start.checked_add(count) else {
            return false;
        };
        self.fetch(start..end);
        self.assemble(self.topology, elts, u16::MAX);
        true
    }

    fn finish(&mut self) {
        self.setup.flush(self.fb);
    }
}

/// Maps decomposed primitives to shaded vertices and feeds them to setup.
struct Assembler<'a> {
    elts: &'a [u16],
    mask: u16,
    vertices: &'a [Option<SetupVertex>],
    setup: &'a mut Setup,
    fb: &'a mut Framebuffer,
    culled: usize,
}

impl Assembler<'_> {
    fn vertex(&self, position: u32) -> Option<&SetupVertex> {
        let e = self.elts.get(position as usize)? & self.mask;
        self.vertices.get(usize::from(e))?.as_ref()
    }

    fn emit_line(&mut self, i0: u32, i1: u32) {
        match (self.vertex(i0).copied(), self.vertex(i1).copied()) {
            (Some(v0), Some(v1)) => self.setup.line(self.fb, &v0, &v1),
            _ => self.culled += 1,
        }
    }

    fn emit_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        match (
            self.vertex(i0).copied(),
            self.vertex(i1).copied(),
            self.vertex(i2).copied(),
        ) {
            (Some(v0), Some(v1), Some(v2)) => self.setup.triangle(self.fb, [&v0, &v1, &v2]),
            _ => self.culled += 1,
        }
    }
}

impl PrimitiveSink for Assembler<'_> {
    type Error = Infallible;

    fn point(&mut self, _flags: u16, i0: u32) -> Result<(), Infallible> {
        match self.vertex(i0).copied() {
            Some(v) => self.setup.point(self.fb, &v),
            None => self.culled += 1,
        }
        Ok(())
    }

    fn line(&mut self, _flags: u16, i0: u32, i1: u32) -> Result<(), Infallible> {
        self.emit_line(i0, i1);
        Ok(())
    }

    fn triangle(&mut self, _flags: u16, i0: u32, i1: u32, i2: u32) -> Result<(), Infallible> {
        self.emit_triangle(i0, i1, i2);
        Ok(())
    }

    fn line_adj(&mut self, _flags: u16, i: [u32; 4]) -> Result<(), Infallible> {
        self.emit_line(i[1], i[2]);
        Ok(())
    }

    fn triangle_adj(&mut self, _flags: u16, i: [u32; 6]) -> Result<(), Infallible> {
        self.emit_triangle(i[0], i[2], i[4]);
        Ok(())
    }
}
