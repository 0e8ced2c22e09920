// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Conversion of window-space primitives into quads.
//!
//! Triangles are sampled at pixel centers with edge functions and the top-left fill rule,
//! so two triangles sharing an edge never both cover a pixel on it. Lines are stepped with
//! a DDA along their major axis and points are rasterized as screen-aligned squares.
//! The quads of one primitive are collected into batches of [`QUAD_BATCH`] and run through
//! the quad pipeline before the next primitive starts. Quads of one primitive never share an
//! origin, so blend and color mask always read what earlier primitives wrote.

use smallvec::SmallVec;

use crate::framebuffer::Framebuffer;
use crate::quad::{Face, QuadHeader, QuadPrim, MAX_COLOR_BUFS, QUAD_SIZE};
use crate::stage::{PipelineState, QuadPipeline};
use crate::state::{CullFace, RasterizerState};

/// Number of quads handed to the pipeline per run.
pub const QUAD_BATCH: usize = 16;

/// A vertex after the viewport transform.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SetupVertex {
    /// Window x, y and depth.
    pub position: [f32; 3],
    /// Reciprocal of the clip-space w, used for perspective correction.
    pub inv_w: f32,
    /// Color, RGBA.
    pub color: [f32; 4],
}

/// The window area primitives are clipped to. `max` is exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Bounds {
    min_x: u16,
    min_y: u16,
    max_x: u16,
    max_y: u16,
}

impl Bounds {
    fn contains(self, x: u16, y: u16) -> bool {
        (self.min_x..self.max_x).contains(&x) && (self.min_y..self.max_y).contains(&y)
    }

    fn is_empty(self) -> bool {
        self.min_x >= self.max_x || self.min_y >= self.max_y
    }

    /// Clamp a window coordinate to the bounds on the x axis.
    fn clamp_x(self, v: f32) -> u16 {
        clamp_to_u16(v, self.min_x, self.max_x)
    }

    /// Clamp a window coordinate to the bounds on the y axis.
    fn clamp_y(self, v: f32) -> u16 {
        clamp_to_u16(v, self.min_y, self.max_y)
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "the value is clamped to a u16 range"
)]
fn clamp_to_u16(v: f32, lo: u16, hi: u16) -> u16 {
    v.clamp(f32::from(lo), f32::from(hi)) as u16
}

/// One edge of a triangle, oriented so that the interior is on the positive side.
#[derive(Debug, Clone, Copy)]
struct Edge {
    ax: f32,
    ay: f32,
    dx: f32,
    dy: f32,
    top_left: bool,
}

impl Edge {
    fn new(a: &SetupVertex, b: &SetupVertex) -> Self {
        let dx = b.position[0] - a.position[0];
        let dy = b.position[1] - a.position[1];
        Self {
            ax: a.position[0],
            ay: a.position[1],
            dx,
            dy,
            // With y pointing down and a positive determinant, top edges run right and
            // left edges run up.
            top_left: (dy == 0.0 && dx > 0.0) || dy < 0.0,
        }
    }

    #[inline]
    fn eval(&self, x: f32, y: f32) -> f32 {
        self.dx * (y - self.ay) - self.dy * (x - self.ax)
    }

    #[inline]
    fn contains(&self, w: f32) -> bool {
        w > 0.0 || (w == 0.0 && self.top_left)
    }
}

/// Rasterizes primitives into quads and runs them through a [`QuadPipeline`].
#[derive(Debug)]
pub struct Setup {
    rasterizer: RasterizerState,
    pipeline: QuadPipeline,
    quads: SmallVec<[QuadHeader; QUAD_BATCH]>,
    bounds: Bounds,
    num_cbufs: usize,
}

impl Setup {
    /// Create a setup stage and build its quad pipeline.
    pub fn new(state: &PipelineState) -> Self {
        Self {
            rasterizer: state.rasterizer,
            pipeline: QuadPipeline::new(state),
            quads: SmallVec::new(),
            bounds: Bounds::default(),
            num_cbufs: 1,
        }
    }

    /// Begin a draw into `fb`.
    pub fn begin(&mut self, fb: &Framebuffer) {
        let (width, height) = fb.size();
        let mut bounds = Bounds {
            min_x: 0,
            min_y: 0,
            max_x: width,
            max_y: height,
        };
        if self.rasterizer.scissor {
            let s = self.rasterizer.scissor_rect;
            bounds.min_x = bounds.min_x.max(s.min_x);
            bounds.min_y = bounds.min_y.max(s.min_y);
            bounds.max_x = bounds.max_x.min(s.max_x);
            bounds.max_y = bounds.max_y.min(s.max_y);
        }
        self.bounds = bounds;
        self.num_cbufs = fb.num_color_bufs().clamp(1, MAX_COLOR_BUFS);
        self.pipeline.begin(fb);
    }

    /// Run all pending quads through the pipeline.
    pub fn flush(&mut self, fb: &mut Framebuffer) {
        if self.quads.is_empty() {
            return;
        }
        {
            let mut batch: SmallVec<[&mut QuadHeader; QUAD_BATCH]> =
                self.quads.iter_mut().collect();
            self.pipeline.run(fb, &mut batch);
        }
        self.quads.clear();
    }

    fn push_quad(&mut self, fb: &mut Framebuffer, quad: QuadHeader) {
        self.quads.push(quad);
        if self.quads.len() >= QUAD_BATCH {
            self.flush(fb);
        }
    }

    fn shade(&self, quad: &mut QuadHeader, j: usize, depth: f32, color: [f32; 4]) {
        quad.mask |= 1 << j;
        quad.depth[j] = depth;
        for cbuf in 0..self.num_cbufs {
            quad.set_color(cbuf, j, color);
        }
    }

    /// Rasterize a triangle.
    pub fn triangle(&mut self, fb: &mut Framebuffer, v: [&SetupVertex; 3]) {
        let [x0, y0, _] = v[0].position;
        let [x1, y1, _] = v[1].position;
        let [x2, y2, _] = v[2].position;
        let det = (x1 - x0) * (y2 - y0) - (x2 - x0) * (y1 - y0);
        if det == 0.0 || !det.is_finite() || self.bounds.is_empty() {
            return;
        }

        // Counter-clockwise on screen, with y pointing down.
        let ccw = det < 0.0;
        let facing = if ccw == self.rasterizer.front_ccw {
            Face::Front
        } else {
            Face::Back
        };
        let culled = match self.rasterizer.cull_face {
            CullFace::None => false,
            CullFace::Front => facing == Face::Front,
            CullFace::Back => facing == Face::Back,
            CullFace::FrontAndBack => true,
        };
        if culled {
            return;
        }

        let provoking = if self.rasterizer.flatshade_first { v[0] } else { v[2] };
        let flat = self.rasterizer.flatshade.then_some(provoking.color);

        let v = if det < 0.0 { [v[0], v[2], v[1]] } else { v };
        let det = det.abs();
        let edges = [
            Edge::new(v[1], v[2]),
            Edge::new(v[2], v[0]),
            Edge::new(v[0], v[1]),
        ];

        let (min_x, max_x) = min_max(v.map(|v| v.position[0]));
        let (min_y, max_y) = min_max(v.map(|v| v.position[1]));
        let x_lo = self.bounds.clamp_x(min_x.floor());
        let x_hi = self.bounds.clamp_x(max_x.ceil());
        let y_lo = self.bounds.clamp_y(min_y.floor());
        let y_hi = self.bounds.clamp_y(max_y.ceil());

        for qy in (y_lo & !1..y_hi).step_by(2) {
            for qx in (x_lo & !1..x_hi).step_by(2) {
                let mut quad = QuadHeader::new(qx, qy, 0, QuadPrim::Triangle);
                quad.facing = facing;
                for j in 0..QUAD_SIZE {
                    let (px, py) = quad.pixel(j);
                    if !self.bounds.contains(px, py) {
                        continue;
                    }
                    let cx = f32::from(px) + 0.5;
                    let cy = f32::from(py) + 0.5;
                    let w = edges.map(|e| e.eval(cx, cy));
                    if !edges.iter().zip(w).all(|(e, w)| e.contains(w)) {
                        continue;
                    }
                    let b = w.map(|w| w / det);
                    let depth = b[0] * v[0].position[2]
                        + b[1] * v[1].position[2]
                        + b[2] * v[2].position[2];
                    let color = match flat {
                        Some(color) => color,
                        None => self.interpolate(v, b),
                    };
                    self.shade(&mut quad, j, depth, color);
                }
                if quad.mask != 0 {
                    self.push_quad(fb, quad);
                }
            }
        }
        self.flush(fb);
    }

    /// Interpolate vertex colors with barycentric weights `b`.
    fn interpolate(&self, v: [&SetupVertex; 3], b: [f32; 3]) -> [f32; 4] {
        let weights = if self.rasterizer.perspective_correct {
            let pw = [b[0] * v[0].inv_w, b[1] * v[1].inv_w, b[2] * v[2].inv_w];
            let sum = pw[0] + pw[1] + pw[2];
            if sum == 0.0 {
                b
            } else {
                pw.map(|w| w / sum)
            }
        } else {
            b
        };
        core::array::from_fn(|c| {
            weights[0] * v[0].color[c] + weights[1] * v[1].color[c] + weights[2] * v[2].color[c]
        })
    }

    /// Rasterize a line of width one.
    ///
    /// The pixel of the last vertex is not drawn, so connected segments do not overlap.
    pub fn line(&mut self, fb: &mut Framebuffer, v0: &SetupVertex, v1: &SetupVertex) {
        if self.bounds.is_empty() {
            return;
        }
        let [x0, y0, z0] = v0.position.map(f64::from);
        let [x1, y1, z1] = v1.position.map(f64::from);
        let (dx, dy) = (x1 - x0, y1 - y0);
        let steps = dx.abs().max(dy.abs()).round();
        if !steps.is_finite() || steps < 1.0 {
            return;
        }

        let Some((t0, t1)) = self.clip_segment([x0, y0], [dx, dy]) else {
            return;
        };
        // Steps are counted in f64 so that long, mostly offscreen lines still land on the
        // right pixels.
        let first = (t0 * steps).floor().clamp(0.0, steps);
        let last = (t1 * steps + 1.0).floor().clamp(0.0, steps);

        let provoking = if self.rasterizer.flatshade_first { v0 } else { v1 };
        let flat = self.rasterizer.flatshade.then_some(provoking.color);

        let mut current: Option<QuadHeader> = None;
        let mut i = first;
        while i < last {
            let t = i / steps;
            i += 1.0;
            let Some((px, py)) = to_pixel(x0 + dx * t, y0 + dy * t) else {
                continue;
            };
            if !self.bounds.contains(px, py) {
                continue;
            }

            let (qx, qy) = (px & !1, py & !1);
            if let Some(quad) = current.take_if(|quad| (quad.x0, quad.y0) != (qx, qy)) {
                self.push_quad(fb, quad);
            }
            let quad =
                current.get_or_insert_with(|| QuadHeader::new(qx, qy, 0, QuadPrim::Line));
            let j = usize::from(py & 1) * 2 + usize::from(px & 1);
            #[expect(clippy::cast_possible_truncation, reason = "t is in [0, 1]")]
            let t = t as f32;
            let color = flat.unwrap_or_else(|| {
                core::array::from_fn(|c| v0.color[c] + (v1.color[c] - v0.color[c]) * t)
            });
            #[expect(clippy::cast_possible_truncation, reason = "depth is stored as f32")]
            let depth = (z0 + (z1 - z0) * f64::from(t)) as f32;
            self.shade(quad, j, depth, color);
        }
        if let Some(quad) = current {
            self.push_quad(fb, quad);
        }
        self.flush(fb);
    }

    /// The parameter range `[t0, t1]` of `p + d * t`, `t` in `[0, 1]`, that lies within one
    /// pixel of the bounds.
    fn clip_segment(&self, p: [f64; 2], d: [f64; 2]) -> Option<(f64, f64)> {
        let b = self.bounds;
        let lo = [f64::from(b.min_x) - 1.0, f64::from(b.min_y) - 1.0];
        let hi = [f64::from(b.max_x) + 1.0, f64::from(b.max_y) + 1.0];
        let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
        for axis in 0..2 {
            if d[axis] == 0.0 {
                if p[axis] < lo[axis] || p[axis] > hi[axis] {
                    return None;
                }
                continue;
            }
            let a = (lo[axis] - p[axis]) / d[axis];
            let b = (hi[axis] - p[axis]) / d[axis];
            t0 = t0.max(a.min(b));
            t1 = t1.min(a.max(b));
        }
        (t0 <= t1).then_some((t0, t1))
    }

    /// Rasterize a point as a square of the rasterizer's point size.
    pub fn point(&mut self, fb: &mut Framebuffer, v: &SetupVertex) {
        if self.bounds.is_empty() {
            return;
        }
        let half = self.rasterizer.point_size.max(1.0) * 0.5;
        let [x, y, z] = v.position;
        // Pixels whose centers fall into [x - half, x + half).
        let x_lo = self.bounds.clamp_x((x - half - 0.5).ceil());
        let x_hi = self.bounds.clamp_x((x + half - 0.5).ceil());
        let y_lo = self.bounds.clamp_y((y - half - 0.5).ceil());
        let y_hi = self.bounds.clamp_y((y + half - 0.5).ceil());

        for qy in (y_lo & !1..y_hi).step_by(2) {
            for qx in (x_lo & !1..x_hi).step_by(2) {
                let mut quad = QuadHeader::new(qx, qy, 0, QuadPrim::Point);
                for j in 0..QUAD_SIZE {
                    let (px, py) = quad.pixel(j);
                    if (x_lo..x_hi).contains(&px) && (y_lo..y_hi).contains(&py) {
                        self.shade(&mut quad, j, z, v.color);
                    }
                }
                if quad.mask != 0 {
                    self.push_quad(fb, quad);
                }
            }
        }
        self.flush(fb);
    }
}

fn min_max(v: [f32; 3]) -> (f32, f32) {
    (v[0].min(v[1]).min(v[2]), v[0].max(v[1]).max(v[2]))
}

/// The pixel containing window position `(x, y)`, if it has u16 coordinates.
#[expect(clippy::cast_possible_truncation, reason = "the range is checked first")]
fn to_pixel(x: f64, y: f64) -> Option<(u16, u16)> {
    let (x, y) = (x.floor(), y.floor());
    let range = 0.0..=f64::from(u16::MAX);
    if !range.contains(&x) || !range.contains(&y) {
        return None;
    }
    Some((x as u16, y as u16))
}
