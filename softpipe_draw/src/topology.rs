// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Primitive topologies and their decomposition into independent primitives.

/// The first edge (`v0 -> v1`) of a triangle is a boundary edge.
pub const EDGE_FLAG_0: u16 = 0x1 << 12;
/// The second edge (`v1 -> v2`) of a triangle is a boundary edge.
pub const EDGE_FLAG_1: u16 = 0x2 << 12;
/// The third edge (`v2 -> v0`) of a triangle is a boundary edge.
pub const EDGE_FLAG_2: u16 = 0x4 << 12;
/// All three edges of a triangle are boundary edges.
pub const EDGE_FLAG_ALL: u16 = EDGE_FLAG_0 | EDGE_FLAG_1 | EDGE_FLAG_2;
/// The primitive starts a new line stipple pattern.
pub const RESET_STIPPLE: u16 = 0x8 << 12;
/// All flag bits that can be OR'd into a draw-list entry.
///
/// The remaining low bits hold the compact fetch position.
pub const FLAG_MASK: u16 = 0xf << 12;

/// The topology of a draw call, in the vocabulary of the Gallium `PIPE_PRIM_*` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    /// Independent points.
    Points,
    /// Independent line segments, two vertices each.
    Lines,
    /// A line strip that is closed back to its first vertex.
    LineLoop,
    /// Connected line segments.
    LineStrip,
    /// Independent triangles.
    Triangles,
    /// A triangle strip.
    TriangleStrip,
    /// A triangle fan around the first vertex.
    TriangleFan,
    /// Independent quadrilaterals, four vertices each.
    Quads,
    /// A strip of quadrilaterals.
    QuadStrip,
    /// A single convex polygon.
    Polygon,
    /// Independent line segments with adjacency, four vertices each.
    LinesAdjacency,
    /// A line strip with adjacency.
    LineStripAdjacency,
    /// Independent triangles with adjacency, six vertices each.
    TrianglesAdjacency,
    /// A triangle strip with adjacency.
    TriangleStripAdjacency,
}

impl Topology {
    /// The topology the batching path submits after decomposition.
    pub const fn reduced(self) -> Self {
        match self {
            Self::Points => Self::Points,
            Self::Lines | Self::LineLoop | Self::LineStrip => Self::Lines,
            Self::Triangles
            | Self::TriangleStrip
            | Self::TriangleFan
            | Self::Quads
            | Self::QuadStrip
            | Self::Polygon => Self::Triangles,
            Self::LinesAdjacency | Self::LineStripAdjacency => Self::LinesAdjacency,
            Self::TrianglesAdjacency | Self::TriangleStripAdjacency => Self::TrianglesAdjacency,
        }
    }

    /// Number of vertices of one primitive of a reduced topology.
    ///
    /// Returns `None` for topologies that have to be decomposed first.
    pub const fn vertices_per_primitive(self) -> Option<usize> {
        match self {
            Self::Points => Some(1),
            Self::Lines => Some(2),
            Self::Triangles => Some(3),
            Self::LinesAdjacency => Some(4),
            Self::TrianglesAdjacency => Some(6),
            _ => None,
        }
    }
}

/// The maximum number of vertices a single decomposed primitive references.
pub const MAX_VERTICES_PER_PRIMITIVE: usize = 6;

/// A consumer of decomposed primitives.
///
/// The indices passed to the sink are positions within the draw (`0..count`), not vertex
/// indices. `flags` carries the draw pipe flags of the primitive; it belongs to the first
/// vertex that is passed.
pub trait PrimitiveSink {
    /// The error type of the sink.
    type Error;

    /// Emit a point.
    fn point(&mut self, flags: u16, i0: u32) -> Result<(), Self::Error>;
    /// Emit a line segment.
    fn line(&mut self, flags: u16, i0: u32, i1: u32) -> Result<(), Self::Error>;
    /// Emit a triangle.
    fn triangle(&mut self, flags: u16, i0: u32, i1: u32, i2: u32) -> Result<(), Self::Error>;
    /// Emit a line segment with adjacency, in `[adj, v0, v1, adj]` order.
    fn line_adj(&mut self, flags: u16, i: [u32; 4]) -> Result<(), Self::Error>;
    /// Emit a triangle with adjacency, in `[v0, adj, v1, adj, v2, adj]` order.
    fn triangle_adj(&mut self, flags: u16, i: [u32; 6]) -> Result<(), Self::Error>;
}

/// Walk positions `0..count` of a draw with the given topology and emit every complete
/// primitive to `sink`.
///
/// `flatshade_first` selects the provoking-vertex convention: when set, the provoking
/// vertex of every emitted primitive is its first vertex, otherwise its last. Incomplete
/// trailing primitives are dropped.
pub fn decompose<S: PrimitiveSink>(
    topology: Topology,
    count: u32,
    flatshade_first: bool,
    sink: &mut S,
) -> Result<(), S::Error> {
    match topology {
        Topology::Points => {
            for i in 0..count {
                sink.point(0, i)?;
            }
        }
        Topology::Lines => {
            for i in (0..count.saturating_sub(1)).step_by(2) {
                sink.line(RESET_STIPPLE, i, i + 1)?;
            }
        }
        Topology::LineStrip | Topology::LineLoop => {
            if count >= 2 {
                let mut flags = RESET_STIPPLE;
                for i in 1..count {
                    sink.line(flags, i - 1, i)?;
                    flags = 0;
                }
                if topology == Topology::LineLoop {
                    sink.line(flags, count - 1, 0)?;
                }
            }
        }
        Topology::Triangles => {
            for i in (0..count.saturating_sub(2)).step_by(3) {
                sink.triangle(RESET_STIPPLE | EDGE_FLAG_ALL, i, i + 1, i + 2)?;
            }
        }
        Topology::TriangleStrip => {
            for i in 0..count.saturating_sub(2) {
                let odd = i & 1;
                if flatshade_first {
                    sink.triangle(
                        RESET_STIPPLE | EDGE_FLAG_ALL,
                        i,
                        i + 1 + odd,
                        i + 2 - odd,
                    )?;
                } else {
                    sink.triangle(RESET_STIPPLE | EDGE_FLAG_ALL, i + odd, i + 1 - odd, i + 2)?;
                }
            }
        }
        Topology::TriangleFan => {
            for i in 0..count.saturating_sub(2) {
                if flatshade_first {
                    sink.triangle(RESET_STIPPLE | EDGE_FLAG_ALL, i + 1, i + 2, 0)?;
                } else {
                    sink.triangle(RESET_STIPPLE | EDGE_FLAG_ALL, 0, i + 1, i + 2)?;
                }
            }
        }
        Topology::Quads => {
            for i in (0..count.saturating_sub(3)).step_by(4) {
                quad(sink, flatshade_first, [i, i + 1, i + 2, i + 3])?;
            }
        }
        Topology::QuadStrip => {
            for i in (0..count.saturating_sub(3)).step_by(2) {
                quad(sink, flatshade_first, [i + 2, i, i + 1, i + 3])?;
            }
        }
        Topology::Polygon => {
            // The provoking vertex of a polygon is always its first vertex.
            for i in 0..count.saturating_sub(2) {
                let first = if i == 0 { RESET_STIPPLE } else { 0 };
                let last = i + 3 == count;
                if flatshade_first {
                    let mut flags = first | EDGE_FLAG_1;
                    if i == 0 {
                        flags |= EDGE_FLAG_0;
                    }
                    if last {
                        flags |= EDGE_FLAG_2;
                    }
                    sink.triangle(flags, 0, i + 1, i + 2)?;
                } else {
                    let mut flags = first | EDGE_FLAG_0;
                    if last {
                        flags |= EDGE_FLAG_1;
                    }
                    if i == 0 {
                        flags |= EDGE_FLAG_2;
                    }
                    sink.triangle(flags, i + 1, i + 2, 0)?;
                }
            }
        }
        Topology::LinesAdjacency => {
            for i in (0..count.saturating_sub(3)).step_by(4) {
                sink.line_adj(RESET_STIPPLE, [i, i + 1, i + 2, i + 3])?;
            }
        }
        Topology::LineStripAdjacency => {
            let mut flags = RESET_STIPPLE;
            for i in 0..count.saturating_sub(3) {
                sink.line_adj(flags, [i, i + 1, i + 2, i + 3])?;
                flags = 0;
            }
        }
        Topology::TrianglesAdjacency => {
            for i in (0..count.saturating_sub(5)).step_by(6) {
                sink.triangle_adj(
                    RESET_STIPPLE | EDGE_FLAG_ALL,
                    [i, i + 1, i + 2, i + 3, i + 4, i + 5],
                )?;
            }
        }
        Topology::TriangleStripAdjacency => {
            let prims = if count >= 6 { (count - 4) / 2 } else { 0 };
            for j in 0..prims {
                sink.triangle_adj(RESET_STIPPLE | EDGE_FLAG_ALL, strip_adj(j, prims))?;
            }
        }
    }

    Ok(())
}

/// Emit a quadrilateral `q0 q1 q2 q3` as two triangles whose provoking vertex is `q3`.
///
/// The shared diagonal `q1 - q3` is not a boundary edge.
fn quad<S: PrimitiveSink>(
    sink: &mut S,
    flatshade_first: bool,
    [q0, q1, q2, q3]: [u32; 4],
) -> Result<(), S::Error> {
    if flatshade_first {
        sink.triangle(RESET_STIPPLE | EDGE_FLAG_0 | EDGE_FLAG_1, q3, q0, q1)?;
        sink.triangle(EDGE_FLAG_1 | EDGE_FLAG_2, q3, q1, q2)
    } else {
        sink.triangle(RESET_STIPPLE | EDGE_FLAG_0 | EDGE_FLAG_2, q0, q1, q3)?;
        sink.triangle(EDGE_FLAG_0 | EDGE_FLAG_1, q1, q2, q3)
    }
}

/// Vertex positions of triangle `j` out of `prims` in a triangle strip with adjacency.
fn strip_adj(j: u32, prims: u32) -> [u32; 6] {
    let i = 2 * j;
    let odd = j & 1 == 1;
    let (p, a) = if prims == 1 {
        ([0, 2, 4], [1, 5, 3])
    } else if j == 0 {
        ([0, 2, 4], [1, 6, 3])
    } else if j + 1 == prims {
        if odd {
            ([i + 2, i, i + 4], [i - 2, i + 3, i + 5])
        } else {
            ([i, i + 2, i + 4], [i - 2, i + 5, i + 3])
        }
    } else if odd {
        ([i + 2, i, i + 4], [i - 2, i + 3, i + 6])
    } else {
        ([i, i + 2, i + 4], [i - 2, i + 6, i + 3])
    };

    [p[0], a[0], p[1], a[1], p[2], a[2]]
}
