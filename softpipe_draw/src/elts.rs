// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Index buffers and the element sources of a draw call.

use crate::error::DrawError;
use crate::topology::Topology;

/// A borrowed index buffer.
#[derive(Debug, Clone, Copy)]
pub enum IndexBuffer<'a> {
    /// 8-bit indices.
    U8(&'a [u8]),
    /// 16-bit indices.
    U16(&'a [u16]),
    /// 32-bit indices.
    U32(&'a [u32]),
}

impl<'a> IndexBuffer<'a> {
    /// View raw bytes as an index buffer with `index_size`-byte elements.
    ///
    /// The bytes must be aligned for the element type and a multiple of its size.
    pub fn from_bytes(bytes: &'a [u8], index_size: usize) -> Result<Self, DrawError> {
        let cast_err = |err| DrawError::InvalidIndexBuffer {
            size: index_size,
            err,
        };
        match index_size {
            1 => Ok(Self::U8(bytes)),
            2 => bytemuck::try_cast_slice(bytes).map(Self::U16).map_err(cast_err),
            4 => bytemuck::try_cast_slice(bytes).map(Self::U32).map_err(cast_err),
            _ => Err(DrawError::InvalidIndexSize(index_size)),
        }
    }

    /// Size of one element in bytes.
    pub fn index_size(&self) -> usize {
        match self {
            Self::U8(_) => 1,
            Self::U16(_) => 2,
            Self::U32(_) => 4,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Self::U8(e) => e.len(),
            Self::U16(e) => e.len(),
            Self::U32(e) => e.len(),
        }
    }

    /// Whether the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element `i`, widened to 32 bits.
    #[inline]
    pub fn get(&self, i: usize) -> u32 {
        match self {
            Self::U8(e) => u32::from(e[i]),
            Self::U16(e) => u32::from(e[i]),
            Self::U32(e) => e[i],
        }
    }

    /// The elements `start..start + count`.
    pub fn slice(&self, start: u32, count: u32) -> Result<Self, DrawError> {
        let out_of_bounds = || DrawError::IndexOutOfBounds {
            start,
            count,
            len: self.len(),
        };
        let begin = start as usize;
        let end = begin.checked_add(count as usize).ok_or_else(out_of_bounds)?;
        if end > self.len() {
            return Err(out_of_bounds());
        }

        Ok(match self {
            Self::U8(e) => Self::U8(&e[begin..end]),
            Self::U16(e) => Self::U16(&e[begin..end]),
            Self::U32(e) => Self::U32(&e[begin..end]),
        })
    }

    /// The smallest and largest element, or `None` if the buffer is empty.
    pub fn range(&self) -> Option<(u32, u32)> {
        (0..self.len()).map(|i| self.get(i)).fold(None, |acc, e| match acc {
            None => Some((e, e)),
            Some((lo, hi)) => Some((lo.min(e), hi.max(e))),
        })
    }
}

/// The element source of one draw call.
#[derive(Debug, Clone, Copy)]
pub enum Elts<'a> {
    /// Element `i` is vertex `start + i`.
    Linear {
        /// The first vertex.
        start: u32,
    },
    /// Element `i` is read from an index buffer.
    Indexed(IndexBuffer<'a>),
}

impl Elts<'_> {
    /// Element `i` of the draw, before the index bias is applied.
    #[inline]
    pub fn get(&self, i: u32) -> u32 {
        match self {
            Self::Linear { start } => start + i,
            Self::Indexed(buffer) => buffer.get(i as usize),
        }
    }
}

/// Description of one draw call.
#[derive(Debug, Clone, Copy)]
pub struct DrawInfo<'a> {
    /// The topology of the draw.
    pub topology: Topology,
    /// The index buffer, or `None` for a non-indexed draw.
    pub indices: Option<IndexBuffer<'a>>,
    /// The first element (indexed) or first vertex (non-indexed) of the draw.
    pub start: u32,
    /// The number of elements of the draw.
    pub count: u32,
    /// Value added to every index before fetching.
    pub index_bias: i32,
    /// Lower bound of all elements of the draw, before the index bias is applied.
    pub min_index: u32,
    /// Upper bound of all elements of the draw, before the index bias is applied.
    ///
    /// May be `u32::MAX`.
    pub max_index: u32,
    /// Number of instances to draw.
    pub instance_count: u32,
    /// The instance id of the first instance.
    pub start_instance: u32,
}

impl<'a> DrawInfo<'a> {
    /// A non-indexed draw of vertices `start..start + count`.
    pub fn arrays(topology: Topology, start: u32, count: u32) -> Self {
        Self {
            topology,
            indices: None,
            start,
            count,
            index_bias: 0,
            min_index: start,
            max_index: start.saturating_add(count.saturating_sub(1)),
            instance_count: 1,
            start_instance: 0,
        }
    }

    /// An indexed draw of all elements of `indices`.
    ///
    /// The index range is computed by scanning the buffer.
    pub fn indexed(topology: Topology, indices: IndexBuffer<'a>) -> Self {
        let (min_index, max_index) = indices.range().unwrap_or((0, 0));
        #[expect(
            clippy::cast_possible_truncation,
            reason = "index buffers longer than u32::MAX elements are not supported"
        )]
        let count = indices.len() as u32;
        Self {
            topology,
            indices: Some(indices),
            start: 0,
            count,
            index_bias: 0,
            min_index,
            max_index,
            instance_count: 1,
            start_instance: 0,
        }
    }

    /// Override the index range of the draw with a caller-supplied one.
    pub fn with_index_range(mut self, min_index: u32, max_index: u32) -> Self {
        self.min_index = min_index;
        self.max_index = max_index;
        self
    }

    /// Set the index bias of the draw.
    pub fn with_index_bias(mut self, index_bias: i32) -> Self {
        self.index_bias = index_bias;
        self
    }

    /// Draw `instance_count` instances starting at instance id `start_instance`.
    pub fn with_instances(mut self, start_instance: u32, instance_count: u32) -> Self {
        self.start_instance = start_instance;
        self.instance_count = instance_count;
        self
    }

    /// The element source of the draw, validated against the index buffer length.
    pub fn elts(&self) -> Result<Elts<'a>, DrawError> {
        match self.indices {
            Some(buffer) => Ok(Elts::Indexed(buffer.slice(self.start, self.count)?)),
            None => {
                if self.start.checked_add(self.count).is_none() {
                    return Err(DrawError::VertexRangeOverflow {
                        start: self.start,
                        count: self.count,
                    });
                }
                Ok(Elts::Linear { start: self.start })
            }
        }
    }
}
