// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::collections::TryReserveError;

use bytemuck::PodCastError;
use thiserror::Error;

/// Errors that can occur while assembling a draw call.
#[derive(Debug, Error)]
pub enum DrawError {
    /// A primitive does not fit into an empty batch.
    ///
    /// This happens when the middle end advertises a fetch limit smaller than the number
    /// of vertices of a single primitive.
    #[error("primitive does not fit into a batch of at most {limit} fetches")]
    CapacityExceeded {
        /// The fetch limit of the batch.
        limit: usize,
    },
    /// Scratch storage could not be allocated.
    #[error("failed to allocate scratch storage")]
    OutOfMemory(#[from] TryReserveError),
    /// The draw reads past the end of its index buffer.
    #[error("draw of {count} elements at {start} exceeds index buffer of length {len}")]
    IndexOutOfBounds {
        /// The first element of the draw.
        start: u32,
        /// The number of elements of the draw.
        count: u32,
        /// The length of the index buffer.
        len: usize,
    },
    /// A linear draw addresses vertices beyond `u32::MAX`.
    #[error("linear draw of {count} vertices at {start} overflows the vertex id range")]
    VertexRangeOverflow {
        /// The first vertex of the draw.
        start: u32,
        /// The number of vertices of the draw.
        count: u32,
    },
    /// Index buffers must use 1, 2 or 4 byte elements.
    #[error("unsupported index size {0}")]
    InvalidIndexSize(usize),
    /// The bytes of an index buffer cannot be viewed as elements of the requested size.
    #[error("index buffer cannot be viewed as {size}-byte elements: {err:?}")]
    InvalidIndexBuffer {
        /// The requested element size.
        size: usize,
        /// Why the cast failed.
        err: PodCastError,
    },
}

/// Reasons why a draw did not take the linear-range fast path.
///
/// None of these are errors: the draw is retried through the vertex cache.
#[derive(Debug, Error)]
pub enum LinearRangeRejection {
    /// The draw references vertex ids too large for compact indices.
    #[error("max index {0} exceeds the largest linear vertex id")]
    VertexIdTooLarge(u32),
    /// Per-instance attributes are fetched per instance, not per range.
    #[error("a vertex element uses an instance divisor")]
    InstanceDivisor,
    /// The declared index range is empty.
    #[error("max index {max_index} is below min index {min_index}")]
    InvertedRange {
        /// Lower bound of the range.
        min_index: u32,
        /// Upper bound of the range.
        max_index: u32,
    },
    /// Fetching the whole range would fetch more vertices than the draw has elements.
    #[error("fetch range of {fetch_count} vertices is sparser than the {count} elements drawn")]
    SparseRange {
        /// Vertices in the range.
        fetch_count: u64,
        /// Elements of the draw.
        count: u32,
    },
    /// The fetch range does not fit compact 16-bit indices.
    #[error("fetch range of {0} vertices exceeds the compact index range")]
    RangeTooLarge(u64),
    /// The biased start vertex is negative or overflows.
    #[error("start vertex {min_index} + {index_bias} is not a valid vertex id")]
    StartOverflow {
        /// Lower bound of the range.
        min_index: u32,
        /// The index bias of the draw.
        index_bias: i32,
    },
    /// Scratch storage for rebased indices could not be allocated.
    #[error("index scratch allocation failed")]
    OutOfMemory(#[from] TryReserveError),
    /// The middle end declined the range.
    #[error("middle end rejected the linear range")]
    Rejected,
}
