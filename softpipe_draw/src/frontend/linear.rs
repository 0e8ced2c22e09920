// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The linear-range fast path: satisfy a whole draw with one contiguous vertex fetch.

use super::VcacheFrontend;
use crate::elts::{DrawInfo, Elts, IndexBuffer};
use crate::error::LinearRangeRejection;
use crate::middle::MiddleEnd;

/// Vertex ids at or above this value never take the linear-range path.
pub const DRAW_PIPE_MAX_VERTICES: u32 = 0xffff;
/// The compact index that marks an undefined vertex.
pub const UNDEFINED_VERTEX_ID: u32 = 0xffff;

impl VcacheFrontend {
    /// Try to draw `elts` as 16-bit indices into the single fetch range
    /// `min_index + index_bias ..= max_index + index_bias`.
    pub(super) fn run_linear<M: MiddleEnd>(
        &mut self,
        draw: &DrawInfo<'_>,
        elts: &Elts<'_>,
        middle: &mut M,
    ) -> Result<(), LinearRangeRejection> {
        let (min_index, max_index) = (draw.min_index, draw.max_index);
        if max_index >= DRAW_PIPE_MAX_VERTICES {
            return Err(LinearRangeRejection::VertexIdTooLarge(max_index));
        }
        if self.instanced {
            return Err(LinearRangeRejection::InstanceDivisor);
        }
        if max_index < min_index {
            return Err(LinearRangeRejection::InvertedRange {
                min_index,
                max_index,
            });
        }

        let fetch_count = u64::from(max_index) - u64::from(min_index) + 1;
        if fetch_count > u64::from(draw.count) {
            return Err(LinearRangeRejection::SparseRange {
                fetch_count,
                count: draw.count,
            });
        }
        if fetch_count >= u64::from(UNDEFINED_VERTEX_ID) {
            return Err(LinearRangeRejection::RangeTooLarge(fetch_count));
        }

        let start = u32::try_from(i64::from(min_index) + i64::from(draw.index_bias)).map_err(
            |_| LinearRangeRejection::StartOverflow {
                min_index,
                index_bias: draw.index_bias,
            },
        )?;
        #[expect(
            clippy::cast_possible_truncation,
            reason = "fetch_count is below UNDEFINED_VERTEX_ID"
        )]
        let fetch_count = fetch_count as u32;

        let prim = self.input_prim;
        self.prepare_middle(prim, middle);

        let ok = match elts {
            Elts::Indexed(IndexBuffer::U16(indices)) if min_index == 0 => {
                middle.run_linear_elts(start, fetch_count, indices)
            }
            _ => {
                rebase_elts(elts, draw.count, min_index, &mut self.scratch)?;
                middle.run_linear_elts(start, fetch_count, &self.scratch)
            }
        };

        if ok {
            Ok(())
        } else {
            Err(LinearRangeRejection::Rejected)
        }
    }
}

/// Write the first `count` elements of `elts`, rebased to start at `min_index` and
/// narrowed to 16 bits, into `out`.
///
/// `out` is reused between draws; it only grows.
pub(crate) fn rebase_elts(
    elts: &Elts<'_>,
    count: u32,
    min_index: u32,
    out: &mut Vec<u16>,
) -> Result<(), LinearRangeRejection> {
    out.clear();
    out.try_reserve_exact(count as usize)?;
    out.extend((0..count).map(|i| narrow(elts.get(i), min_index)));

    Ok(())
}

#[inline]
#[expect(
    clippy::cast_possible_truncation,
    reason = "checked against the fetch range by the caller"
)]
fn narrow(e: u32, min_index: u32) -> u16 {
    debug_assert!(e >= min_index, "element {e} below min index {min_index}");
    let rebased = e - min_index;
    debug_assert!(
        rebased < UNDEFINED_VERTEX_ID,
        "rebased element {rebased} does not fit a compact index"
    );
    rebased as u16
}
