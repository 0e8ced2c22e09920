// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A direct-mapped vertex cache that deduplicates fetches within one batch.

use crate::error::DrawError;
use crate::topology::FLAG_MASK;
use static_assertions::const_assert;

/// Number of slots in the vertex cache.
pub const CACHE_MAX: usize = 256;
/// Maximum number of distinct vertices fetched per batch.
pub const FETCH_MAX: usize = 256;
/// Maximum number of draw-list entries per batch.
pub const DRAW_MAX: usize = 16384;

const_assert!(CACHE_MAX.is_power_of_two());
// Compact positions must never collide with the draw pipe flag bits.
const_assert!((FETCH_MAX - 1) & FLAG_MASK as usize == 0);
const_assert!(DRAW_MAX >= FETCH_MAX);

/// Tag of an empty slot. Wider than any vertex index, so it never matches one.
const EMPTY_TAG: u64 = u64::MAX;

/// One slot of the vertex cache.
#[derive(Debug, Clone, Copy)]
pub struct CacheSlot {
    tag: u64,
    fetch_position: u16,
}

impl CacheSlot {
    const EMPTY: Self = Self {
        tag: EMPTY_TAG,
        fetch_position: 0,
    };

    /// Whether the slot holds no vertex.
    pub fn is_empty(&self) -> bool {
        self.tag == EMPTY_TAG
    }
}

/// A direct-mapped cache from vertex index to position in the batch's fetch list.
///
/// A slot is selected by `index % CACHE_MAX` and holds a single entry. Two indices that map
/// to the same slot evict each other, so both may end up in the fetch list more than once
/// per batch. There is no chaining: lookups stay O(1) and never allocate, at the cost of
/// fewer hits for colliding indices.
#[derive(Debug, Clone)]
pub struct VertexCache {
    slots: [CacheSlot; CACHE_MAX],
    fetch: Vec<u32>,
    fetch_limit: usize,
}

impl Default for VertexCache {
    fn default() -> Self {
        Self::new()
    }
}

impl VertexCache {
    /// Create an empty cache whose fetch list can hold [`FETCH_MAX`] vertices.
    pub fn new() -> Self {
        Self {
            slots: [CacheSlot::EMPTY; CACHE_MAX],
            fetch: Vec::with_capacity(FETCH_MAX),
            fetch_limit: FETCH_MAX,
        }
    }

    /// Limit the number of fetches per batch. Limits above [`FETCH_MAX`] are clamped.
    pub fn set_fetch_limit(&mut self, limit: usize) {
        self.fetch_limit = limit.min(FETCH_MAX);
    }

    /// The maximum number of fetches per batch.
    pub fn fetch_limit(&self) -> usize {
        self.fetch_limit
    }

    /// Return the fetch-list position of `index`, appending it to the fetch list on a miss.
    ///
    /// Fails with [`DrawError::CapacityExceeded`] if the index misses and the fetch list is
    /// already full; the cache is left unchanged in that case.
    #[inline]
    pub fn lookup_or_insert(&mut self, index: u32) -> Result<u16, DrawError> {
        let slot = &mut self.slots[index as usize % CACHE_MAX];
        if slot.tag == u64::from(index) {
            return Ok(slot.fetch_position);
        }

        if self.fetch.len() >= self.fetch_limit {
            return Err(DrawError::CapacityExceeded {
                limit: self.fetch_limit,
            });
        }

        #[expect(
            clippy::cast_possible_truncation,
            reason = "the fetch list never holds more than FETCH_MAX entries"
        )]
        let position = self.fetch.len() as u16;
        slot.tag = u64::from(index);
        slot.fetch_position = position;
        self.fetch.push(index);

        Ok(position)
    }

    /// The vertices to fetch for the current batch, in fetch-position order.
    pub fn fetch_list(&self) -> &[u32] {
        &self.fetch
    }

    /// Number of entries in the fetch list.
    pub fn len(&self) -> usize {
        self.fetch.len()
    }

    /// Whether the fetch list is empty.
    pub fn is_empty(&self) -> bool {
        self.fetch.is_empty()
    }

    /// Whether every slot is empty.
    pub fn slots_empty(&self) -> bool {
        self.slots.iter().all(CacheSlot::is_empty)
    }

    /// Empty all slots and the fetch list, keeping the allocation.
    pub fn reset(&mut self) {
        self.slots.fill(CacheSlot::EMPTY);
        self.fetch.clear();
    }
}
