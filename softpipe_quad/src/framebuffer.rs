// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The render targets a quad pipeline writes to.

use crate::quad::MAX_COLOR_BUFS;
use crate::surface::{ColorSurface, DepthStencilSurface, Surface};
use crate::tile_cache::{TileCache, DEFAULT_TILE_ENTRIES};

/// Color buffers, an optional depth/stencil buffer and the occlusion counter.
#[derive(Debug)]
pub struct Framebuffer {
    cbufs: Vec<TileCache<ColorSurface>>,
    zsbuf: Option<TileCache<DepthStencilSurface>>,
    occlusion_count: u64,
    tile_entries: usize,
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new(DEFAULT_TILE_ENTRIES)
    }
}

impl Framebuffer {
    /// An empty framebuffer whose tile caches hold `tile_entries` tiles each.
    pub fn new(tile_entries: usize) -> Self {
        Self {
            cbufs: Vec::new(),
            zsbuf: None,
            occlusion_count: 0,
            tile_entries,
        }
    }

    /// Bind color buffers, flushing and returning the previously bound ones.
    ///
    /// # Panics
    ///
    /// Panics if more than [`MAX_COLOR_BUFS`] surfaces are bound.
    pub fn set_color_buffers(&mut self, surfaces: Vec<ColorSurface>) -> Vec<ColorSurface> {
        assert!(
            surfaces.len() <= MAX_COLOR_BUFS,
            "at most {MAX_COLOR_BUFS} color buffers can be bound"
        );
        let entries = self.tile_entries;
        let new = surfaces
            .into_iter()
            .map(|surface| TileCache::with_entries(surface, entries))
            .collect();
        core::mem::replace(&mut self.cbufs, new)
            .into_iter()
            .map(TileCache::into_surface)
            .collect()
    }

    /// Bind a depth/stencil buffer, flushing and returning the previously bound one.
    pub fn set_depth_stencil(
        &mut self,
        surface: Option<DepthStencilSurface>,
    ) -> Option<DepthStencilSurface> {
        let entries = self.tile_entries;
        let new = surface.map(|surface| TileCache::with_entries(surface, entries));
        core::mem::replace(&mut self.zsbuf, new).map(TileCache::into_surface)
    }

    /// Number of bound color buffers.
    pub fn num_color_bufs(&self) -> usize {
        self.cbufs.len()
    }

    /// The tile cache of color buffer `i`.
    pub fn color(&self, i: usize) -> Option<&TileCache<ColorSurface>> {
        self.cbufs.get(i)
    }

    /// The tile cache of color buffer `i`.
    pub fn color_mut(&mut self, i: usize) -> Option<&mut TileCache<ColorSurface>> {
        self.cbufs.get_mut(i)
    }

    /// The tile cache of the depth/stencil buffer.
    pub fn depth_stencil(&self) -> Option<&TileCache<DepthStencilSurface>> {
        self.zsbuf.as_ref()
    }

    /// The tile cache of the depth/stencil buffer.
    pub fn depth_stencil_mut(&mut self) -> Option<&mut TileCache<DepthStencilSurface>> {
        self.zsbuf.as_mut()
    }

    /// The size of the area covered by all bound buffers.
    pub fn size(&self) -> (u16, u16) {
        let color = self.cbufs.iter().map(|c| (c.surface().width(), c.surface().height()));
        let zs = self
            .zsbuf
            .iter()
            .map(|zs| (zs.surface().width(), zs.surface().height()));
        color
            .chain(zs)
            .reduce(|(w0, h0), (w1, h1)| (w0.min(w1), h0.min(h1)))
            .unwrap_or((0, 0))
    }

    /// Number of pixels that reached the occlusion counter since the last reset.
    pub fn occlusion_count(&self) -> u64 {
        self.occlusion_count
    }

    /// Add `pixels` to the occlusion counter.
    pub fn add_occlusion(&mut self, pixels: u64) {
        self.occlusion_count += pixels;
    }

    /// Reset the occlusion counter to zero.
    pub fn reset_occlusion(&mut self) {
        self.occlusion_count = 0;
    }

    /// Write all cached tiles to their surfaces.
    pub fn flush(&mut self) {
        for cbuf in &mut self.cbufs {
            cbuf.flush();
        }
        if let Some(zsbuf) = &mut self.zsbuf {
            zsbuf.flush();
        }
    }
}
