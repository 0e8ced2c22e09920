// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A cache of render target tiles.
//!
//! Quads never straddle tiles: quad origins are even and [`TILE_SIZE`] is even, so one
//! lookup per quad is enough.

use core::ops::Range;

use log::trace;
use static_assertions::const_assert;

use crate::surface::Surface;

/// Width and height of a tile in pixels.
pub const TILE_SIZE: u16 = 64;
/// Number of tiles a cache holds unless configured otherwise.
pub const DEFAULT_TILE_ENTRIES: usize = 50;

const_assert!(TILE_SIZE % 2 == 0);

const TILE_PIXELS: usize = TILE_SIZE as usize * TILE_SIZE as usize;

/// The address of a tile, in units of tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileAddr {
    /// Tile column.
    pub x: u16,
    /// Tile row.
    pub y: u16,
}

impl TileAddr {
    /// The address of the tile containing pixel `(x, y)`.
    pub const fn containing(x: u16, y: u16) -> Self {
        Self {
            x: x / TILE_SIZE,
            y: y / TILE_SIZE,
        }
    }

    /// The pixel coordinates of the top left corner of the tile.
    pub const fn origin(self) -> (u16, u16) {
        (self.x * TILE_SIZE, self.y * TILE_SIZE)
    }
}

/// A cached tile of texels.
#[derive(Debug, Clone)]
pub struct Tile<T> {
    addr: Option<TileAddr>,
    dirty: bool,
    data: Vec<T>,
}

impl<T: Copy + Default> Tile<T> {
    fn new() -> Self {
        Self {
            addr: None,
            dirty: false,
            data: vec![T::default(); TILE_PIXELS],
        }
    }

    /// The address of the tile, or `None` if the entry holds no tile.
    pub fn addr(&self) -> Option<TileAddr> {
        self.addr
    }

    /// Whether the tile has been written since it was loaded.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The texel at surface position `(x, y)`, which must lie in this tile.
    #[inline]
    pub fn get(&self, x: u16, y: u16) -> T {
        self.data[self.index(x, y)]
    }

    /// Replace the texel at surface position `(x, y)`, which must lie in this tile.
    #[inline]
    pub fn set(&mut self, x: u16, y: u16, texel: T) {
        let index = self.index(x, y);
        self.data[index] = texel;
        self.dirty = true;
    }

    #[inline]
    fn index(&self, x: u16, y: u16) -> usize {
        debug_assert_eq!(
            self.addr,
            Some(TileAddr::containing(x, y)),
            "pixel ({x}, {y}) is not in this tile"
        );
        usize::from(y % TILE_SIZE) * usize::from(TILE_SIZE) + usize::from(x % TILE_SIZE)
    }
}

/// A direct-mapped cache of tiles of one surface.
///
/// Each tile address maps to exactly one entry. Writes stay in the cache until the entry
/// is evicted by a colliding tile or the cache is [flushed](Self::flush).
#[derive(Debug)]
pub struct TileCache<S: Surface> {
    surface: S,
    entries: Vec<Tile<S::Texel>>,
    last: Option<usize>,
    clear_value: S::Texel,
    /// One flag per tile of the surface, set while the tile is pending a deferred clear.
    clear_flags: Vec<bool>,
    tiles_x: u16,
}

impl<S: Surface> TileCache<S> {
    /// Create a cache of [`DEFAULT_TILE_ENTRIES`] tiles over `surface`.
    pub fn new(surface: S) -> Self {
        Self::with_entries(surface, DEFAULT_TILE_ENTRIES)
    }

    /// Create a cache of `entries` tiles over `surface`.
    ///
    /// # Panics
    ///
    /// Panics if `entries` is zero.
    pub fn with_entries(surface: S, entries: usize) -> Self {
        assert!(entries > 0, "a tile cache needs at least one entry");
        let tiles_x = surface.width().div_ceil(TILE_SIZE);
        let tiles_y = surface.height().div_ceil(TILE_SIZE);
        Self {
            surface,
            entries: (0..entries).map(|_| Tile::new()).collect(),
            last: None,
            clear_value: S::Texel::default(),
            clear_flags: vec![false; usize::from(tiles_x) * usize::from(tiles_y)],
            tiles_x,
        }
    }

    /// The cached surface.
    ///
    /// Writes that are still cached are only visible after a [flush](Self::flush).
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Flush the cache and return the surface.
    pub fn into_surface(mut self) -> S {
        self.flush();
        self.surface
    }

    /// The number of entries of the cache.
    pub fn entries(&self) -> usize {
        self.entries.len()
    }

    /// The tile containing pixel `(x, y)`, loading it if needed.
    pub fn tile_mut(&mut self, x: u16, y: u16) -> &mut Tile<S::Texel> {
        let addr = TileAddr::containing(x, y);
        if let Some(last) = self.last {
            if self.entries[last].addr == Some(addr) {
                return &mut self.entries[last];
            }
        }

        let pos = self.entry_index(addr);
        if self.entries[pos].addr != Some(addr) {
            let tile = &mut self.entries[pos];
            if let Some(old) = tile.addr {
                if tile.dirty {
                    trace!("evicting dirty tile {old:?} for {addr:?}");
                    write_back(&mut self.surface, tile);
                }
            }

            tile.addr = Some(addr);
            let flag = usize::from(addr.y) * usize::from(self.tiles_x) + usize::from(addr.x);
            if self.clear_flags[flag] {
                tile.data.fill(self.clear_value);
                tile.dirty = true;
                self.clear_flags[flag] = false;
            } else {
                load(&self.surface, tile);
                tile.dirty = false;
            }
        }

        self.last = Some(pos);
        &mut self.entries[pos]
    }

    /// Clear the whole surface to `value`.
    ///
    /// The clear is deferred: tiles are filled when they are next loaded, or written out on
    /// [flush](Self::flush). Cached tiles are discarded.
    pub fn clear(&mut self, value: S::Texel) {
        self.clear_value = value;
        self.clear_flags.fill(true);
        for tile in &mut self.entries {
            tile.addr = None;
            tile.dirty = false;
        }
        self.last = None;
    }

    /// Write all dirty tiles and pending clears to the surface.
    ///
    /// Cached tiles stay valid.
    pub fn flush(&mut self) {
        for tile in &mut self.entries {
            if tile.addr.is_some() && tile.dirty {
                write_back(&mut self.surface, tile);
            }
        }

        if self.clear_flags.contains(&true) {
            let value = self.clear_value;
            for (i, flag) in self.clear_flags.iter_mut().enumerate() {
                if *flag {
                    #[expect(
                        clippy::cast_possible_truncation,
                        reason = "there are at most u16::MAX tiles per row"
                    )]
                    let addr = TileAddr {
                        x: (i % usize::from(self.tiles_x)) as u16,
                        y: (i / usize::from(self.tiles_x)) as u16,
                    };
                    let (xs, ys) = pixels_in(&self.surface, addr);
                    for y in ys {
                        for x in xs.clone() {
                            self.surface.write(x, y, value);
                        }
                    }
                    *flag = false;
                }
            }
        }
    }

    fn entry_index(&self, addr: TileAddr) -> usize {
        (usize::from(addr.x) * 5 + usize::from(addr.y) * 7) % self.entries.len()
    }
}

/// The pixels of `addr` that lie inside `surface`.
fn pixels_in(surface: &impl Surface, addr: TileAddr) -> (Range<u16>, Range<u16>) {
    let (x0, y0) = addr.origin();
    let x1 = x0.saturating_add(TILE_SIZE).min(surface.width());
    let y1 = y0.saturating_add(TILE_SIZE).min(surface.height());
    (x0..x1, y0..y1)
}

fn load<S: Surface>(surface: &S, tile: &mut Tile<S::Texel>) {
    let Some(addr) = tile.addr else {
        return;
    };
    let (xs, ys) = pixels_in(surface, addr);
    for y in ys {
        for x in xs.clone() {
            let texel = surface.read(x, y);
            let index = tile.index(x, y);
            tile.data[index] = texel;
        }
    }
}

fn write_back<S: Surface>(surface: &mut S, tile: &mut Tile<S::Texel>) {
    let Some(addr) = tile.addr else {
        return;
    };
    let (xs, ys) = pixels_in(surface, addr);
    for y in ys {
        for x in xs.clone() {
            surface.write(x, y, tile.get(x, y));
        }
    }
    tile.dirty = false;
}
