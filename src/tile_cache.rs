//! Lazy, memoized background tiles.
//!
//! Tiles are a visual aid only. Each tile is requested at most once per
//! session; a failed load is remembered as missing and never retried.

use crate::geom::WorldRect;
use macroquad::prelude::*;
use std::collections::HashMap;

/// Tiles smaller than this on screen are neither fetched nor drawn.
pub const MIN_TILE_PIXELS: f32 = 24.0;

/// Tile coordinate; tile `(tx, ty)` covers world `[tx*span, (tx+1)*span)` on each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    /// Column
    pub tx: i32,
    /// Row
    pub ty: i32,
}

/// Cache state of one tile. Absent from the map means never requested.
#[derive(Debug)]
pub enum TileEntry<I> {
    /// Fetch issued, no answer yet
    Loading,
    /// Image available
    Ready(I),
    /// Load failed; stays missing for the session
    Missing,
}

/// Completion of a fetch, fed back through [`TileCache::resolve`].
#[derive(Debug)]
pub struct TileLoad<I> {
    /// Tile the fetch was for
    pub coord: TileCoord,
    /// Loaded image, or why it could not be loaded
    pub result: Result<I, String>,
}

/// Starts asynchronous tile fetches. Completions come back as [`TileLoad`]s.
pub trait TileFetcher<I> {
    /// Begin loading `url` for `coord`. Must not block.
    fn fetch(&mut self, coord: TileCoord, url: &str);
}

/// Tile states for one session; entries are never evicted.
pub struct TileCache<I> {
    entries: HashMap<TileCoord, TileEntry<I>>,
    span: i32,
    base_url: String,
}

impl<I> TileCache<I> {
    /// `span` world units per tile edge; `base_url` without a trailing slash.
    pub fn new(base_url: impl Into<String>, span: i32) -> Self {
        TileCache {
            entries: HashMap::new(),
            span: span.max(1),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    /// World units per tile edge
    pub fn span(&self) -> i32 {
        self.span
    }

    /// Whether tiles are large enough on screen at `scale` to be worth showing.
    pub fn visible_at(&self, scale: f32) -> bool {
        self.span as f32 * scale >= MIN_TILE_PIXELS
    }

    /// Deterministic resource address for a tile.
    pub fn tile_url(&self, coord: TileCoord) -> String {
        format!("{}/map_{}_{}.png", self.base_url, coord.tx, coord.ty)
    }

    /// World rectangle covered by a tile.
    pub fn tile_world_rect(&self, coord: TileCoord) -> WorldRect {
        let s = self.span as f32;
        let min = vec2(coord.tx as f32 * s, coord.ty as f32 * s);
        WorldRect { min, max: min + Vec2::splat(s) }
    }

    /// Tiles intersecting `rect`, row-major.
    pub fn tiles_covering(&self, rect: &WorldRect) -> Vec<TileCoord> {
        let ((x0, y0), (x1, y1)) = rect.cell_range();
        let (tx0, tx1) = (x0.div_euclid(self.span), x1.div_euclid(self.span));
        let (ty0, ty1) = (y0.div_euclid(self.span), y1.div_euclid(self.span));

        let mut coords = Vec::new();
        for ty in ty0..=ty1 {
            for tx in tx0..=tx1 {
                coords.push(TileCoord { tx, ty });
            }
        }
        coords
    }

    /// Mark every never-requested tile in `rect` as loading and start its fetch.
    /// Returns how many fetches were started.
    pub fn request_visible<F: TileFetcher<I> + ?Sized>(&mut self, rect: &WorldRect, fetcher: &mut F) -> usize {
        let mut started = 0;
        for coord in self.tiles_covering(rect) {
            if self.entries.contains_key(&coord) {
                continue;
            }
            self.entries.insert(coord, TileEntry::Loading);
            let url = self.tile_url(coord);
            fetcher.fetch(coord, &url);
            started += 1;
        }
        started
    }

    /// Record a finished fetch. Returns `true` when a redraw is warranted,
    /// i.e. a loading tile just became ready. Settled entries never change.
    pub fn resolve(&mut self, load: TileLoad<I>) -> bool {
        let Some(entry) = self.entries.get_mut(&load.coord) else {
            log::debug!("dropping unrequested tile {:?}", load.coord);
            return false;
        };
        if !matches!(entry, TileEntry::Loading) {
            return false;
        }
        match load.result {
            Ok(image) => {
                *entry = TileEntry::Ready(image);
                true
            }
            Err(reason) => {
                log::debug!("tile {:?} missing: {}", load.coord, reason);
                *entry = TileEntry::Missing;
                false
            }
        }
    }

    /// Cache state for a tile; `None` if never requested.
    pub fn get(&self, coord: TileCoord) -> Option<&TileEntry<I>> {
        self.entries.get(&coord)
    }

    /// Loaded image for a tile
    pub fn image(&self, coord: TileCoord) -> Option<&I> {
        match self.entries.get(&coord) {
            Some(TileEntry::Ready(image)) => Some(image),
            _ => None,
        }
    }

    /// Number of tiles ever requested
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No tile was ever requested
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
