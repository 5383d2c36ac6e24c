use crate::geom::WorldRect;
use crate::spatial::index::{ChunkCoord, ChunkIndex};
use macroquad::prelude::*;
use std::collections::HashSet;

/// Below this extent on both axes a drag commits as a click.
pub const DEFAULT_CLICK_THRESHOLD: f32 = 0.5;

/// In-progress selection rectangle, in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragRect {
    /// Where the primary button went down
    pub start: Vec2,
    /// Latest pointer position
    pub end: Vec2,
}

impl DragRect {
    /// Zero-sized drag at `p`
    pub fn at(p: Vec2) -> Self {
        DragRect { start: p, end: p }
    }

    /// Normalized rectangle
    pub fn rect(&self) -> WorldRect {
        WorldRect::from_corners(self.start, self.end)
    }
}

/// What a commit did to the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Click on an empty cell
    Nothing,
    /// Click toggled (or force-removed) one chunk; `selected` is its new state
    Clicked { coord: ChunkCoord, selected: bool },
    /// Region added or subtracted `matched` chunks
    Region { matched: usize, subtract: bool },
}

/// Set of selected chunk coordinates.
///
/// Keys are not checked against the index; stale ones simply match nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    keys: HashSet<ChunkCoord>,
}

impl Selection {
    /// Nothing selected
    pub fn new() -> Self {
        Self::default()
    }

    /// Selected coordinates
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Nothing selected
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// `coord` is selected
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.keys.contains(&coord)
    }

    /// Selected coordinates, unordered
    pub fn iter(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.keys.iter().copied()
    }

    /// Selection keys in `"x_y"` form, sorted by (y, x).
    pub fn keys(&self) -> Vec<String> {
        let mut coords: Vec<ChunkCoord> = self.iter().collect();
        coords.sort_by_key(|c| (c.y, c.x));
        coords.into_iter().map(ChunkCoord::key).collect()
    }

    /// Add `coord`; `false` if it was already selected
    pub fn insert(&mut self, coord: ChunkCoord) -> bool {
        self.keys.insert(coord)
    }

    /// Drop `coord`; `false` if it was not selected
    pub fn remove(&mut self, coord: ChunkCoord) -> bool {
        self.keys.remove(&coord)
    }

    /// Flip membership; returns the new state.
    pub fn toggle(&mut self, coord: ChunkCoord) -> bool {
        if self.keys.remove(&coord) {
            false
        } else {
            self.keys.insert(coord);
            true
        }
    }

    /// Deselect everything
    pub fn clear(&mut self) {
        self.keys.clear();
    }

    /// Select every loaded chunk.
    pub fn select_all(&mut self, index: &ChunkIndex) {
        self.keys = index.coords().collect();
    }

    /// Complement against the loaded chunk set. Stale keys are dropped.
    pub fn invert(&mut self, index: &ChunkIndex) {
        self.keys = index.coords().filter(|c| !self.keys.contains(c)).collect();
    }

    /// Drop keys that are no longer loaded.
    pub fn retain_loaded(&mut self, index: &ChunkIndex) {
        self.keys.retain(|c| index.contains(*c));
    }

    /// Apply a finished drag.
    ///
    /// Small drags act on the single chunk under the drag midpoint: toggle, or
    /// remove when `subtract` is held. Larger drags add (or subtract) every
    /// chunk whose unit square overlaps the rectangle; they never toggle.
    pub fn commit(
        &mut self,
        index: &ChunkIndex,
        drag: &DragRect,
        subtract: bool,
        click_threshold: f32,
    ) -> CommitOutcome {
        let rect = drag.rect();

        if rect.width() < click_threshold && rect.height() < click_threshold {
            let coord = ChunkCoord::containing(rect.center());
            if !index.contains(coord) {
                return CommitOutcome::Nothing;
            }
            let selected = if subtract {
                self.remove(coord);
                false
            } else {
                self.toggle(coord)
            };
            return CommitOutcome::Clicked { coord, selected };
        }

        let mut matched = 0;
        for chunk in index.overlapping(&rect) {
            matched += 1;
            if subtract {
                self.keys.remove(&chunk.coord());
            } else {
                self.keys.insert(chunk.coord());
            }
        }
        CommitOutcome::Region { matched, subtract }
    }
}

/// Number of loaded chunks a rectangle would touch; drives the live drag label.
pub fn count_in_rect(index: &ChunkIndex, rect: &WorldRect) -> usize {
    index.overlapping(rect).count()
}
