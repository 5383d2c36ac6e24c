use crate::camera::ViewCamera;
use crate::geom::WorldRect;
use crate::spatial::index::{Chunk, ChunkIndex};
use macroquad::prelude::*;

const CULL_MARGIN_CHUNKS: f32 = 1.0;

/// Result of a visibility query.
pub struct LocalView<'g> {
    /// Visible chunks, (y, x) order
    pub chunks: Vec<&'g Chunk>,
}

impl<'g> LocalView<'g> {
    /// Number of visible chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Nothing in view
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Chunks visible through `camera` in a viewport of `size` pixels.
pub fn query_visible<'g>(index: &'g ChunkIndex, camera: &ViewCamera, size: Vec2) -> LocalView<'g> {
    query_visible_rect(index, &camera.visible_world_rect(size))
}

/// Chunks overlapping `view` padded by one chunk, in stable (y, x) order.
pub fn query_visible_rect<'g>(index: &'g ChunkIndex, view: &WorldRect) -> LocalView<'g> {
    let padded = view.padded(CULL_MARGIN_CHUNKS);
    let mut chunks: Vec<&Chunk> = index
        .candidates(&padded)
        .filter(|c| padded.overlaps_cell(c.x, c.y))
        .collect();
    chunks.sort_by_key(|c| (c.y, c.x));

    LocalView { chunks }
}
