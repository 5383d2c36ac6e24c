//! State snapshot -> draw command list. No I/O, no window access.

use crate::camera::ViewCamera;
use crate::command::DrawCommand;
use crate::render::cull::query_visible;
use crate::render::hud::{push_hud, HudState};
use crate::selection::{count_in_rect, DragRect, Selection};
use crate::spatial::index::{Chunk, ChunkCoord, ChunkIndex};
use crate::tile_cache::TileCache;
use macroquad::prelude::*;

/// Clear color behind the map
pub const BACKGROUND: Color = Color::new(0.07, 0.08, 0.09, 1.0);
/// Fill of selected chunks
pub const SELECTED: Color = Color::new(0.95, 0.3, 0.22, 0.9);
/// Outline of the hovered cell
pub const HOVER: Color = Color::new(1.0, 1.0, 1.0, 0.9);
const GRID: Color = Color::new(0.0, 0.0, 0.0, 0.35);
const DRAG_ADD_FILL: Color = Color::new(0.3, 0.6, 1.0, 0.2);
const DRAG_ADD_EDGE: Color = Color::new(0.4, 0.7, 1.0, 0.9);
const DRAG_SUB_FILL: Color = Color::new(1.0, 0.35, 0.3, 0.2);
const DRAG_SUB_EDGE: Color = Color::new(1.0, 0.45, 0.4, 0.9);

/// Chunk outlines appear from this many pixels per chunk.
const GRID_MIN_SCALE: f32 = 12.0;

const TAG_PALETTE: [Color; 6] = [
    Color::new(0.35, 0.62, 0.4, 0.85),
    Color::new(0.36, 0.5, 0.75, 0.85),
    Color::new(0.7, 0.6, 0.3, 0.85),
    Color::new(0.55, 0.4, 0.7, 0.85),
    Color::new(0.3, 0.65, 0.65, 0.85),
    Color::new(0.6, 0.6, 0.6, 0.85),
];

/// Pointer-derived transient state.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerSnapshot {
    /// World point under the pointer
    pub hover: Option<Vec2>,
    /// Selection rectangle being dragged
    pub drag: Option<DragRect>,
    /// Subtract modifier held
    pub subtract: bool,
}

/// Everything one frame is drawn from.
pub struct RenderInput<'a, I> {
    /// View transform
    pub camera: &'a ViewCamera,
    /// Chunks to draw
    pub index: &'a ChunkIndex,
    /// Background tiles
    pub tiles: &'a TileCache<I>,
    /// Highlighted chunks
    pub selection: &'a Selection,
    /// Hover and drag
    pub pointer: PointerSnapshot,
    /// Canvas size, pixels
    pub viewport: Vec2,
    /// Overlay text
    pub hud: HudState<'a>,
}

/// Stable color per source tag.
pub fn tag_color(tag: &str) -> Color {
    let h = tag
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
    TAG_PALETTE[h as usize % TAG_PALETTE.len()]
}

/// Paint one frame.
pub fn render_viewport<I>(input: &RenderInput<'_, I>) -> Vec<DrawCommand> {
    let cam = input.camera;
    let mut out = vec![DrawCommand::Clear(BACKGROUND)];

    if input.tiles.visible_at(cam.scale()) {
        let view = cam.visible_world_rect(input.viewport);
        for tile in input.tiles.tiles_covering(&view) {
            if input.tiles.image(tile).is_some() {
                out.push(DrawCommand::Image {
                    tile,
                    dest: cam.world_rect_to_screen(&input.tiles.tile_world_rect(tile)),
                });
            }
        }
    }

    let visible = query_visible(input.index, cam, input.viewport);
    // sub-pixel chunks still get one pixel so sparse saves stay visible
    let side = cam.scale().max(1.0);
    for chunk in &visible.chunks {
        let mut rect = cam.cell_rect(chunk.x, chunk.y);
        rect.w = side;
        rect.h = side;
        let color = if input.selection.contains(chunk.coord()) {
            SELECTED
        } else {
            tag_color(&chunk.source_tag)
        };
        out.push(DrawCommand::FillRect { rect, color });
    }

    if cam.scale() >= GRID_MIN_SCALE {
        for chunk in &visible.chunks {
            out.push(DrawCommand::StrokeRect {
                rect: cam.cell_rect(chunk.x, chunk.y),
                thickness: 1.0,
                color: GRID,
            });
        }
    }

    if let Some(coord) = input.pointer.hover.map(ChunkCoord::containing) {
        if input.index.contains(coord) {
            let mut rect = cam.cell_rect(coord.x, coord.y);
            rect.w = side;
            rect.h = side;
            out.push(DrawCommand::StrokeRect {
                rect,
                thickness: 2.0,
                color: HOVER,
            });
        }
    }

    if let Some(drag) = input.pointer.drag {
        push_drag_preview(&mut out, input, &drag);
    }

    push_hud(&mut out, &input.hud, input.viewport);
    out
}

fn push_drag_preview<I>(out: &mut Vec<DrawCommand>, input: &RenderInput<'_, I>, drag: &DragRect) {
    let rect = drag.rect();
    let screen = input.camera.world_rect_to_screen(&rect);
    let (fill, edge) = if input.pointer.subtract {
        (DRAG_SUB_FILL, DRAG_SUB_EDGE)
    } else {
        (DRAG_ADD_FILL, DRAG_ADD_EDGE)
    };
    out.push(DrawCommand::FillRect { rect: screen, color: fill });
    out.push(DrawCommand::StrokeRect {
        rect: screen,
        thickness: 1.5,
        color: edge,
    });

    let count = count_in_rect(input.index, &rect);
    let label = input.camera.world_to_screen(drag.end) + vec2(12.0, -8.0);
    out.push(DrawCommand::Text {
        text: format!("{} chunks", count),
        pos: label,
        size: 18.0,
        color: edge,
    });
}

/// HUD hover entry for a world point.
pub fn hover_target(index: &ChunkIndex, hover: Option<Vec2>) -> Option<(ChunkCoord, Option<&Chunk>)> {
    let coord = ChunkCoord::containing(hover?);
    Some((coord, index.get(coord)))
}
