//! Screen <-> world transform for the chunk map.
//!
//! World space is chunk-indexed (one unit per chunk, +y down like the screen).
//! `screen = world * scale + offset`.

use crate::geom::WorldRect;
use crate::spatial::index::Bounds;
use macroquad::prelude::*;

/// Smallest allowed pixels-per-chunk.
pub const MIN_SCALE: f32 = 0.05;
/// Largest allowed pixels-per-chunk.
pub const MAX_SCALE: f32 = 48.0;

/// Pan/zoom state of the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewCamera {
    scale: f32,
    /// Screen position of world origin, in pixels
    pub offset: Vec2,
    min_scale: f32,
    max_scale: f32,
}

impl Default for ViewCamera {
    fn default() -> Self {
        Self::new(MIN_SCALE, MAX_SCALE)
    }
}

impl ViewCamera {
    /// Camera at scale 1 with the given clamp range.
    pub fn new(min_scale: f32, max_scale: f32) -> Self {
        ViewCamera {
            scale: 1.0_f32.clamp(min_scale, max_scale),
            offset: Vec2::ZERO,
            min_scale,
            max_scale,
        }
    }

    /// Screen pixels per world unit
    #[inline]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Clamp range `(min, max)`
    pub fn limits(&self) -> (f32, f32) {
        (self.min_scale, self.max_scale)
    }

    /// Set the scale directly, clamped.
    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale.clamp(self.min_scale, self.max_scale);
    }

    /// Pixel position to world units
    #[inline]
    pub fn screen_to_world(&self, s: Vec2) -> Vec2 {
        (s - self.offset) / self.scale
    }

    /// World units to pixel position
    #[inline]
    pub fn world_to_screen(&self, w: Vec2) -> Vec2 {
        w * self.scale + self.offset
    }

    /// Screen-space rectangle of the unit cell at `(x, y)`.
    pub fn cell_rect(&self, x: i32, y: i32) -> Rect {
        let p = self.world_to_screen(vec2(x as f32, y as f32));
        Rect::new(p.x, p.y, self.scale, self.scale)
    }

    /// Screen-space rectangle of an arbitrary world rectangle.
    pub fn world_rect_to_screen(&self, r: &WorldRect) -> Rect {
        let a = self.world_to_screen(r.min);
        let b = self.world_to_screen(r.max);
        Rect::new(a.x, a.y, b.x - a.x, b.y - a.y)
    }

    /// World rectangle currently visible in a viewport of `size` pixels.
    pub fn visible_world_rect(&self, size: Vec2) -> WorldRect {
        WorldRect::from_corners(self.screen_to_world(Vec2::ZERO), self.screen_to_world(size))
    }

    /// Move the view by a screen-space delta.
    pub fn pan_by(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Scale by `factor` keeping the world point under `screen` fixed.
    pub fn zoom_at(&mut self, screen: Vec2, factor: f32) {
        let anchor = self.screen_to_world(screen);
        self.set_scale(self.scale * factor);
        self.offset = screen - anchor * self.scale;
    }

    /// Largest clamped scale at which `bounds` plus `padding` pixels fits in
    /// `viewport`, centered.
    pub fn fit_to_bounds(&mut self, bounds: &Bounds, viewport: Vec2, padding: f32) {
        let w = bounds.width() as f32;
        let h = bounds.height() as f32;
        let avail_w = (viewport.x - 2.0 * padding).max(1.0);
        let avail_h = (viewport.y - 2.0 * padding).max(1.0);

        self.set_scale((avail_w / w).min(avail_h / h));
        self.center_on(bounds.world_rect().center(), viewport);
    }

    /// Put world point `world` at the middle of the viewport.
    pub fn center_on(&mut self, world: Vec2, viewport: Vec2) {
        self.offset = viewport * 0.5 - world * self.scale;
    }
}
