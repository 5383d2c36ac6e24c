use macroquad::prelude::*;

/// Axis-aligned rectangle in world units, always stored normalized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldRect {
    /// Smallest corner
    pub min: Vec2,
    /// Largest corner
    pub max: Vec2,
}

impl WorldRect {
    /// Build from two arbitrary corners (e.g. drag start and end).
    pub fn from_corners(a: Vec2, b: Vec2) -> Self {
        WorldRect {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Width in world units
    #[inline]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    /// Height in world units
    #[inline]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Midpoint of the rectangle
    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Whether the unit cell with top-left corner `(x, y)` overlaps this rectangle.
    /// Touching edges do not count.
    #[inline]
    pub fn overlaps_cell(&self, x: i32, y: i32) -> bool {
        let (fx, fy) = (x as f32, y as f32);
        fx + 1.0 > self.min.x && fx < self.max.x && fy + 1.0 > self.min.y && fy < self.max.y
    }

    /// Grow the rectangle by `pad` world units on every side.
    pub fn padded(&self, pad: f32) -> Self {
        WorldRect {
            min: self.min - Vec2::splat(pad),
            max: self.max + Vec2::splat(pad),
        }
    }

    /// Integer cell range `(min, max)` inclusive touched by this rectangle.
    pub fn cell_range(&self) -> ((i32, i32), (i32, i32)) {
        (
            (self.min.x.floor() as i32, self.min.y.floor() as i32),
            (self.max.x.floor() as i32, self.max.y.floor() as i32),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_corners_normalizes() {
        let r = WorldRect::from_corners(vec2(3.0, -1.0), vec2(-2.0, 4.0));
        assert_eq!(r.min, vec2(-2.0, -1.0));
        assert_eq!(r.max, vec2(3.0, 4.0));
    }

    #[test]
    fn touching_edge_is_not_overlap() {
        let r = WorldRect::from_corners(vec2(1.0, 1.0), vec2(2.0, 2.0));
        assert!(r.overlaps_cell(1, 1));
        assert!(!r.overlaps_cell(0, 1));
        assert!(!r.overlaps_cell(2, 1));
    }
}
