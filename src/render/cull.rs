use crate::map::TileMapData;
use macroquad::math::{vec2, Affine2, Rect, Vec2};

/// Half-open range of tile coordinates `[x_min, x_max) x [y_min, y_max)`.
/// Coordinates are pre-wrap: with repeat enabled they may lie outside the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileRange {
    /// First column.
    pub x_min: i32,
    /// Exclusive.
    pub x_max: i32,
    /// First row.
    pub y_min: i32,
    /// Exclusive.
    pub y_max: i32,
}

impl TileRange {
    /// Covers nothing.
    pub const EMPTY: TileRange = TileRange {
        x_min: 0,
        x_max: 0,
        y_min: 0,
        y_max: 0,
    };

    /// True if no tile has a slot.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x_min >= self.x_max || self.y_min >= self.y_max
    }

    /// True if tile `(x, y)` is inside the range.
    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x_min && x < self.x_max && y >= self.y_min && y < self.y_max
    }
}

/// Tile coordinates covering `viewport` (world space) for a grid drawn with
/// `transform` (grid pixels to world).
///
/// All four viewport corners are mapped back into grid space, so rotated or
/// skewed grids get a conservative axis-aligned range. The range is padded by
/// `overdraw` tiles and clamped to the populated bounds on axes that do not
/// repeat.
pub fn visible_tile_range(
    data: &TileMapData,
    viewport: Rect,
    transform: &Affine2,
    tile_size: Vec2,
    overdraw: u32,
) -> TileRange {
    if transform.matrix2.determinant().abs() <= f32::EPSILON {
        return TileRange::EMPTY;
    }
    let inverse = transform.inverse();

    let corners = [
        vec2(viewport.x, viewport.y),
        vec2(viewport.x + viewport.w, viewport.y),
        vec2(viewport.x + viewport.w, viewport.y + viewport.h),
        vec2(viewport.x, viewport.y + viewport.h),
    ];

    let mut min = Vec2::splat(f32::INFINITY);
    let mut max = Vec2::splat(f32::NEG_INFINITY);
    for corner in corners {
        let local = inverse.transform_point2(corner) / tile_size;
        if !local.is_finite() {
            return TileRange::EMPTY;
        }
        min = min.min(local);
        max = max.max(local);
    }

    // floor(max) + 1 also keeps tiles whose edge lies exactly on the boundary.
    let pad = overdraw as i32;
    let mut range = TileRange {
        x_min: (min.x.floor() as i32).saturating_sub(pad),
        x_max: (max.x.floor() as i32).saturating_add(1 + pad),
        y_min: (min.y.floor() as i32).saturating_sub(pad),
        y_max: (max.y.floor() as i32).saturating_add(1 + pad),
    };

    let bounds = data.bounds();
    if data.repeat_x().is_none() {
        range.x_min = range.x_min.clamp(bounds.start_x, bounds.end_x);
        range.x_max = range.x_max.clamp(bounds.start_x, bounds.end_x);
    }
    if data.repeat_y().is_none() {
        range.y_min = range.y_min.clamp(bounds.start_y, bounds.end_y);
        range.y_max = range.y_max.clamp(bounds.start_y, bounds.end_y);
    }
    range
}
