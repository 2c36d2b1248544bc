use crate::error::MapError;
use crate::spatial::{Cell, StackedGrid};
use crate::tileset::TileSet;
use macroquad::math::vec2;
use std::rc::Rc;

/// How tile coordinates outside the grid map back into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TileMapRepeat {
    /// Outside the grid is empty.
    #[default]
    None,
    /// Wraps around, `x mod size`.
    Repeat,
    /// Ping-pongs: `0 1 2 2 1 0 0 1 ...` for size 3.
    Mirror,
}

impl TileMapRepeat {
    /// Maps coordinate `v` on an axis of `size` tiles.
    #[inline]
    pub fn get(self, v: i32, size: usize) -> i32 {
        let size = size as i32;
        match self {
            TileMapRepeat::None => v,
            TileMapRepeat::Repeat => v.rem_euclid(size),
            TileMapRepeat::Mirror => {
                let m = v.rem_euclid(size * 2);
                if m >= size {
                    size * 2 - 1 - m
                } else {
                    m
                }
            }
        }
    }

    /// True for [`TileMapRepeat::None`].
    #[inline]
    pub fn is_none(self) -> bool {
        self == TileMapRepeat::None
    }
}

/// Inclusive-exclusive rectangle of grid cells that ever held a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GridBounds {
    /// First column.
    pub start_x: i32,
    /// First row.
    pub start_y: i32,
    /// One past the last column.
    pub end_x: i32,
    /// One past the last row.
    pub end_y: i32,
}

impl GridBounds {
    /// True until a cell has been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start_x >= self.end_x || self.start_y >= self.end_y
    }

    /// True if `(x, y)` lies inside.
    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.start_x && x < self.end_x && y >= self.start_y && y < self.end_y
    }

    fn include(&mut self, x: i32, y: i32) {
        if self.is_empty() {
            *self = GridBounds {
                start_x: x,
                start_y: y,
                end_x: x + 1,
                end_y: y + 1,
            };
        } else {
            self.start_x = self.start_x.min(x);
            self.start_y = self.start_y.min(y);
            self.end_x = self.end_x.max(x + 1);
            self.end_y = self.end_y.max(y + 1);
        }
    }
}

/// A stacked tile grid plus the tile set it indexes and its repeat modes.
///
/// Every edit that changes the grid bumps [`content_version`](Self::content_version),
/// which renderers compare against to decide whether cached vertices are stale.
/// Edits must happen between render ticks.
#[derive(Debug, Clone)]
pub struct TileMapData {
    grid: StackedGrid,
    tileset: Rc<TileSet>,
    repeat_x: TileMapRepeat,
    repeat_y: TileMapRepeat,
    content_version: u64,
    // Grow-only: removing cells never shrinks it.
    bounds: GridBounds,
}

impl TileMapData {
    /// Empty `width` x `height` grid without repeat.
    ///
    /// Fails with [`MapError::EmptyGrid`] if either dimension is zero.
    pub fn new(width: usize, height: usize, tileset: Rc<TileSet>) -> Result<Self, MapError> {
        Ok(Self {
            grid: StackedGrid::new(width, height)?,
            tileset,
            repeat_x: TileMapRepeat::None,
            repeat_y: TileMapRepeat::None,
            content_version: 0,
            bounds: GridBounds::default(),
        })
    }

    /// Builder form of [`set_repeat`](Self::set_repeat).
    pub fn with_repeat(mut self, repeat_x: TileMapRepeat, repeat_y: TileMapRepeat) -> Self {
        self.set_repeat(repeat_x, repeat_y);
        self
    }

    /// Width in tiles.
    #[inline]
    pub fn width(&self) -> usize {
        self.grid.width()
    }

    /// Height in tiles.
    #[inline]
    pub fn height(&self) -> usize {
        self.grid.height()
    }

    /// The underlying stacked grid.
    #[inline]
    pub fn grid(&self) -> &StackedGrid {
        &self.grid
    }

    /// Tile set the cells index into.
    #[inline]
    pub fn tileset(&self) -> &Rc<TileSet> {
        &self.tileset
    }

    /// Horizontal repeat mode.
    #[inline]
    pub fn repeat_x(&self) -> TileMapRepeat {
        self.repeat_x
    }

    /// Vertical repeat mode.
    #[inline]
    pub fn repeat_y(&self) -> TileMapRepeat {
        self.repeat_y
    }

    /// Counter of edits; strictly grows with every successful mutation.
    #[inline]
    pub fn content_version(&self) -> u64 {
        self.content_version
    }

    /// Cells that ever held a value. Grow-only.
    #[inline]
    pub fn bounds(&self) -> GridBounds {
        self.bounds
    }

    /// Deepest stack in the grid.
    #[inline]
    pub fn max_level(&self) -> usize {
        self.grid.max_level()
    }

    /// Changes the repeat modes. Only an actual change bumps the version.
    pub fn set_repeat(&mut self, repeat_x: TileMapRepeat, repeat_y: TileMapRepeat) {
        if (repeat_x, repeat_y) != (self.repeat_x, self.repeat_y) {
            self.repeat_x = repeat_x;
            self.repeat_y = repeat_y;
            self.content_version += 1;
        }
    }

    /// Swaps the tile set; renderers reset their per-tile state when they see it.
    pub fn set_tileset(&mut self, tileset: Rc<TileSet>) {
        self.tileset = tileset;
    }

    /// Stacks `cell` on top of `(x, y)`.
    pub fn push(&mut self, x: i32, y: i32, cell: Cell) -> Result<(), MapError> {
        self.grid.push(x, y, cell.raw())?;
        self.bounds.include(x, y);
        self.content_version += 1;
        Ok(())
    }

    /// Pops the top cell of `(x, y)`. `None` when the stack is empty or
    /// the coordinate is outside, which leaves the version alone.
    pub fn remove_last(&mut self, x: i32, y: i32) -> Option<Cell> {
        let removed = self.grid.remove_last(x, y)?;
        self.content_version += 1;
        Some(Cell::from_raw(removed))
    }

    /// Overwrites `level` at `(x, y)`, or pushes when `level` is the stack depth.
    ///
    /// Every successful call bumps the version, even if the value is unchanged.
    pub fn set(&mut self, x: i32, y: i32, level: usize, cell: Cell) -> Result<(), MapError> {
        self.grid.set(x, y, level, cell.raw())?;
        self.bounds.include(x, y);
        self.content_version += 1;
        Ok(())
    }

    /// Empties `(x, y)`, returning how many cells were dropped.
    pub fn clear_cell(&mut self, x: i32, y: i32) -> usize {
        let dropped = self.grid.clear_cell(x, y);
        if dropped > 0 {
            self.content_version += 1;
        }
        dropped
    }

    /// Wraps `(x, y)` through the repeat modes into grid coordinates.
    #[inline]
    pub fn wrap(&self, x: i32, y: i32) -> (i32, i32) {
        (
            self.repeat_x.get(x, self.width()),
            self.repeat_y.get(y, self.height()),
        )
    }

    /// Stack depth at the wrapped coordinate.
    pub fn get_stack_level(&self, x: i32, y: i32) -> usize {
        let (rx, ry) = self.wrap(x, y);
        self.grid.get_stack_level(rx, ry)
    }

    /// Cell at the wrapped coordinate, [`Cell::EMPTY`] when absent.
    pub fn get(&self, x: i32, y: i32, level: usize) -> Cell {
        let (rx, ry) = self.wrap(x, y);
        Cell::from_raw(self.grid.get(rx, ry, level))
    }

    /// Bottom cell at the wrapped coordinate.
    pub fn get_first(&self, x: i32, y: i32) -> Cell {
        self.get(x, y, 0)
    }

    /// Top cell at the wrapped coordinate.
    pub fn get_last(&self, x: i32, y: i32) -> Cell {
        let (rx, ry) = self.wrap(x, y);
        Cell::from_raw(self.grid.get_last(rx, ry))
    }

    /// Collision test at map pixel `(x, y)`. Anything outside the grid counts as
    /// solid so level borders block movement; empty cells never do.
    pub fn pixel_hit_test(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 {
            return true;
        }
        let tw = self.tileset.tile_width() as i32;
        let th = self.tileset.tile_height() as i32;
        self.tile_hit_test(x / tw, y / th, x % tw, y % th)
    }

    /// Collision test of tile-local pixel `(px, py)` against the top cell of
    /// tile `(tile_x, tile_y)`.
    pub fn tile_hit_test(&self, tile_x: i32, tile_y: i32, px: i32, py: i32) -> bool {
        if !self.grid.inside(tile_x, tile_y) {
            return true;
        }
        let cell = Cell::from_raw(self.grid.get_last(tile_x, tile_y));
        if cell.is_invalid() {
            return false;
        }
        // TODO: map (px, py) through the cell's flip/rotate before testing.
        let point = vec2(px as f32, py as f32);
        self.tileset
            .info(cell.tile())
            .is_some_and(|info| info.collision.iter().any(|r| r.contains(point)))
    }
}
