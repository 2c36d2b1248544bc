use crate::error::MapError;

/// 2D grid where every coordinate holds an ordered stack of raw cell values.
///
/// Levels are stored as whole planes: plane `n` holds level `n` for every
/// coordinate, and a separate plane holds each coordinate's stack depth. A new
/// plane is only allocated when some stack grows past the deepest level seen
/// so far, so pushing onto a cell never allocates per cell.
#[derive(Debug, Clone)]
pub struct StackedGrid {
    width: usize,
    height: usize,
    levels: Vec<Vec<i64>>,
    depth: Vec<u32>,
}

impl StackedGrid {
    /// Value returned for empty stacks and coordinates outside the grid.
    pub const EMPTY: i64 = -1;

    /// Creates an empty `width x height` grid. Both dimensions must be non-zero.
    pub fn new(width: usize, height: usize) -> Result<Self, MapError> {
        if width == 0 || height == 0 {
            return Err(MapError::EmptyGrid { width, height });
        }
        Ok(Self {
            width,
            height,
            levels: Vec::new(),
            depth: vec![0; width * height],
        })
    }

    /// Width in tiles.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in tiles.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of level planes allocated, i.e. the deepest stack ever pushed.
    #[inline]
    pub fn max_level(&self) -> usize {
        self.levels.len()
    }

    /// True if `(x, y)` is a cell of the grid.
    #[inline]
    pub fn inside(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if self.inside(x, y) {
            Some(y as usize * self.width + x as usize)
        } else {
            None
        }
    }

    fn out_of_bounds(&self, x: i32, y: i32) -> MapError {
        MapError::OutOfBounds {
            x,
            y,
            width: self.width,
            height: self.height,
        }
    }

    /// Stack depth at `(x, y)`; zero outside the grid.
    #[inline]
    pub fn get_stack_level(&self, x: i32, y: i32) -> usize {
        self.index(x, y).map_or(0, |i| self.depth[i] as usize)
    }

    /// Value at `level`, or [`Self::EMPTY`] past the top of the stack.
    #[inline]
    pub fn get(&self, x: i32, y: i32, level: usize) -> i64 {
        match self.index(x, y) {
            Some(i) if level < self.depth[i] as usize => self.levels[level][i],
            _ => Self::EMPTY,
        }
    }

    /// Bottom value of the stack.
    #[inline]
    pub fn get_first(&self, x: i32, y: i32) -> i64 {
        self.get(x, y, 0)
    }

    /// Top value of the stack.
    #[inline]
    pub fn get_last(&self, x: i32, y: i32) -> i64 {
        match self.index(x, y) {
            Some(i) if self.depth[i] > 0 => self.levels[self.depth[i] as usize - 1][i],
            _ => Self::EMPTY,
        }
    }

    /// Stacks `value` on `(x, y)`; fails outside the grid.
    pub fn push(&mut self, x: i32, y: i32, value: i64) -> Result<(), MapError> {
        let i = self.index(x, y).ok_or_else(|| self.out_of_bounds(x, y))?;
        let level = self.depth[i] as usize;
        self.ensure_level(level);
        self.levels[level][i] = value;
        self.depth[i] += 1;
        Ok(())
    }

    /// Removes and returns the top value. `None` for empty stacks and
    /// coordinates outside the grid.
    pub fn remove_last(&mut self, x: i32, y: i32) -> Option<i64> {
        let i = self.index(x, y)?;
        if self.depth[i] == 0 {
            return None;
        }
        self.depth[i] -= 1;
        let level = self.depth[i] as usize;
        Some(self.levels[level][i])
    }

    /// Overwrites `level`; `level == get_stack_level(x, y)` pushes instead.
    pub fn set(&mut self, x: i32, y: i32, level: usize, value: i64) -> Result<(), MapError> {
        let i = self.index(x, y).ok_or_else(|| self.out_of_bounds(x, y))?;
        let depth = self.depth[i] as usize;
        if level < depth {
            self.levels[level][i] = value;
            Ok(())
        } else if level == depth {
            self.push(x, y, value)
        } else {
            Err(MapError::InvalidLevel {
                x,
                y,
                level,
                stack_level: depth,
            })
        }
    }

    /// Empties the stack at `(x, y)`; returns how many values were dropped.
    pub fn clear_cell(&mut self, x: i32, y: i32) -> usize {
        match self.index(x, y) {
            Some(i) => std::mem::take(&mut self.depth[i]) as usize,
            None => 0,
        }
    }

    /// Values at `(x, y)` from bottom to top.
    pub fn levels(&self, x: i32, y: i32) -> impl Iterator<Item = i64> + '_ {
        let (i, depth) = match self.index(x, y) {
            Some(i) => (i, self.depth[i] as usize),
            None => (0, 0),
        };
        self.levels[..depth].iter().map(move |plane| plane[i])
    }

    fn ensure_level(&mut self, level: usize) {
        while self.levels.len() <= level {
            self.levels.push(vec![Self::EMPTY; self.width * self.height]);
        }
    }
}
