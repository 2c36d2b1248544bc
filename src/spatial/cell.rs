/// Tiled gid bit 31: horizontal flip.
pub const FLIP_H: u32 = 0x8000_0000;
/// Tiled gid bit 30: vertical flip.
pub const FLIP_V: u32 = 0x4000_0000;
/// Tiled gid bit 29: anti-diagonal flip.
pub const FLIP_D: u32 = 0x2000_0000;
/// Gid bits left once the flip flags are stripped.
pub const GID_MASK: u32 = 0x1FFF_FFFF;

const TILE_MASK: i64 = 0xFFFF_FFFF;
const FLIP_X_BIT: i64 = 1 << 32;
const FLIP_Y_BIT: i64 = 1 << 33;
const ROTATE_BIT: i64 = 1 << 34;
const OFFSET_X_SHIFT: u32 = 40;
const OFFSET_Y_SHIFT: u32 = 48;

/// One packed tile reference as stored in a [`StackedGrid`](super::StackedGrid).
///
/// Layout of the raw value: tile id in bits 0..32, flip x / flip y / rotate in
/// bits 32, 33 and 34, signed x and y pixel offsets in bits 40..48 and 48..56.
/// The raw value `-1` is the empty cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell(i64);

impl Cell {
    /// The empty cell, same raw value as [`StackedGrid::EMPTY`](super::StackedGrid::EMPTY).
    pub const EMPTY: Cell = Cell(-1);

    /// A cell showing `tile` without flips or offsets.
    #[inline]
    pub const fn new(tile: u32) -> Self {
        Cell(tile as i64)
    }

    /// Wraps a packed value read from the grid.
    #[inline]
    pub const fn from_raw(raw: i64) -> Self {
        Cell(raw)
    }

    /// Packed value as stored in the grid.
    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// True for the empty cell.
    #[inline]
    pub const fn is_invalid(self) -> bool {
        self.0 == -1
    }

    /// True for anything but the empty cell.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != -1
    }

    /// Tile id into the [`TileSet`](crate::TileSet).
    #[inline]
    pub const fn tile(self) -> u32 {
        (self.0 & TILE_MASK) as u32
    }

    /// Mirrored horizontally.
    #[inline]
    pub const fn flip_x(self) -> bool {
        self.0 & FLIP_X_BIT != 0
    }

    /// Mirrored vertically.
    #[inline]
    pub const fn flip_y(self) -> bool {
        self.0 & FLIP_Y_BIT != 0
    }

    /// Diagonal flip (Tiled's anti-diagonal bit).
    #[inline]
    pub const fn rotate(self) -> bool {
        self.0 & ROTATE_BIT != 0
    }

    /// Horizontal pixel offset.
    #[inline]
    pub const fn offset_x(self) -> i8 {
        ((self.0 >> OFFSET_X_SHIFT) & 0xFF) as u8 as i8
    }

    /// Vertical pixel offset.
    #[inline]
    pub const fn offset_y(self) -> i8 {
        ((self.0 >> OFFSET_Y_SHIFT) & 0xFF) as u8 as i8
    }

    /// Same cell with the given axis flips.
    pub const fn with_flip(self, flip_x: bool, flip_y: bool) -> Self {
        let mut raw = self.0 & !(FLIP_X_BIT | FLIP_Y_BIT);
        if flip_x {
            raw |= FLIP_X_BIT;
        }
        if flip_y {
            raw |= FLIP_Y_BIT;
        }
        Cell(raw)
    }

    /// Same cell with the diagonal flip set or cleared.
    pub const fn with_rotate(self, rotate: bool) -> Self {
        let raw = self.0 & !ROTATE_BIT;
        Cell(if rotate { raw | ROTATE_BIT } else { raw })
    }

    /// Sub-tile pixel nudge, applied before the grid transform.
    pub const fn with_offset(self, offset_x: i8, offset_y: i8) -> Self {
        let cleared = self.0 & !((0xFF << OFFSET_X_SHIFT) | (0xFF << OFFSET_Y_SHIFT));
        Cell(
            cleared
                | ((offset_x as u8 as i64) << OFFSET_X_SHIFT)
                | ((offset_y as u8 as i64) << OFFSET_Y_SHIFT),
        )
    }

    /// Index into the 8-entry UV permutation table.
    #[inline]
    pub const fn transform_index(self) -> usize {
        self.flip_x() as usize | (self.flip_y() as usize) << 1 | (self.rotate() as usize) << 2
    }

    /// Decodes a raw Tiled gid. Gid 0 is the empty cell; the diagonal flag
    /// maps to `rotate`.
    pub const fn from_tiled_gid(raw_gid: u32) -> Self {
        let gid = raw_gid & GID_MASK;
        if gid == 0 {
            return Cell::EMPTY;
        }
        Cell::new(gid)
            .with_flip(raw_gid & FLIP_H != 0, raw_gid & FLIP_V != 0)
            .with_rotate(raw_gid & FLIP_D != 0)
    }
}

impl Default for Cell {
    fn default() -> Self {
        Cell::EMPTY
    }
}

impl From<i64> for Cell {
    fn from(raw: i64) -> Self {
        Cell(raw)
    }
}

impl From<Cell> for i64 {
    fn from(cell: Cell) -> Self {
        cell.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_flags_and_negative_offsets_without_touching_tile() {
        let cell = Cell::new(0xABCD)
            .with_flip(true, false)
            .with_rotate(true)
            .with_offset(-3, 7);

        assert_eq!(cell.tile(), 0xABCD);
        assert!(cell.flip_x());
        assert!(!cell.flip_y());
        assert!(cell.rotate());
        assert_eq!(cell.offset_x(), -3);
        assert_eq!(cell.offset_y(), 7);
        assert!(cell.is_valid());
        assert_eq!(cell.transform_index(), 0b101);
    }

    #[test]
    fn max_tile_with_all_flags_is_still_valid() {
        let cell = Cell::new(u32::MAX)
            .with_flip(true, true)
            .with_rotate(true)
            .with_offset(-1, -1);
        assert!(cell.is_valid());
        assert_eq!(cell.tile(), u32::MAX);
    }

    #[test]
    fn tiled_gid_flags_decode() {
        assert!(Cell::from_tiled_gid(0).is_invalid());
        assert!(Cell::from_tiled_gid(FLIP_H).is_invalid());

        let cell = Cell::from_tiled_gid(5 | FLIP_H | FLIP_D);
        assert_eq!(cell.tile(), 5);
        assert!(cell.flip_x());
        assert!(!cell.flip_y());
        assert!(cell.rotate());
    }
}
