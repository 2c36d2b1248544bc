use crate::error::MapError;
use macroquad::math::{vec2, Rect, Vec2};

/// Index of a texture atlas page. Tile regions reference atlases by id so the
/// geometry side never needs a live GPU texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtlasId(pub u16);

/// A tile's sub-rectangle of an atlas, in normalized UV space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureRegion {
    /// Atlas page.
    pub atlas: AtlasId,
    /// Normalized rectangle inside the atlas.
    pub uv: Rect,
}

impl TextureRegion {
    /// Region from normalized coordinates.
    pub fn new(atlas: AtlasId, uv: Rect) -> Self {
        Self { atlas, uv }
    }

    /// Region from a pixel rectangle of an `atlas_size` image.
    pub fn from_pixels(atlas: AtlasId, px: Rect, atlas_size: Vec2) -> Self {
        Self {
            atlas,
            uv: Rect::new(
                px.x / atlas_size.x,
                px.y / atlas_size.y,
                px.w / atlas_size.x,
                px.h / atlas_size.y,
            ),
        }
    }

    /// UVs in TL, TR, BR, BL order.
    #[inline]
    pub fn corners(&self) -> [Vec2; 4] {
        let Rect { x, y, w, h } = self.uv;
        [
            vec2(x, y),
            vec2(x + w, y),
            vec2(x + w, y + h),
            vec2(x, y + h),
        ]
    }
}

/// One step of a tile animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationFrame {
    /// Tile whose texture is displayed during this frame.
    pub tile_id: u32,
    /// How long the frame shows.
    pub duration_ms: u32,
}

/// Per-tile metadata besides its texture.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileInfo {
    /// Animation frames; empty for static tiles.
    pub frames: Vec<AnimationFrame>,
    /// Solid areas in tile-local pixels.
    pub collision: Vec<Rect>,
}

/// Atlas laid out as a regular grid of tiles.
#[derive(Debug, Clone, Copy)]
pub struct AtlasGrid {
    /// Atlas page the grid lives on.
    pub atlas: AtlasId,
    /// Tile id of the atlas' first cell.
    pub first_id: u32,
    /// Tiles in the atlas.
    pub tile_count: u32,
    /// Tiles per atlas row.
    pub columns: u32,
    /// Tile width in pixels.
    pub tile_w: u32,
    /// Tile height in pixels.
    pub tile_h: u32,
    /// Pixels between neighbouring tiles.
    pub spacing: u32,
    /// Pixels around the tile area.
    pub margin: u32,
    /// Atlas size in pixels.
    pub image_size: Vec2,
}

/// Tile id to texture / animation / collision lookup, shared by the map
/// data and the renderer.
#[derive(Debug, Clone)]
pub struct TileSet {
    tile_width: u32,
    tile_height: u32,
    textures: Vec<Option<TextureRegion>>,
    infos: Vec<Option<TileInfo>>,
}

impl TileSet {
    /// Largest id [`add_atlas_grid`](Self::add_atlas_grid) accepts. Slots are
    /// dense, so this also bounds the lookup tables.
    pub const MAX_TILE_ID: u32 = (1 << 20) - 1;

    /// Empty tile set; fails with [`MapError::InvalidTileSize`] on a zero size.
    pub fn new(tile_width: u32, tile_height: u32) -> Result<Self, MapError> {
        if tile_width == 0 || tile_height == 0 {
            return Err(MapError::InvalidTileSize {
                width: tile_width,
                height: tile_height,
            });
        }
        Ok(Self {
            tile_width,
            tile_height,
            textures: Vec::new(),
            infos: Vec::new(),
        })
    }

    /// Tile width in pixels.
    #[inline]
    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    /// Tile height in pixels.
    #[inline]
    pub fn tile_height(&self) -> u32 {
        self.tile_height
    }

    /// Tile size in pixels as a vector.
    #[inline]
    pub fn tile_size(&self) -> Vec2 {
        vec2(self.tile_width as f32, self.tile_height as f32)
    }

    /// One past the largest tile id with a slot.
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// True if no tile has a slot.
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    fn grow(&mut self, id: u32) {
        let needed = id as usize + 1;
        if self.textures.len() < needed {
            self.textures.resize(needed, None);
            self.infos.resize(needed, None);
        }
    }

    /// Sets the texture of tile `id`, growing the table as needed.
    pub fn set_texture(&mut self, id: u32, region: TextureRegion) {
        self.grow(id);
        self.textures[id as usize] = Some(region);
    }

    /// Marks a tile as not loaded; the renderer skips it until it is set again.
    pub fn clear_texture(&mut self, id: u32) {
        if let Some(slot) = self.textures.get_mut(id as usize) {
            *slot = None;
        }
    }

    /// Replaces the frames of tile `id`.
    pub fn set_animation(&mut self, id: u32, frames: Vec<AnimationFrame>) {
        self.grow(id);
        self.infos[id as usize]
            .get_or_insert_with(TileInfo::default)
            .frames = frames;
    }

    /// Adds a solid rectangle (tile-local pixels) to tile `id`.
    pub fn add_collision(&mut self, id: u32, rect: Rect) {
        self.grow(id);
        self.infos[id as usize]
            .get_or_insert_with(TileInfo::default)
            .collision
            .push(rect);
    }

    /// Texture of tile `id`, `None` when not loaded.
    #[inline]
    pub fn texture(&self, id: u32) -> Option<&TextureRegion> {
        self.textures.get(id as usize).and_then(Option::as_ref)
    }

    /// Animation and collision data of tile `id`.
    #[inline]
    pub fn info(&self, id: u32) -> Option<&TileInfo> {
        self.infos.get(id as usize).and_then(Option::as_ref)
    }

    /// All slots in id order, `None` for unloaded tiles.
    pub fn textures(&self) -> &[Option<TextureRegion>] {
        &self.textures
    }

    /// Per-tile metadata in id order.
    pub fn infos(&self) -> &[Option<TileInfo>] {
        &self.infos
    }

    /// Fills regions for every cell of a regular atlas.
    pub fn add_atlas_grid(&mut self, grid: &AtlasGrid) -> Result<(), MapError> {
        if grid.tile_count == 0 || grid.columns == 0 {
            return Ok(());
        }
        let last_id = grid
            .first_id
            .checked_add(grid.tile_count - 1)
            .filter(|&id| id <= Self::MAX_TILE_ID)
            .ok_or(MapError::TileIdOutOfRange {
                first_id: grid.first_id,
                tile_count: grid.tile_count,
            })?;
        self.grow(last_id);

        let step_x = grid.tile_w as u64 + grid.spacing as u64;
        let step_y = grid.tile_h as u64 + grid.spacing as u64;
        for local in 0..grid.tile_count {
            let col = (local % grid.columns) as u64;
            let row = (local / grid.columns) as u64;
            let sx = grid.margin as u64 + col * step_x;
            let sy = grid.margin as u64 + row * step_y;
            let px = Rect::new(sx as f32, sy as f32, grid.tile_w as f32, grid.tile_h as f32);
            self.textures[(grid.first_id + local) as usize] =
                Some(TextureRegion::from_pixels(grid.atlas, px, grid.image_size));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atlas_grid_accounts_for_margin_and_spacing() {
        let mut ts = TileSet::new(16, 16).unwrap();
        ts.add_atlas_grid(&AtlasGrid {
            atlas: AtlasId(2),
            first_id: 1,
            tile_count: 4,
            columns: 2,
            tile_w: 16,
            tile_h: 16,
            spacing: 2,
            margin: 1,
            image_size: vec2(35.0, 35.0),
        })
        .unwrap();

        assert_eq!(ts.len(), 5);
        assert!(ts.texture(0).is_none());
        let last = ts.texture(4).unwrap();
        assert_eq!(last.atlas, AtlasId(2));
        assert_eq!(last.uv, Rect::new(19.0 / 35.0, 19.0 / 35.0, 16.0 / 35.0, 16.0 / 35.0));
    }

    #[test]
    fn atlas_ids_past_the_limit_are_rejected() {
        let mut ts = TileSet::new(16, 16).unwrap();
        let grid = |first_id| AtlasGrid {
            atlas: AtlasId(0),
            first_id,
            tile_count: 2,
            columns: 2,
            tile_w: 16,
            tile_h: 16,
            spacing: 0,
            margin: 0,
            image_size: vec2(32.0, 16.0),
        };

        assert!(matches!(
            ts.add_atlas_grid(&grid(u32::MAX)),
            Err(MapError::TileIdOutOfRange { first_id: u32::MAX, tile_count: 2 })
        ));
        assert!(ts.add_atlas_grid(&grid(TileSet::MAX_TILE_ID)).is_err());
        assert!(ts.is_empty());

        ts.add_atlas_grid(&grid(TileSet::MAX_TILE_ID - 1)).unwrap();
        assert_eq!(ts.len(), TileSet::MAX_TILE_ID as usize + 1);
    }

    #[test]
    fn zero_tile_size_is_rejected() {
        assert!(matches!(
            TileSet::new(0, 8),
            Err(MapError::InvalidTileSize { width: 0, height: 8 })
        ));
    }

    #[test]
    fn animation_and_collision_share_one_info() {
        let mut ts = TileSet::new(8, 8).unwrap();
        ts.set_animation(3, vec![AnimationFrame { tile_id: 3, duration_ms: 100 }]);
        ts.add_collision(3, Rect::new(0.0, 0.0, 8.0, 4.0));
        let info = ts.info(3).unwrap();
        assert_eq!(info.frames.len(), 1);
        assert_eq!(info.collision.len(), 1);
        assert!(ts.texture(3).is_none());
    }
}
