use super::batch::{BatchPool, TextureBatch, QUAD_UV_ORDER};
use super::cull::TileRange;
use super::{RenderConfig, RenderStats};
use crate::animation::AnimationClock;
use crate::map::TileMapData;
use crate::spatial::Cell;
use crate::tileset::AtlasId;
use macroquad::math::{vec2, Affine2};

const NO_SLOT: u32 = u32::MAX;

/// Turns the visible part of a [`TileMapData`] into per-atlas vertex batches.
///
/// Batches live in creation order, one per atlas touched, each chaining as
/// many chunks as its quad count needs. Shells are recycled through a
/// [`BatchPool`] so steady-state rebuilds do not allocate.
#[derive(Default)]
pub struct VertexBatchBuilder {
    pool: BatchPool,
    batches: Vec<TextureBatch>,
    // atlas id -> index into `batches`
    atlas_slot: Vec<u32>,
    stats: RenderStats,
}

impl VertexBatchBuilder {
    /// Builder with no batches.
    pub fn new() -> Self {
        Self::default()
    }

    /// Batches from the last build, in creation order.
    #[inline]
    pub fn batches(&self) -> &[TextureBatch] {
        &self.batches
    }

    /// Counters from the last build.
    #[inline]
    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    /// Drops all batches back into the pool.
    pub fn clear(&mut self) {
        for batch in self.batches.drain(..) {
            self.pool.release(batch);
        }
        self.atlas_slot.fill(NO_SLOT);
        self.stats = RenderStats::default();
    }

    fn batch_for(&mut self, atlas: AtlasId) -> &mut TextureBatch {
        let key = atlas.0 as usize;
        if key >= self.atlas_slot.len() {
            self.atlas_slot.resize(key + 1, NO_SLOT);
        }
        let mut slot = self.atlas_slot[key];
        if slot == NO_SLOT {
            slot = self.batches.len() as u32;
            self.batches.push(self.pool.alloc(atlas));
            self.atlas_slot[key] = slot;
        }
        &mut self.batches[slot as usize]
    }

    /// Rebuilds every batch for the tiles in `range`.
    ///
    /// Empty cells and tiles whose texture is not loaded are skipped. Cells
    /// are emitted bottom level first so upper layers draw on top within an
    /// atlas.
    pub fn build(
        &mut self,
        data: &TileMapData,
        clock: &AnimationClock,
        range: TileRange,
        transform: &Affine2,
        config: &RenderConfig,
    ) -> &RenderStats {
        self.clear();

        let tileset = data.tileset();
        let tw = tileset.tile_width() as f32;
        let th = tileset.tile_height() as f32;
        let du = transform.transform_vector2(vec2(tw, 0.0));
        let dv = transform.transform_vector2(vec2(0.0, th));
        let scale_x = config.offset_scale / tw;
        let scale_y = config.offset_scale / th;
        let color = config.color();
        let max_quads = config.max_quads();

        let grid = data.grid();
        let bounds = data.bounds();
        let mut iterations = 0usize;
        let mut tiles = 0usize;

        for y in range.y_min..range.y_max {
            for x in range.x_min..range.x_max {
                iterations += 1;
                let (rx, ry) = data.wrap(x, y);
                if !bounds.contains(rx, ry) {
                    continue;
                }
                for level in 0..grid.get_stack_level(rx, ry) {
                    let cell = Cell::from_raw(grid.get(rx, ry, level));
                    if cell.is_invalid() {
                        continue;
                    }
                    let Some(region) = clock.resolve(cell.tile()) else {
                        continue;
                    };
                    tiles += 1;

                    let px = x as f32 + cell.offset_x() as f32 * scale_x;
                    let py = y as f32 + cell.offset_y() as f32 * scale_y;
                    let p0 = transform.transform_point2(vec2(px * tw, py * th));
                    let positions = [p0, p0 + du, p0 + du + dv, p0 + dv];

                    let corners = region.corners();
                    let order = &QUAD_UV_ORDER[cell.transform_index()];
                    let uvs = [
                        corners[order[0]],
                        corners[order[1]],
                        corners[order[2]],
                        corners[order[3]],
                    ];

                    self.batch_for(region.atlas)
                        .push_quad(positions, uvs, color, max_quads);
                }
            }
        }

        let mut stats = RenderStats {
            iteration_count: iterations,
            tiles_rendered: tiles,
            group_count: self.batches.len(),
            ..RenderStats::default()
        };
        for chunk in self.batches.iter().flat_map(|b| b.chunks()) {
            stats.batch_count += 1;
            stats.vertex_count += chunk.vertex_count();
            stats.index_count += chunk.index_count();
        }
        self.stats = stats;
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tileset::{TextureRegion, TileSet};
    use macroquad::math::{Rect, Vec2};
    use std::rc::Rc;

    fn tileset() -> TileSet {
        let mut ts = TileSet::new(16, 16).unwrap();
        ts.set_texture(1, TextureRegion::new(AtlasId(0), Rect::new(0.0, 0.0, 0.5, 0.5)));
        ts.set_texture(2, TextureRegion::new(AtlasId(1), Rect::new(0.5, 0.5, 0.5, 0.5)));
        ts
    }

    fn build(data: &TileMapData, range: TileRange, transform: Affine2) -> VertexBatchBuilder {
        let clock = AnimationClock::new(data.tileset());
        let mut builder = VertexBatchBuilder::new();
        builder.build(data, &clock, range, &transform, &RenderConfig::default());
        builder
    }

    fn full(data: &TileMapData) -> TileRange {
        TileRange {
            x_min: 0,
            x_max: data.width() as i32,
            y_min: 0,
            y_max: data.height() as i32,
        }
    }

    #[test]
    fn quad_corners_follow_transform_and_offset() {
        let mut data = TileMapData::new(4, 4, Rc::new(tileset())).unwrap();
        data.push(2, 1, Cell::new(1).with_offset(5, -2)).unwrap();
        let transform = Affine2::from_translation(vec2(100.0, 50.0));

        let builder = build(&data, full(&data), transform);
        let chunk = &builder.batches()[0].chunks()[0];
        let positions: Vec<Vec2> = chunk
            .vertices()
            .iter()
            .map(|v| vec2(v.position.x, v.position.y))
            .collect();
        assert_eq!(
            positions,
            vec![
                vec2(137.0, 64.0),
                vec2(153.0, 64.0),
                vec2(153.0, 80.0),
                vec2(137.0, 80.0),
            ]
        );
    }

    #[test]
    fn flipped_cell_swaps_uvs() {
        let mut data = TileMapData::new(1, 1, Rc::new(tileset())).unwrap();
        data.push(0, 0, Cell::new(1).with_flip(true, false)).unwrap();
        let builder = build(&data, full(&data), Affine2::IDENTITY);
        let uvs: Vec<Vec2> = builder.batches()[0].chunks()[0]
            .vertices()
            .iter()
            .map(|v| v.uv)
            .collect();
        assert_eq!(
            uvs,
            vec![vec2(0.5, 0.0), vec2(0.0, 0.0), vec2(0.0, 0.5), vec2(0.5, 0.5)]
        );
    }

    #[test]
    fn groups_by_atlas_and_skips_empty_or_unloaded_tiles() {
        let mut data = TileMapData::new(3, 1, Rc::new(tileset())).unwrap();
        data.push(0, 0, Cell::new(1)).unwrap();
        data.push(0, 0, Cell::new(2)).unwrap();
        data.push(1, 0, Cell::EMPTY).unwrap();
        data.push(1, 0, Cell::new(42)).unwrap();
        data.push(2, 0, Cell::new(1)).unwrap();

        let builder = build(&data, full(&data), Affine2::IDENTITY);
        let stats = builder.stats();
        assert_eq!(stats.iteration_count, 3);
        assert_eq!(stats.tiles_rendered, 3);
        assert_eq!(stats.group_count, 2);
        let atlases: Vec<AtlasId> = builder.batches().iter().map(|b| b.atlas()).collect();
        assert_eq!(atlases, vec![AtlasId(0), AtlasId(1)]);
        assert_eq!(builder.batches()[0].chunks()[0].quad_count(), 2);
    }

    #[test]
    fn rebuild_reuses_pooled_batches() {
        let mut data = TileMapData::new(2, 1, Rc::new(tileset())).unwrap();
        data.push(0, 0, Cell::new(1)).unwrap();
        let clock = AnimationClock::new(data.tileset());
        let mut builder = VertexBatchBuilder::new();
        let config = RenderConfig::default();
        builder.build(&data, &clock, full(&data), &Affine2::IDENTITY, &config);
        data.push(1, 0, Cell::new(1)).unwrap();
        let stats = builder.build(&data, &clock, full(&data), &Affine2::IDENTITY, &config);
        assert_eq!(stats.tiles_rendered, 2);
        assert_eq!(stats.vertex_count, 8);
        assert_eq!(builder.pool.free_len(), 0);
    }
}
