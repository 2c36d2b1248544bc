use super::batch::{quad_indices, TextureBatch};
use super::builder::VertexBatchBuilder;
use super::cull::{visible_tile_range, TileRange};
use super::submit::{submit_batches, BatchSink};
use super::{RenderConfig, RenderStats};
use crate::animation::AnimationClock;
use crate::map::TileMapData;
use crate::tileset::TileSet;
use macroquad::math::{Affine2, Rect};
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq)]
struct CullKey {
    viewport: Rect,
    transform: Affine2,
    content_version: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct BuildKey {
    cull: CullKey,
    animation_version: u64,
}

/// Caching renderer for one [`TileMapData`].
///
/// Vertices are rebuilt only when the viewport, the transform, the map
/// content or an animation frame changed since the last [`prepare`](Self::prepare);
/// a static map in a static view tessellates once. Animation state is owned
/// here and reset whenever the map's tile set is swapped.
pub struct TileMapRenderer {
    config: RenderConfig,
    clock: AnimationClock,
    builder: VertexBatchBuilder,
    quad_indices: Vec<u16>,
    tileset: Option<Rc<TileSet>>,
    cull_key: Option<CullKey>,
    build_key: Option<BuildKey>,
    range: TileRange,
    rebuilds: u64,
}

impl TileMapRenderer {
    /// Renderer with nothing cached yet.
    pub fn new(config: RenderConfig) -> Self {
        let quad_indices = quad_indices(config.max_quads());
        Self {
            config,
            clock: AnimationClock::default(),
            builder: VertexBatchBuilder::new(),
            quad_indices,
            tileset: None,
            cull_key: None,
            build_key: None,
            range: TileRange::EMPTY,
            rebuilds: 0,
        }
    }

    /// Active config.
    #[inline]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Replaces the config; the next `prepare` rebuilds.
    pub fn set_config(&mut self, config: RenderConfig) {
        if config.max_quads() != self.config.max_quads() {
            self.quad_indices = quad_indices(config.max_quads());
        }
        self.config = config;
        self.invalidate();
    }

    /// Forgets cached vertices and cull range.
    pub fn invalidate(&mut self) {
        self.cull_key = None;
        self.build_key = None;
    }

    /// Animation state owned by this renderer.
    #[inline]
    pub fn clock(&self) -> &AnimationClock {
        &self.clock
    }

    /// Counters from the last rebuild.
    #[inline]
    pub fn stats(&self) -> &RenderStats {
        self.builder.stats()
    }

    /// How many times vertices were actually rebuilt.
    #[inline]
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    /// Tile range used by the last rebuild.
    #[inline]
    pub fn visible_range(&self) -> TileRange {
        self.range
    }

    /// Current vertex batches.
    #[inline]
    pub fn batches(&self) -> &[TextureBatch] {
        self.builder.batches()
    }

    fn sync_tileset(&mut self, data: &TileMapData) {
        let current = data.tileset();
        let same = self
            .tileset
            .as_ref()
            .is_some_and(|ts| Rc::ptr_eq(ts, current));
        if !same {
            debug!(tiles = current.len(), "tile set changed, resetting animation state");
            self.clock.reset(current);
            self.tileset = Some(Rc::clone(current));
            self.invalidate();
        }
    }

    /// Advances tile animations. Returns true if any displayed frame changed.
    pub fn update(&mut self, data: &TileMapData, dt: Duration) -> bool {
        self.sync_tileset(data);
        self.clock.tick(data.tileset(), dt)
    }

    /// Brings the vertex batches up to date for `viewport` (world space) and
    /// `transform` (grid pixels to world). Returns true if it rebuilt.
    pub fn prepare(&mut self, data: &TileMapData, viewport: Rect, transform: Affine2) -> bool {
        self.sync_tileset(data);

        let cull = CullKey {
            viewport,
            transform,
            content_version: data.content_version(),
        };
        let key = BuildKey {
            cull,
            animation_version: self.clock.version(),
        };
        if self.build_key == Some(key) {
            trace!("tile map vertices up to date");
            return false;
        }

        if self.cull_key != Some(cull) {
            self.range = visible_tile_range(
                data,
                viewport,
                &transform,
                data.tileset().tile_size(),
                self.config.overdraw_tiles,
            );
            self.cull_key = Some(cull);
        }

        let stats = self
            .builder
            .build(data, &self.clock, self.range, &transform, &self.config);
        debug!(
            range = ?self.range,
            tiles = stats.tiles_rendered,
            iterations = stats.iteration_count,
            batches = stats.batch_count,
            "rebuilt tile map vertices"
        );
        self.build_key = Some(key);
        self.rebuilds += 1;
        true
    }

    /// Hands the current batches to `sink`; returns the number of draw calls.
    pub fn submit<S: BatchSink + ?Sized>(&self, sink: &mut S) -> usize {
        submit_batches(self.builder.batches(), &self.quad_indices, sink)
    }
}

impl Default for TileMapRenderer {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::Cell;
    use crate::tileset::{AnimationFrame, AtlasId, TextureRegion};
    use macroquad::math::vec2;

    fn tileset() -> TileSet {
        let mut ts = TileSet::new(16, 16).unwrap();
        ts.set_texture(1, TextureRegion::new(AtlasId(0), Rect::new(0.0, 0.0, 0.5, 1.0)));
        ts.set_texture(2, TextureRegion::new(AtlasId(0), Rect::new(0.5, 0.0, 0.5, 1.0)));
        ts
    }

    const VIEW: Rect = Rect { x: 0.0, y: 0.0, w: 64.0, h: 64.0 };

    #[test]
    fn unchanged_inputs_do_not_rebuild() {
        let mut data = TileMapData::new(8, 8, Rc::new(tileset())).unwrap();
        data.push(0, 0, Cell::new(1)).unwrap();
        let mut renderer = TileMapRenderer::default();

        assert!(renderer.prepare(&data, VIEW, Affine2::IDENTITY));
        assert!(!renderer.prepare(&data, VIEW, Affine2::IDENTITY));
        assert_eq!(renderer.rebuild_count(), 1);

        data.push(1, 0, Cell::new(1)).unwrap();
        assert!(renderer.prepare(&data, VIEW, Affine2::IDENTITY));
        assert_eq!(renderer.stats().tiles_rendered, 2);

        let moved = Affine2::from_translation(vec2(3.0, 0.0));
        assert!(renderer.prepare(&data, VIEW, moved));
        assert_eq!(renderer.rebuild_count(), 3);
    }

    #[test]
    fn animation_frame_change_triggers_rebuild() {
        let mut ts = tileset();
        ts.set_animation(
            1,
            vec![
                AnimationFrame { tile_id: 1, duration_ms: 100 },
                AnimationFrame { tile_id: 2, duration_ms: 100 },
            ],
        );
        let mut data = TileMapData::new(2, 2, Rc::new(ts)).unwrap();
        data.push(0, 0, Cell::new(1)).unwrap();
        let mut renderer = TileMapRenderer::default();
        renderer.prepare(&data, VIEW, Affine2::IDENTITY);

        assert!(!renderer.update(&data, Duration::from_millis(50)));
        assert!(!renderer.prepare(&data, VIEW, Affine2::IDENTITY));

        assert!(renderer.update(&data, Duration::from_millis(50)));
        assert!(renderer.prepare(&data, VIEW, Affine2::IDENTITY));
        let uv = renderer.batches()[0].chunks()[0].vertices()[0].uv;
        assert_eq!(uv, vec2(0.5, 0.0));
    }

    #[test]
    fn swapping_tileset_resets_and_rebuilds() {
        let mut data = TileMapData::new(2, 2, Rc::new(tileset())).unwrap();
        data.push(0, 0, Cell::new(1)).unwrap();
        let mut renderer = TileMapRenderer::default();
        renderer.prepare(&data, VIEW, Affine2::IDENTITY);

        let mut other = tileset();
        other.set_texture(1, TextureRegion::new(AtlasId(4), Rect::new(0.0, 0.0, 1.0, 1.0)));
        data.set_tileset(Rc::new(other));
        assert!(renderer.prepare(&data, VIEW, Affine2::IDENTITY));
        assert_eq!(renderer.batches()[0].atlas(), AtlasId(4));
    }
}
