// tests/render_tests.rs

use macroquad::math::{vec2, Affine2, Rect, Vec2};
use macroquad::models::Vertex;
use macroquad_tilemap::{
    mesh_slices, visible_tile_range, AtlasId, BatchSink, Cell, RenderConfig, TextureRegion, TileMapData,
    TileMapRenderer, TileMapRepeat, TileSet,
};
use std::f32::consts::FRAC_PI_4;
use std::rc::Rc;

const TILE: f32 = 16.0;

fn tileset() -> Rc<TileSet> {
    let mut ts = TileSet::new(TILE as u32, TILE as u32).unwrap();
    ts.set_texture(1, TextureRegion::new(AtlasId(0), Rect::new(0.0, 0.0, 0.5, 0.5)));
    ts.set_texture(2, TextureRegion::new(AtlasId(1), Rect::new(0.0, 0.0, 1.0, 1.0)));
    Rc::new(ts)
}

fn filled(w: usize, h: usize, tile: u32) -> TileMapData {
    let mut data = TileMapData::new(w, h, tileset()).unwrap();
    for y in 0..h as i32 {
        for x in 0..w as i32 {
            data.push(x, y, Cell::new(tile)).unwrap();
        }
    }
    data
}

#[derive(Default)]
struct Snapshot {
    draws: Vec<(AtlasId, Vec<(Vec2, Vec2, [u8; 4])>, usize)>,
}

impl BatchSink for Snapshot {
    fn draw_batch(&mut self, atlas: AtlasId, vertices: &[Vertex], indices: &[u16]) {
        let verts = vertices
            .iter()
            .map(|v| (vec2(v.position.x, v.position.y), v.uv, v.color))
            .collect();
        self.draws.push((atlas, verts, indices.len()));
    }
}

#[test]
fn memoized_frame_matches_forced_rebuild() {
    let data = filled(20, 20, 1);
    let view = Rect::new(10.0, 10.0, 100.0, 80.0);
    let transform = Affine2::from_scale_angle_translation(vec2(2.0, 2.0), 0.3, vec2(5.0, -7.0));
    let mut renderer = TileMapRenderer::default();

    assert!(renderer.prepare(&data, view, transform));
    let iterations = renderer.stats().iteration_count;
    let mut first = Snapshot::default();
    renderer.submit(&mut first);

    assert!(!renderer.prepare(&data, view, transform));
    assert_eq!(renderer.rebuild_count(), 1);
    assert_eq!(renderer.stats().iteration_count, iterations);

    renderer.invalidate();
    assert!(renderer.prepare(&data, view, transform));
    let mut second = Snapshot::default();
    renderer.submit(&mut second);
    assert_eq!(first.draws, second.draws);
}

#[test]
fn chained_chunks_keep_every_quad() {
    let data = filled(10, 10, 1);
    let config = RenderConfig {
        max_tiles_per_batch: 16,
        ..RenderConfig::default()
    };
    let mut renderer = TileMapRenderer::new(config);
    renderer.prepare(&data, Rect::new(0.0, 0.0, 160.0, 160.0), Affine2::IDENTITY);

    let stats = *renderer.stats();
    assert_eq!(stats.tiles_rendered, 100);
    assert_eq!(stats.group_count, 1);
    assert_eq!(stats.batch_count, 7);
    assert_eq!(stats.vertex_count, 4 * stats.tiles_rendered);
    assert_eq!(stats.index_count, 6 * stats.tiles_rendered);

    let mut sink = Snapshot::default();
    assert_eq!(renderer.submit(&mut sink), 7);
    let quads: usize = sink.draws.iter().map(|(_, v, _)| v.len() / 4).sum();
    assert_eq!(quads, 100);
    assert!(sink.draws.iter().all(|(_, v, i)| v.len() <= 16 * 4 && *i == v.len() / 4 * 6));
}

#[test]
fn rotated_view_never_misses_an_intersecting_tile() {
    let data = filled(40, 40, 1);
    let transform = Affine2::from_scale_angle_translation(vec2(1.5, 1.5), FRAC_PI_4, vec2(300.0, -50.0));
    for view in [
        Rect::new(250.0, 100.0, 120.0, 90.0),
        Rect::new(0.0, 300.0, 400.0, 30.0),
        Rect::new(280.0, -40.0, 10.0, 10.0),
    ] {
        let range = visible_tile_range(&data, view, &transform, vec2(TILE, TILE), 0);
        for ty in 0..40 {
            for tx in 0..40 {
                let corners = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.5, 0.5)];
                let hit = corners.iter().any(|&(u, v)| {
                    let local = vec2((tx as f32 + u) * TILE, (ty as f32 + v) * TILE);
                    view.contains(transform.transform_point2(local))
                });
                if hit {
                    assert!(range.contains(tx, ty), "({tx}, {ty}) outside {range:?} for {view:?}");
                }
            }
        }
    }
}

#[test]
fn repeating_map_tiles_the_whole_view() {
    let mut data = filled(3, 2, 1).with_repeat(TileMapRepeat::Repeat, TileMapRepeat::Repeat);
    data.push(0, 0, Cell::new(2)).unwrap();
    let mut renderer = TileMapRenderer::default();
    // 9 x 4 tiles exactly, offset by whole periods.
    let view = Rect::new(-3.0 * TILE, 2.0 * TILE, 9.0 * TILE - 0.5, 4.0 * TILE - 0.5);
    renderer.prepare(&data, view, Affine2::IDENTITY);

    let stats = *renderer.stats();
    assert_eq!(stats.iteration_count, 36);
    // one extra layer on (0, 0) of each of the 6 periods
    assert_eq!(stats.tiles_rendered, 36 + 6);
    assert_eq!(stats.group_count, 2);
}

#[test]
fn unloaded_textures_are_skipped_until_available() {
    let mut ts = TileSet::new(16, 16).unwrap();
    ts.set_texture(1, TextureRegion::new(AtlasId(0), Rect::new(0.0, 0.0, 1.0, 1.0)));
    let mut data = TileMapData::new(2, 1, Rc::new(ts.clone())).unwrap();
    data.push(0, 0, Cell::new(1)).unwrap();
    data.push(1, 0, Cell::new(7)).unwrap();

    let mut renderer = TileMapRenderer::default();
    let view = Rect::new(0.0, 0.0, 32.0, 16.0);
    renderer.prepare(&data, view, Affine2::IDENTITY);
    assert_eq!(renderer.stats().tiles_rendered, 1);

    ts.set_texture(7, TextureRegion::new(AtlasId(0), Rect::new(0.0, 0.0, 1.0, 1.0)));
    data.set_tileset(Rc::new(ts));
    assert!(renderer.prepare(&data, view, Affine2::IDENTITY));
    assert_eq!(renderer.stats().tiles_rendered, 2);
}

#[test]
fn overdraw_reveals_offset_tiles_from_outside_the_view() {
    let mut data = TileMapData::new(10, 1, tileset()).unwrap();
    // Tile 5 nudged 12px left so it overlaps tile 4's slot.
    data.push(5, 0, Cell::new(1).with_offset(-12, 0)).unwrap();
    data.push(0, 0, Cell::new(1)).unwrap();
    let view = Rect::new(0.0, 0.0, 5.0 * TILE - 1.0, TILE);

    let mut plain = TileMapRenderer::default();
    plain.prepare(&data, view, Affine2::IDENTITY);
    assert_eq!(plain.stats().tiles_rendered, 1);

    let mut padded = TileMapRenderer::new(RenderConfig {
        overdraw_tiles: 1,
        ..RenderConfig::default()
    });
    padded.prepare(&data, view, Affine2::IDENTITY);
    assert_eq!(padded.stats().tiles_rendered, 2);
}

#[derive(Default)]
struct MeshCounter {
    draws: usize,
    quads: usize,
}

impl BatchSink for MeshCounter {
    fn draw_batch(&mut self, _atlas: AtlasId, vertices: &[Vertex], indices: &[u16]) {
        for (slice, slice_indices) in mesh_slices(vertices, indices) {
            assert!(slice_indices.len() <= 5000);
            self.draws += 1;
            self.quads += slice_indices.len() / 6;
        }
    }
}

#[test]
fn large_batches_still_draw_every_quad() {
    let data = filled(50, 40, 1);
    let mut renderer = TileMapRenderer::new(RenderConfig {
        max_tiles_per_batch: 2000,
        ..RenderConfig::default()
    });
    renderer.prepare(&data, Rect::new(0.0, 0.0, 800.0, 640.0), Affine2::IDENTITY);
    assert_eq!(renderer.stats().batch_count, 1);
    assert_eq!(renderer.stats().tiles_rendered, 2000);

    let mut sink = MeshCounter::default();
    renderer.submit(&mut sink);
    assert_eq!(sink.quads, 2000);
    assert_eq!(sink.draws, 3);
}
