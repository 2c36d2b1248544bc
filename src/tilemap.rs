use crate::loader::json_loader::{decode_map_file, LoadedMap};
use crate::map::TileMapData;
use crate::render::{MacroquadSink, RenderConfig, RenderStats, TileMapRenderer};
use anyhow::Context;
use macroquad::prelude::*;
use std::time::Duration;

/// A loaded tile map with its atlas textures, ready to draw with macroquad.
pub struct TileMap {
    data: TileMapData,
    textures: Vec<Texture2D>,
    renderer: TileMapRenderer,
    mesh: Mesh,
    /// Grid pixels to world.
    pub transform: Affine2,
}

impl TileMap {
    /// Loads a Tiled JSON map and its atlas textures with the default config.
    pub async fn load(path: &str) -> anyhow::Result<Self> {
        Self::load_with_config(path, RenderConfig::default()).await
    }

    /// Like [`load`](Self::load) with an explicit render config.
    pub async fn load_with_config(path: &str, config: RenderConfig) -> anyhow::Result<Self> {
        let LoadedMap { data, atlas_images } =
            decode_map_file(path).with_context(|| format!("Decoding map {}", path))?;

        let mut textures = Vec::with_capacity(atlas_images.len());
        for img in &atlas_images {
            let img_path = img
                .to_str()
                .with_context(|| format!("Texture path is not UTF-8: {}", img.display()))?;
            let tex: Texture2D = load_texture(img_path)
                .await
                .with_context(|| format!("Loading texture {}", img_path))?;
            tex.set_filter(FilterMode::Nearest);
            textures.push(tex);
        }

        Ok(Self::from_parts(data, textures, config))
    }

    /// `textures[i]` is drawn for regions of `AtlasId(i)`.
    pub fn from_parts(data: TileMapData, textures: Vec<Texture2D>, config: RenderConfig) -> Self {
        Self {
            data,
            textures,
            renderer: TileMapRenderer::new(config),
            mesh: MacroquadSink::scratch_mesh(),
            transform: Affine2::IDENTITY,
        }
    }

    /// Map contents.
    #[inline]
    pub fn data(&self) -> &TileMapData {
        &self.data
    }

    /// Edits go through [`TileMapData`], which tracks its own version.
    #[inline]
    pub fn data_mut(&mut self) -> &mut TileMapData {
        &mut self.data
    }

    /// Counters from the last vertex rebuild.
    #[inline]
    pub fn stats(&self) -> &RenderStats {
        self.renderer.stats()
    }

    /// The caching renderer.
    #[inline]
    pub fn renderer(&self) -> &TileMapRenderer {
        &self.renderer
    }

    /// Replaces the render config; the next draw rebuilds.
    pub fn set_config(&mut self, config: RenderConfig) {
        self.renderer.set_config(config);
    }

    /// Advances tile animations by `dt`.
    pub fn update(&mut self, dt: Duration) -> bool {
        self.renderer.update(&self.data, dt)
    }

    /// Advances animations by macroquad's last frame time.
    pub fn update_frame(&mut self) -> bool {
        self.update(Duration::from_secs_f32(get_frame_time().max(0.0)))
    }

    /// Draws the part of the map inside `viewport` (world space). Returns the
    /// number of draw calls.
    pub fn draw(&mut self, viewport: Rect) -> usize {
        self.renderer.prepare(&self.data, viewport, self.transform);
        let mut sink = MacroquadSink::new(&self.textures, &mut self.mesh);
        self.renderer.submit(&mut sink)
    }

    /// Draws what `camera` sees.
    pub fn draw_camera(&mut self, camera: &Camera2D) -> usize {
        self.draw(camera_viewport(camera))
    }

    /// See [`TileMapData::pixel_hit_test`].
    pub fn pixel_hit_test(&self, x: i32, y: i32) -> bool {
        self.data.pixel_hit_test(x, y)
    }
}

/// World-space bounding box of the screen as seen through `camera`.
pub fn camera_viewport(camera: &Camera2D) -> Rect {
    let (w, h) = match camera.viewport {
        Some((_, _, w, h)) => (w as f32, h as f32),
        None => (screen_width(), screen_height()), // Fall back to screen dimensions
    };
    let corners = [vec2(0.0, 0.0), vec2(w, 0.0), vec2(w, h), vec2(0.0, h)]
        .map(|p| camera.screen_to_world(p));
    let min = corners.iter().fold(Vec2::splat(f32::INFINITY), |a, &p| a.min(p));
    let max = corners.iter().fold(Vec2::splat(f32::NEG_INFINITY), |a, &p| a.max(p));
    Rect::new(min.x, min.y, max.x - min.x, max.y - min.y)
}
