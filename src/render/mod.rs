mod batch;
mod builder;
mod cull;
mod renderer;
mod submit;

pub use batch::{quad_indices, TextureBatch, VertexChunk, MAX_QUADS_PER_CHUNK, QUAD_UV_ORDER};
pub use builder::VertexBatchBuilder;
pub use cull::{visible_tile_range, TileRange};
pub use renderer::TileMapRenderer;
pub use submit::{mesh_slices, submit_batches, BatchSink, MacroquadSink, MESH_QUADS_PER_DRAW};

use crate::error::MapError;
use macroquad::color::Color;
use serde::Deserialize;
use std::path::Path;

/// Fits one macroquad draw call, so [`MacroquadSink`] never has to split a chunk.
pub const DEFAULT_MAX_TILES_PER_BATCH: usize = 832;

/// Renderer tuning, deserializable from JSON with every field optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Extra tiles drawn on every side of the viewport, for cells whose
    /// offsets push them into view from outside it.
    pub overdraw_tiles: u32,
    /// Quads per chunk before a new chunk is chained.
    pub max_tiles_per_batch: usize,
    /// Multiplier for cell pixel offsets.
    pub offset_scale: f32,
    /// RGBA colour multiplier for every vertex.
    pub color: [f32; 4],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            overdraw_tiles: 0,
            max_tiles_per_batch: DEFAULT_MAX_TILES_PER_BATCH,
            offset_scale: 1.0,
            color: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

impl RenderConfig {
    /// Parses a JSON object; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, MapError> {
        serde_json::from_str(json).map_err(|source| MapError::Json {
            path: Path::new("<inline>").to_path_buf(),
            source,
        })
    }

    /// `max_tiles_per_batch` clamped to what one `u16`-indexed chunk can hold.
    #[inline]
    pub fn max_quads(&self) -> usize {
        self.max_tiles_per_batch.clamp(1, MAX_QUADS_PER_CHUNK)
    }

    /// Vertex tint as a macroquad colour.
    #[inline]
    pub fn color(&self) -> Color {
        let [r, g, b, a] = self.color;
        Color::new(r, g, b, a)
    }
}

/// Counters from the last rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    /// Tile coordinates visited, including empty ones.
    pub iteration_count: usize,
    /// Quads emitted.
    pub tiles_rendered: usize,
    /// Vertices across all chunks.
    pub vertex_count: usize,
    /// Indices needed to draw all chunks.
    pub index_count: usize,
    /// Chunks across all atlases.
    pub batch_count: usize,
    /// Distinct atlases.
    pub group_count: usize,
}
