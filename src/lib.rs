#![warn(missing_docs)]

//! Stacked tile map renderer for Macroquad.
//!
//! A [`TileMapData`] holds a grid where every cell is a stack of packed
//! [`Cell`]s. [`TileMapRenderer`] culls it against a viewport, turns the
//! visible cells into per-atlas vertex chunks, caches them until the view,
//! the content or an animation frame changes, and hands them to a
//! [`BatchSink`]. [`TileMap`] wires all of it to macroquad textures and a
//! Tiled JSON loader.

mod animation;
mod error;
mod loader {
    //! Map file importers.
    pub mod json_loader;
}
mod map;
mod render;
mod spatial;
mod tilemap;
mod tileset;

pub use animation::AnimationClock;
pub use error::MapError;
pub use loader::json_loader::{decode_map_file, decode_map_str, LoadedMap};
pub use map::{GridBounds, TileMapData, TileMapRepeat};
pub use render::{
    mesh_slices, quad_indices, submit_batches, visible_tile_range, BatchSink, MacroquadSink,
    RenderConfig, RenderStats, TextureBatch, TileMapRenderer, TileRange, VertexBatchBuilder,
    VertexChunk, DEFAULT_MAX_TILES_PER_BATCH, MAX_QUADS_PER_CHUNK, MESH_QUADS_PER_DRAW,
    QUAD_UV_ORDER,
};
pub use spatial::{Cell, StackedGrid, FLIP_D, FLIP_H, FLIP_V, GID_MASK};
pub use tilemap::{camera_viewport, TileMap};
pub use tileset::{AnimationFrame, AtlasGrid, AtlasId, TextureRegion, TileInfo, TileSet};
