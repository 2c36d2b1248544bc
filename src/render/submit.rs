use super::batch::TextureBatch;
use crate::tileset::AtlasId;
use macroquad::models::{draw_mesh, Mesh, Vertex};
use macroquad::texture::Texture2D;
use tracing::{debug, warn};

/// Receiver of finished vertex chunks, one call per draw.
pub trait BatchSink {
    /// Draws `vertices` with `indices` using the texture of `atlas`.
    fn draw_batch(&mut self, atlas: AtlasId, vertices: &[Vertex], indices: &[u16]);
}

/// Sends every non-empty chunk to `sink` in batch creation order, chunks of
/// one atlas back to back. Returns the number of draw calls issued.
///
/// `quad_indices` is the shared index buffer and must cover the largest chunk.
pub fn submit_batches<S: BatchSink + ?Sized>(
    batches: &[TextureBatch],
    quad_indices: &[u16],
    sink: &mut S,
) -> usize {
    let mut draws = 0;
    for batch in batches {
        for chunk in batch.chunks() {
            if chunk.is_empty() {
                continue;
            }
            let Some(indices) = quad_indices.get(..chunk.index_count()) else {
                warn!(
                    atlas = batch.atlas().0,
                    quads = chunk.quad_count(),
                    "chunk larger than the shared index buffer, skipped"
                );
                continue;
            };
            sink.draw_batch(batch.atlas(), chunk.vertices(), indices);
            draws += 1;
        }
    }
    draws
}

/// Quads one `draw_mesh` call can hold: macroquad batches at most 5000
/// indices per draw and truncates anything past that.
pub const MESH_QUADS_PER_DRAW: usize = 5000 / 6;

/// Splits a chunk into slices `draw_mesh` accepts whole. Every slice starts on
/// a quad boundary, so it reuses the head of the same 0-based index buffer.
pub fn mesh_slices<'a>(
    vertices: &'a [Vertex],
    indices: &'a [u16],
) -> impl Iterator<Item = (&'a [Vertex], &'a [u16])> + 'a {
    vertices.chunks(MESH_QUADS_PER_DRAW * 4).map(move |slice| {
        let n = (slice.len() / 4 * 6).min(indices.len());
        (slice, &indices[..n])
    })
}

/// Draws chunks with macroquad, looking atlas textures up by id.
pub struct MacroquadSink<'a> {
    textures: &'a [Texture2D],
    mesh: &'a mut Mesh,
}

impl<'a> MacroquadSink<'a> {
    /// `mesh` is scratch space kept by the caller so its buffers survive
    /// between frames.
    pub fn new(textures: &'a [Texture2D], mesh: &'a mut Mesh) -> Self {
        Self { textures, mesh }
    }

    /// Empty mesh to pass to [`MacroquadSink::new`].
    pub fn scratch_mesh() -> Mesh {
        Mesh {
            vertices: Vec::new(),
            indices: Vec::new(),
            texture: None,
        }
    }
}

impl BatchSink for MacroquadSink<'_> {
    fn draw_batch(&mut self, atlas: AtlasId, vertices: &[Vertex], indices: &[u16]) {
        let Some(texture) = self.textures.get(atlas.0 as usize) else {
            debug!(atlas = atlas.0, "no texture loaded for atlas, chunk skipped");
            return;
        };
        self.mesh.texture = Some(texture.clone());
        for (slice, slice_indices) in mesh_slices(vertices, indices) {
            self.mesh.vertices.clear();
            self.mesh.vertices.extend_from_slice(slice);
            self.mesh.indices.clear();
            self.mesh.indices.extend_from_slice(slice_indices);
            draw_mesh(self.mesh);
        }
    }
}
