use crate::tileset::AtlasId;
use macroquad::color::Color;
use macroquad::math::Vec2;
use macroquad::models::Vertex;

/// Largest quad count whose vertices are still addressable by `u16` indices.
pub const MAX_QUADS_PER_CHUNK: usize = 16 * 1024 - 16;

/// UV slot order per `(flip_x | flip_y << 1 | rotate << 2)`.
///
/// Entry `i` of a row says which atlas corner (TL, TR, BR, BL) lands on quad
/// corner `i`. Rotation is the diagonal flip, applied before the axis flips.
pub const QUAD_UV_ORDER: [[usize; 4]; 8] = build_uv_order();

const fn uv_order(flip_x: bool, flip_y: bool, rotate: bool) -> [usize; 4] {
    let mut i = [0, 1, 2, 3];
    let mut t;
    if rotate {
        t = i[1];
        i[1] = i[3];
        i[3] = t;
    }
    if flip_y {
        t = i[0];
        i[0] = i[3];
        i[3] = t;
        t = i[1];
        i[1] = i[2];
        i[2] = t;
    }
    if flip_x {
        t = i[0];
        i[0] = i[1];
        i[1] = t;
        t = i[3];
        i[3] = i[2];
        i[2] = t;
    }
    i
}

const fn build_uv_order() -> [[usize; 4]; 8] {
    let mut table = [[0; 4]; 8];
    let mut n = 0;
    while n < 8 {
        table[n] = uv_order(n & 1 != 0, n & 2 != 0, n & 4 != 0);
        n += 1;
    }
    table
}

/// Index buffer for `quads` quads: two triangles per quad, 6 indices each.
pub fn quad_indices(quads: usize) -> Vec<u16> {
    let quads = quads.min(MAX_QUADS_PER_CHUNK);
    let mut indices = Vec::with_capacity(quads * 6);
    for q in 0..quads {
        let b = (q * 4) as u16;
        indices.extend_from_slice(&[b, b + 1, b + 2, b, b + 2, b + 3]);
    }
    indices
}

/// One draw-call worth of quads.
#[derive(Clone, Default)]
pub struct VertexChunk {
    vertices: Vec<Vertex>,
}

impl VertexChunk {
    /// Four vertices per quad, TL TR BR BL.
    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Vertices in the chunk.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Quads in the chunk.
    #[inline]
    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }

    /// Indices needed to draw every quad of the chunk.
    #[inline]
    pub fn index_count(&self) -> usize {
        self.quad_count() * 6
    }

    /// True if nothing was pushed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    // Keeps the allocation; old vertices are overwritten, never read.
    fn reset(&mut self) {
        self.vertices.clear();
    }
}

/// Every quad for one atlas, chained over as many chunks as needed.
#[derive(Clone)]
pub struct TextureBatch {
    atlas: AtlasId,
    chunks: Vec<VertexChunk>,
    used: usize,
}

impl TextureBatch {
    fn new(atlas: AtlasId) -> Self {
        Self {
            atlas,
            chunks: Vec::new(),
            used: 0,
        }
    }

    fn reset(&mut self, atlas: AtlasId) {
        self.atlas = atlas;
        for chunk in &mut self.chunks[..self.used] {
            chunk.reset();
        }
        self.used = 0;
    }

    /// Atlas every quad in this batch samples.
    #[inline]
    pub fn atlas(&self) -> AtlasId {
        self.atlas
    }

    /// Chunks in fill order.
    #[inline]
    pub fn chunks(&self) -> &[VertexChunk] {
        &self.chunks[..self.used]
    }

    /// Appends one quad, opening a new chunk first if the current one already
    /// holds `max_quads`.
    pub fn push_quad(&mut self, positions: [Vec2; 4], uvs: [Vec2; 4], color: Color, max_quads: usize) {
        let full = self.used == 0 || self.chunks[self.used - 1].quad_count() >= max_quads;
        if full {
            if self.used == self.chunks.len() {
                self.chunks.push(VertexChunk::default());
            } else {
                self.chunks[self.used].reset();
            }
            self.used += 1;
        }
        let chunk = &mut self.chunks[self.used - 1];
        for (p, uv) in positions.iter().zip(uvs.iter()) {
            chunk
                .vertices
                .push(Vertex::new(p.x, p.y, 0.0, uv.x, uv.y, color));
        }
    }
}

/// Free list of batch shells reused across rebuilds.
#[derive(Default)]
pub struct BatchPool {
    free: Vec<TextureBatch>,
}

impl BatchPool {
    /// Reuses a released batch for `atlas`, or makes a new one.
    pub fn alloc(&mut self, atlas: AtlasId) -> TextureBatch {
        match self.free.pop() {
            Some(mut batch) => {
                batch.reset(atlas);
                batch
            }
            None => TextureBatch::new(atlas),
        }
    }

    /// Returns a batch for later reuse.
    pub fn release(&mut self, batch: TextureBatch) {
        self.free.push(batch);
    }

    /// Batches waiting for reuse.
    pub fn free_len(&self) -> usize {
        self.free.len()
    }
}
