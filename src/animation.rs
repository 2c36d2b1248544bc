use crate::tileset::{TextureRegion, TileSet};
use std::time::Duration;

/// Per-tile animation state for one tile set.
///
/// `current[id]` is the texture tile `id` displays right now; the vertex
/// builder reads through it so an animated tile changes on screen without
/// the grid changing.
#[derive(Debug, Clone, Default)]
pub struct AnimationClock {
    frame_index: Vec<usize>,
    elapsed: Vec<Duration>,
    current: Vec<Option<TextureRegion>>,
    version: u64,
}

impl AnimationClock {
    /// State for `tileset`, every tile on its first frame.
    pub fn new(tileset: &TileSet) -> Self {
        let mut clock = Self::default();
        clock.reset(tileset);
        clock
    }

    /// Resizes to `tileset` and rewinds every animation. The version keeps
    /// increasing so cached output keyed on it is invalidated.
    pub fn reset(&mut self, tileset: &TileSet) {
        let n = tileset.len();
        self.frame_index.clear();
        self.frame_index.resize(n, 0);
        self.elapsed.clear();
        self.elapsed.resize(n, Duration::ZERO);
        self.current.clear();
        self.current.extend_from_slice(tileset.textures());
        for (id, info) in tileset.infos().iter().enumerate() {
            if let Some(first) = info.as_ref().and_then(|i| i.frames.first()) {
                self.current[id] = tileset.texture(first.tile_id).copied();
            }
        }
        self.version += 1;
    }

    /// Advances every animated tile by `dt`. Returns true and bumps the version
    /// once if any tile changed frame.
    pub fn tick(&mut self, tileset: &TileSet, dt: Duration) -> bool {
        let mut changed = false;
        for (id, info) in tileset.infos().iter().enumerate() {
            let Some(info) = info else { continue };
            if info.frames.is_empty() || id >= self.frame_index.len() {
                continue;
            }
            let cycle: Duration = info
                .frames
                .iter()
                .map(|f| Duration::from_millis(f.duration_ms as u64))
                .sum();
            if cycle.is_zero() {
                continue;
            }

            let mut index = self.frame_index[id] % info.frames.len();
            let mut elapsed = self.elapsed[id] + dt;

            // Drop whole cycles but keep one so the loop still walks them.
            if elapsed >= cycle * 2 {
                let rest = elapsed.as_nanos() % cycle.as_nanos();
                elapsed = cycle + Duration::from_nanos(rest as u64);
            }

            let mut advanced = false;
            loop {
                let frame = Duration::from_millis(info.frames[index].duration_ms as u64);
                if elapsed < frame {
                    break;
                }
                elapsed -= frame;
                index = (index + 1) % info.frames.len();
                advanced = true;
            }

            self.frame_index[id] = index;
            self.elapsed[id] = elapsed;
            if advanced {
                self.current[id] = tileset.texture(info.frames[index].tile_id).copied();
                changed = true;
            }
        }
        if changed {
            self.version += 1;
        }
        changed
    }

    /// Texture currently displayed for `tile_id`.
    #[inline]
    pub fn resolve(&self, tile_id: u32) -> Option<&TextureRegion> {
        self.current.get(tile_id as usize).and_then(Option::as_ref)
    }

    /// Frame `tile_id` is showing, 0 for tiles without animation.
    pub fn frame_index(&self, tile_id: u32) -> usize {
        self.frame_index.get(tile_id as usize).copied().unwrap_or(0)
    }

    /// Time spent on the current frame of `tile_id`.
    pub fn elapsed(&self, tile_id: u32) -> Duration {
        self.elapsed.get(tile_id as usize).copied().unwrap_or_default()
    }

    /// Bumped on every reset and on every tick that changed a frame.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }
}
