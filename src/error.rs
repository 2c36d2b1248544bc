use std::error;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Error type for grid construction, edits and map loading.
#[derive(Debug)]
pub enum MapError {
    /// File I/O error
    Io {
        /// File that failed to read
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },
    /// JSON parse error
    Json {
        /// File that failed to parse
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },
    /// The map file is structurally unusable
    InvalidMap(String),
    /// A tile layer references a gid no tileset covers
    InvalidTileGid {
        /// Layer name
        layer: String,
        /// Offending gid, flip bits stripped
        gid: u32,
        /// Largest gid covered by the tilesets
        max_gid: u32,
    },
    /// Atlas tile ids run past [`MAX_TILE_ID`](crate::TileSet::MAX_TILE_ID)
    TileIdOutOfRange {
        /// First tile id of the atlas
        first_id: u32,
        /// Tiles in the atlas
        tile_count: u32,
    },
    /// Grid created with a zero dimension
    EmptyGrid {
        /// Requested width in tiles
        width: usize,
        /// Requested height in tiles
        height: usize,
    },
    /// Tile set created with a zero tile dimension
    InvalidTileSize {
        /// Requested tile width in pixels
        width: u32,
        /// Requested tile height in pixels
        height: u32,
    },
    /// Edit outside `[0, width) x [0, height)`
    OutOfBounds {
        /// Column
        x: i32,
        /// Row
        y: i32,
        /// Grid width
        width: usize,
        /// Grid height
        height: usize,
    },
    /// Indexed set above the top of a cell's stack
    InvalidLevel {
        /// Column
        x: i32,
        /// Row
        y: i32,
        /// Requested level
        level: usize,
        /// Current stack depth at that cell
        stack_level: usize,
    },
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::Io { path, source } => {
                write!(f, "I/O error reading {}: {}", path.display(), source)
            }
            MapError::Json { path, source } => {
                write!(f, "JSON parse error in {}: {}", path.display(), source)
            }
            MapError::InvalidMap(msg) => write!(f, "Invalid map: {}", msg),
            MapError::InvalidTileGid { layer, gid, max_gid } => write!(
                f,
                "Layer '{}' references gid {} but tilesets only cover up to {}",
                layer, gid, max_gid
            ),
            MapError::TileIdOutOfRange {
                first_id,
                tile_count,
            } => write!(
                f,
                "{} tiles starting at id {} run past the largest tile id",
                tile_count, first_id
            ),
            MapError::EmptyGrid { width, height } => {
                write!(f, "Grid must not be empty, got {}x{}", width, height)
            }
            MapError::InvalidTileSize { width, height } => {
                write!(f, "Tile size must be positive, got {}x{}", width, height)
            }
            MapError::OutOfBounds { x, y, width, height } => write!(
                f,
                "Cell ({}, {}) is outside the {}x{} grid",
                x, y, width, height
            ),
            MapError::InvalidLevel {
                x,
                y,
                level,
                stack_level,
            } => write!(
                f,
                "Level {} at ({}, {}) is above the stack top ({} levels)",
                level, x, y, stack_level
            ),
        }
    }
}

impl error::Error for MapError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            MapError::Io { source, .. } => Some(source),
            MapError::Json { source, .. } => Some(source),
            _ => None,
        }
    }
}
