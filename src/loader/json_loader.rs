//! Tiled JSON map import.
use crate::error::MapError;
use crate::map::TileMapData;
use crate::spatial::{Cell, GID_MASK};
use crate::tileset::{AnimationFrame, AtlasGrid, AtlasId, TileSet};
use macroquad::math::{vec2, Rect};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, trace};

#[derive(Deserialize)]
struct JsonMap {
    width: usize,
    height: usize,
    tilewidth: u32,
    tileheight: u32,
    #[serde(default)]
    infinite: bool,
    #[serde(default)]
    orientation: Option<String>,
    #[serde(default)]
    layers: Vec<JsonLayer>,
    #[serde(default)]
    tilesets: Vec<JsonValue>,
}

#[derive(Deserialize)]
struct JsonLayer {
    #[serde(default)]
    data: Vec<u32>,
    #[serde(default)]
    width: Option<usize>,
    #[serde(default)]
    height: Option<usize>,
    #[serde(default = "default_true")]
    visible: bool,
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    kind: Option<String>, // "tilelayer" expected here
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    layers: Vec<JsonLayer>,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
struct JsonTileset {
    tilewidth: u32,
    tileheight: u32,
    tilecount: u32,
    columns: u32,
    image: String,
    #[serde(default)]
    imagewidth: u32,
    #[serde(default)]
    imageheight: u32,
    #[serde(default)]
    spacing: u32,
    #[serde(default)]
    margin: u32,
    #[serde(default)]
    tiles: Vec<JsonTile>,
}

#[derive(Deserialize)]
struct JsonTile {
    id: u32,
    #[serde(default)]
    animation: Vec<JsonFrame>,
    #[serde(default)]
    objectgroup: JsonObjectGroup,
}

#[derive(Deserialize)]
struct JsonFrame {
    tileid: u32,
    duration: u32,
}

#[derive(Deserialize, Default)]
struct JsonObjectGroup {
    #[serde(default)]
    objects: Vec<JsonObject>,
}

#[derive(Deserialize)]
struct JsonObject {
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default)]
    width: f32,
    #[serde(default)]
    height: f32,
    #[serde(default)]
    point: bool,
    #[serde(default)]
    polygon: Vec<JsonObjectPoint>,
}

#[derive(Deserialize)]
struct JsonObjectPoint {
    x: f32,
    y: f32,
}

/// A decoded map: grid data plus the atlas images its regions point at.
pub struct LoadedMap {
    /// Grid, tile set and collision data.
    pub data: TileMapData,
    /// Image path per [`AtlasId`], indexed by the id.
    pub atlas_images: Vec<PathBuf>,
}

/// Solid area of a collision object, polygons reduced to their bounding box.
fn object_to_collision(obj: &JsonObject) -> Option<Rect> {
    if obj.point {
        return None;
    }
    if !obj.polygon.is_empty() {
        let (mut min, mut max) = (vec2(f32::MAX, f32::MAX), vec2(f32::MIN, f32::MIN));
        for p in &obj.polygon {
            min = min.min(vec2(p.x, p.y));
            max = max.max(vec2(p.x, p.y));
        }
        return Some(Rect::new(obj.x + min.x, obj.y + min.y, max.x - min.x, max.y - min.y));
    }
    if obj.width <= 0.0 || obj.height <= 0.0 {
        return None;
    }
    Some(Rect::new(obj.x, obj.y, obj.width, obj.height))
}

fn read_file(path: &Path) -> Result<String, MapError> {
    std::fs::read_to_string(path).map_err(|source| MapError::Io {
        path: path.to_path_buf(),
        source,
    })
}

struct ResolvedTileset {
    first_gid: u32,
    tileset: JsonTileset,
    image: PathBuf,
}

fn resolve_tileset(value: JsonValue, map_path: &Path, map_dir: &Path) -> Result<ResolvedTileset, MapError> {
    let first_gid = value
        .get("firstgid")
        .and_then(JsonValue::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| MapError::InvalidMap("tileset without a valid firstgid".to_owned()))?;

    let (tileset, base_dir): (JsonTileset, PathBuf) =
        match value.get("source").and_then(JsonValue::as_str) {
            Some(source) => {
                if !source.ends_with(".json") {
                    return Err(MapError::InvalidMap(format!(
                        "External tileset must be JSON: {}",
                        source
                    )));
                }
                let ts_path = map_dir.join(source);
                let txt = read_file(&ts_path)?;
                let ts = serde_json::from_str(&txt).map_err(|source| MapError::Json {
                    path: ts_path.clone(),
                    source,
                })?;
                let dir = ts_path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| map_dir.to_path_buf());
                (ts, dir)
            }
            None => {
                let ts = serde_json::from_value(value).map_err(|source| MapError::Json {
                    path: map_path.to_path_buf(),
                    source,
                })?;
                (ts, map_dir.to_path_buf())
            }
        };

    // Image is relative to the file that declared the tileset.
    let image = base_dir.join(&tileset.image);
    Ok(ResolvedTileset {
        first_gid,
        tileset,
        image,
    })
}

/// Fallback when the tileset omits `imagewidth`/`imageheight`.
fn atlas_size(ts: &JsonTileset) -> (u32, u32) {
    let extent = |count: u32, tile: u32| {
        ts.margin
            .saturating_mul(2)
            .saturating_add(count.saturating_mul(tile))
            .saturating_add((count - 1).saturating_mul(ts.spacing))
    };
    let cols = ts.columns.max(1);
    let rows = ts.tilecount.div_ceil(cols).max(1);
    let w = if ts.imagewidth > 0 {
        ts.imagewidth
    } else {
        extent(cols, ts.tilewidth)
    };
    let h = if ts.imageheight > 0 {
        ts.imageheight
    } else {
        extent(rows, ts.tileheight)
    };
    (w, h)
}

fn push_layers(
    data: &mut TileMapData,
    layers: Vec<JsonLayer>,
    max_gid: u32,
    pushed: &mut usize,
) -> Result<(), MapError> {
    let (width, height) = (data.width(), data.height());
    for layer in layers {
        if !layer.visible {
            trace!(layer = %layer.name, "skipping hidden layer");
            continue;
        }
        match layer.kind.as_deref().unwrap_or("tilelayer") {
            "tilelayer" => {}
            "group" => {
                push_layers(data, layer.layers, max_gid, pushed)?;
                continue;
            }
            other => {
                trace!(layer = %layer.name, kind = other, "skipping non-tile layer");
                continue;
            }
        }

        if layer.encoding.as_deref().is_some_and(|e| e != "csv") {
            return Err(MapError::InvalidMap(format!(
                "Layer '{}' uses an unsupported encoding; save the map with CSV layer data",
                layer.name
            )));
        }
        let lw = layer.width.unwrap_or(width);
        let lh = layer.height.unwrap_or(height);
        if lw != width || lh != height || layer.data.len() != lw * lh {
            return Err(MapError::InvalidMap(format!(
                "Layer '{}' data does not match the {}x{} map",
                layer.name, width, height
            )));
        }

        for (idx, &raw_gid) in layer.data.iter().enumerate() {
            let gid = raw_gid & GID_MASK;
            if gid == 0 {
                continue;
            }
            if gid > max_gid {
                return Err(MapError::InvalidTileGid {
                    layer: layer.name.clone(),
                    gid,
                    max_gid,
                });
            }
            let x = (idx % width) as i32;
            let y = (idx / width) as i32;
            data.push(x, y, Cell::from_tiled_gid(raw_gid))?;
            *pushed += 1;
        }
    }
    Ok(())
}

fn decode(txt: &str, map_path: &Path, map_dir: &Path) -> Result<LoadedMap, MapError> {
    let j: JsonMap = serde_json::from_str(txt).map_err(|source| MapError::Json {
        path: map_path.to_path_buf(),
        source,
    })?;

    if j.infinite {
        return Err(MapError::InvalidMap("Infinite maps are not supported".to_owned()));
    }
    if let Some(o) = j.orientation.as_deref() {
        if o != "orthogonal" {
            return Err(MapError::InvalidMap(format!("Unsupported orientation: {}", o)));
        }
    }

    let mut resolved = j
        .tilesets
        .into_iter()
        .map(|v| resolve_tileset(v, map_path, map_dir))
        .collect::<Result<Vec<_>, _>>()?;
    // Sort by first_gid so atlas ids follow gid order
    resolved.sort_by_key(|t| t.first_gid);

    let mut tileset = TileSet::new(j.tilewidth, j.tileheight)?;
    let mut atlas_images = Vec::with_capacity(resolved.len());
    let mut max_gid = 0u32;

    for (i, r) in resolved.into_iter().enumerate() {
        let ts = &r.tileset;
        let (iw, ih) = atlas_size(ts);
        tileset.add_atlas_grid(&AtlasGrid {
            atlas: AtlasId(i as u16),
            first_id: r.first_gid,
            tile_count: ts.tilecount,
            columns: ts.columns,
            tile_w: ts.tilewidth,
            tile_h: ts.tileheight,
            spacing: ts.spacing,
            margin: ts.margin,
            image_size: vec2(iw as f32, ih as f32),
        })?;
        // add_atlas_grid bounds first_gid + tilecount, so local ids below
        // tilecount cannot overflow.
        if ts.tilecount > 0 {
            max_gid = max_gid.max(r.first_gid + ts.tilecount - 1);
        }
        let local_gid = |id: u32| {
            if id < ts.tilecount {
                Ok(r.first_gid + id)
            } else {
                Err(MapError::InvalidMap(format!(
                    "Tile id {} is outside tileset '{}' ({} tiles)",
                    id, ts.image, ts.tilecount
                )))
            }
        };

        for tile in &ts.tiles {
            let gid = local_gid(tile.id)?;
            if !tile.animation.is_empty() {
                let frames = tile
                    .animation
                    .iter()
                    .map(|f| {
                        Ok(AnimationFrame {
                            tile_id: local_gid(f.tileid)?,
                            duration_ms: f.duration,
                        })
                    })
                    .collect::<Result<Vec<_>, MapError>>()?;
                tileset.set_animation(gid, frames);
            }
            for rect in tile.objectgroup.objects.iter().filter_map(object_to_collision) {
                tileset.add_collision(gid, rect);
            }
        }
        atlas_images.push(r.image);
    }

    let mut data = TileMapData::new(j.width, j.height, Rc::new(tileset))?;
    let mut pushed = 0;
    push_layers(&mut data, j.layers, max_gid, &mut pushed)?;

    debug!(
        path = %map_path.display(),
        width = j.width,
        height = j.height,
        atlases = atlas_images.len(),
        cells = pushed,
        max_level = data.max_level(),
        "decoded tile map"
    );

    Ok(LoadedMap { data, atlas_images })
}

/// Decodes a Tiled JSON map file. Tilesets may be embedded or external
/// JSON files; visible tile layers stack bottom to top in file order.
pub fn decode_map_file(path: impl AsRef<Path>) -> Result<LoadedMap, MapError> {
    let p = path.as_ref();
    if p.extension().and_then(|e| e.to_str()) != Some("json") {
        return Err(MapError::InvalidMap(format!(
            "Map file must be a JSON file: {}",
            p.display()
        )));
    }

    let txt = read_file(p)?;
    let map_dir = p
        .parent()
        .map(|d| d.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./"));
    decode(&txt, p, &map_dir)
}

/// Decodes map JSON held in memory; relative paths resolve against `base_dir`.
pub fn decode_map_str(json: &str, base_dir: impl AsRef<Path>) -> Result<LoadedMap, MapError> {
    let base_dir = base_dir.as_ref();
    decode(json, &base_dir.join("<memory>"), base_dir)
}
