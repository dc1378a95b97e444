//! Layout sidecar output.
//!
//! Describes where each tile landed in the composite, in a JSON hash keyed by
//! tile identifier, so downstream tools can map pixels back to tiles.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::{Result, StitchError};
use crate::tile::TileRef;

use super::GridLayout;

/// Render the layout document as pretty JSON.
pub fn layout_json(layout: &GridLayout, tiles: &[TileRef], image: &str) -> Result<String> {
    let doc = LayoutJson::new(layout, tiles, image);
    serde_json::to_string_pretty(&doc).map_err(|e| StitchError::Encode {
        message: format!("Failed to serialize layout: {}", e),
    })
}

/// Write the layout document next to the composite image.
pub fn write_layout_json(
    layout: &GridLayout,
    tiles: &[TileRef],
    image: &str,
    path: &Path,
) -> Result<()> {
    let json = layout_json(layout, tiles, image)?;
    fs::write(path, json).map_err(|e| StitchError::Io {
        path: path.to_path_buf(),
        message: format!("Failed to write layout: {}", e),
    })?;
    Ok(())
}

// --- JSON serialization types ---

#[derive(Serialize)]
struct LayoutJson {
    tiles: BTreeMap<String, TileEntry>,
    meta: Meta,
}

#[derive(Serialize)]
struct TileEntry {
    cell: Cell,
    frame: Rect,
}

#[derive(Serialize)]
struct Cell {
    x: i64,
    y: i64,
}

#[derive(Serialize)]
struct Rect {
    x: i64,
    y: i64,
    w: u32,
    h: u32,
}

#[derive(Serialize)]
struct Size {
    w: u32,
    h: u32,
}

#[derive(Serialize)]
struct Meta {
    app: String,
    version: String,
    image: String,
    size: Size,
    tile: Size,
    columns: u64,
    rows: u64,
    origin: Cell,
}

impl LayoutJson {
    fn new(layout: &GridLayout, tiles: &[TileRef], image: &str) -> Self {
        let mut entries = BTreeMap::new();
        for tile in tiles {
            let (x, y) = layout.tile_origin(tile.x, tile.y);
            entries.insert(
                tile.identifier.clone(),
                TileEntry {
                    cell: Cell {
                        x: tile.x,
                        y: tile.y,
                    },
                    frame: Rect {
                        x,
                        y,
                        w: layout.tile_width,
                        h: layout.tile_height,
                    },
                },
            );
        }

        LayoutJson {
            tiles: entries,
            meta: Meta {
                app: "tilestitch".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                image: image.to_string(),
                size: Size {
                    w: layout.canvas_width,
                    h: layout.canvas_height,
                },
                tile: Size {
                    w: layout.tile_width,
                    h: layout.tile_height,
                },
                columns: layout.columns(),
                rows: layout.rows(),
                origin: Cell {
                    x: layout.min_x,
                    y: layout.min_y,
                },
            },
        }
    }
}
