//! Tile inputs and parsed tile references.
//!
//! A tile enters the pipeline as a [`TileInput`] (an identifier plus a byte
//! source). The coordinate parser turns the ones with `x,y` identifiers into
//! [`TileRef`]s; everything else is dropped.

mod coord;

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Result, StitchError};

pub use coord::{collect_tiles, parse_coords};

/// Where a tile's encoded bytes live.
///
/// File sources are read lazily, right before the tile is probed or decoded,
/// so a run never holds more encoded tiles in memory than it is working on.
#[derive(Debug, Clone)]
pub enum TileSource {
    Memory(Arc<[u8]>),
    File(PathBuf),
}

impl TileSource {
    /// Fetch the encoded bytes for this tile.
    pub fn bytes(&self) -> Result<Cow<'_, [u8]>> {
        match self {
            TileSource::Memory(data) => Ok(Cow::Borrowed(&data[..])),
            TileSource::File(path) => fs::read(path).map(Cow::Owned).map_err(|e| StitchError::Io {
                path: path.clone(),
                message: format!("Failed to read tile: {}", e),
            }),
        }
    }
}

/// One raw input: an identifier (usually a file name) and its bytes.
#[derive(Debug, Clone)]
pub struct TileInput {
    pub identifier: String,
    pub source: TileSource,
}

impl TileInput {
    pub fn from_bytes(identifier: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            identifier: identifier.into(),
            source: TileSource::Memory(data.into()),
        }
    }

    /// Create an input backed by a file. The identifier is the file name.
    pub fn from_path(path: &Path) -> Self {
        let identifier = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            identifier,
            source: TileSource::File(path.to_path_buf()),
        }
    }
}

/// A tile with parsed grid coordinates. Immutable once created.
#[derive(Debug, Clone)]
pub struct TileRef {
    pub x: i64,
    pub y: i64,
    pub identifier: String,
    pub source: TileSource,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_source_borrows() {
        let input = TileInput::from_bytes("0,0.png", vec![1u8, 2, 3]);
        let bytes = input.source.bytes().unwrap();
        assert!(matches!(bytes, Cow::Borrowed(_)));
        assert_eq!(&*bytes, &[1, 2, 3]);
    }

    #[test]
    fn test_file_source_reads_lazily() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("3,4.png");
        let input = TileInput::from_path(&path);
        assert_eq!(input.identifier, "3,4.png");

        // Not written yet: reading fails with the path attached
        match input.source.bytes() {
            Err(StitchError::Io { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected Io error, got {:?}", other),
        }

        fs::write(&path, b"data").unwrap();
        assert_eq!(&*input.source.bytes().unwrap(), b"data");
    }
}
