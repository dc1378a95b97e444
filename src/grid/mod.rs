//! Grid planning.
//!
//! Derives the bounding grid of a tile set and the output canvas size, and
//! guards the canvas against the hard size limits before anything is
//! allocated.

mod sidecar;

use std::ops::Range;

use serde::Serialize;
use tracing::info;

use crate::error::{Result, StitchError};
use crate::tile::TileRef;

pub use sidecar::{layout_json, write_layout_json};

/// Largest width or height of the output canvas, in pixels.
pub const MAX_DIMENSION: u32 = 32_767;

/// Largest total pixel count of the output canvas (2^28).
pub const MAX_PIXELS: u64 = 268_435_456;

/// Layout of the output canvas. Immutable once planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridLayout {
    pub min_x: i64,
    pub max_x: i64,
    pub min_y: i64,
    pub max_y: i64,
    pub tile_width: u32,
    pub tile_height: u32,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl GridLayout {
    /// Number of grid columns. Zero for an inverted range.
    pub fn columns(&self) -> u64 {
        cell_count(self.min_x, self.max_x)
    }

    /// Number of grid rows. Zero for an inverted range.
    pub fn rows(&self) -> u64 {
        cell_count(self.min_y, self.max_y)
    }

    pub fn pixel_count(&self) -> u64 {
        self.canvas_width as u64 * self.canvas_height as u64
    }

    /// Pixel offset of the top-left corner of the tile at `(x, y)`.
    pub fn tile_origin(&self, x: i64, y: i64) -> (i64, i64) {
        tile_origin(
            (self.min_x, self.min_y),
            (self.tile_width, self.tile_height),
            x,
            y,
        )
    }

    /// Zero-based grid row of tile row `y`.
    pub fn row_of(&self, y: i64) -> u64 {
        (y - self.min_y) as u64
    }

    /// Split the grid rows into contiguous bands of `rows_per_band` rows.
    ///
    /// The last band may be shorter. A band size of zero is treated as one.
    pub fn bands(&self, rows_per_band: u32) -> impl Iterator<Item = Range<u64>> {
        let rows = self.rows();
        let step = rows_per_band.max(1) as u64;
        (0..rows)
            .step_by(step as usize)
            .map(move |start| start..(start + step).min(rows))
    }
}

/// Pixel offset of a tile given the grid origin and the tile size.
///
/// Shared by every compositor so that tile placement is identical whichever
/// venue draws it.
pub fn tile_origin(min: (i64, i64), tile_size: (u32, u32), x: i64, y: i64) -> (i64, i64) {
    (
        (x - min.0) * tile_size.0 as i64,
        (y - min.1) * tile_size.1 as i64,
    )
}

/// Compute the grid layout for a tile set.
///
/// Tile dimensions come from the reference tile; every tile is assumed to
/// share them. Fails if the canvas would exceed [`MAX_DIMENSION`] or
/// [`MAX_PIXELS`].
pub fn plan(tiles: &[TileRef], tile_width: u32, tile_height: u32) -> Result<GridLayout> {
    let first = tiles.first().ok_or(StitchError::NoValidTiles)?;

    if tile_width == 0 || tile_height == 0 {
        return Err(StitchError::ZeroSizedTile {
            identifier: first.identifier.clone(),
        });
    }

    let (mut min_x, mut max_x) = (first.x, first.x);
    let (mut min_y, mut max_y) = (first.y, first.y);
    for tile in &tiles[1..] {
        min_x = min_x.min(tile.x);
        max_x = max_x.max(tile.x);
        min_y = min_y.min(tile.y);
        max_y = max_y.max(tile.y);
    }

    let width = span_pixels(min_x, max_x, tile_width);
    let height = span_pixels(min_y, max_y, tile_height);
    check_canvas_size(width, height)?;

    let layout = GridLayout {
        min_x,
        max_x,
        min_y,
        max_y,
        tile_width,
        tile_height,
        canvas_width: width as u32,
        canvas_height: height as u32,
    };

    info!(
        columns = layout.columns(),
        rows = layout.rows(),
        width = layout.canvas_width,
        height = layout.canvas_height,
        "Planned grid"
    );

    Ok(layout)
}

/// Cells in the inclusive range `min..=max`, clamped to `0..=u64::MAX`.
fn cell_count(min: i64, max: i64) -> u64 {
    let cells = max as i128 - min as i128 + 1;
    cells.clamp(0, u64::MAX as i128) as u64
}

/// Pixel extent of an inclusive coordinate range, saturating at `u64::MAX`.
fn span_pixels(min: i64, max: i64, tile_size: u32) -> u64 {
    let cells = max as i128 - min as i128 + 1;
    u64::try_from(cells * tile_size as i128).unwrap_or(u64::MAX)
}

/// Check a canvas size against the hard limits.
///
/// Dimensions are checked before area. Values equal to a limit pass.
pub fn check_canvas_size(width: u64, height: u64) -> Result<()> {
    let max = MAX_DIMENSION as u64;
    if width > max || height > max {
        return Err(StitchError::CanvasTooLarge {
            width,
            height,
            max: MAX_DIMENSION,
        });
    }

    let pixels = width * height;
    if pixels > MAX_PIXELS {
        return Err(StitchError::TooManyPixels {
            width,
            height,
            pixels,
            max: MAX_PIXELS,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::TileSource;
    use pretty_assertions::assert_eq;

    fn tiles(coords: &[(i64, i64)]) -> Vec<TileRef> {
        coords
            .iter()
            .map(|&(x, y)| TileRef {
                x,
                y,
                identifier: format!("{},{}.png", x, y),
                source: TileSource::Memory(Vec::<u8>::new().into()),
            })
            .collect()
    }

    #[test]
    fn test_plan_bounding_box() {
        let set = tiles(&[(0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (2, 1)]);
        let layout = plan(&set, 16, 8).unwrap();

        assert_eq!(
            layout,
            GridLayout {
                min_x: 0,
                max_x: 2,
                min_y: 0,
                max_y: 1,
                tile_width: 16,
                tile_height: 8,
                canvas_width: 48,
                canvas_height: 16,
            }
        );
        assert_eq!(layout.columns(), 3);
        assert_eq!(layout.rows(), 2);
    }

    #[test]
    fn test_plan_single_tile() {
        let layout = plan(&tiles(&[(5, 5)]), 10, 10).unwrap();
        assert_eq!(
            (layout.min_x, layout.max_x, layout.min_y, layout.max_y),
            (5, 5, 5, 5)
        );
        assert_eq!((layout.canvas_width, layout.canvas_height), (10, 10));
        assert_eq!(layout.tile_origin(5, 5), (0, 0));
    }

    #[test]
    fn test_plan_negative_and_sparse() {
        let layout = plan(&tiles(&[(-2, 3), (1, -1)]), 4, 4).unwrap();
        assert_eq!((layout.min_x, layout.max_x), (-2, 1));
        assert_eq!((layout.min_y, layout.max_y), (-1, 3));
        assert_eq!((layout.canvas_width, layout.canvas_height), (16, 20));
        assert_eq!(layout.tile_origin(1, -1), (12, 0));
        assert_eq!(layout.tile_origin(-2, 3), (0, 16));
        assert_eq!(layout.row_of(3), 4);
    }

    #[test]
    fn test_plan_empty() {
        assert!(matches!(plan(&[], 4, 4), Err(StitchError::NoValidTiles)));
    }

    #[test]
    fn test_plan_zero_sized_tile() {
        assert!(matches!(
            plan(&tiles(&[(0, 0)]), 0, 4),
            Err(StitchError::ZeroSizedTile { .. })
        ));
    }

    #[test]
    fn test_plan_dimension_too_large() {
        // 32768 columns of 1px tiles
        let layout = plan(&tiles(&[(0, 0), (32767, 0)]), 1, 1);
        match layout {
            Err(StitchError::CanvasTooLarge { width, height, max }) => {
                assert_eq!((width, height, max), (32768, 1, 32767));
            }
            other => panic!("expected CanvasTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_plan_extreme_span_saturates() {
        let layout = plan(&tiles(&[(i64::MIN, 0), (i64::MAX, 0)]), 256, 256);
        assert!(matches!(layout, Err(StitchError::CanvasTooLarge { .. })));
    }

    #[test]
    fn test_plan_max_dimension_passes() {
        let layout = plan(&tiles(&[(0, 0), (32766, 0)]), 1, 1).unwrap();
        assert_eq!(layout.canvas_width, MAX_DIMENSION);
    }

    #[test]
    fn test_check_exact_pixel_limit_passes() {
        assert!(check_canvas_size(16_384, 16_384).is_ok());
    }

    #[test]
    fn test_check_pixel_limit_exceeded() {
        match check_canvas_size(16_385, 16_384) {
            Err(StitchError::TooManyPixels { pixels, max, .. }) => {
                assert_eq!(pixels, 268_451_840);
                assert_eq!(max, MAX_PIXELS);
            }
            other => panic!("expected TooManyPixels, got {:?}", other),
        }
    }

    #[test]
    fn test_check_dimension_before_area() {
        assert!(matches!(
            check_canvas_size(268_435_457, 1),
            Err(StitchError::CanvasTooLarge { .. })
        ));
    }

    #[test]
    fn test_bands() {
        let layout = plan(&tiles(&[(0, 0), (0, 4)]), 2, 2).unwrap();

        let bands: Vec<_> = layout.bands(2).collect();
        assert_eq!(bands, vec![0..2, 2..4, 4..5]);

        let single: Vec<_> = layout.bands(8).collect();
        assert_eq!(single, vec![0..5]);

        let per_row: Vec<_> = layout.bands(0).collect();
        assert_eq!(per_row.len(), 5);
    }

    #[test]
    fn test_inverted_layout_has_no_rows() {
        let layout = GridLayout {
            min_x: 3,
            max_x: 0,
            min_y: 2,
            max_y: -1,
            tile_width: 4,
            tile_height: 4,
            canvas_width: 4,
            canvas_height: 4,
        };
        assert_eq!(layout.columns(), 0);
        assert_eq!(layout.rows(), 0);
        assert_eq!(layout.bands(1).count(), 0);
    }

    #[test]
    fn test_full_i64_span_counts() {
        let layout = GridLayout {
            min_x: i64::MIN,
            max_x: i64::MAX,
            min_y: 0,
            max_y: 0,
            tile_width: 1,
            tile_height: 1,
            canvas_width: 1,
            canvas_height: 1,
        };
        assert_eq!(layout.columns(), u64::MAX);
        assert_eq!(layout.rows(), 1);
    }
}
