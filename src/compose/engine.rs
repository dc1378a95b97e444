//! Compositing engine.
//!
//! Runs on a worker that is allowed to block. The direct strategy draws every
//! tile in one pass; the banded strategy walks the grid in row bands so that
//! only one decoded tile is alive at a time and work is handed back to the
//! scheduler between bands.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::Result;
use crate::grid::{check_canvas_size, GridLayout};
use crate::tile::TileRef;

use super::{
    ensure_active, CompositionRequest, CompositionResult, Phase, Progress, ProgressSink, Strategy,
    Surface,
};

/// Compose the request's tiles onto a surface sized by `layout`.
///
/// Emits one `Draw` progress event per tile drawn. A tile that fails to
/// decode aborts the whole composition; no partial image is returned.
/// The layout's canvas is checked against the size limits before allocation.
pub fn compose(
    request: &CompositionRequest,
    layout: &GridLayout,
    sink: &mut dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<CompositionResult> {
    check_canvas_size(layout.canvas_width as u64, layout.canvas_height as u64)?;
    ensure_active(cancel)?;
    let strategy = request.strategy();
    debug!(?strategy, tiles = request.tiles.len(), "Composing");

    let mut surface = Surface::allocate(layout.canvas_width, layout.canvas_height)?;
    let mut progress = Progress::start(Phase::Draw, request.tiles.len(), sink);

    match strategy {
        Strategy::Direct => {
            draw_direct(&request.tiles, layout, &mut surface, &mut progress, cancel)?
        }
        Strategy::Banded { rows_per_band } => draw_banded(
            &request.tiles,
            layout,
            rows_per_band,
            &mut surface,
            &mut progress,
            cancel,
        )?,
    }

    surface.encode()
}

fn draw_direct(
    tiles: &[TileRef],
    layout: &GridLayout,
    surface: &mut Surface,
    progress: &mut Progress<'_>,
    cancel: &CancellationToken,
) -> Result<()> {
    for tile in tiles {
        ensure_active(cancel)?;
        surface.draw_tile(tile, layout.tile_origin(tile.x, tile.y))?;
        progress.advance();
    }
    Ok(())
}

fn draw_banded(
    tiles: &[TileRef],
    layout: &GridLayout,
    rows_per_band: u32,
    surface: &mut Surface,
    progress: &mut Progress<'_>,
    cancel: &CancellationToken,
) -> Result<()> {
    for band in layout.bands(rows_per_band) {
        let mut drawn = 0usize;
        for tile in tiles {
            if tile.y < layout.min_y || !band.contains(&layout.row_of(tile.y)) {
                continue;
            }
            ensure_active(cancel)?;
            surface.draw_tile(tile, layout.tile_origin(tile.x, tile.y))?;
            progress.advance();
            drawn += 1;
        }

        debug!(rows = ?band, drawn, "Band complete");
        std::thread::yield_now();
    }
    Ok(())
}
