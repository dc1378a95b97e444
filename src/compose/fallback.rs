//! Main-thread fallback compositor.
//!
//! Draws a handed-off layout on the caller's task when no isolated worker is
//! available. Same placement as the engine's direct strategy, but it yields
//! to the scheduler after every tile so it never monopolizes the thread.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::Result;
use crate::grid::{check_canvas_size, tile_origin};
use crate::venue::FallbackHandoff;

use super::{ensure_active, CompositionResult, Phase, Progress, ProgressSink, Surface};

/// Compose a handed-off layout, yielding after each tile.
///
/// The canvas size is checked again here since the handoff may not come from
/// this crate's planner.
pub async fn compose_fallback(
    handoff: FallbackHandoff,
    sink: &mut dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<CompositionResult> {
    check_canvas_size(handoff.canvas_width as u64, handoff.canvas_height as u64)?;
    ensure_active(cancel)?;

    let min = (handoff.min_x, handoff.min_y);
    let tile_size = (handoff.tile_width, handoff.tile_height);

    let mut surface = Surface::allocate(handoff.canvas_width, handoff.canvas_height)?;
    let mut progress = Progress::start(Phase::Draw, handoff.tiles.len(), sink);

    for tile in &handoff.tiles {
        ensure_active(cancel)?;
        surface.draw_tile(tile, tile_origin(min, tile_size, tile.x, tile.y))?;
        progress.advance();
        tokio::task::yield_now().await;
    }

    debug!(tiles = handoff.tiles.len(), "Fallback composition complete");
    surface.encode()
}
