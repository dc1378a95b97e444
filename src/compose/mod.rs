//! Tile compositing.
//!
//! Two compositors draw the same layout: the [`engine`] runs on a worker that
//! may block freely and offers a direct and a banded (memory-bounded)
//! strategy; the [`fallback`] compositor runs on the caller's task and yields
//! after every tile. Both draw through [`Surface`], so pixel placement is
//! identical.

pub mod engine;
pub mod fallback;
mod surface;

use std::fmt;

use tokio_util::sync::CancellationToken;

use crate::error::{Result, StitchError};
use crate::tile::TileRef;

pub use engine::compose;
pub use fallback::compose_fallback;
pub use surface::{probe_dimensions, Surface};

/// Rows per band when safe mode does not say otherwise.
pub const DEFAULT_ROWS_PER_BAND: u32 = 8;

/// Pipeline phase a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Reading and probing tile sources.
    Load,
    /// Decoding tiles onto the output surface.
    Draw,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Load => write!(f, "load"),
            Phase::Draw => write!(f, "draw"),
        }
    }
}

/// Progress within one phase. `completed` never decreases and the last event
/// of a finished phase has `completed == total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub phase: Phase,
    pub completed: usize,
    pub total: usize,
}

impl ProgressEvent {
    /// Completion as a rounded percentage.
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed as f64 / self.total as f64) * 100.0).round() as u32
    }
}

/// Consumer of progress events.
pub trait ProgressSink: Send {
    fn emit(&mut self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: FnMut(ProgressEvent) + Send,
{
    fn emit(&mut self, event: ProgressEvent) {
        self(event)
    }
}

/// Monotonic counter that reports each step to a sink.
pub(crate) struct Progress<'a> {
    phase: Phase,
    completed: usize,
    total: usize,
    sink: &'a mut dyn ProgressSink,
}

impl<'a> Progress<'a> {
    /// Start a phase, announcing `0 / total`.
    pub(crate) fn start(phase: Phase, total: usize, sink: &'a mut dyn ProgressSink) -> Self {
        let mut progress = Self {
            phase,
            completed: 0,
            total,
            sink,
        };
        progress.report();
        progress
    }

    pub(crate) fn advance(&mut self) {
        self.completed += 1;
        self.report();
    }

    fn report(&mut self) {
        self.sink.emit(ProgressEvent {
            phase: self.phase,
            completed: self.completed,
            total: self.total,
        });
    }
}

/// How the engine walks the tile set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Every tile in one pass.
    Direct,
    /// Row bands in ascending order, rescanning the tile list per band.
    Banded { rows_per_band: u32 },
}

/// Input to the compositing engine.
#[derive(Debug, Clone)]
pub struct CompositionRequest {
    pub tiles: Vec<TileRef>,
    pub safe_mode: bool,
    pub rows_per_band: u32,
}

impl CompositionRequest {
    /// Create a request. `rows_per_band` is clamped to at least 1.
    pub fn new(tiles: Vec<TileRef>, safe_mode: bool, rows_per_band: u32) -> Self {
        Self {
            tiles,
            safe_mode,
            rows_per_band: rows_per_band.max(1),
        }
    }

    pub fn strategy(&self) -> Strategy {
        if self.safe_mode {
            Strategy::Banded {
                rows_per_band: self.rows_per_band.max(1),
            }
        } else {
            Strategy::Direct
        }
    }
}

/// Encoded composite image. Ownership passes to the caller.
#[derive(Clone, PartialEq, Eq)]
pub struct CompositionResult {
    /// PNG-encoded bytes.
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl fmt::Debug for CompositionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositionResult")
            .field("png", &format_args!("{} bytes", self.png.len()))
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Bail out if the run has been cancelled.
pub(crate) fn ensure_active(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(StitchError::Cancelled);
    }
    Ok(())
}
