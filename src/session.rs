//! Control surface for composition runs.
//!
//! A [`Stitcher`] starts runs and hands back a [`RunHandle`] carrying the
//! run's event stream. Each run parses and plans on a blocking worker,
//! negotiates a venue, then composes either on the isolated worker or through
//! the main-thread fallback. Every run ends with exactly one `Done` or
//! `Error` event.
//!
//! ```text
//! inputs ─► parse ─► load/probe ─► plan ─► negotiate ─┬─► engine (isolated)
//!                                                     └─► fallback (main thread)
//! ```

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::compose::{
    compose, compose_fallback, ensure_active, probe_dimensions, CompositionRequest,
    CompositionResult, Phase, Progress, ProgressEvent, ProgressSink, DEFAULT_ROWS_PER_BAND,
};
use crate::error::{Result, StitchError};
use crate::grid::{plan, GridLayout};
use crate::tile::{collect_tiles, TileInput, TileRef};
use crate::venue::{
    negotiate, CapabilityInfo, CapabilityProbe, FallbackHandoff, LayoutInfo, RuntimeProbe, Venue,
};

/// Per-run options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StitchOptions {
    /// Use the banded, memory-bounded strategy.
    pub safe_mode: bool,
    /// Grid rows per band in safe mode. Clamped to at least 1.
    pub rows_per_band: u32,
    /// Check every tile's dimensions against the reference tile.
    pub verify_tile_sizes: bool,
}

impl Default for StitchOptions {
    fn default() -> Self {
        Self {
            safe_mode: false,
            rows_per_band: DEFAULT_ROWS_PER_BAND,
            verify_tile_sizes: true,
        }
    }
}

/// Events emitted by a run, in order.
#[derive(Debug)]
pub enum StitchEvent {
    /// Planning succeeded and a venue was chosen.
    Ready(CapabilityInfo),
    Progress(ProgressEvent),
    /// Drawing was handed to the main-thread fallback.
    Fallback(LayoutInfo),
    Done(CompositionResult),
    Error(StitchError),
}

impl StitchEvent {
    /// True for the event that ends a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StitchEvent::Done(_) | StitchEvent::Error(_))
    }
}

/// Sending half of a run's event stream. A closed receiver is not an error:
/// the run keeps going until it notices its cancellation.
#[derive(Clone)]
struct Events(UnboundedSender<StitchEvent>);

impl Events {
    fn send(&self, event: StitchEvent) {
        let _ = self.0.send(event);
    }

    fn sink(&self) -> impl ProgressSink + 'static {
        let events = self.clone();
        move |progress: ProgressEvent| events.send(StitchEvent::Progress(progress))
    }
}

/// Handle to one run. Dropping it cancels the run.
pub struct RunHandle {
    events: UnboundedReceiver<StitchEvent>,
    cancel: CancellationToken,
}

impl RunHandle {
    /// Next event, or `None` once the run has finished.
    pub async fn next_event(&mut self) -> Option<StitchEvent> {
        self.events.recv().await
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drain the event stream, passing non-terminal events to `on_event`,
    /// and return the run's outcome.
    pub async fn finish<F>(mut self, mut on_event: F) -> Result<CompositionResult>
    where
        F: FnMut(&StitchEvent),
    {
        while let Some(event) = self.events.recv().await {
            match event {
                StitchEvent::Done(result) => return Ok(result),
                StitchEvent::Error(err) => return Err(err),
                other => on_event(&other),
            }
        }

        Err(StitchError::Worker {
            message: "run ended without a result".to_string(),
        })
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct InFlight {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Starts composition runs, one at a time.
///
/// Starting a run tears down the previous one first: it is cancelled and its
/// task is awaited, so two runs never compete for the same output.
pub struct Stitcher {
    probe: Arc<dyn CapabilityProbe>,
    current: Option<InFlight>,
}

impl Default for Stitcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Stitcher {
    /// A stitcher that probes the ambient runtime for an isolated worker.
    pub fn new() -> Self {
        Self::with_probe(RuntimeProbe)
    }

    pub fn with_probe(probe: impl CapabilityProbe + 'static) -> Self {
        Self {
            probe: Arc::new(probe),
            current: None,
        }
    }

    pub fn with_boxed_probe(probe: Box<dyn CapabilityProbe>) -> Self {
        Self {
            probe: Arc::from(probe),
            current: None,
        }
    }

    /// Start a run. Must be called from within a tokio runtime.
    pub async fn start(&mut self, inputs: Vec<TileInput>, options: StitchOptions) -> RunHandle {
        self.shutdown().await;

        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(
            inputs,
            options,
            Arc::clone(&self.probe),
            Events(tx),
            cancel.clone(),
        ));

        self.current = Some(InFlight {
            cancel: cancel.clone(),
            task,
        });

        RunHandle { events: rx, cancel }
    }

    /// Cancel the in-flight run, if any, and wait for it to release its
    /// buffers.
    pub async fn shutdown(&mut self) {
        if let Some(previous) = self.current.take() {
            previous.cancel.cancel();
            if let Err(e) = previous.task.await {
                warn!(error = %e, "Previous run did not shut down cleanly");
            }
        }
    }
}

impl Drop for Stitcher {
    fn drop(&mut self) {
        if let Some(current) = &self.current {
            current.cancel.cancel();
        }
    }
}

/// Compose a tile set with default venue probing and wait for the result.
pub async fn stitch(inputs: Vec<TileInput>, options: StitchOptions) -> Result<CompositionResult> {
    let mut stitcher = Stitcher::new();
    let handle = stitcher.start(inputs, options).await;
    handle.finish(|_| {}).await
}

async fn run(
    inputs: Vec<TileInput>,
    options: StitchOptions,
    probe: Arc<dyn CapabilityProbe>,
    events: Events,
    cancel: CancellationToken,
) {
    let terminal = match drive(inputs, options, probe, &events, &cancel).await {
        Ok(result) => {
            info!(width = result.width, height = result.height, "Composition complete");
            StitchEvent::Done(result)
        }
        Err(err) => {
            debug!(error = %err, "Composition failed");
            StitchEvent::Error(err)
        }
    };
    events.send(terminal);
}

async fn drive(
    inputs: Vec<TileInput>,
    options: StitchOptions,
    probe: Arc<dyn CapabilityProbe>,
    events: &Events,
    cancel: &CancellationToken,
) -> Result<CompositionResult> {
    let (tiles, layout) = {
        let mut sink = events.sink();
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            prepare(inputs, options.verify_tile_sizes, &mut sink, &cancel)
        })
        .await
        .map_err(join_error)??
    };

    let venue = negotiate(probe.as_ref());
    info!(%venue, "Venue selected");
    events.send(StitchEvent::Ready(CapabilityInfo { venue, layout }));

    match venue {
        Venue::Isolated => {
            let request =
                CompositionRequest::new(tiles, options.safe_mode, options.rows_per_band);
            let mut sink = events.sink();
            let cancel = cancel.clone();
            tokio::task::spawn_blocking(move || compose(&request, &layout, &mut sink, &cancel))
                .await
                .map_err(join_error)?
        }
        Venue::MainThread => {
            warn!("Isolated worker unavailable, using main-thread fallback");
            let handoff = FallbackHandoff::new(tiles, &layout);
            events.send(StitchEvent::Fallback(handoff.info()));
            let mut sink = events.sink();
            compose_fallback(handoff, &mut sink, cancel).await
        }
    }
}

fn join_error(err: tokio::task::JoinError) -> StitchError {
    StitchError::Worker {
        message: err.to_string(),
    }
}

/// Parse, probe and plan a tile set.
///
/// Probing reads tile headers only and reports `Load` progress. With
/// `verify_tile_sizes`, every tile must match the first tile's dimensions;
/// otherwise only the first tile is probed.
pub fn prepare(
    inputs: Vec<TileInput>,
    verify_tile_sizes: bool,
    sink: &mut dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<(Vec<TileRef>, GridLayout)> {
    let tiles = collect_tiles(inputs)?;
    let total = if verify_tile_sizes { tiles.len() } else { 1 };
    let mut progress = Progress::start(Phase::Load, total, sink);

    let reference = &tiles[0];
    let expected = probe_dimensions(reference)?;
    progress.advance();

    if verify_tile_sizes {
        for tile in &tiles[1..] {
            ensure_active(cancel)?;
            let actual = probe_dimensions(tile)?;
            if actual != expected {
                return Err(StitchError::TileSizeMismatch {
                    identifier: tile.identifier.clone(),
                    expected,
                    actual,
                });
            }
            progress.advance();
        }
    }

    ensure_active(cancel)?;
    let layout = plan(&tiles, expected.0, expected.1)?;
    Ok((tiles, layout))
}
