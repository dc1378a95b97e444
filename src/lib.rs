//! tilestitch - Tile grid compositor
//!
//! A library for assembling image tiles named by their grid coordinates
//! (`x,y.png`) into a single composite PNG, with a memory-bounded banded mode
//! and a main-thread fallback when no isolated worker is available.

pub mod cli;
pub mod compose;
pub mod config;
pub mod discovery;
pub mod error;
pub mod grid;
pub mod logging;
pub mod output;
pub mod session;
pub mod tile;
pub mod venue;

pub use compose::{
    compose, compose_fallback, CompositionRequest, CompositionResult, Phase, ProgressEvent,
    ProgressSink, Strategy,
};
pub use config::StitchConfig;
pub use discovery::discover_inputs;
pub use error::{Result, StitchError};
pub use grid::{check_canvas_size, plan, GridLayout, MAX_DIMENSION, MAX_PIXELS};
pub use session::{prepare, stitch, RunHandle, StitchEvent, StitchOptions, Stitcher};
pub use tile::{collect_tiles, parse_coords, TileInput, TileRef, TileSource};
pub use venue::{
    negotiate, CapabilityInfo, CapabilityProbe, FallbackHandoff, FixedProbe, LayoutInfo,
    RuntimeProbe, Venue, VenueChoice,
};
