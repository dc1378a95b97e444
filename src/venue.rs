//! Execution venue negotiation.
//!
//! The engine prefers an isolated worker that may block. When that capability
//! is missing, the layout is handed to the fallback compositor, which draws on
//! the caller's task instead. Choosing the fallback is never an error.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::runtime::{Handle, RuntimeFlavor};

use crate::grid::GridLayout;
use crate::tile::TileRef;

/// Where compositing runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Venue {
    /// A dedicated worker that can block freely.
    Isolated,
    /// The caller's own task, shared with other responsive work.
    MainThread,
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Venue::Isolated => write!(f, "isolated"),
            Venue::MainThread => write!(f, "main-thread"),
        }
    }
}

/// Reports whether an isolated rendering worker is available.
pub trait CapabilityProbe: Send + Sync {
    fn isolated_surface_available(&self) -> bool;
}

/// Probes the ambient tokio runtime.
///
/// A multi-threaded runtime can park a blocking compositor on its own worker
/// without starving the caller; a current-thread runtime cannot.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuntimeProbe;

impl CapabilityProbe for RuntimeProbe {
    fn isolated_surface_available(&self) -> bool {
        Handle::try_current()
            .map(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread)
            .unwrap_or(false)
    }
}

/// A probe with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe(pub bool);

impl CapabilityProbe for FixedProbe {
    fn isolated_surface_available(&self) -> bool {
        self.0
    }
}

/// Venue selection as configured by the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum VenueChoice {
    /// Probe the runtime
    #[default]
    Auto,
    /// Always use the isolated worker
    Isolated,
    /// Always use the main-thread fallback
    MainThread,
}

impl VenueChoice {
    pub fn probe(self) -> Box<dyn CapabilityProbe> {
        match self {
            VenueChoice::Auto => Box::new(RuntimeProbe),
            VenueChoice::Isolated => Box::new(FixedProbe(true)),
            VenueChoice::MainThread => Box::new(FixedProbe(false)),
        }
    }
}

/// Pick the venue for one run.
pub fn negotiate(probe: &dyn CapabilityProbe) -> Venue {
    if probe.isolated_surface_available() {
        Venue::Isolated
    } else {
        Venue::MainThread
    }
}

/// Informational result of negotiation, reported before drawing starts
/// together with the planned layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CapabilityInfo {
    pub venue: Venue,
    pub layout: GridLayout,
}

impl CapabilityInfo {
    pub fn isolated_available(&self) -> bool {
        self.venue == Venue::Isolated
    }
}

/// Layout summary sent along with a fallback handoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayoutInfo {
    pub tile_count: usize,
    pub tile_width: u32,
    pub tile_height: u32,
    pub min_x: i64,
    pub min_y: i64,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

/// Everything the fallback compositor needs to draw without the engine.
#[derive(Debug, Clone)]
pub struct FallbackHandoff {
    pub tiles: Vec<TileRef>,
    pub tile_width: u32,
    pub tile_height: u32,
    pub min_x: i64,
    pub min_y: i64,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl FallbackHandoff {
    pub fn new(tiles: Vec<TileRef>, layout: &GridLayout) -> Self {
        Self {
            tiles,
            tile_width: layout.tile_width,
            tile_height: layout.tile_height,
            min_x: layout.min_x,
            min_y: layout.min_y,
            canvas_width: layout.canvas_width,
            canvas_height: layout.canvas_height,
        }
    }

    pub fn info(&self) -> LayoutInfo {
        LayoutInfo {
            tile_count: self.tiles.len(),
            tile_width: self.tile_width,
            tile_height: self.tile_height,
            min_x: self.min_x,
            min_y: self.min_y,
            canvas_width: self.canvas_width,
            canvas_height: self.canvas_height,
        }
    }
}
