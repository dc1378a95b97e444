//! Optional options file (`stitch.yaml`).
//!
//! Holds defaults for the `stitch` command. Every key is optional and
//! command-line flags take precedence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::compose::DEFAULT_ROWS_PER_BAND;
use crate::error::{Result, StitchError};
use crate::session::StitchOptions;
use crate::venue::VenueChoice;

/// Stitch defaults loaded from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StitchConfig {
    /// Output image path.
    pub output: PathBuf,

    /// Use the banded, memory-bounded strategy.
    pub safe_mode: bool,

    /// Grid rows per band in safe mode.
    pub rows_per_band: u32,

    /// Where to compose.
    pub venue: VenueChoice,

    /// Check every tile against the first tile's dimensions.
    pub verify_tile_sizes: bool,

    /// Write a layout JSON file next to the output image.
    pub layout_json: bool,
}

fn default_output() -> PathBuf {
    PathBuf::from("combined.png")
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            safe_mode: false,
            rows_per_band: DEFAULT_ROWS_PER_BAND,
            venue: VenueChoice::Auto,
            verify_tile_sizes: true,
            layout_json: false,
        }
    }
}

impl StitchConfig {
    /// Load options from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| StitchError::Io {
            path: path.to_path_buf(),
            message: format!("Failed to read config: {}", e),
        })?;

        Self::parse(&content)
    }

    /// Parse options from a YAML string.
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = serde_yaml::from_str(content).map_err(|e| StitchError::Parse {
            message: format!("Invalid config: {}", e),
            help: Some("Check stitch.yaml syntax".to_string()),
        })?;

        if config.rows_per_band == 0 {
            return Err(StitchError::Parse {
                message: "rows_per_band must be at least 1".to_string(),
                help: None,
            });
        }

        Ok(config)
    }

    /// Engine options described by this config.
    pub fn options(&self) -> StitchOptions {
        StitchOptions {
            safe_mode: self.safe_mode,
            rows_per_band: self.rows_per_band,
            verify_tile_sizes: self.verify_tile_sizes,
        }
    }
}
