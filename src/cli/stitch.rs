//! Stitch command implementation.
//!
//! Collects tiles from the given paths, composes them and writes the PNG.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use tokio::runtime::{Builder, Runtime};

use crate::compose::{Phase, ProgressEvent};
use crate::config::StitchConfig;
use crate::discovery::discover_inputs;
use crate::error::{Result, StitchError};
use crate::grid::{write_layout_json, GridLayout};
use crate::output::{display_path, format_bytes, plural, Printer};
use crate::session::{StitchEvent, StitchOptions, Stitcher};
use crate::tile::collect_tiles;
use crate::venue::VenueChoice;

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG: &str = "stitch.yaml";

/// Compose tiles into a single image
#[derive(Args, Debug, Default)]
pub struct StitchArgs {
    /// Tile files, or directories to search for tiles
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Output PNG path [default: combined.png]
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Draw in row bands to cap memory use
    #[arg(long)]
    pub safe_mode: bool,

    /// Grid rows per band in safe mode [default: 8]
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub rows_per_band: Option<u32>,

    /// Where to compose
    #[arg(long, value_enum)]
    pub venue: Option<VenueChoice>,

    /// Skip checking that every tile matches the first tile's size
    #[arg(long)]
    pub no_verify: bool,

    /// Also write a layout JSON file next to the output
    #[arg(long)]
    pub layout_json: bool,

    /// Options file (YAML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Only print warnings and errors
    #[arg(long, short)]
    pub quiet: bool,
}

/// Effective settings after merging the config file and flags.
#[derive(Debug, Clone, PartialEq)]
struct Settings {
    output: PathBuf,
    options: StitchOptions,
    venue: VenueChoice,
    layout_json: bool,
}

impl Settings {
    fn resolve(args: &StitchArgs, config: &StitchConfig) -> Self {
        let mut options = config.options();
        options.safe_mode |= args.safe_mode;
        if let Some(rows) = args.rows_per_band {
            options.rows_per_band = rows;
        }
        if args.no_verify {
            options.verify_tile_sizes = false;
        }

        Self {
            output: args.output.clone().unwrap_or_else(|| config.output.clone()),
            options,
            venue: args.venue.unwrap_or(config.venue),
            layout_json: args.layout_json || config.layout_json,
        }
    }
}

pub fn run(args: StitchArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let settings = Settings::resolve(&args, &config);
    let printer = if args.quiet {
        Printer::quiet()
    } else {
        Printer::new()
    };

    let inputs = discover_inputs(&args.paths)?;
    printer.status("Collected", &plural(inputs.len(), "file", "files"));

    let runtime = build_runtime(settings.venue)?;
    let mut reporter = Reporter::new(&printer);
    let result = runtime.block_on(async {
        let mut stitcher = Stitcher::with_boxed_probe(settings.venue.probe());
        let handle = stitcher.start(inputs.clone(), settings.options).await;
        handle.finish(|event| reporter.on_event(event)).await
    })?;

    write_output(&settings.output, &result.png)?;
    printer.status(
        "Stitched",
        &format!(
            "{} ({}×{}, {})",
            printer.cyan(&display_path(&settings.output)),
            result.width,
            result.height,
            format_bytes(result.png.len() as u64)
        ),
    );

    if settings.layout_json {
        if let Some(layout) = reporter.layout {
            let tiles = collect_tiles(inputs)?;
            let json_path = settings.output.with_extension("json");
            let image_name = settings
                .output
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            write_layout_json(&layout, &tiles, &image_name, &json_path)?;
            printer.status("Wrote", &printer.cyan(&display_path(&json_path)));
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<StitchConfig> {
    match path {
        Some(path) => StitchConfig::load(path),
        None if Path::new(DEFAULT_CONFIG).is_file() => StitchConfig::load(Path::new(DEFAULT_CONFIG)),
        None => Ok(StitchConfig::default()),
    }
}

/// A current-thread runtime has no spare worker, which is what the
/// main-thread venue models.
fn build_runtime(venue: VenueChoice) -> Result<Runtime> {
    let mut builder = match venue {
        VenueChoice::MainThread => Builder::new_current_thread(),
        VenueChoice::Auto | VenueChoice::Isolated => Builder::new_multi_thread(),
    };
    Ok(builder.build()?)
}

fn write_output(path: &Path, png: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| StitchError::Io {
                path: parent.to_path_buf(),
                message: format!("Failed to create output directory: {}", e),
            })?;
        }
    }

    fs::write(path, png).map_err(|e| StitchError::Io {
        path: path.to_path_buf(),
        message: format!("Failed to write output: {}", e),
    })
}

/// Prints run events, throttling progress to 10% steps.
struct Reporter<'a> {
    printer: &'a Printer,
    last_step: Option<(Phase, u32)>,
    layout: Option<GridLayout>,
}

impl<'a> Reporter<'a> {
    fn new(printer: &'a Printer) -> Self {
        Self {
            printer,
            last_step: None,
            layout: None,
        }
    }

    fn on_event(&mut self, event: &StitchEvent) {
        match event {
            StitchEvent::Ready(info) => {
                let layout = info.layout;
                self.layout = Some(layout);
                self.printer.info(
                    "Planned",
                    &format!(
                        "{}×{} canvas ({}×{} grid of {}×{} tiles)",
                        layout.canvas_width,
                        layout.canvas_height,
                        layout.columns(),
                        layout.rows(),
                        layout.tile_width,
                        layout.tile_height
                    ),
                );
                if !info.isolated_available() {
                    self.printer.warning(
                        "Warning",
                        "isolated worker not available, using main-thread fallback",
                    );
                }
            }
            StitchEvent::Progress(progress) => self.on_progress(progress),
            StitchEvent::Fallback(info) => self.printer.info(
                "Fallback",
                &format!("drawing {}", plural(info.tile_count, "tile", "tiles")),
            ),
            StitchEvent::Done(_) | StitchEvent::Error(_) => {}
        }
    }

    fn on_progress(&mut self, progress: &ProgressEvent) {
        let step = (progress.phase, progress.percent() / 10);
        if self.last_step != Some(step) {
            self.last_step = Some(step);
            self.printer.progress(progress);
        }
    }
}
