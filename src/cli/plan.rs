//! Plan command implementation.
//!
//! Probes tile headers and prints the resulting grid without drawing.

use std::path::PathBuf;

use clap::Args;
use tokio_util::sync::CancellationToken;

use crate::compose::ProgressEvent;
use crate::discovery::discover_inputs;
use crate::error::Result;
use crate::grid::{layout_json, GridLayout, MAX_DIMENSION, MAX_PIXELS};
use crate::output::{plural, Printer};
use crate::session::prepare;
use crate::tile::TileRef;

/// Show the grid and canvas size without drawing
#[derive(Args, Debug, Default)]
pub struct PlanArgs {
    /// Tile files, or directories to search for tiles
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Skip checking that every tile matches the first tile's size
    #[arg(long)]
    pub no_verify: bool,

    /// Print the layout as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Image file name recorded in the JSON layout (empty if omitted)
    #[arg(long, requires = "json")]
    pub image: Option<String>,
}

pub fn run(args: PlanArgs) -> Result<()> {
    let printer = Printer::new();
    let inputs = discover_inputs(&args.paths)?;

    let mut ignore = |_: ProgressEvent| {};
    let (tiles, layout) = prepare(
        inputs,
        !args.no_verify,
        &mut ignore,
        &CancellationToken::new(),
    )?;

    if args.json {
        println!("{}", json_report(&args, &layout, &tiles)?);
        return Ok(());
    }

    printer.info("Tiles", &plural(tiles.len(), "tile", "tiles"));
    printer.info(
        "Grid",
        &format!(
            "x {}..={}, y {}..={} ({}×{} cells, {} empty)",
            layout.min_x,
            layout.max_x,
            layout.min_y,
            layout.max_y,
            layout.columns(),
            layout.rows(),
            (layout.columns() * layout.rows()).saturating_sub(tiles.len() as u64)
        ),
    );
    printer.info(
        "Tile size",
        &format!("{}×{}", layout.tile_width, layout.tile_height),
    );
    printer.info(
        "Canvas",
        &format!(
            "{}×{} = {} px (limits: {} px per side, {} px total)",
            layout.canvas_width,
            layout.canvas_height,
            layout.pixel_count(),
            MAX_DIMENSION,
            MAX_PIXELS
        ),
    );

    Ok(())
}

fn json_report(args: &PlanArgs, layout: &GridLayout, tiles: &[TileRef]) -> Result<String> {
    layout_json(layout, tiles, args.image.as_deref().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use crate::compose::test_support::solid_png;
    use crate::error::StitchError;
    use crate::tile::TileInput;
    use clap::Parser;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_plan_directory() {
        let dir = tempdir().unwrap();
        for name in ["0,0.png", "3,1.png"] {
            fs::write(dir.path().join(name), solid_png(2, 2, [0, 0, 0, 255])).unwrap();
        }

        let args = PlanArgs {
            paths: vec![dir.path().to_path_buf()],
            ..PlanArgs::default()
        };
        run(args).unwrap();
    }

    #[test]
    fn test_plan_json_records_given_image_name() {
        let inputs = vec![TileInput::from_bytes("0,0.png", solid_png(2, 2, [0, 0, 0, 255]))];
        let mut ignore = |_: ProgressEvent| {};
        let (tiles, layout) =
            prepare(inputs, true, &mut ignore, &CancellationToken::new()).unwrap();

        let cli = Cli::parse_from(["tilestitch", "plan", "--json", "--image", "atlas.png", "."]);
        let args = match cli.command {
            Commands::Plan(args) => args,
            _ => panic!("expected plan command"),
        };
        let json: serde_json::Value =
            serde_json::from_str(&json_report(&args, &layout, &tiles).unwrap()).unwrap();
        assert_eq!(json["meta"]["image"], "atlas.png");

        let unnamed = PlanArgs {
            json: true,
            ..PlanArgs::default()
        };
        let json: serde_json::Value =
            serde_json::from_str(&json_report(&unnamed, &layout, &tiles).unwrap()).unwrap();
        assert_eq!(json["meta"]["image"], "");
    }

    #[test]
    fn test_plan_image_requires_json() {
        let parsed = Cli::try_parse_from(["tilestitch", "plan", "--image", "a.png", "."]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_plan_too_large() {
        let dir = tempdir().unwrap();
        for name in ["0,0.png", "20000,0.png"] {
            fs::write(dir.path().join(name), solid_png(2, 2, [0, 0, 0, 255])).unwrap();
        }

        let args = PlanArgs {
            paths: vec![dir.path().to_path_buf()],
            ..PlanArgs::default()
        };
        assert!(matches!(
            run(args),
            Err(StitchError::CanvasTooLarge { .. })
        ));
    }
}
