pub mod completions;
pub mod plan;
pub mod stitch;

use clap::{ArgAction, Parser, Subcommand};

/// tilestitch - Stitch x,y-named image tiles into one PNG
#[derive(Parser, Debug)]
#[command(name = "tilestitch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compose tiles into a single image
    Stitch(stitch::StitchArgs),

    /// Show the grid and canvas size without drawing
    Plan(plan::PlanArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}
