use clap::Parser;
use miette::Result;
use tilestitch::cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();
    tilestitch::logging::init_logging(cli.verbose);

    match cli.command {
        Commands::Stitch(args) => tilestitch::cli::stitch::run(args)?,
        Commands::Plan(args) => tilestitch::cli::plan::run(args)?,
        Commands::Completions(args) => tilestitch::cli::completions::run(args)?,
    }

    Ok(())
}
