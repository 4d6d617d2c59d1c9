use clap::Parser;
use heatloc::config::{Config, HeatlocConfig};
use miette::Result;
use tracing::Level;

mod cli;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    miette::set_panic_hook();
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .init();

    let config = match &args.config {
        Some(path) => HeatlocConfig::load_file(path)?,
        None => HeatlocConfig::default(),
    };
    config.validate()?;

    match args.action {
        Commands::Evaluate(opts) => opts.evaluate()?,
        Commands::Detections(opts) => opts.detections(&config)?,
        Commands::Summary(opts) => opts.summary()?,
    }

    Ok(())
}
