use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod detections;
pub mod evaluate;
pub mod summary;

/// `heateval` - Offline evaluation of heatmap localization results
///
/// Predictions and ground truth are JSON objects keyed by sample id.
///
/// # Evaluating the best region of every sample
/// ```sh
/// heateval evaluate --predictions predictions.json --ground-truth truth.json --output evals.json
/// ```
///
/// # Labeling all regions for a precision-recall analysis
/// ```sh
/// heateval detections --predictions regions.json --ground-truth truth.json --output labels.mp
/// ```
///
/// # Summarizing stored evaluation records
/// ```sh
/// heateval summary --evals evals.json --allow-list ids.txt
/// ```
#[derive(Parser, Debug)]
#[clap(name = "heateval", version)]
pub struct Cli {
    /// Configuration file, the defaults are used when omitted.
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,
    /// Log debug output.
    #[clap(long, short, global = true)]
    pub verbose: bool,
    #[clap(subcommand)]
    pub action: Commands,
}

/// All possible commands for the cli, used for clap derive macros.
#[derive(Subcommand, Debug)]
pub enum Commands {
    Evaluate(evaluate::Evaluate),
    Detections(detections::Detections),
    Summary(summary::Summary),
}
