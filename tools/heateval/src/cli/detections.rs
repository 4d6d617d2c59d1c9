use std::path::PathBuf;

use clap::Parser;
use heatloc::config::HeatlocConfig;
use heatloc::eval::store::{self, DetectionPrediction, Documents, GroundTruth};
use heatloc::eval::{average_precision, precision_recall_curve};
use miette::Result;

/// Label every predicted region as hit or miss, and report the average precision
#[derive(Parser, Debug)]
pub struct Detections {
    /// JSON file with the `regions` and `scores` per sample.
    #[clap(long, short)]
    pub predictions: PathBuf,
    /// JSON file with the `rects` and `image_size` per sample.
    #[clap(long, short)]
    pub ground_truth: PathBuf,
    /// Where to write the labels, as MessagePack.
    #[clap(long, short)]
    pub output: PathBuf,
    /// Fraction of a region that has to lie inside a target to hit it.
    /// Overrides `evaluation.hit_threshold` of the config.
    #[clap(long)]
    pub hit_threshold: Option<f64>,
}

impl Detections {
    pub fn detections(self, config: &HeatlocConfig) -> Result<()> {
        let threshold = self
            .hit_threshold
            .unwrap_or(config.evaluation.hit_threshold);

        let predictions: Documents<DetectionPrediction> =
            store::load_documents(&self.predictions)?;
        let ground_truth: Documents<GroundTruth> = store::load_documents(&self.ground_truth)?;

        let labels = store::label_detections(&predictions, &ground_truth, threshold)?;
        store::save_labels(&self.output, &labels)?;

        tracing::info!(
            regions = labels.len(),
            hits = labels.positives(),
            threshold,
            "wrote labels to `{}`",
            self.output.display()
        );

        let curve = precision_recall_curve(&labels)?;
        println!("average precision: {:.4}", average_precision(&curve));

        Ok(())
    }
}
