use std::path::PathBuf;

use clap::Parser;
use heatloc::eval::store::{self, Documents, GroundTruth, Prediction};
use heatloc::eval::{self, EvalSummary};
use miette::Result;

use super::summary::print_summary;

/// Evaluate the best predicted region of every sample against its ground truth
#[derive(Parser, Debug)]
pub struct Evaluate {
    /// JSON file with a `region` and `score` per sample.
    #[clap(long, short)]
    pub predictions: PathBuf,
    /// JSON file with the `rects` and `image_size` per sample.
    #[clap(long, short)]
    pub ground_truth: PathBuf,
    /// Where to write the evaluation records.
    #[clap(long, short)]
    pub output: PathBuf,
}

impl Evaluate {
    pub fn evaluate(self) -> Result<()> {
        let predictions: Documents<Prediction> = store::load_documents(&self.predictions)?;
        let ground_truth: Documents<GroundTruth> = store::load_documents(&self.ground_truth)?;

        let samples = store::join_samples(&predictions, &ground_truth);
        let evaluation = eval::evaluate_batch(&samples);
        store::save_records(&self.output, &evaluation.records)?;

        tracing::info!(
            evaluated = evaluation.records.len(),
            skipped = evaluation.skipped.len(),
            "wrote records to `{}`",
            self.output.display()
        );

        match EvalSummary::from_records(&evaluation.records, None) {
            Some(summary) => print_summary(&summary),
            None => tracing::warn!("no sample could be evaluated"),
        }

        Ok(())
    }
}
