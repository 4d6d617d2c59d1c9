use std::path::PathBuf;

use clap::Parser;
use heatloc::eval::EvalSummary;
use heatloc::eval::store;
use miette::{Result, miette};

/// Print the mean statistics of stored evaluation records
#[derive(Parser, Debug)]
pub struct Summary {
    /// JSON file written by `heateval evaluate`.
    #[clap(long, short)]
    pub evals: PathBuf,
    /// Only count the sample ids in this file, one per line.
    #[clap(long, short)]
    pub allow_list: Option<PathBuf>,
}

impl Summary {
    pub fn summary(self) -> Result<()> {
        let records = store::load_records(&self.evals)?;
        let allow_list = self
            .allow_list
            .as_ref()
            .map(store::load_allow_list)
            .transpose()?;

        let summary = EvalSummary::from_records(&records, allow_list.as_ref())
            .ok_or_else(|| miette!("no evaluation records left to summarize"))?;
        print_summary(&summary);

        Ok(())
    }
}

pub fn print_summary(summary: &EvalSummary) {
    println!("samples:        {}", summary.count);
    println!("mean iou:       {:.4}", summary.mean_iou);
    println!("mean dist err:  {:.4}", summary.mean_distance_error);
    println!("mean scale err: {:.4}", summary.mean_scale_error);
}
