//! Offline evaluation of predicted regions against ground truth.

pub mod detection;
pub mod store;

use std::collections::{BTreeMap, HashSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::bbox::{Bbox, Xyxy};
use crate::{Error, Result};

pub use detection::{
    DetectionLabels, PrecisionRecall, average_precision, hits, precision_recall_curve,
};

/// Localization quality of one predicted box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvalRecord {
    /// Intersection over union with the ground truth.
    pub iou: f64,
    /// Distance between the box centers, relative to the image diagonal.
    pub distance_error: f64,
    /// Length of the `(width ratio, height ratio)` vector of prediction over ground truth.
    pub scale_error: f64,
}

/// Evaluation records keyed by sample id.
pub type EvalRecords = BTreeMap<String, EvalRecord>;

/// Evaluate a predicted box against the ground truth box of an image of `(height, width)`.
///
/// Fails with [`Error::DegenerateImage`] when the image has no height or width, and with
/// [`Error::DegenerateGroundTruth`] when the ground truth has no width or height.
pub fn evaluate(
    predicted: &Bbox<Xyxy>,
    ground_truth: &Bbox<Xyxy>,
    (height, width): (usize, usize),
) -> Result<EvalRecord> {
    if height == 0 || width == 0 {
        return Err(Error::DegenerateImage { height, width });
    }

    let (gt_width, gt_height) = (ground_truth.width(), ground_truth.height());
    if gt_width == 0.0 || gt_height == 0.0 {
        return Err(Error::DegenerateGroundTruth {
            width: gt_width,
            height: gt_height,
        });
    }

    let diagonal = (height as f64).hypot(width as f64);

    Ok(EvalRecord {
        iou: predicted.iou(ground_truth),
        distance_error: predicted.center_distance(ground_truth) / diagonal,
        scale_error: (predicted.width() / gt_width).hypot(predicted.height() / gt_height),
    })
}

/// A single prediction to evaluate.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub id: String,
    pub predicted: Bbox<Xyxy>,
    pub ground_truth: Bbox<Xyxy>,
    /// `(height, width)` of the original image.
    pub image_size: (usize, usize),
}

/// Result of [`evaluate_batch`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchEvaluation {
    pub records: EvalRecords,
    /// Ids of the samples that could not be evaluated.
    pub skipped: Vec<String>,
}

/// Evaluate all samples in parallel.
///
/// Samples with a degenerate image size or ground truth are skipped and listed in
/// [`BatchEvaluation::skipped`].
pub fn evaluate_batch(samples: &[Sample]) -> BatchEvaluation {
    let results: Vec<(String, Result<EvalRecord>)> = samples
        .par_iter()
        .map(|sample| {
            let record = evaluate(&sample.predicted, &sample.ground_truth, sample.image_size);
            (sample.id.clone(), record)
        })
        .collect();

    let mut evaluation = BatchEvaluation::default();
    for (id, result) in results {
        match result {
            Ok(record) => {
                evaluation.records.insert(id, record);
            }
            Err(error) => {
                tracing::warn!(%id, %error, "skipping sample");
                evaluation.skipped.push(id);
            }
        }
    }

    evaluation
}

/// Mean localization quality over a set of samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvalSummary {
    pub mean_iou: f64,
    pub mean_distance_error: f64,
    pub mean_scale_error: f64,
    pub count: usize,
}

impl EvalSummary {
    /// Summarize `records`, only counting the samples in `allow_list` when one is given.
    ///
    /// Returns `None` when no sample is left to summarize.
    pub fn from_records(
        records: &EvalRecords,
        allow_list: Option<&HashSet<String>>,
    ) -> Option<Self> {
        let selected: Vec<&EvalRecord> = records
            .iter()
            .filter(|(id, _)| allow_list.is_none_or(|allowed| allowed.contains(*id)))
            .map(|(_, record)| record)
            .collect();

        if selected.is_empty() {
            return None;
        }

        let count = selected.len();
        let mean = |field: fn(&EvalRecord) -> f64| {
            selected.iter().map(|record| field(record)).sum::<f64>() / count as f64
        };

        Some(Self {
            mean_iou: mean(|r| r.iou),
            mean_distance_error: mean(|r| r.distance_error),
            mean_scale_error: mean(|r| r.scale_error),
            count,
        })
    }
}
