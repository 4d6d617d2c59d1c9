//! Reading and writing evaluation inputs and results.
//!
//! Evaluation records and the input documents are JSON, detection labels are MessagePack.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use super::{DetectionLabels, EvalRecords, Sample};
use crate::bbox::{Bbox, Xyxy};
use crate::{Error, Result};

/// The single best region predicted for a sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// `[x1, y1, x2, y2]`
    pub region: [f64; 4],
    pub score: f64,
}

/// All regions predicted for a sample, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionPrediction {
    pub regions: Vec<[f64; 4]>,
    pub scores: Vec<f64>,
}

/// The annotated boxes of a sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    pub rects: Vec<[f64; 4]>,
    /// `(height, width)` of the image.
    pub image_size: (usize, usize),
}

impl GroundTruth {
    pub fn boxes(&self) -> Vec<Bbox<Xyxy>> {
        self.rects.iter().copied().map(Bbox::from).collect()
    }
}

/// Documents keyed by sample id.
pub type Documents<T> = BTreeMap<String, T>;

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| Error::io(path, e))
}

fn write(path: &Path, contents: &[u8]) -> Result<()> {
    std::fs::write(path, contents).map_err(|e| Error::io(path, e))
}

/// Load a JSON object of documents keyed by sample id.
pub fn load_documents<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Documents<T>> {
    Ok(serde_json::from_slice(&read(path.as_ref())?)?)
}

pub fn save_records(path: impl AsRef<Path>, records: &EvalRecords) -> Result<()> {
    write(path.as_ref(), &serde_json::to_vec_pretty(records)?)
}

pub fn load_records(path: impl AsRef<Path>) -> Result<EvalRecords> {
    load_documents(path)
}

pub fn save_labels(path: impl AsRef<Path>, labels: &DetectionLabels) -> Result<()> {
    write(path.as_ref(), &rmp_serde::to_vec_named(labels)?)
}

/// Load detection labels, also accepting the `hitted_labels` and `pred_labels` keys.
///
/// Fails with [`Error::ShapeMismatch`] when the file does not hold one label per score.
pub fn load_labels(path: impl AsRef<Path>) -> Result<DetectionLabels> {
    let labels: DetectionLabels = rmp_serde::from_slice(&read(path.as_ref())?)?;
    labels.check_lengths()?;

    Ok(labels)
}

/// Load a list of sample ids, one per line. Blank lines are ignored.
pub fn load_allow_list(path: impl AsRef<Path>) -> Result<HashSet<String>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;

    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect())
}

/// Pair every prediction with the first ground truth box of the same sample.
///
/// Predictions without ground truth are left out with a warning.
pub fn join_samples(
    predictions: &Documents<Prediction>,
    ground_truth: &Documents<GroundTruth>,
) -> Vec<Sample> {
    predictions
        .iter()
        .filter_map(|(id, prediction)| {
            let Some(truth) = ground_truth.get(id) else {
                tracing::warn!(%id, "no ground truth for prediction");
                return None;
            };
            let Some(&rect) = truth.rects.first() else {
                tracing::warn!(%id, "ground truth has no boxes");
                return None;
            };

            Some(Sample {
                id: id.clone(),
                predicted: Bbox::from(prediction.region),
                ground_truth: Bbox::from(rect),
                image_size: truth.image_size,
            })
        })
        .collect()
}

/// Label every predicted region against all ground truth boxes of its sample.
///
/// Samples without ground truth have nothing to hit, so all their regions are misses.
pub fn label_detections(
    predictions: &Documents<DetectionPrediction>,
    ground_truth: &Documents<GroundTruth>,
    threshold: f64,
) -> Result<DetectionLabels> {
    let mut labels = DetectionLabels::default();

    for (id, prediction) in predictions {
        let targets = ground_truth
            .get(id)
            .map(GroundTruth::boxes)
            .unwrap_or_default();
        if targets.is_empty() {
            tracing::debug!(%id, "no ground truth boxes, every region is a miss");
        }

        let boxes: Vec<Bbox<Xyxy>> = prediction.regions.iter().copied().map(Bbox::from).collect();
        labels.record_boxes(&boxes, &prediction.scores, &targets, threshold)?;
    }

    Ok(labels)
}
