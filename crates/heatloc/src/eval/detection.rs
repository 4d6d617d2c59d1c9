//! Detection style evaluation against any number of target boxes per image.

use serde::{Deserialize, Serialize};

use crate::bbox::{Bbox, Xyxy};
use crate::region::Regions;
use crate::{Error, Result};

/// Whether `rect` hits any of the `targets`.
///
/// A target is hit when at least `threshold` of `rect` lies inside it.
pub fn hits(rect: &Bbox<Xyxy>, targets: &[Bbox<Xyxy>], threshold: f64) -> bool {
    targets
        .iter()
        .any(|target| rect.intersection_over_left(target) >= threshold)
}

/// Hit labels and scores of all predicted boxes in a dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionLabels {
    /// `1` when the prediction hit a target, `0` otherwise.
    #[serde(alias = "hitted_labels")]
    pub hit_labels: Vec<u8>,
    /// The score of each prediction, parallel to `hit_labels`.
    #[serde(alias = "pred_labels")]
    pub scores: Vec<f64>,
}

impl DetectionLabels {
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Label the regions detected in one image against the targets of that image.
    pub fn record(&mut self, regions: &Regions, targets: &[Bbox<Xyxy>], threshold: f64) {
        for detection in regions.detections() {
            self.push(hits(&detection.bbox, targets, threshold), detection.score);
        }
    }

    /// Label boxes with parallel scores, as read back from a stored prediction.
    pub fn record_boxes(
        &mut self,
        boxes: &[Bbox<Xyxy>],
        scores: &[f64],
        targets: &[Bbox<Xyxy>],
        threshold: f64,
    ) -> Result<()> {
        if boxes.len() != scores.len() {
            return Err(Error::ShapeMismatch {
                expected: boxes.len(),
                found: scores.len(),
            });
        }

        for (rect, &score) in boxes.iter().zip(scores) {
            self.push(hits(rect, targets, threshold), score);
        }

        Ok(())
    }

    /// Check that there is exactly one hit label per score.
    pub fn check_lengths(&self) -> Result<()> {
        if self.hit_labels.len() != self.scores.len() {
            return Err(Error::ShapeMismatch {
                expected: self.scores.len(),
                found: self.hit_labels.len(),
            });
        }

        Ok(())
    }

    fn push(&mut self, hit: bool, score: f64) {
        self.hit_labels.push(u8::from(hit));
        self.scores.push(score);
    }

    pub fn positives(&self) -> usize {
        self.hit_labels.iter().filter(|label| **label != 0).count()
    }
}

/// Precision and recall at every distinct score, from the highest score down.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrecisionRecall {
    pub precision: Vec<f64>,
    pub recall: Vec<f64>,
    /// The score at which each precision/recall pair is reached.
    pub thresholds: Vec<f64>,
}

/// Compute the precision-recall curve of the labeled detections.
///
/// Predictions are accepted from the highest score down; predictions with equal scores are
/// accepted together. When there are no hits at all, the recall is `0.0` everywhere.
///
/// Fails with [`Error::ShapeMismatch`] when the labels and scores are not parallel.
pub fn precision_recall_curve(labels: &DetectionLabels) -> Result<PrecisionRecall> {
    labels.check_lengths()?;

    let mut order: Vec<usize> = (0..labels.len()).collect();
    order.sort_by(|&a, &b| labels.scores[b].total_cmp(&labels.scores[a]));

    let positives = labels.positives();
    let mut curve = PrecisionRecall::default();
    let (mut true_positives, mut accepted) = (0usize, 0usize);

    for (position, &index) in order.iter().enumerate() {
        accepted += 1;
        if labels.hit_labels[index] != 0 {
            true_positives += 1;
        }

        let score = labels.scores[index];
        let last_of_score = order
            .get(position + 1)
            .is_none_or(|&next| labels.scores[next] != score);
        if !last_of_score {
            continue;
        }

        curve
            .precision
            .push(true_positives as f64 / accepted as f64);
        curve.recall.push(if positives == 0 {
            0.0
        } else {
            true_positives as f64 / positives as f64
        });
        curve.thresholds.push(score);
    }

    Ok(curve)
}

/// Average precision, the precision weighted by the recall gained at each threshold.
pub fn average_precision(curve: &PrecisionRecall) -> f64 {
    let mut previous_recall = 0.0;
    let mut ap = 0.0;

    for (precision, recall) in curve.precision.iter().zip(&curve.recall) {
        ap += (recall - previous_recall) * precision;
        previous_recall = *recall;
    }

    ap
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(hit_labels: &[u8], scores: &[f64]) -> DetectionLabels {
        DetectionLabels {
            hit_labels: hit_labels.to_vec(),
            scores: scores.to_vec(),
        }
    }

    #[test]
    fn hit_requires_coverage_of_prediction() {
        let targets = [
            Bbox::xyxy(0.0, 0.0, 10.0, 10.0),
            Bbox::xyxy(50.0, 50.0, 60.0, 60.0),
        ];

        // fully inside the second target
        assert!(hits(&Bbox::xyxy(52.0, 52.0, 58.0, 58.0), &targets, 0.7));
        // 60% inside the first target
        assert!(!hits(&Bbox::xyxy(4.0, 0.0, 14.0, 10.0), &targets, 0.7));
        assert!(hits(&Bbox::xyxy(4.0, 0.0, 14.0, 10.0), &targets, 0.6));
        assert!(!hits(&Bbox::xyxy(20.0, 20.0, 30.0, 30.0), &targets, 0.7));
        assert!(!hits(&Bbox::xyxy(0.0, 0.0, 10.0, 10.0), &[], 0.7));
    }

    #[test]
    fn record_regions() {
        let regions = Regions {
            boxes: ndarray::array![[0.0, 0.0, 10.0, 10.0], [30.0, 30.0, 40.0, 40.0]],
            scores: ndarray::array![0.9, 0.4],
        };

        let mut labels = DetectionLabels::default();
        labels.record(&regions, &[Bbox::xyxy(0.0, 0.0, 12.0, 12.0)], 0.7);

        assert_eq!(labels.hit_labels, vec![1, 0]);
        assert_eq!(labels.scores, vec![0.9, 0.4]);
        assert_eq!(labels.positives(), 1);
    }

    #[test]
    fn record_boxes_checks_lengths() {
        let mut labels = DetectionLabels::default();
        let result = labels.record_boxes(&[Bbox::xyxy(0.0, 0.0, 1.0, 1.0)], &[], &[], 0.7);

        assert!(matches!(
            result,
            Err(Error::ShapeMismatch {
                expected: 1,
                found: 0
            })
        ));
        assert!(labels.is_empty());
    }

    #[test]
    fn curve_and_average_precision() {
        let labels = labels(&[1, 0, 1, 1, 0], &[0.9, 0.8, 0.7, 0.6, 0.5]);
        let curve = precision_recall_curve(&labels).unwrap();

        assert_eq!(curve.thresholds, vec![0.9, 0.8, 0.7, 0.6, 0.5]);
        assert_eq!(curve.precision, vec![1.0, 0.5, 2.0 / 3.0, 0.75, 0.6]);
        assert_eq!(curve.recall, vec![1.0 / 3.0, 1.0 / 3.0, 2.0 / 3.0, 1.0, 1.0]);
        assert!((average_precision(&curve) - 29.0 / 36.0).abs() < 1e-12);
    }

    #[test]
    fn equal_scores_share_a_threshold() {
        let labels = labels(&[0, 1, 1], &[0.5, 0.5, 0.9]);
        let curve = precision_recall_curve(&labels).unwrap();

        assert_eq!(curve.thresholds, vec![0.9, 0.5]);
        assert_eq!(curve.precision, vec![1.0, 2.0 / 3.0]);
        assert_eq!(curve.recall, vec![0.5, 1.0]);
    }

    #[test]
    fn no_hits_has_zero_recall() {
        let curve = precision_recall_curve(&labels(&[0, 0], &[0.3, 0.2])).unwrap();

        assert_eq!(curve.recall, vec![0.0, 0.0]);
        assert_eq!(curve.precision, vec![0.0, 0.0]);
        assert_eq!(average_precision(&curve), 0.0);
    }

    #[test]
    fn curve_rejects_unparallel_labels() {
        let result = precision_recall_curve(&labels(&[1], &[0.9, 0.5]));
        assert!(matches!(
            result,
            Err(Error::ShapeMismatch {
                expected: 2,
                found: 1
            })
        ));

        let result = precision_recall_curve(&labels(&[1, 1, 0], &[0.9]));
        assert!(result.is_err());
    }
}
