//! Reduce a heatmap to scored bounding boxes.
//!
//! Every candidate from the [`CandidateCache`] is scored by the mean heatmap value inside it.
//! Candidates with a density above a fraction of the best density go through
//! [`non_max_suppression`], the survivors are the detected regions.

use std::sync::Arc;

use ndarray::{Array1, Array2, ArrayView2, Axis};
use rayon::prelude::*;

use crate::Result;
use crate::bbox::{Bbox, Xyxy};
use crate::cache::CandidateCache;
use crate::candidates::CandidateGenerator;
use crate::config::{HeatlocConfig, SelectionConfig};
use crate::integral::IntegralImage;
use crate::nms::non_max_suppression;

/// A detected region, with a bounding box and a score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    /// The bounding box of the region in heatmap coordinates.
    pub bbox: Bbox<Xyxy>,
    /// The mean heatmap value inside the box.
    pub score: f64,
}

/// The regions detected in a single heatmap.
#[derive(Debug, Clone, PartialEq)]
pub struct Regions {
    /// One `[x1, y1, x2, y2]` row per region.
    pub boxes: Array2<f64>,
    /// The score of each region, parallel to `boxes`, descending.
    pub scores: Array1<f64>,
}

impl Regions {
    pub fn empty() -> Self {
        Self {
            boxes: Array2::zeros((0, 4)),
            scores: Array1::zeros(0),
        }
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn bbox(&self, index: usize) -> Bbox<Xyxy> {
        let row = self.boxes.row(index);
        Bbox::xyxy(row[0], row[1], row[2], row[3])
    }

    /// The detections, best first.
    pub fn detections(&self) -> impl Iterator<Item = Detection> + '_ {
        self.scores
            .iter()
            .enumerate()
            .map(|(i, &score)| Detection {
                bbox: self.bbox(i),
                score,
            })
    }

    /// The best scoring detection, if any.
    pub fn best(&self) -> Option<Detection> {
        self.detections().next()
    }
}

/// Turns heatmaps into [`Regions`], sharing one candidate cache across calls.
#[derive(Debug, Clone)]
pub struct RegionSelector {
    cache: Arc<CandidateCache>,
    config: SelectionConfig,
}

impl RegionSelector {
    pub fn new(cache: Arc<CandidateCache>, config: SelectionConfig) -> Self {
        Self { cache, config }
    }

    /// Create a selector with its own candidate cache from a full configuration.
    pub fn from_config(config: &HeatlocConfig) -> Result<Self> {
        config.validate()?;

        let generator = CandidateGenerator::new(&config.candidates);
        let cache = CandidateCache::new(generator, config.cache.capacity);

        Ok(Self::new(Arc::new(cache), config.selection.clone()))
    }

    pub fn cache(&self) -> &Arc<CandidateCache> {
        &self.cache
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    /// Detect the regions of a single heatmap.
    ///
    /// Returns an empty result when the heatmap is too small to hold any candidate. When no
    /// candidate passes the density threshold (for example an all-zero heatmap), the single best
    /// candidate is returned.
    pub fn select(&self, heatmap: ArrayView2<f32>) -> Result<Regions> {
        let candidates = self.cache.get_or_generate(heatmap.dim());
        if candidates.is_empty() {
            tracing::debug!(shape = ?heatmap.dim(), "no candidates fit the heatmap");
            return Ok(Regions::empty());
        }

        let densities = IntegralImage::new(heatmap).densities(&candidates)?;

        let max_density = densities.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let threshold = self.config.density_ratio * max_density;
        let survivors: Vec<usize> = densities
            .iter()
            .enumerate()
            .filter(|(_, density)| **density > threshold)
            .map(|(i, _)| i)
            .collect();

        let picks = if survivors.is_empty() {
            tracing::debug!(max_density, "no candidate above the density threshold");
            vec![first_max(&densities)]
        } else {
            let starts = candidates.starts.select(Axis(0), &survivors);
            let ends = candidates.ends.select(Axis(0), &survivors);
            let scores = densities.select(Axis(0), &survivors);

            non_max_suppression(
                starts.view(),
                ends.view(),
                scores.view(),
                self.config.nms_threshold,
            )
            .into_iter()
            .map(|pick| survivors[pick])
            .collect()
        };

        tracing::debug!(
            candidates = candidates.len(),
            survivors = survivors.len(),
            regions = picks.len(),
            "selected regions"
        );

        let boxes = picks
            .iter()
            .map(|&i| <[f64; 4]>::from(candidates.bbox(i)))
            .collect::<Vec<_>>();

        Ok(Regions {
            boxes: Array2::from(boxes),
            scores: densities.select(Axis(0), &picks),
        })
    }

    /// Detect the regions of many heatmaps in parallel.
    ///
    /// The results are in the same order as `heatmaps`.
    pub fn select_batch(&self, heatmaps: &[ArrayView2<f32>]) -> Result<Vec<Regions>> {
        heatmaps
            .par_iter()
            .map(|heatmap| self.select(heatmap.view()))
            .collect()
    }
}

impl Default for RegionSelector {
    fn default() -> Self {
        Self::new(Arc::default(), SelectionConfig::default())
    }
}

/// Index of the first maximum, with `NaN` treated as the largest value.
fn first_max(values: &Array1<f64>) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(best, best_value), (i, &value)| {
            if value.total_cmp(&best_value).is_gt() && !best_value.is_nan() {
                (i, value)
            } else {
                (best, best_value)
            }
        })
        .0
}
