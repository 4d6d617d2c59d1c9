use itertools::Itertools;
use ndarray::{Array1, Array2};

use crate::bbox::{Bbox, Xyxy};
use crate::config::CandidateConfig;

/// Default of the reserved `scales` option.
const DEFAULT_SCALES: [u32; 3] = [2, 5, 7];

/// A fixed set of candidate boxes for one image shape.
///
/// The three fields are parallel: candidate `i` spans from `starts[i]` to `ends[i]`, both
/// `(row, column)` pairs, and is scored against `areas[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSet {
    pub starts: Array2<usize>,
    pub ends: Array2<usize>,
    pub areas: Array1<f64>,
}

impl CandidateSet {
    /// Number of candidates in the set.
    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    pub fn start(&self, index: usize) -> (usize, usize) {
        (self.starts[[index, 0]], self.starts[[index, 1]])
    }

    pub fn end(&self, index: usize) -> (usize, usize) {
        (self.ends[[index, 0]], self.ends[[index, 1]])
    }

    /// The candidate at `index` as a bounding box.
    pub fn bbox(&self, index: usize) -> Bbox<Xyxy> {
        Bbox::from_corners(self.start(index), self.end(index))
    }
}

/// Generates sliding window candidates from a multi-scale, multi-aspect-ratio template.
#[derive(Debug, Clone)]
pub struct CandidateGenerator {
    /// The `(height, width)` of every window in the template, in generation order.
    pub window_sizes: Vec<(usize, usize)>,
    pub stride_fraction: f64,
    pub use_exact_clipped_area: bool,
}

impl CandidateGenerator {
    pub fn new(config: &CandidateConfig) -> CandidateGenerator {
        if config.scales.as_slice() != DEFAULT_SCALES {
            tracing::debug!(
                scales = ?config.scales,
                "`scales` is reserved and does not change the candidate template"
            );
        }

        let extents = Self::create_extents(
            &config.scale_multipliers,
            &config.aspect_ratios,
            config.base_length,
        );
        let window_sizes = Self::create_window_sizes(&extents);

        CandidateGenerator {
            window_sizes,
            stride_fraction: config.stride_fraction,
            use_exact_clipped_area: config.use_exact_clipped_area,
        }
    }

    /// Create the template extents in whole pixels.
    ///
    /// Every scale multiplier is crossed with every aspect ratio, with the scales in the outer
    /// loop. The products are truncated towards zero.
    fn create_extents(scales: &[f64], aspect_ratios: &[f64], base_length: f64) -> Vec<usize> {
        scales
            .iter()
            .cartesian_product(aspect_ratios)
            .map(|(scale, ratio)| (scale * ratio * base_length) as usize)
            .collect()
    }

    /// Pair every extent as a height with every extent as a width.
    ///
    /// Duplicate sizes are kept, the order of the sizes decides which of two equally scoring
    /// candidates survives suppression.
    fn create_window_sizes(extents: &[usize]) -> Vec<(usize, usize)> {
        extents
            .iter()
            .copied()
            .cartesian_product(extents.iter().copied())
            .collect()
    }

    /// Generate the candidate boxes for an image of `(height, width)` pixels.
    ///
    /// Windows slide with a stride of `stride_fraction` times their own size. A window that
    /// reaches past the last row or column is clipped to it, its area is then the clipped area
    /// and it is dropped when that area is zero.
    pub fn generate(&self, (height, width): (usize, usize)) -> CandidateSet {
        let mut starts = Vec::new();
        let mut ends = Vec::new();
        let mut areas = Vec::new();

        for &(window_height, window_width) in &self.window_sizes {
            // sub-pixel template extents truncate to empty windows
            if window_height == 0 || window_width == 0 {
                continue;
            }

            let nominal_area = (window_height * window_width) as f64;
            let row_stride = self.stride(window_height);
            let col_stride = self.stride(window_width);

            for (x1, y1) in (0..height)
                .step_by(row_stride)
                .cartesian_product((0..width).step_by(col_stride))
            {
                let mut x2 = x1 + window_height;
                let mut y2 = y1 + window_width;
                let mut clipped = false;

                if x2 >= height {
                    clipped = true;
                    x2 = height - 1;
                }
                if y2 >= width {
                    clipped = true;
                    y2 = width - 1;
                }

                let area = if clipped || self.use_exact_clipped_area {
                    let area = ((x2 - x1) * (y2 - y1)) as f64;
                    if area == 0.0 {
                        continue;
                    }
                    area
                } else {
                    nominal_area
                };

                starts.push([x1, y1]);
                ends.push([x2, y2]);
                areas.push(area);
            }
        }

        tracing::debug!(height, width, count = areas.len(), "generated candidate set");

        CandidateSet {
            starts: Array2::from(starts),
            ends: Array2::from(ends),
            areas: Array1::from(areas),
        }
    }

    fn stride(&self, size: usize) -> usize {
        ((size as f64 * self.stride_fraction) as usize).max(1)
    }
}

impl Default for CandidateGenerator {
    fn default() -> Self {
        Self::new(&CandidateConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(base_length: f64) -> CandidateGenerator {
        CandidateGenerator::new(&CandidateConfig {
            base_length,
            ..CandidateConfig::default()
        })
    }

    #[test]
    fn template_extents() {
        let generator = CandidateGenerator::default();

        assert_eq!(generator.window_sizes.len(), 225);
        let heights = generator
            .window_sizes
            .iter()
            .step_by(15)
            .map(|(h, _)| *h)
            .collect_vec();
        assert_eq!(
            heights,
            vec![
                100, 133, 161, 200, 276, 150, 200, 242, 300, 413, 200, 266, 323, 400, 552
            ]
        );
        assert_eq!(generator.window_sizes[1], (100, 133));
        assert_eq!(generator.window_sizes[15], (133, 100));
    }

    #[test]
    fn generation_is_deterministic() {
        let generator = CandidateGenerator::default();

        let first = generator.generate((240, 320));
        let second = generator.generate((240, 320));

        assert!(!first.is_empty());
        assert_eq!(first, second);
        assert!(first.areas.iter().all(|area| *area > 0.0));
    }

    #[test]
    fn candidates_stay_inside_the_image() {
        let candidates = generator(20.0).generate((100, 80));

        for i in 0..candidates.len() {
            let (x1, y1) = candidates.start(i);
            let (x2, y2) = candidates.end(i);
            assert!(x1 < x2 && x2 < 100, "rows {x1}..{x2}");
            assert!(y1 < y2 && y2 < 80, "cols {y1}..{y2}");
        }
    }

    #[test]
    fn clipped_candidates_record_clipped_area() {
        let candidates = CandidateGenerator::default().generate((100, 100));

        assert_eq!(candidates.len(), 361);
        assert_eq!(candidates.start(0), (0, 0));
        assert_eq!(candidates.end(0), (99, 99));
        assert_eq!(candidates.areas[0], 9801.0);
        assert_eq!(candidates.start(1), (0, 50));
        assert_eq!(candidates.areas[1], 4851.0);
    }

    #[test]
    fn unclipped_candidates_record_nominal_area() {
        let candidates = generator(20.0).generate((100, 100));

        assert_eq!(candidates.start(0), (0, 0));
        assert_eq!(candidates.end(0), (20, 20));
        assert_eq!(candidates.areas[0], 400.0);
        assert_eq!(candidates.start(1), (0, 10));
        assert_eq!(candidates.end(1), (20, 30));
    }

    #[test]
    fn exact_area_policy_agrees_for_whole_pixel_templates() {
        let legacy = generator(20.0).generate((64, 48));
        let exact = CandidateGenerator::new(&CandidateConfig {
            base_length: 20.0,
            use_exact_clipped_area: true,
            ..CandidateConfig::default()
        })
        .generate((64, 48));

        assert_eq!(legacy, exact);
    }

    #[test]
    fn empty_windows_are_skipped() {
        let generator = generator(0.5);
        assert!(generator.window_sizes.iter().any(|(h, w)| *h == 0 || *w == 0));

        let candidates = generator.generate((4, 4));

        assert!(!candidates.is_empty());
        assert!(candidates.areas.iter().all(|area| *area > 0.0));
        for i in 0..candidates.len() {
            let (x1, y1) = candidates.start(i);
            let (x2, y2) = candidates.end(i);
            assert!(x1 < x2 && y1 < y2);
        }
    }

    #[test]
    fn tiny_image_has_no_candidates() {
        let candidates = CandidateGenerator::default().generate((1, 1));
        assert!(candidates.is_empty());

        let candidates = CandidateGenerator::default().generate((0, 10));
        assert!(candidates.is_empty());
    }

    #[test]
    fn reserved_scales_do_not_change_the_template() {
        let reserved = CandidateGenerator::new(&CandidateConfig {
            scales: vec![2, 7, 15],
            ..CandidateConfig::default()
        });

        assert_eq!(
            reserved.window_sizes,
            CandidateGenerator::default().window_sizes
        );
    }
}
