use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::candidates::CandidateSet;
use crate::{Error, Result};

/// Summed area table of a heatmap.
///
/// Cell `(i, j)` holds the sum of all heatmap cells with row `<= i` and column `<= j`.
#[derive(Debug, Clone)]
pub struct IntegralImage {
    table: Array2<f64>,
}

impl IntegralImage {
    /// Build the integral image of `heatmap`, accumulating rows first and columns second.
    pub fn new(heatmap: ArrayView2<f32>) -> Self {
        let mut table = heatmap.mapv(f64::from);
        table.accumulate_axis_inplace(Axis(0), |&prev, curr| *curr += prev);
        table.accumulate_axis_inplace(Axis(1), |&prev, curr| *curr += prev);

        Self { table }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.table.dim()
    }

    pub fn table(&self) -> ArrayView2<'_, f64> {
        self.table.view()
    }

    /// Sum of the heatmap inside the box from `start` to `end`, both `(row, column)`.
    ///
    /// The corners are used directly as indices: the sum covers rows `start.0 + 1..=end.0` and
    /// columns `start.1 + 1..=end.1`, so a box of `(x2 - x1) * (y2 - y1)` cells. Corners
    /// outside of the table are an error, they are never clamped.
    pub fn box_sum(&self, start: (usize, usize), end: (usize, usize)) -> Result<f64> {
        let (x1, y1) = start;
        let (x2, y2) = end;

        let cell = |row: usize, col: usize| {
            self.table
                .get([row, col])
                .copied()
                .ok_or_else(|| Error::OutOfBounds {
                    start,
                    end,
                    shape: self.shape(),
                })
        };

        Ok(cell(x2, y2)? + cell(x1, y1)? - cell(x1, y2)? - cell(x2, y1)?)
    }

    /// Mean heatmap value of every candidate, the box sum divided by the candidate area.
    pub fn densities(&self, candidates: &CandidateSet) -> Result<Array1<f64>> {
        (0..candidates.len())
            .map(|i| {
                let volume = self.box_sum(candidates.start(i), candidates.end(i))?;
                Ok(volume / candidates.areas[i])
            })
            .collect::<Result<Vec<_>>>()
            .map(Array1::from)
    }
}
